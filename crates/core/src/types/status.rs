//! Order status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// The happy path is `Pending → {Paid | Placed} → Shipped → Delivered`.
/// `Cancelled` is reachable from any non-terminal state. Webhook-driven
/// transitions go through [`OrderStatus::can_transition_to`]; admin writes
/// are deliberately unconstrained (last writer wins) and bypass it at the
/// route layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, awaiting payment confirmation.
    #[default]
    Pending,
    /// Created at checkout without online payment (manual/WhatsApp flow).
    Placed,
    /// Payment confirmed by the gateway.
    Paid,
    /// Handed to the carrier / in transit.
    Shipped,
    /// Delivered to the customer. Terminal.
    Delivered,
    /// Cancelled. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are allowed from this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a transition to `next` is allowed on trusted (webhook) paths.
    ///
    /// Cancellation is allowed from any non-terminal state. Self-transitions
    /// are allowed so that repeated carrier callbacks are idempotent.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (_, Self::Cancelled)
                | (Self::Pending, Self::Paid | Self::Placed)
                | (Self::Paid | Self::Placed, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Map a carrier status string to an internal status.
    ///
    /// Carriers report coarse, uppercase status strings. Unrecognized strings
    /// return `None`: the webhook handler ignores them without error.
    #[must_use]
    pub fn from_carrier_status(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DELIVERED" => Some(Self::Delivered),
            "SHIPPED" | "IN TRANSIT" | "OUT FOR DELIVERY" => Some(Self::Shipped),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Placed => "placed",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "placed" => Ok(Self::Placed),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Placed,
            OrderStatus::Paid,
            OrderStatus::Shipped,
        ] {
            assert!(status.can_transition_to(OrderStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_frozen() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(OrderStatus::Shipped));
            assert!(!status.can_transition_to(OrderStatus::Cancelled));
        }
    }

    #[test]
    fn test_self_transition_is_idempotent() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_carrier_status_mapping() {
        assert_eq!(
            OrderStatus::from_carrier_status("DELIVERED"),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::from_carrier_status("SHIPPED"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::from_carrier_status("IN TRANSIT"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::from_carrier_status("out for delivery"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::from_carrier_status("CANCELLED"),
            Some(OrderStatus::Cancelled)
        );
    }

    #[test]
    fn test_carrier_status_unknown_ignored() {
        assert_eq!(OrderStatus::from_carrier_status("RTO INITIATED"), None);
        assert_eq!(OrderStatus::from_carrier_status(""), None);
    }

    #[test]
    fn test_display_from_str_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Placed,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
