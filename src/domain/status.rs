use std::fmt;

/// Lifecycle stage of an order.
///
/// Variants are declared in lifecycle order, so the derived `Ord` gives
/// `Created < Paid < Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
    Delivered,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
            OrderStatus::Delivered => "Delivered",
        };
        f.write_str(name)
    }
}
