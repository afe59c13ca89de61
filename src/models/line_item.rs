use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One priced entry within a requisition.
///
/// `total_price` is derived from `quantity × unit_price` and cannot be set
/// independently; it is carried in the serialized form so exported files stay
/// readable on their own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    total_price: Decimal,
}

impl LineItem {
    /// Creates a line item with a fresh identifier. `None` when
    /// `quantity × unit_price` does not fit in a [`Decimal`].
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: Decimal) -> Option<Self> {
        Self::with_id(Uuid::new_v4().to_string(), description, quantity, unit_price)
    }

    pub fn with_id(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Option<Self> {
        let mut item = Self {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
            total_price: Decimal::ZERO,
        };
        item.reprice()?;
        Some(item)
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// `quantity × unit_price`, computed from the current fields.
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    /// Re-derives `total_price` after `quantity` or `unit_price` changed.
    /// On overflow the item keeps its previous total.
    pub fn reprice(&mut self) -> Option<Decimal> {
        let total = self.line_total()?;
        self.total_price = total;
        Some(total)
    }
}
