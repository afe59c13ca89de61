//! Line-item ledger.
//!
//! Every mutation rebuilds the item list and recomputes the aggregate total
//! as the sum of `quantity × unit_price`, returning both in one patch so the
//! total can never drift from the items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::ServiceError;
use crate::models::{ApprovalStatus, LineItem, Requisition, RequisitionPatch};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewLineItem {
    #[validate(
        length(min = 1, max = 500, message = "Description is required and must be at most 500 characters"),
        custom = "validate_not_blank"
    )]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: u32,
    #[validate(custom = "validate_positive_price")]
    pub unit_price: Decimal,
}

/// Changes to an existing line item; absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LineItemChanges {
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub description: Option<String>,
    pub quantity: Option<u32>,
    #[validate(custom = "validate_non_negative_price")]
    pub unit_price: Option<Decimal>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        let mut err = ValidationError::new("unit_price");
        err.message = Some("Unit price must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("unit_price");
        err.message = Some("Unit price must not be negative".into());
        return Err(err);
    }
    Ok(())
}

fn overflow() -> ServiceError {
    ServiceError::ValidationError("Amount exceeds the supported range".to_string())
}

/// Sum of `quantity × unit_price` over `items`. Fails when a line total or
/// the sum does not fit in a [`Decimal`].
pub fn recompute_total(items: &[LineItem]) -> Result<Decimal, ServiceError> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        item.line_total()
            .and_then(|total| sum.checked_add(total))
            .ok_or_else(overflow)
    })
}

fn ensure_editable(requisition: &Requisition) -> Result<(), ServiceError> {
    if requisition.approval_status != ApprovalStatus::Draft {
        return Err(ServiceError::InvalidStatus(format!(
            "Line items are locked once a requisition is {}",
            requisition.approval_status
        )));
    }
    Ok(())
}

fn items_patch(items: Vec<LineItem>) -> Result<RequisitionPatch, ServiceError> {
    Ok(RequisitionPatch {
        total_amount: Some(recompute_total(&items)?),
        line_items: Some(items),
        ..Default::default()
    })
}

/// Appends a validated line item. Invalid input leaves the requisition untouched.
pub fn add_line_item(
    requisition: &Requisition,
    input: &NewLineItem,
) -> Result<(LineItem, RequisitionPatch), ServiceError> {
    ensure_editable(requisition)?;
    input.validate()?;

    let item = LineItem::new(input.description.trim(), input.quantity, input.unit_price)
        .ok_or_else(overflow)?;
    let mut items = requisition.line_items.clone();
    items.push(item.clone());
    Ok((item, items_patch(items)?))
}

pub fn update_line_item(
    requisition: &Requisition,
    id: &str,
    changes: &LineItemChanges,
) -> Result<(LineItem, RequisitionPatch), ServiceError> {
    ensure_editable(requisition)?;
    changes.validate()?;

    let mut items = requisition.line_items.clone();
    let item = items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("Line item {} not found", id)))?;

    if let Some(description) = &changes.description {
        item.description = description.trim().to_string();
    }
    if let Some(quantity) = changes.quantity {
        item.quantity = quantity;
    }
    if let Some(unit_price) = changes.unit_price {
        item.unit_price = unit_price;
    }
    item.reprice().ok_or_else(overflow)?;
    let updated = item.clone();

    Ok((updated, items_patch(items)?))
}

pub fn remove_line_item(
    requisition: &Requisition,
    id: &str,
) -> Result<RequisitionPatch, ServiceError> {
    ensure_editable(requisition)?;

    let before = requisition.line_items.len();
    let items: Vec<LineItem> = requisition
        .line_items
        .iter()
        .filter(|item| item.id != id)
        .cloned()
        .collect();
    if items.len() == before {
        return Err(ServiceError::NotFound(format!("Line item {} not found", id)));
    }
    items_patch(items)
}
