//! Purchase order and invoice bookkeeping after final approval.

use chrono::{DateTime, Utc};

use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::models::{ApprovalStatus, Requisition, RequisitionPatch};

fn ensure_recordable(requisition: &Requisition, actor: &Actor, what: &str) -> Result<(), ServiceError> {
    if requisition.approval_status != ApprovalStatus::Approved {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot record {} on requisition in {} status. Must be in Approved status.",
            what, requisition.approval_status
        )));
    }
    if !actor.role.is_approver() {
        return Err(ServiceError::Forbidden(format!(
            "{} may not record {}",
            actor.email, what
        )));
    }
    Ok(())
}

fn required_number(value: &str, what: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!("{} is required", what)));
    }
    Ok(trimmed.to_string())
}

/// Records the issued purchase order number and date.
pub fn record_purchase_order(
    requisition: &Requisition,
    actor: &Actor,
    po_number: &str,
    issued: DateTime<Utc>,
) -> Result<RequisitionPatch, ServiceError> {
    ensure_recordable(requisition, actor, "a purchase order")?;
    Ok(RequisitionPatch {
        po_number: Some(required_number(po_number, "PO number")?),
        po_issued_date: Some(issued),
        ..Default::default()
    })
}

/// Records the received invoice number and date.
pub fn record_invoice(
    requisition: &Requisition,
    actor: &Actor,
    invoice_number: &str,
    received: DateTime<Utc>,
) -> Result<RequisitionPatch, ServiceError> {
    ensure_recordable(requisition, actor, "an invoice")?;
    Ok(RequisitionPatch {
        invoice_number: Some(required_number(invoice_number, "Invoice number")?),
        invoice_received_date: Some(received),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use assert_matches::assert_matches;

    fn approved() -> Requisition {
        let mut req = Requisition::new_draft(Utc::now());
        req.approval_status = ApprovalStatus::Approved;
        req
    }

    #[test]
    fn purchase_order_requires_approval() {
        let req = Requisition::new_draft(Utc::now());
        let finance = Actor::new("fin@x.com", "Fin", Role::Finance);
        assert_matches!(
            record_purchase_order(&req, &finance, "PO-1", Utc::now()),
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[test]
    fn requesters_cannot_record_documents() {
        let requester = Actor::new("a@x.com", "A", Role::Requester);
        assert_matches!(
            record_invoice(&approved(), &requester, "INV-1", Utc::now()),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn numbers_are_trimmed_and_required() {
        let ceo = Actor::new("ceo@x.com", "Ceo", Role::Ceo);
        let patch = record_purchase_order(&approved(), &ceo, "  PO-9 ", Utc::now()).unwrap();
        assert_eq!(patch.po_number.as_deref(), Some("PO-9"));
        assert_matches!(
            record_invoice(&approved(), &ceo, "  ", Utc::now()),
            Err(ServiceError::ValidationError(_))
        );
    }
}
