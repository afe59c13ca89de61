use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ApprovalStep, Attachment, LineItem};

/// Requisition-level workflow status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ApprovalStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

/// The purchase request record and its workflow state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: String,
    pub title: String,
    pub requester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_email: Option<String>,
    pub department: String,
    pub date_requested: DateTime<Utc>,
    pub justification: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub approval_status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approval_steps: Vec<ApprovalStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_approval_step: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_issued_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_received_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Requisition {
    /// A freshly-initialized, empty Draft requisition.
    pub fn new_draft(now: DateTime<Utc>) -> Self {
        Self {
            id: format!("REQ-{}", now.timestamp_millis()),
            title: String::new(),
            requester: String::new(),
            requester_email: None,
            department: String::new(),
            date_requested: now,
            justification: String::new(),
            line_items: Vec::new(),
            total_amount: Decimal::ZERO,
            approval_status: ApprovalStatus::Draft,
            approval_steps: Vec::new(),
            current_approval_step: None,
            po_number: None,
            po_issued_date: None,
            invoice_number: None,
            invoice_received_date: None,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_steps(&self) -> bool {
        !self.approval_steps.is_empty()
    }

    /// The pointer value, defaulting to the first step when unset.
    pub fn pointer(&self) -> u8 {
        self.current_approval_step.unwrap_or(1)
    }

    pub fn step_at(&self, order: u8) -> Option<&ApprovalStep> {
        self.approval_steps.iter().find(|s| s.order == order)
    }

    /// The step currently awaiting action, if steps exist.
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        self.step_at(self.pointer())
    }

    pub fn line_item(&self, id: &str) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.id == id)
    }
}

/// A partial update merged into the current requisition by the store.
/// Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequisitionPatch {
    pub title: Option<String>,
    pub requester: Option<String>,
    pub requester_email: Option<String>,
    pub department: Option<String>,
    pub date_requested: Option<DateTime<Utc>>,
    pub justification: Option<String>,
    pub line_items: Option<Vec<LineItem>>,
    pub total_amount: Option<Decimal>,
    pub approval_status: Option<ApprovalStatus>,
    pub approval_steps: Option<Vec<ApprovalStep>>,
    pub current_approval_step: Option<u8>,
    pub po_number: Option<String>,
    pub po_issued_date: Option<DateTime<Utc>>,
    pub invoice_number: Option<String>,
    pub invoice_received_date: Option<DateTime<Utc>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl RequisitionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the present fields into `requisition`. Does not touch `updated_at`.
    pub fn apply_to(self, requisition: &mut Requisition) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    requisition.$field = value;
                })*
            };
        }
        macro_rules! merge_opt {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    requisition.$field = Some(value);
                })*
            };
        }

        merge!(
            title,
            requester,
            department,
            date_requested,
            justification,
            line_items,
            total_amount,
            approval_status,
            approval_steps,
            attachments,
        );
        merge_opt!(
            requester_email,
            current_approval_step,
            po_number,
            po_issued_date,
            invoice_number,
            invoice_received_date,
        );
    }
}
