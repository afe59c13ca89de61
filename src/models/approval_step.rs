use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role bound to one step of the approval chain.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ApproverRole {
    #[serde(rename = "Finance")]
    #[strum(serialize = "Finance")]
    Finance,
    #[serde(rename = "COO")]
    #[strum(serialize = "COO")]
    Coo,
    #[serde(rename = "CFO")]
    #[strum(serialize = "CFO")]
    Cfo,
    #[serde(rename = "CEO")]
    #[strum(serialize = "CEO")]
    Ceo,
}

/// The fixed approval chain, in order.
pub const APPROVAL_CHAIN: [ApproverRole; 4] = [
    ApproverRole::Finance,
    ApproverRole::Coo,
    ApproverRole::Cfo,
    ApproverRole::Ceo,
];

impl ApproverRole {
    /// 1-based position of this role in [`APPROVAL_CHAIN`].
    pub fn order(self) -> u8 {
        match self {
            ApproverRole::Finance => 1,
            ApproverRole::Coo => 2,
            ApproverRole::Cfo => 3,
            ApproverRole::Ceo => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
}

/// One role's decision in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStep {
    pub id: String,
    pub approver_role: ApproverRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_email: Option<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub order: u8,
}

impl ApprovalStep {
    /// A fresh Pending step for `role`, identified by its order.
    pub fn pending(role: ApproverRole) -> Self {
        Self {
            id: role.order().to_string(),
            approver_role: role,
            approver_name: None,
            approver_email: None,
            status: StepStatus::Pending,
            comments: None,
            approved_at: None,
            order: role.order(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }
}
