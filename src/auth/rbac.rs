/*!
 * # Role Directory
 *
 * Maps identities onto the fixed approval roles. The mapping is plain data
 * (role → set of emails) loaded from configuration, so the chain can be
 * re-staffed without touching code.
 */

use std::collections::HashMap;
use tracing::warn;

use crate::config::ApproverTable;
use crate::models::ApproverRole;

/// Every role an identity can hold.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display,
)]
pub enum Role {
    Finance,
    #[strum(serialize = "COO")]
    #[serde(rename = "COO")]
    Coo,
    #[strum(serialize = "CFO")]
    #[serde(rename = "CFO")]
    Cfo,
    #[strum(serialize = "CEO")]
    #[serde(rename = "CEO")]
    Ceo,
    /// Administrative override: may act at any pointer position.
    Admin,
    /// Anyone not in the directory.
    Requester,
}

impl Role {
    /// The chain role this identity answers for, if any.
    pub fn as_approver(self) -> Option<ApproverRole> {
        match self {
            Role::Finance => Some(ApproverRole::Finance),
            Role::Coo => Some(ApproverRole::Coo),
            Role::Cfo => Some(ApproverRole::Cfo),
            Role::Ceo => Some(ApproverRole::Ceo),
            Role::Admin | Role::Requester => None,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    /// True for the four chain roles and Admin.
    pub fn is_approver(self) -> bool {
        self != Role::Requester
    }
}

impl From<ApproverRole> for Role {
    fn from(role: ApproverRole) -> Self {
        match role {
            ApproverRole::Finance => Role::Finance,
            ApproverRole::Coo => Role::Coo,
            ApproverRole::Cfo => Role::Cfo,
            ApproverRole::Ceo => Role::Ceo,
        }
    }
}

/// Normalizes an email for comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Role → permitted identities lookup.
#[derive(Debug, Clone, Default)]
pub struct ApproverDirectory {
    by_email: HashMap<String, Role>,
}

impl ApproverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `role` to `email`. An email already mapped keeps its first role.
    pub fn grant(&mut self, role: Role, email: &str) -> &mut Self {
        let key = normalize_email(email);
        if let Some(existing) = self.by_email.get(&key) {
            if *existing != role {
                warn!(
                    email = %key,
                    existing = %existing,
                    ignored = %role,
                    "Identity listed under more than one role; keeping the first"
                );
            }
            return self;
        }
        self.by_email.insert(key, role);
        self
    }

    pub fn from_table(table: &ApproverTable) -> Self {
        let mut directory = Self::new();
        let rows: [(Role, &Vec<String>); 5] = [
            (Role::Admin, &table.admin),
            (Role::Finance, &table.finance),
            (Role::Coo, &table.coo),
            (Role::Cfo, &table.cfo),
            (Role::Ceo, &table.ceo),
        ];
        for (role, emails) in rows {
            for email in emails {
                directory.grant(role, email);
            }
        }
        directory
    }

    /// Role for `email`; identities not in the table are requesters.
    pub fn role_for(&self, email: &str) -> Role {
        self.by_email
            .get(&normalize_email(email))
            .copied()
            .unwrap_or(Role::Requester)
    }

    pub fn is_approver(&self, email: &str) -> bool {
        self.role_for(email).is_approver()
    }

    /// All identities holding `role`, sorted.
    pub fn members(&self, role: Role) -> Vec<String> {
        let mut members: Vec<String> = self
            .by_email
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(email, _)| email.clone())
            .collect();
        members.sort();
        members
    }
}
