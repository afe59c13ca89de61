/*!
 * # Authentication Module
 *
 * Resolves an email/password pair into an [`Identity`] against a static
 * credential list, and maps identities onto approval roles through the
 * [`ApproverDirectory`]. The approval engine only ever sees the resulting
 * [`Actor`]; it performs no authentication itself.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, OpenDomainLogin, UserCredential};
use crate::errors::ServiceError;

mod rbac;

pub use rbac::*;

/// An authenticated person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

/// An identity together with the role it acts under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role,
        }
    }

    /// Resolves the role of `identity` through `directory`.
    pub fn resolve(identity: &Identity, directory: &ApproverDirectory) -> Self {
        Self::new(
            identity.email.clone(),
            identity.name.clone(),
            directory.role_for(&identity.email),
        )
    }

    /// True when this actor is the recorded requester of `requester_email`.
    pub fn is_same_person(&self, requester_email: Option<&str>) -> bool {
        requester_email
            .map(|email| normalize_email(email) == normalize_email(&self.email))
            .unwrap_or(false)
    }
}

/// Authentication boundary.
pub trait Authenticator {
    fn authenticate(&self, email: &str, password: &str) -> Result<Identity, ServiceError>;
}

/// Hashes `password` into an Argon2 PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::AuthError(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Ignoring malformed password hash: {}", e);
            false
        }
    }
}

/// `john.doe@x` → "John Doe".
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Authenticates against a fixed credential list, optionally admitting any
/// address in one open domain with a shared password.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: Vec<UserCredential>,
    open_domain: Option<OpenDomainLogin>,
}

impl StaticAuthenticator {
    pub fn new(users: Vec<UserCredential>, open_domain: Option<OpenDomainLogin>) -> Self {
        Self { users, open_domain }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.users.clone(), config.open_domain.clone())
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, email: &str, password: &str) -> Result<Identity, ServiceError> {
        let wanted = normalize_email(email);

        if let Some(user) = self
            .users
            .iter()
            .find(|u| normalize_email(&u.email) == wanted)
        {
            if verify_password(password, &user.password_hash) {
                info!(email = %wanted, "User authenticated");
                return Ok(Identity {
                    email: user.email.clone(),
                    name: user.name.clone(),
                });
            }
            debug!(email = %wanted, "Password mismatch for listed user");
        } else if let Some(open) = &self.open_domain {
            let suffix = format!("@{}", open.domain.trim().to_ascii_lowercase());
            if wanted.ends_with(&suffix) && verify_password(password, &open.shared_password_hash)
            {
                info!(email = %wanted, "User authenticated through open domain");
                return Ok(Identity {
                    email: email.trim().to_string(),
                    name: display_name_from_email(&wanted),
                });
            }
        }

        Err(ServiceError::AuthError(
            "Invalid email or password".to_string(),
        ))
    }
}
