use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

const HASH_SEPARATOR: char = '$';
const DIGEST_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccountError {
    #[error("username and password are required")]
    MissingFields,

    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("stored password hash is malformed")]
    MalformedPasswordHash,
}

/// Username and password as entered by the user.
///
/// The username is trimmed; the password is kept verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Credentials for signing in: both fields must be present.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::MissingFields` if either field is empty.
    pub fn for_login(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AccountError> {
        let username = username.into().trim().to_string();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        Ok(Self { username, password })
    }

    /// Credentials for a new account, with length rules applied.
    ///
    /// # Errors
    ///
    /// Returns `AccountError` if a field is empty or shorter than allowed.
    pub fn for_registration(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AccountError> {
        let credentials = Self::for_login(username, password)?;
        if credentials.username.chars().count() < MIN_USERNAME_LEN {
            return Err(AccountError::UsernameTooShort {
                min: MIN_USERNAME_LEN,
            });
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(credentials)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Salted SHA-256 digest of a password, stored as `salt$digest` in hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl PasswordHash {
    #[must_use]
    pub fn derive(password: &str, salt: &[u8]) -> Self {
        Self {
            salt: salt.to_vec(),
            digest: digest(password, salt),
        }
    }

    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        digest(password, &self.salt) == self.digest
    }

    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{HASH_SEPARATOR}{}",
            hex::encode(&self.salt),
            hex::encode(&self.digest)
        )
    }
}

impl FromStr for PasswordHash {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (salt, digest) = s
            .split_once(HASH_SEPARATOR)
            .ok_or(AccountError::MalformedPasswordHash)?;
        let salt = hex::decode(salt).map_err(|_| AccountError::MalformedPasswordHash)?;
        let digest = hex::decode(digest).map_err(|_| AccountError::MalformedPasswordHash)?;
        if digest.len() != DIGEST_LEN {
            return Err(AccountError::MalformedPasswordHash);
        }
        Ok(Self { salt, digest })
    }
}

fn digest(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}
