//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for domain identifiers. Each newtype ensures
//! data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Maximum length of an upstream scheme code
const MAX_SCHEME_CODE_LEN: usize = 20;

/// Opaque upstream identifier for a mutual-fund scheme
///
/// Scheme codes arrive from the upstream catalog as short numeric strings
/// (e.g. `"127042"`), but the format is not guaranteed; the only contract
/// is non-empty ASCII alphanumeric content of at most 20 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemeCode(String);

impl SchemeCode {
    /// Create a validated scheme code
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidSchemeCode`] when the input is empty,
    /// longer than 20 characters, or contains non-alphanumeric characters.
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into();
        if code.is_empty() {
            return Err(DomainError::InvalidSchemeCode("empty".to_string()));
        }
        if code.len() > MAX_SCHEME_CODE_LEN {
            return Err(DomainError::InvalidSchemeCode(format!(
                "'{code}' exceeds {MAX_SCHEME_CODE_LEN} characters"
            )));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidSchemeCode(format!(
                "'{code}' contains non-alphanumeric characters"
            )));
        }
        Ok(Self(code))
    }

    /// The code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SchemeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchemeCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SchemeCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
