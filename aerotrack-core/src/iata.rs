use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, CoreResult};

// ============================================================================
// IATA Airport Codes
// ============================================================================

/// Three letter, upper case airport identifier (e.g. `ATL`).
///
/// Construction goes through [`AirportCode::parse`], so a value of this type is
/// always well formed. Deserialization applies the same check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let code = raw.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::Validation(format!(
                "airport code '{}' must be exactly 3 uppercase letters",
                raw
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AirportCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
