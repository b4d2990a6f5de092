// Fixed-length numeric identifiers

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

fn validate(kind: &'static str, digits: usize, value: &str) -> Result<()> {
    if value.len() == digits && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(DomainError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            digits,
        })
    }
}

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $digits:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const DIGITS: usize = $digits;

            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                let trimmed = value.trim();
                validate($kind, $digits, trimmed)?;
                Ok(Self(trimmed.to_string()))
            }

            /// Build from an integer column, restoring leading zeros
            pub fn from_number(value: i64) -> Result<Self> {
                if value < 0 {
                    return Err(DomainError::InvalidIdentifier {
                        kind: $kind,
                        value: value.to_string(),
                        digits: $digits,
                    });
                }
                Self::new(format!("{:0width$}", value, width = $digits))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

fixed_id!(
    /// National id of a patient (11 digits)
    PatientId,
    "patient",
    11
);
fixed_id!(
    /// Registration code of a doctor (7 digits)
    DoctorId,
    "doctor",
    7
);
fixed_id!(
    /// Code of a clinic (6 digits)
    ClinicId,
    "clinic",
    6
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(PatientId::new("12345678901").unwrap().as_str(), "12345678901");
        assert_eq!(DoctorId::new(" 1234567 ").unwrap().as_str(), "1234567");
        assert!(ClinicId::new("123456").is_ok());
    }

    #[test]
    fn test_wrong_length_or_letters_rejected() {
        assert!(PatientId::new("1234567890").is_err());
        assert!(DoctorId::new("12345a7").is_err());
        assert!(ClinicId::new("").is_err());

        let err = ClinicId::new("12").unwrap_err();
        assert!(err.to_string().contains("6 digits"));
    }

    #[test]
    fn test_from_number_restores_leading_zeros() {
        assert_eq!(ClinicId::from_number(42).unwrap().as_str(), "000042");
        assert!(ClinicId::from_number(1_234_567).is_err());
        assert!(DoctorId::from_number(-1).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: DoctorId = serde_json::from_str("\"7654321\"").unwrap();
        assert_eq!(id.as_str(), "7654321");
        assert!(serde_json::from_str::<DoctorId>("\"76\"").is_err());
    }
}
