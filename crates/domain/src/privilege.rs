//! Privilege levels for administrative calls.
//!
//! Queries require [`Privilege::Observer`]; mutations require
//! [`Privilege::Operator`]; location changes and list reloads require
//! [`Privilege::Admin`].

use serde::{Deserialize, Serialize};

use crate::error::AccessDeniedError;

/// Caller privilege, ordered from least to most powerful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Observer,
    Operator,
    Admin,
}

impl Privilege {
    /// Check that this caller meets `required`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDeniedError`] when the caller's level is below
    /// `required`.
    pub fn require(self, required: Privilege) -> Result<(), AccessDeniedError> {
        if self >= required {
            Ok(())
        } else {
            Err(AccessDeniedError {
                required,
                actual: self,
            })
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Observer => f.write_str("observer"),
            Self::Operator => f.write_str("operator"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_order_privileges() {
        assert!(Privilege::Observer < Privilege::Operator);
        assert!(Privilege::Operator < Privilege::Admin);
    }

    #[test]
    fn should_allow_equal_or_higher_privilege() {
        assert!(Privilege::Operator.require(Privilege::Operator).is_ok());
        assert!(Privilege::Admin.require(Privilege::Observer).is_ok());
    }

    #[test]
    fn should_deny_lower_privilege() {
        let err = Privilege::Observer.require(Privilege::Admin).unwrap_err();
        assert_eq!(err.required, Privilege::Admin);
        assert_eq!(err.actual, Privilege::Observer);
    }
}
