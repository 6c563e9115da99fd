// Field bounds and the errors raised when input falls outside them.

use crate::domain::{RequestId, RequestStatus};

/// Declared bounds for record fields.
///
/// Text bounds are measured in bytes of UTF-8, matching the fixed-width
/// encoding used by the flat-file backend.
pub mod limits {
    /// Maximum length of an equipment name.
    pub const NAME_LEN: usize = 63;
    /// Maximum length of an equipment description.
    pub const DESCRIPTION_LEN: usize = 255;
    /// Maximum length of a unit of issue, or of a requesting unit.
    pub const UNIT_LEN: usize = 31;
    /// Maximum length of a storage location.
    pub const LOCATION_LEN: usize = 63;
    /// Largest quantity or threshold that can be recorded.
    pub const QUANTITY_MAX: u32 = 999_999;
}

/// A field fell outside its declared bounds, or a requested change is not
/// permitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required text field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A text field exceeded its length bound.
    #[error("{field} is {len} bytes long; the limit is {max}")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Length of the supplied value in bytes.
        len: usize,
        /// Maximum permitted length in bytes.
        max: usize,
    },

    /// A text field contained a NUL byte, which fixed-width storage uses as
    /// padding.
    #[error("{field} must not contain NUL characters")]
    InvalidCharacter {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field fell outside its range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The supplied value.
        value: u32,
        /// Smallest permitted value.
        min: u32,
        /// Largest permitted value.
        max: u32,
    },

    /// A supply request status change that the lifecycle does not allow.
    #[error("request {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The request being changed.
        id: RequestId,
        /// The status it currently has.
        from: RequestStatus,
        /// The status that was requested.
        to: RequestStatus,
    },
}

pub(crate) fn check_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    if value.contains('\0') {
        return Err(ValidationError::InvalidCharacter { field });
    }
    Ok(())
}

pub(crate) fn check_required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    check_text(field, value, max)
}

pub(crate) const fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Error returned when text cannot be parsed as an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} identifier '{input}': expected a positive integer")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl ParseIdError {
    pub(crate) fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

/// Error returned when a name or numeric code does not correspond to any
/// variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} '{input}'")]
pub struct ParseCodeError {
    kind: &'static str,
    input: String,
}

impl ParseCodeError {
    pub(crate) fn new(kind: &'static str, input: impl ToString) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(
            check_required_text("name", "   ", 10),
            Err(ValidationError::Empty { field: "name" })
        );
    }

    #[test]
    fn text_bound_is_measured_in_bytes() {
        // 'é' is two bytes
        assert!(check_text("unit", "éé", 4).is_ok());
        assert_eq!(
            check_text("unit", "ééé", 4),
            Err(ValidationError::TooLong {
                field: "unit",
                len: 6,
                max: 4
            })
        );
    }

    #[test]
    fn text_rejects_embedded_nul() {
        assert_eq!(
            check_required_text("name", "Rope\0Coil", 63),
            Err(ValidationError::InvalidCharacter { field: "name" })
        );
        assert_eq!(
            check_text("location", "Bay\0", 63),
            Err(ValidationError::InvalidCharacter { field: "location" })
        );
    }

    #[test]
    fn range_is_inclusive() {
        assert!(check_range("quantity", 0, 0, 5).is_ok());
        assert!(check_range("quantity", 5, 0, 5).is_ok());
        assert!(check_range("quantity", 6, 0, 5).is_err());
        assert!(check_range("requested quantity", 0, 1, 5).is_err());
    }
}
