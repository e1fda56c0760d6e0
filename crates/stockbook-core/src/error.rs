//! # Error Types
//!
//! Input validation errors for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-store errors (separate crate)                               │
//! │  └── StoreError       - Document store failures                        │
//! │                                                                         │
//! │  stockbook-ledger errors (separate crate)                              │
//! │  └── LedgerError      - What callers of the engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError ← StoreError                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, limits)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any read or write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same component appears twice in one bill of materials.
    #[error("bill of materials lists component {product_id} more than once")]
    DuplicateComponent { product_id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 10_000,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 10000");
    }

    #[test]
    fn test_duplicate_component_message() {
        let err = ValidationError::DuplicateComponent {
            product_id: "c-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "bill of materials lists component c-1 more than once"
        );
    }
}
