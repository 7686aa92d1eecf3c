//! Domain error types.

use serde::Serialize;
use thiserror::Error;

/// Why a request was rejected before touching any store.
///
/// The serialized form is a stable snake_case code that clients can
/// branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// A sale was submitted without line items.
    EmptySale,
    /// A quantity was zero, negative or out of range.
    BadQuantity,
    /// A price was negative (or not positive where a sellable price is required).
    BadPrice,
    /// A stock level was negative.
    BadStock,
    /// A subtotal or sale total is too large to be stored.
    AmountTooLarge,
    /// A client was submitted without a first name.
    MissingFirstName,
    /// A client was submitted without a last name.
    MissingLastName,
    /// A product was submitted without a name.
    MissingName,
}

impl InvalidReason {
    /// Returns the stable code for this reason.
    pub fn code(&self) -> &'static str {
        match self {
            InvalidReason::EmptySale => "empty_sale",
            InvalidReason::BadQuantity => "bad_quantity",
            InvalidReason::BadPrice => "bad_price",
            InvalidReason::BadStock => "bad_stock",
            InvalidReason::AmountTooLarge => "amount_too_large",
            InvalidReason::MissingFirstName => "missing_first_name",
            InvalidReason::MissingLastName => "missing_last_name",
            InvalidReason::MissingName => "missing_name",
        }
    }
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised by domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The request failed field-level validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(InvalidReason),
}

impl DomainError {
    /// Returns the validation reason.
    pub fn reason(&self) -> InvalidReason {
        match self {
            DomainError::InvalidRequest(reason) => *reason,
        }
    }
}

impl From<InvalidReason> for DomainError {
    fn from(reason: InvalidReason) -> Self {
        DomainError::InvalidRequest(reason)
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
