use thiserror::Error;

/// Rule violations detected before any storage call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("User ID is required")]
    UserIdRequired,

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Amount must not exceed {}", crate::validate::MAX_AMOUNT)]
    AmountTooLarge,

    #[error("Budget limit must be greater than zero")]
    NonPositiveLimit,

    #[error("Budget limit must not exceed {}", crate::validate::MAX_AMOUNT)]
    LimitTooLarge,

    #[error("Price must be greater than zero")]
    NonPositivePrice,

    #[error("Category must be a non-empty string")]
    EmptyCategory,

    #[error("Name must be a non-empty string")]
    EmptyName,

    #[error("Date must be in YYYY-MM-DD format: {0}")]
    InvalidDate(String),

    #[error("Month must be in YYYY-MM format: {0}")]
    InvalidMonth(String),

    #[error("Limit must be a number between 1 and 100")]
    InvalidPageLimit,

    #[error("Offset must be a non-negative number")]
    InvalidPageOffset,

    #[error("Invalid CNPJ: {0}")]
    InvalidCnpj(&'static str),

    #[error("Barcode must be between 8 and 14 digits")]
    InvalidBarcode,
}

/// Error surfaced by the service layer.
///
/// Storage failures keep the backend's message verbatim; they are neither
/// retried nor classified further.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

pub(crate) type AppResult<T> = std::result::Result<T, AppError>;
