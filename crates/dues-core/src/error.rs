use dues_domain::MonthKey;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),
    #[error(
        "{0} was covered by pooled credit and has no payment tagged to it; \
         delete the originating payment from the history instead"
    )]
    NotRevertible(MonthKey),
    #[error("Opening dues are covered by pooled payments and cannot be toggled")]
    OpeningNotToggleable,
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn member_not_found(id: Uuid) -> Self {
        CoreError::MemberNotFound(id.to_string())
    }
}
