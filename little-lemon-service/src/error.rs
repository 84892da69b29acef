use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("No cart items found for the user")]
    EmptyCart,
    #[error("You do not have permission to perform this action")]
    PermissionDenied,
    #[error("{0}")]
    BadRequest(String),
    #[error("Unexpected internal error")]
    Internal(#[source] DieselError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::EmptyCart => "empty_cart",
            ServiceError::PermissionDenied => "permission_denied",
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ServiceError::NotFound("record"),
            err => ServiceError::Internal(err),
        }
    }
}

/// Returns the kind of constraint a write tripped over, if any.
pub(crate) fn violated_constraint(err: &DieselError) -> Option<&DatabaseErrorKind> {
    match err {
        DieselError::DatabaseError(
            kind @ (DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::CheckViolation),
            _,
        ) => Some(kind),
        _ => None,
    }
}
