/// Error type shared by the task and category services.
///
/// Absence of a record on get/update/delete is not an error: those
/// operations return `Ok(None)` and leave the decision to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Malformed id or one or more schema rule violations.
    #[error("{0}")]
    Validation(String),
    /// A category with the same name (ignoring case) already exists.
    #[error("{0}")]
    Conflict(String),
    /// A bulk operation referenced ids that match no record.
    #[error("{0}")]
    NotFound(String),
}
