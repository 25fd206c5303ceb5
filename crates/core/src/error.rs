/// Semantic error taxonomy shared by every layer.
///
/// The first six variants are generic; the rest name the failure modes of the
/// subtitle pipeline and workflow engine so callers can match on them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Language already exists: {0}")]
    LanguageExists(String),

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Version {0} does not belong to this video")]
    VersionNotInVideo(String),

    #[error("Action rejected: {0}")]
    ActionError(String),

    #[error("Language is currently being edited by {holder}")]
    WriteLocked { holder: String },
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] keyed by anything displayable.
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
