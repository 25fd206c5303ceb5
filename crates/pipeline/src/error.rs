use subhub_core::error::CoreError;
use subhub_db::StoreError;

/// Errors raised by the services.
///
/// Domain failures travel as [`CoreError`]; storage failures keep their
/// [`StoreError`] so the pipeline can recognise a version-number race and
/// retry it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Another writer took the same `(language, version_number)`.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::VersionConflict(_)))
    }

    /// Collapse into the semantic taxonomy.
    pub fn into_core(self) -> CoreError {
        match self {
            PipelineError::Core(e) => e,
            PipelineError::Store(e) => e.into(),
        }
    }
}

impl From<PipelineError> for CoreError {
    fn from(err: PipelineError) -> Self {
        err.into_core()
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
