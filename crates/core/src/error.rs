use clinic_types::TextError;

/// The kind of record a [`ClinicError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    Visit,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Patient => write!(f, "patient"),
            RecordKind::Visit => write!(f, "visit"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_yaml::Error),
    #[error(
        "failed to deserialize record (file: {file}) at {path}: {message}",
        file = file.display()
    )]
    Deserialization {
        file: std::path::PathBuf,
        path: String,
        message: String,
    },
    #[error("failed to allocate a record id after {attempts} attempts")]
    IdAllocation { attempts: usize },
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl ClinicError {
    pub fn not_found(kind: RecordKind, id: i64) -> Self {
        ClinicError::NotFound { kind, id }
    }

    /// True for failures in the storage layer rather than in the caller's request.
    pub fn is_storage(&self) -> bool {
        !matches!(
            self,
            ClinicError::InvalidInput(_)
                | ClinicError::NotFound { .. }
                | ClinicError::InvalidState(_)
        )
    }
}

impl From<TextError> for ClinicError {
    fn from(err: TextError) -> Self {
        ClinicError::InvalidInput(err.to_string())
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
