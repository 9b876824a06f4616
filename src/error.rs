use thiserror::Error;

// Unified error types for invertop

/// Status codes carried by [`KError`], numbered like PETSc's error codes.
pub mod code {
    pub const UNSUPPORTED: i32 = 56;
    pub const ARG_SIZ: i32 = 60;
    pub const ARG_WRONG: i32 = 62;
    pub const ARG_WRONGSTATE: i32 = 73;
    pub const USER: i32 = 83;
    pub const ARG_NULL: i32 = 85;
}

/// Errors raised by the solver engine (shell matrices, vectors, KSP handles).
#[derive(Error, Debug)]
pub enum KError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("size mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("object in wrong state: {0}")]
    WrongState(&'static str),
    #[error("null argument: {0}")]
    NullArgument(&'static str),
    #[error("option -{key}: cannot parse {value:?}")]
    BadOption { key: String, value: String },
    #[error("shell multiply callback failed")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl KError {
    /// Non-zero status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            KError::InvalidArgument(_) | KError::BadOption { .. } => code::ARG_WRONG,
            KError::SizeMismatch { .. } => code::ARG_SIZ,
            KError::WrongState(_) => code::ARG_WRONGSTATE,
            KError::NullArgument(_) => code::ARG_NULL,
            KError::Callback(_) => code::USER,
            KError::Unsupported(_) => code::UNSUPPORTED,
        }
    }
}

/// Errors raised by an invertible operator session.
#[derive(Error, Debug)]
pub enum InvertError {
    #[error("setup called on an invertible operator that has already been set up")]
    SetupReentry,
    #[error("invert called on an invertible operator that has not been set up")]
    UseBeforeSetup,
    #[error("invertible operator used after it was destroyed")]
    UseAfterDestroy,
    #[error("field is bound to a different mesh than the invertible operator")]
    MeshMismatch,
    #[error("operator function returned a field bound to a different mesh")]
    ForeignOperatorResult,
    #[error("KSP solve failed with converged reason {reason}")]
    ConvergenceFailure { reason: i32 },
    #[error("{call} failed with status {code}")]
    EngineCall {
        call: &'static str,
        code: i32,
        #[source]
        source: KError,
    },
    #[error("local vector length {expected} does not match field entry count {found}")]
    LocalSizeMismatch { expected: usize, found: usize },
    #[error("field has not been allocated")]
    Unallocated,
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl InvertError {
    /// Wrap an engine error raised by the named collaborator call.
    pub fn engine(call: &'static str, source: KError) -> Self {
        InvertError::EngineCall { call, code: source.code(), source }
    }
}
