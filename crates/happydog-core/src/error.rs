// ── HappyDog Core: Error Types ──────────────────────────────────────────
// Single canonical error enum for the core, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (DocStore, Network, Validation…).
//   • `#[from]` wires std/external error conversions automatically.
//   • `error_code()` / `http_status()` give the (out-of-scope) HTTP layer a
//     single place to translate a `CoreError` into the §6.2 envelope without
//     re-deriving the taxonomy.
//   • No variant carries secret material in its message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Document-store I/O or transaction failure.
    #[error("document store error: {0}")]
    DocStore(#[from] rusqlite::Error),

    /// Filesystem I/O failure (object store, vector index snapshot).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller-visible input validation failure. Never reaches the DocStore.
    #[error("validation error: {0}")]
    Validation(String),

    /// Ownership / identity check failed. Never reveals existence of the
    /// underlying resource to an unauthorized caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist, or (for owner-scoped resources) the caller
    /// is not the owner and existence must not be disclosed.
    #[error("not found: {0}")]
    NotFound(String),

    /// ALREADY_VERIFIED, DUPLICATE biometric, InvalidState job transition,
    /// or optimistic-concurrency exhaustion after the retry cap.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The biometric ML pipeline rejected the image as an outlier (not a
    /// nose-print at all), distinct from a duplicate-registration conflict.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// VectorIndex corruption past recovery, or a write-path invariant
    /// violation. The admission engine refuses further requests; social
    /// and job endpoints are unaffected.
    #[error("vector index error: {0}")]
    VectorIndex(String),

    /// Worker pool has no free capacity within the configured timeout.
    #[error("overloaded: {0}")]
    Overloaded(String),

    /// Upstream third-party / ML client error (nose detector, embedding
    /// extractor, image generator, analysis model).
    #[error("upstream error: {service}: {message}")]
    Upstream { service: String, message: String },

    /// Engine or deployment configuration is invalid or missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream { service: service.into(), message: message.into() }
    }

    /// UPPER_SNAKE error code for the §6.2 error envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::InvalidImage(_) => "CONFLICT",
            CoreError::Overloaded(_) => "OVERLOADED",
            CoreError::DocStore(_)
            | CoreError::Io(_)
            | CoreError::Serialization(_)
            | CoreError::VectorIndex(_)
            | CoreError::Upstream { .. }
            | CoreError::Config(_)
            | CoreError::Other(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP status the §6.2 envelope is mounted on.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Validation(_) => 400,
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict(_) | CoreError::InvalidImage(_) => 409,
            CoreError::Overloaded(_) => 503,
            _ => 500,
        }
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
