//! Error types and error handling strategy for ctxscope.
//!
//! The generator itself is a thin, fail-fast assembly layer and defines only
//! the errors needed to keep its collaborators honest:
//!
//! - **Lifecycle**: a variant's pipeline was assembled before its capture hook
//!   was armed
//! - **Scheduling**: work was submitted to a scheduler that has been disposed
//! - **Config**: an environment override could not be parsed
//! - **Pipeline**: a source or operator signalled a failure downstream
//! - **User**: anything raised by test-supplied closures
//!
//! Assertion failures are not represented here; they belong to
//! [`VerificationError`](crate::verify::VerificationError).

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Lifecycle ===
    /// A pipeline was built while a different capture hook was active.
    HookNotInstalled,

    // === Scheduling ===
    /// The scheduler (or worker) has been disposed and rejects new work.
    SchedulerDisposed,

    // === Config ===
    /// A configuration value was invalid.
    InvalidConfig,

    // === Pipeline ===
    /// A source or operator stage failed.
    Stage,

    // === User ===
    /// User-provided error.
    User,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::HookNotInstalled => ErrorCategory::Lifecycle,
            Self::SchedulerDisposed => ErrorCategory::Scheduling,
            Self::InvalidConfig => ErrorCategory::Config,
            Self::Stage => ErrorCategory::Pipeline,
            Self::User => ErrorCategory::User,
        }
    }

    /// Returns a short stable label, used in structured log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HookNotInstalled => "hook_not_installed",
            Self::SchedulerDisposed => "scheduler_disposed",
            Self::InvalidConfig => "invalid_config",
            Self::Stage => "stage",
            Self::User => "user",
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Ordering of install/build was violated.
    Lifecycle,
    /// Scheduler lifecycle failures.
    Scheduling,
    /// Configuration failures.
    Config,
    /// Failures travelling through a pipeline.
    Pipeline,
    /// User-originated errors.
    User,
}

/// The main error type for ctxscope operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates the error raised when a variant is assembled out of order.
    #[must_use]
    pub fn hook_not_installed(expected: &str, active: Option<&str>) -> Self {
        Self::new(ErrorKind::HookNotInstalled).with_message(format!(
            "pipeline for {expected:?} built while active hook is {}",
            active.map_or_else(|| "<none>".to_string(), |name| format!("{name:?}"))
        ))
    }

    /// Creates the error returned when work is submitted after disposal.
    #[must_use]
    pub fn scheduler_disposed(scheduler: &str) -> Self {
        Self::new(ErrorKind::SchedulerDisposed)
            .with_message(format!("scheduler {scheduler} rejected work after dispose"))
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig).with_message(detail)
    }

    /// Creates a pipeline stage error.
    #[must_use]
    pub fn stage(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Stage).with_message(detail)
    }

    /// Creates a user error.
    #[must_use]
    pub fn user(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized Result type for ctxscope operations.
pub type Result<T> = std::result::Result<T, Error>;
