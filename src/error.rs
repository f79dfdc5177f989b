//! Error types used by the caboose runtime, its bootstrapper and its units.
//!
//! This module defines three main error enums:
//!
//! - [`BootstrapError`] — failures while resolving the [`Environment`](crate::Environment); always fatal.
//! - [`UnitError`] — failures raised by a single lifecycle unit during one phase.
//! - [`RuntimeError`] — errors raised by the orchestration engine itself.
//!
//! All of them provide `as_label` (stable snake_case label for logs) and
//! `as_message` (human-readable detail) helpers.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::Phase;

/// # Errors produced while resolving the process environment.
///
/// Every variant is fatal: the process must not start any lifecycle unit
/// when the bootstrapper fails.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A required environment variable is not set (or empty).
    #[error("required environment variable {name} is not set")]
    MissingVariable {
        /// Name of the variable.
        name: &'static str,
    },

    /// The run mode variable holds something other than `development`/`production`.
    #[error("invalid run mode {value:?}; expected \"development\" or \"production\"")]
    InvalidRunMode {
        /// The rejected value.
        value: String,
    },

    /// No data directory could be derived for this host.
    #[error("no data directory could be determined; set CABOOSE_DATA_DIR")]
    NoDataDirectory,

    /// A directory that must already exist is missing.
    #[error("{what} directory {path:?} does not exist")]
    MissingDirectory {
        /// Logical name of the directory (e.g. "content").
        what: &'static str,
        /// Resolved absolute path.
        path: PathBuf,
    },

    /// A directory could not be created.
    #[error("{what} directory {path:?} could not be created: {source}")]
    CreateDirectory {
        /// Logical name of the directory (e.g. "data").
        what: &'static str,
        /// Resolved absolute path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A directory exists but is not writable by this process.
    #[error("{what} directory {path:?} is not writable: {source}")]
    NotWritable {
        /// Logical name of the directory (e.g. "logs").
        what: &'static str,
        /// Resolved absolute path.
        path: PathBuf,
        /// Underlying I/O error raised by the write probe.
        #[source]
        source: std::io::Error,
    },

    /// The installation directory could not be determined.
    #[error("installation directory could not be determined: {source}")]
    InstallDirectory {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use caboose::BootstrapError;
    ///
    /// let err = BootstrapError::MissingVariable { name: "CABOOSE_SERVER_ENV" };
    /// assert_eq!(err.as_label(), "bootstrap_missing_variable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BootstrapError::MissingVariable { .. } => "bootstrap_missing_variable",
            BootstrapError::InvalidRunMode { .. } => "bootstrap_invalid_run_mode",
            BootstrapError::NoDataDirectory => "bootstrap_no_data_directory",
            BootstrapError::MissingDirectory { .. } => "bootstrap_missing_directory",
            BootstrapError::CreateDirectory { .. } => "bootstrap_create_directory",
            BootstrapError::NotWritable { .. } => "bootstrap_not_writable",
            BootstrapError::InstallDirectory { .. } => "bootstrap_install_directory",
        }
    }
}

/// # Errors produced by a lifecycle unit.
///
/// Returned from [`LifecycleUnit::setup`](crate::LifecycleUnit::setup),
/// [`start`](crate::LifecycleUnit::start) and [`stop`](crate::LifecycleUnit::stop).
/// Any error from `setup`/`start` is phase fatal; errors from `stop` are logged and collected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UnitError {
    /// An I/O operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What the unit was doing.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A value the unit depends on is malformed (e.g. an unparsable config file).
    #[error("invalid {what}: {reason}")]
    Invalid {
        /// What was invalid.
        what: &'static str,
        /// Parser or validation message.
        reason: String,
    },

    /// A configuration discriminator selects an option this build does not support.
    #[error("unsupported {what} {value:?}")]
    Unsupported {
        /// The kind of option (e.g. "storage backend").
        what: &'static str,
        /// The rejected value.
        value: String,
    },

    /// State produced by an earlier phase is not available yet.
    #[error("{what} is not available before its phase completed")]
    NotReady {
        /// The missing piece of state.
        what: &'static str,
    },

    /// The storage engine reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Non-recoverable condition detected by the unit itself.
    #[error("fatal: {reason}")]
    Fatal {
        /// Human-readable reason.
        reason: String,
    },

    /// The unit panicked while running a phase.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The unit did not finish its phase within the configured timeout.
    #[error("timed out after {timeout:?}")]
    TimedOut {
        /// The configured phase timeout.
        timeout: Duration,
    },
}

impl UnitError {
    /// Convenience constructor for [`UnitError::Io`].
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        UnitError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use caboose::UnitError;
    ///
    /// let err = UnitError::Unsupported { what: "storage backend", value: "postgres".into() };
    /// assert_eq!(err.as_label(), "unit_unsupported");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitError::Io { .. } => "unit_io",
            UnitError::Invalid { .. } => "unit_invalid",
            UnitError::Unsupported { .. } => "unit_unsupported",
            UnitError::NotReady { .. } => "unit_not_ready",
            UnitError::Database(_) => "unit_database",
            UnitError::Fatal { .. } => "unit_fatal",
            UnitError::Panicked { .. } => "unit_panicked",
            UnitError::TimedOut { .. } => "unit_timed_out",
        }
    }
}

/// A unit that failed a phase, with the error it returned.
#[derive(Debug)]
pub struct UnitFailure {
    /// Name of the failing unit.
    pub unit: &'static str,
    /// The error it returned.
    pub error: UnitError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

/// # Errors produced by the caboose runtime.
///
/// These represent failures of the orchestration itself: an invalid registry,
/// a failed phase, or a shutdown that could not complete in time.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Two units were registered under the same name.
    #[error("unit {name:?} is registered more than once")]
    DuplicateUnit {
        /// The duplicated name.
        name: &'static str,
    },

    /// One or more units failed the `setup` or `start` phase.
    #[error(
        "{phase} phase failed for {count} unit(s): {rendered}",
        count = .failures.len(),
        rendered = render(.failures)
    )]
    PhaseFailed {
        /// The phase that failed.
        phase: Phase,
        /// Every unit that failed, in registration order.
        failures: Vec<UnitFailure>,
    },

    /// The stop phase exceeded the configured grace period.
    #[error("stop grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Units that were still stopping.
        stuck: Vec<String>,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use caboose::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateUnit { .. } => "runtime_duplicate_unit",
            RuntimeError::PhaseFailed { .. } => "runtime_phase_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::PhaseFailed { phase, failures } => {
                format!("{phase} failed: {}", render(failures))
            }
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck units={stuck:?}")
            }
            other => other.to_string(),
        }
    }
}

fn render(failures: &[UnitFailure]) -> String {
    failures
        .iter()
        .map(UnitFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
