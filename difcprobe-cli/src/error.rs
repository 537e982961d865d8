//! CLI-specific error types and exit code mapping

use difcprobe_core::error::DifcProbeError;
use difcprobe_core::types::ProbeResult;
use difcprobe_probe::ProbeError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The probe completed but the extension reported unexpected values.
    #[error("extension mismatch: {0}")]
    Mismatch(String),

    /// The probe completed but the engine build lacks the extension.
    #[error("extension absent: {0}")]
    Absent(String),

    /// The probe could not complete its cycle.
    #[error("probe failed: {0}")]
    RuntimeFailure(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from difcprobe-core.
    #[error("{0}")]
    Core(#[from] DifcProbeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                |
    /// |------|----------------------------------------|
    /// | 0    | Success / extension confirmed          |
    /// | 1    | Extension mismatch or command error    |
    /// | 2    | Extension absent                       |
    /// | 3    | Probe runtime failure                  |
    /// | 4    | Configuration error                    |
    /// | 10   | IO error                               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Mismatch(_) | Self::Command(_) | Self::JsonSerialize(_) => 1,
            Self::Absent(_) => 2,
            Self::RuntimeFailure(_) => 3,
            Self::Config(_) => 4,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                DifcProbeError::Config(_) => 4,
                DifcProbeError::Io(_) => 10,
                DifcProbeError::Engine(_) => 3,
            },
        }
    }

    /// Convert a non-confirmed probe result into the matching error.
    ///
    /// Returns `None` for `Confirmed`.
    pub fn from_probe_result(result: &ProbeResult) -> Option<Self> {
        match result {
            ProbeResult::Confirmed { .. } => None,
            ProbeResult::Mismatch { .. } => Some(Self::Mismatch(result.to_string())),
            ProbeResult::Absent { detail } => Some(Self::Absent(detail.clone())),
            ProbeResult::RuntimeFailure { detail } => Some(Self::RuntimeFailure(detail.clone())),
        }
    }
}

impl From<ProbeError> for CliError {
    fn from(e: ProbeError) -> Self {
        match e {
            // 토픽 패턴은 설정값이므로 설정 오류로 취급
            ProbeError::Topology { .. } => Self::Config(e.to_string()),
            other => Self::RuntimeFailure(other.to_string()),
        }
    }
}
