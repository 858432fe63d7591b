//! Exit code constants and error mapping for dermascan.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `VALIDATION` | Malformed input rejected before any network call |
//! | 4 | `CONNECTION` | Server unreachable, operation blocked by pre-flight gate |
//! | 5 | `GATEWAY_FAILURE` | A request failed (transport or remote rejection) |
//! | 6 | `PARTIAL_BATCH` | Batch completed with at least one failed record |
//! | 7 | `TRAINING_FAILED` | Training job reached the `Failed` state |

use crate::error::DermaError;

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use dermascan_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(6), ExitCode::PARTIAL_BATCH);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Validation error - malformed caller input
    pub const VALIDATION: ExitCode = ExitCode(3);

    /// Connection error - pre-flight health gate failed
    pub const CONNECTION: ExitCode = ExitCode(4);

    /// Gateway failure - transport or remote failure on a request
    pub const GATEWAY_FAILURE: ExitCode = ExitCode(5);

    /// Partial batch - some records failed
    pub const PARTIAL_BATCH: ExitCode = ExitCode(6);

    /// Training failed - job reported the `Failed` terminal state
    pub const TRAINING_FAILED: ExitCode = ExitCode(7);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl DermaError {
    /// Map this error to a CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            DermaError::Config(_) => ExitCode::CLI_ARGS,
            DermaError::Validation(_) => ExitCode::VALIDATION,
            DermaError::Connection(_) => ExitCode::CONNECTION,
            DermaError::Gateway(_) => ExitCode::GATEWAY_FAILURE,
            DermaError::PartialBatch { .. } => ExitCode::PARTIAL_BATCH,
            DermaError::TrainingFailed { .. } => ExitCode::TRAINING_FAILED,
            DermaError::Io(_) => ExitCode::INTERNAL,
        }
    }
}
