//! Encoder launcher state machine types.

use serde::{Deserialize, Serialize};

/// The current state of one encoder invocation.
///
/// `Idle -> Running -> (Stopped | Completed | Failed)`. The three end
/// states are terminal for that invocation; there is no retry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderState {
    /// No encoder process has been launched.
    #[default]
    Idle,

    /// The encoder process is running.
    Running {
        /// Process id of the encoder.
        pid: u32,
    },

    /// The encoder was stopped on request.
    Stopped {
        /// Why it was stopped.
        reason: StopReason,
    },

    /// The encoder exited with status zero.
    Completed,

    /// The encoder could not start or exited with a nonzero status.
    Failed {
        /// Exit code, if the process exited on its own.
        code: Option<i32>,

        /// Error message.
        message: String,
    },
}

impl EncoderState {
    /// Returns true if the encoder has not been launched.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the encoder is running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Returns true for the three end states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stopped { .. } | Self::Completed | Self::Failed { .. }
        )
    }

    /// Returns true only for a clean exit.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running { .. } => "Running",
            Self::Stopped { .. } => "Stopped",
            Self::Completed => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }

    /// Get status message for the operator.
    pub fn message(&self) -> String {
        match self {
            Self::Idle => "Idle".to_string(),
            Self::Running { pid } => format!("Running (pid {pid})"),
            Self::Stopped { reason } => reason.message(),
            Self::Completed => "Stream completed successfully".to_string(),
            Self::Failed {
                code: Some(code), ..
            } => format!("Stream ended with return code: {code}"),
            Self::Failed { code: None, message } => format!("Stream failed: {message}"),
        }
    }
}

/// Reason for stopping the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Operator asked to stop.
    UserRequested,

    /// An interrupt or terminate signal arrived.
    Signal,
}

impl StopReason {
    /// Returns a display message for this reason.
    pub fn message(&self) -> String {
        match self {
            Self::UserRequested => "Stream stopped by user".to_string(),
            Self::Signal => "Stream stopped by signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!EncoderState::Idle.is_terminal());
        assert!(!EncoderState::Running { pid: 1 }.is_terminal());
        assert!(EncoderState::Completed.is_terminal());
        assert!(EncoderState::Stopped {
            reason: StopReason::Signal
        }
        .is_terminal());
        assert!(EncoderState::Failed {
            code: Some(1),
            message: String::new()
        }
        .is_terminal());
    }

    #[test]
    fn test_only_completed_is_success() {
        assert!(EncoderState::Completed.is_success());
        assert!(!EncoderState::Stopped {
            reason: StopReason::UserRequested
        }
        .is_success());
        assert!(!EncoderState::Failed {
            code: Some(0),
            message: String::new()
        }
        .is_success());
    }

    #[test]
    fn test_failed_message_mentions_code() {
        let state = EncoderState::Failed {
            code: Some(255),
            message: "exit".into(),
        };
        assert_eq!(state.message(), "Stream ended with return code: 255");
    }
}
