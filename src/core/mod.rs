//! Core orchestration for rebuilding a branch from topic cherry-picks.
//!
//! This module holds the engine and its collaborators:
//!
//! - Workspace lifecycle (shared-clone creation, rerere setup, teardown)
//! - The cherry-pick state machine and rerere-backed conflict resolution
//! - Checkpoint persistence for resumable conflict recovery
//! - Ref publication back to the source repository
//! - The read-only per-tag statistics report

pub mod checkpoint;
pub mod engine;
pub mod publish;
pub mod rerere;
pub mod stat;
pub mod workspace;

/// Exit codes for rebranch invocations.
///
/// These codes are designed for consumption by CI systems and automation
/// tools, providing clear semantics for different outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// The run completed and all refs were published.
    Success = 0,

    /// A conflict checkpoint was written - resolve and run 'resume'.
    Conflict = 1,

    /// General error (configuration, git, publication, etc.).
    GeneralError = 2,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "All topics applied and refs published",
            ExitCode::Conflict => "Conflict checkpoint written - resolve and run 'resume'",
            ExitCode::GeneralError => "General error occurred",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # Exit Code Values
    ///
    /// Verifies that all exit codes have the correct numeric values.
    ///
    /// ## Test Scenario
    /// - Checks each exit code variant against its expected value
    ///
    /// ## Expected Outcome
    /// - Success is 0, conflict is 1, general errors are 2
    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Conflict.code(), 1);
        assert_eq!(ExitCode::GeneralError.code(), 2);
    }

    /// # Exit Code Descriptions
    ///
    /// Verifies that all exit codes have meaningful descriptions.
    ///
    /// ## Test Scenario
    /// - Checks that each exit code has a non-empty description
    ///
    /// ## Expected Outcome
    /// - All exit codes return non-empty description strings
    #[test]
    fn test_exit_code_descriptions() {
        assert!(!ExitCode::Success.description().is_empty());
        assert!(!ExitCode::Conflict.description().is_empty());
        assert!(!ExitCode::GeneralError.description().is_empty());
    }

    /// # Exit Code Display
    ///
    /// Verifies that exit codes can be displayed as strings.
    ///
    /// ## Test Scenario
    /// - Uses Display trait to format exit codes
    ///
    /// ## Expected Outcome
    /// - Exit codes format to their description strings
    #[test]
    fn test_exit_code_display() {
        assert_eq!(
            format!("{}", ExitCode::Success),
            ExitCode::Success.description()
        );
        assert_eq!(
            format!("{}", ExitCode::Conflict),
            ExitCode::Conflict.description()
        );
    }

    /// # Exit Code Conversion to std::process::ExitCode
    ///
    /// Verifies that exit codes can be converted to std::process::ExitCode.
    ///
    /// ## Test Scenario
    /// - Converts ExitCode variants to std::process::ExitCode
    ///
    /// ## Expected Outcome
    /// - Conversion succeeds without panicking
    #[test]
    fn test_exit_code_conversion() {
        let _: std::process::ExitCode = ExitCode::Success.into();
        let _: std::process::ExitCode = ExitCode::Conflict.into();
        let _: std::process::ExitCode = ExitCode::GeneralError.into();
    }
}
