//! CLI Exit Code Registry
//!
//! Single source of truth for `recap` exit codes. Scripts driving batch runs
//! rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error, including a batch aborted by the engine     |
//! | 2    | Usage error (bad args, empty or invalid search parameter)  |
//! | 3    | Batch finished but at least one file failed                |
//! | 4    | Profile could not be parsed or failed validation           |
//! | 5    | Session or export file could not be read or written        |

use recap_drill::DrillError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure, or the engine went away mid-batch.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Some files failed; records from the others were still admitted.
pub const EXIT_FILES_FAILED: u8 = 3;

/// Profile TOML is malformed or invalid.
pub const EXIT_INVALID_PROFILE: u8 = 4;

/// Session or export IO failure.
pub const EXIT_IO: u8 = 5;

/// Map a library error onto its exit code.
pub fn drill_exit_code(err: &DrillError) -> u8 {
    match err {
        DrillError::ProfileParse(_) | DrillError::ProfileValidation(_) => EXIT_INVALID_PROFILE,
        DrillError::MissingParameter(_)
        | DrillError::InvalidPattern { .. }
        | DrillError::HeaderMismatch { .. } => EXIT_USAGE,
        DrillError::Session(_) => EXIT_IO,
        DrillError::Worker(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_FILES_FAILED,
            EXIT_INVALID_PROFILE,
            EXIT_IO,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn drill_errors_map_to_codes() {
        assert_eq!(drill_exit_code(&DrillError::MissingParameter("code filter")), EXIT_USAGE);
        assert_eq!(drill_exit_code(&DrillError::ProfileParse("x".into())), EXIT_INVALID_PROFILE);
        assert_eq!(drill_exit_code(&DrillError::Session("x".into())), EXIT_IO);
        assert_eq!(
            drill_exit_code(&DrillError::HeaderMismatch { stored: 6, profile: 7 }),
            EXIT_USAGE
        );
    }
}
