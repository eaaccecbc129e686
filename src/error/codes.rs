//! Process exit codes
//!
//! Maps the error taxonomy onto the exit code contract of the `jb` binary:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Environment error (working directory, user configuration) |
//! | 2 | Command-line parse error (emitted by clap) |
//! | 3 | Any install, load, encode or write failure |

use super::Error;

pub const SUCCESS: i32 = 0;
pub const ENVIRONMENT_ERROR: i32 = 1;
pub const USAGE_ERROR: i32 = 2;
pub const FAILURE: i32 = 3;

/// Map an error to the exit code the CLI should terminate with
///
/// # Examples
///
/// ```
/// use jsonnet_bundler::error::codes::{exit_code_for, FAILURE};
/// use jsonnet_bundler::error::Error;
///
/// let err = Error::UnrecognizedSource("not-a-url".to_string());
/// assert_eq!(exit_code_for(&err), FAILURE);
/// ```
pub fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::WorkingDir(_) | Error::Config(_) => ENVIRONMENT_ERROR,
        Error::Io(_)
        | Error::UnrecognizedSource(_)
        | Error::ManifestLoad { .. }
        | Error::AlreadyInitialized { .. }
        | Error::CacheDir { .. }
        | Error::Resolution { .. }
        | Error::Cancelled { .. }
        | Error::Encode { .. }
        | Error::Write { .. } => FAILURE,
    }
}
