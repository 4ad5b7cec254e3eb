//! Command implementations

pub mod check;
pub mod deploy;
pub mod target;
pub mod version;

use crate::domain::error::DeployError;

/// Process exit code for a failed command: 130/143 when a signal stopped
/// the run, 1 otherwise.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DeployError>() {
        Some(DeployError::Interrupted { signal }) => signal.exit_code(),
        _ => 1,
    }
}
