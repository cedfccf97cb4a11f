//! Shell execution behind the command validator

mod executor;
mod session;

pub use executor::SecureExecutor;
pub use session::{BashSession, CommandOutput, DEFAULT_TIMEOUT, ShellSession};

#[cfg(test)]
pub use session::MockShellSession;
