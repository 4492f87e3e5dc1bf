//! Service lifecycle probe for the local model runtime.

pub mod command;
pub mod error;
pub mod platform;
pub mod probe;

pub use command::{CommandRunner, CommandSpec, SystemCommandRunner};
pub use error::LifecycleError;
pub use platform::Platform;
pub use probe::{ServiceProbe, ServiceStatus, StartOutcome};
