// ABOUTME: Library root for sshctl - exposes the fan-out core for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod pool;
pub mod script;
pub mod session;
pub mod ssh;

pub use aggregate::{AggregateError, ErrorAggregator, HostError};
pub use executor::{FanOutExecutor, Operation, run_fan_out};
pub use pool::SessionPool;
pub use session::RemoteSession;
