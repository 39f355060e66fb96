//! # Shellbench Resilience
//!
//! Network outage observation: the [`OutageStateMachine`], pluggable
//! [`ConnectivityProbe`]s and the [`ResilienceSimulator`] that ties them to
//! a running variant.

pub mod probe;
pub mod simulator;
pub mod state;

pub use probe::{ConnectivityProbe, FnProbe, HttpProbe, TcpProbe};
pub use simulator::{OutageReport, OutageSettings, ResilienceSimulator, RetryAttempt};
pub use state::{OutageState, OutageStateMachine, OutageTransition};
