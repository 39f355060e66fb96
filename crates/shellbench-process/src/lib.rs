//! # Shellbench Process
//!
//! Process-level primitives for the benchmark harness:
//!
//! - [`AppVariant`], [`LaunchSpec`] and [`ProcessPattern`] describe what to
//!   run and how to find it again.
//! - [`ProcessInspector`] is the OS capability for finding processes and
//!   reading their memory and CPU usage, with a `sysinfo` implementation and
//!   native `ps` / PowerShell implementations.
//! - [`ProcessController`] launches variants detached, force kills them by
//!   pattern, and polls for presence or absence with a timeout.

pub mod controller;
pub mod inspector;
pub mod native;
pub mod sysinfo_inspector;
pub mod terminate;
pub mod validation;
pub mod variant;

pub use controller::{LaunchHandle, ProcessControl, ProcessController, DEFAULT_POLL_INTERVAL};
pub use inspector::{create_inspector, InspectorKind, ProcessInspector, ProcessSnapshot};
pub use native::{PowerShellInspector, PsInspector};
pub use sysinfo_inspector::SysinfoInspector;
pub use terminate::force_kill;
pub use validation::{validate_launch_spec, validate_variant_id};
pub use variant::{AppVariant, LaunchSpec, ProcessPattern};
