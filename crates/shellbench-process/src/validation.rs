//! Validation of variant definitions.
//!
//! Run before any launch so that a bad definition aborts the whole run
//! instead of failing halfway through a benchmark.

use crate::variant::LaunchSpec;
use shellbench_common::{ProcessError, ProcessResult};

/// Validate a variant id: non-empty, alphanumeric plus `-` and `_`.
pub fn validate_variant_id(id: &str) -> ProcessResult<()> {
    if id.is_empty() {
        return Err(ProcessError::Configuration {
            id: "validation".to_string(),
            reason: "Variant ID cannot be empty".to_string(),
        });
    }

    if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ProcessError::Configuration {
            id: id.to_string(),
            reason: "Variant ID can only contain alphanumeric characters, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate a launch specification for the variant `id`.
pub fn validate_launch_spec(id: &str, launch: &LaunchSpec) -> ProcessResult<()> {
    if launch.command.trim().is_empty() {
        return Err(ProcessError::Configuration {
            id: id.to_string(),
            reason: "Launch command cannot be empty".to_string(),
        });
    }

    if let Some(ref wd) = launch.working_directory {
        if !wd.is_dir() {
            return Err(ProcessError::Configuration {
                id: id.to_string(),
                reason: format!("Working directory does not exist: {}", wd.display()),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id_rules() {
        assert!(validate_variant_id("electron-legacy").is_ok());
        assert!(validate_variant_id("tauri_v2").is_ok());
        assert!(validate_variant_id("").is_err());
        assert!(validate_variant_id("has space").is_err());
        assert!(validate_variant_id("../escape").is_err());
    }

    #[test]
    fn test_launch_spec_rules() {
        assert!(validate_launch_spec("a", &LaunchSpec::new("/usr/bin/app")).is_ok());
        assert!(validate_launch_spec("a", &LaunchSpec::new("  ")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let ok = LaunchSpec::new("app").with_working_directory(dir.path());
        assert!(validate_launch_spec("a", &ok).is_ok());

        let missing = LaunchSpec::new("app").with_working_directory(dir.path().join("nope"));
        assert!(matches!(
            validate_launch_spec("a", &missing),
            Err(ProcessError::Configuration { .. })
        ));
    }
}
