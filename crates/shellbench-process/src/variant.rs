//! Application variants and the patterns used to find their processes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use shellbench_common::{ProcessError, ProcessResult, VariantId};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// How to start a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl LaunchSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_directory: None,
            environment: HashMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

/// Regular expression matched against a process name (or its full command
/// line) to find a variant's running instances.
#[derive(Debug, Clone)]
pub struct ProcessPattern {
    regex: Regex,
    match_command_line: bool,
}

impl ProcessPattern {
    /// Compile a pattern. Empty or malformed patterns are rejected.
    pub fn new(pattern: &str) -> ProcessResult<Self> {
        if pattern.trim().is_empty() {
            return Err(ProcessError::invalid_pattern(pattern, "pattern cannot be empty"));
        }
        let regex = Regex::new(pattern)
            .map_err(|e| ProcessError::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self {
            regex,
            match_command_line: false,
        })
    }

    /// Match against the full command line instead of the process name.
    pub fn with_command_line(mut self, enabled: bool) -> Self {
        self.match_command_line = enabled;
        self
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches_command_line(&self) -> bool {
        self.match_command_line
    }

    /// Check a process against the pattern.
    pub fn matches(&self, name: &str, command_line: &str) -> bool {
        if self.match_command_line {
            self.regex.is_match(command_line)
        } else {
            self.regex.is_match(name)
        }
    }
}

impl PartialEq for ProcessPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str() && self.match_command_line == other.match_command_line
    }
}

impl fmt::Display for ProcessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.regex.as_str())
    }
}

/// One application build under test. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct AppVariant {
    pub id: VariantId,
    pub name: String,
    pub launch: LaunchSpec,
    pub pattern: ProcessPattern,
}

impl AppVariant {
    pub fn new(
        id: impl Into<VariantId>,
        name: impl Into<String>,
        launch: LaunchSpec,
        pattern: ProcessPattern,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            launch,
            pattern,
        }
    }

    /// True if both variants would be found by the same pattern, meaning their
    /// processes cannot be told apart while both are running.
    pub fn shares_pattern_with(&self, other: &AppVariant) -> bool {
        self.pattern == other.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches_name_by_default() {
        let pattern = ProcessPattern::new("^ntfy-desktop$").unwrap();
        assert!(pattern.matches("ntfy-desktop", "/opt/ntfy/ntfy-desktop --hidden"));
        assert!(!pattern.matches("ntfy-desktop-helper", "/opt/ntfy/ntfy-desktop-helper"));
    }

    #[test]
    fn test_pattern_matches_command_line_when_enabled() {
        let pattern = ProcessPattern::new("electron .*app\\.asar")
            .unwrap()
            .with_command_line(true);
        assert!(pattern.matches("electron", "electron /opt/app/resources/app.asar"));
        assert!(!pattern.matches("electron app.asar", "electron --version"));
    }

    #[test]
    fn test_invalid_patterns_are_rejected() {
        assert!(matches!(
            ProcessPattern::new(""),
            Err(ProcessError::InvalidPattern { .. })
        ));
        assert!(matches!(
            ProcessPattern::new("(unclosed"),
            Err(ProcessError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_shared_pattern_detection() {
        let a = AppVariant::new(
            "legacy",
            "Legacy",
            LaunchSpec::new("/opt/legacy/app"),
            ProcessPattern::new("^app$").unwrap(),
        );
        let b = AppVariant::new(
            "candidate",
            "Candidate",
            LaunchSpec::new("/opt/candidate/app"),
            ProcessPattern::new("^app$").unwrap(),
        );
        assert!(a.shares_pattern_with(&b));
    }

    #[test]
    fn test_launch_spec_from_yaml_defaults() {
        let spec: LaunchSpec = serde_yaml::from_str("command: /usr/bin/app").unwrap();
        assert_eq!(spec.command, "/usr/bin/app");
        assert!(spec.args.is_empty());
        assert!(spec.working_directory.is_none());
        assert!(spec.environment.is_empty());
    }
}
