use crate::errors::{Result, WorkflowError};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Branches the pipeline must never run on or delete.
pub const RESTRICTED_BRANCHES: &[&str] = &["develop", "master", "main"];

/// Reviewers requested on every created pull request.
pub const REVIEWERS: &[&str] = &["acortes", "jbuettner", "mnowak"];

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BASE_BRANCH: &str = "develop";
pub const PROPERTIES_FILE: &str = "pr.properties";

pub fn is_restricted(branch: &str) -> bool {
    RESTRICTED_BRANCHES.contains(&branch)
}

/// Key/value pairs read from `pr.properties`.
///
/// A missing file yields an empty map, and `get` distinguishes an absent key
/// from an empty value, so compiled-in defaults stay in force unless the file
/// actually sets something.
#[derive(Debug, Default)]
pub struct Properties(HashMap<String, String>);

impl Properties {
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No properties file at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let line_re = Regex::new(r"^\s*(?P<key>[A-Za-z_][A-Za-z0-9_.]*)\s*=\s*(?P<value>.*?)\s*$")
            .expect("valid regex");

        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match line_re.captures(line) {
                Some(caps) => {
                    values.insert(caps["key"].to_string(), caps["value"].to_string());
                }
                None => log::warn!("Ignoring malformed properties line: {}", line),
            }
        }
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(WorkflowError::Property {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            },
        }
    }
}

/// Settings supplied on the command line. Only explicitly passed flags
/// override the properties file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub base_branch: Option<String>,
    pub skip_lint: bool,
    pub skip_squash: bool,
    pub keep_branch: bool,
}

/// Effective settings for one run. Built once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub base_branch: String,
    pub lint_check: bool,
    pub squash_commits: bool,
    pub keep_branch_after_pr: bool,
}

impl RunConfig {
    /// Resolve one setting at a time: command line flag, then properties
    /// file, then built-in default.
    pub fn resolve(overrides: &ConfigOverrides, properties: &Properties) -> Result<Self> {
        let base_branch = overrides
            .base_branch
            .clone()
            .or_else(|| properties.get("base_branch").map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());

        let lint_check = if overrides.skip_lint {
            false
        } else {
            properties.get_bool("lint_check")?.unwrap_or(true)
        };

        let squash_commits = if overrides.skip_squash {
            false
        } else {
            properties.get_bool("squash_commits")?.unwrap_or(true)
        };

        let keep_branch_after_pr = if overrides.keep_branch {
            true
        } else {
            properties
                .get_bool("keep_current_branch_after_pr")?
                .unwrap_or(false)
        };

        Ok(Self {
            base_branch,
            lint_check,
            squash_commits,
            keep_branch_after_pr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_hold_without_file_or_flags() {
        let config = RunConfig::resolve(&ConfigOverrides::default(), &Properties::default()).unwrap();

        assert_eq!(config.base_branch, "develop");
        assert!(config.lint_check);
        assert!(config.squash_commits);
        assert!(!config.keep_branch_after_pr);
    }

    #[test]
    fn properties_override_defaults() {
        let properties = Properties::parse(
            "base_branch=release/2.0\n\
             lint_check=false\n\
             squash_commits=false\n\
             keep_current_branch_after_pr=true\n",
        );
        let config = RunConfig::resolve(&ConfigOverrides::default(), &properties).unwrap();

        assert_eq!(config.base_branch, "release/2.0");
        assert!(!config.lint_check);
        assert!(!config.squash_commits);
        assert!(config.keep_branch_after_pr);
    }

    #[test]
    fn flags_override_properties() {
        let properties = Properties::parse(
            "base_branch=release/2.0\n\
             lint_check=true\n\
             squash_commits=true\n\
             keep_current_branch_after_pr=false\n",
        );
        let overrides = ConfigOverrides {
            base_branch: Some("hotfix/1.9".to_string()),
            skip_lint: true,
            skip_squash: true,
            keep_branch: true,
        };
        let config = RunConfig::resolve(&overrides, &properties).unwrap();

        assert_eq!(config.base_branch, "hotfix/1.9");
        assert!(!config.lint_check);
        assert!(!config.squash_commits);
        assert!(config.keep_branch_after_pr);
    }

    #[test]
    fn absent_keys_leave_defaults_in_force() {
        // Only one key present: the other three must keep their defaults.
        let properties = Properties::parse("keep_current_branch_after_pr=true\n");
        let config = RunConfig::resolve(&ConfigOverrides::default(), &properties).unwrap();

        assert_eq!(config.base_branch, "develop");
        assert!(config.lint_check);
        assert!(config.squash_commits);
        assert!(config.keep_branch_after_pr);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let properties = Properties::parse(
            "# build settings\n\
             ! also a comment\n\
             \n\
             base_branch = main\n\
             not a property line\n",
        );

        assert_eq!(properties.get("base_branch"), Some("main"));
        assert_eq!(properties.get("not"), None);
    }

    #[test]
    fn empty_value_is_distinct_from_absent() {
        let properties = Properties::parse("base_branch=\n");

        assert_eq!(properties.get("base_branch"), Some(""));
        assert_eq!(properties.get("lint_check"), None);
    }

    #[test]
    fn malformed_bool_is_an_error() {
        let properties = Properties::parse("lint_check=yes\n");
        let result = RunConfig::resolve(&ConfigOverrides::default(), &properties);

        assert!(matches!(
            result,
            Err(WorkflowError::Property { ref key, ref value }) if key == "lint_check" && value == "yes"
        ));
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        let properties = Properties::parse("lint_check=False\nsquash_commits=TRUE\n");
        let config = RunConfig::resolve(&ConfigOverrides::default(), &properties).unwrap();

        assert!(!config.lint_check);
        assert!(config.squash_commits);
    }

    #[test]
    fn restricted_branches_match_exactly() {
        for branch in RESTRICTED_BRANCHES {
            assert!(is_restricted(branch));
        }
        assert!(!is_restricted("feature/login"));
        assert!(!is_restricted("develop-wip"));
        assert!(!is_restricted(""));
    }
}
