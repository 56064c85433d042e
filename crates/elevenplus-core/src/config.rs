//! Application configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::answer::OptionGroups;
use crate::history::HISTORY_CAP;
use crate::model::Subject;
use crate::session::SessionConfig;
use crate::timer::TimerConfig;

/// Name of the config file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "elevenplus.toml";

/// Per-subject overrides of the timer base minutes. A value of `0` turns
/// the timer off for that subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSection {
    #[serde(default)]
    pub base_minutes: BTreeMap<Subject, u32>,
}

/// Top-level elevenplus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding one `<subject>.json` question bank per subject.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory for saved progress, history and preferences.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub timer: TimerSection,
    /// Letter groups for "one per group" multi-answer questions.
    #[serde(default)]
    pub option_groups: OptionGroups,
    /// Maximum number of attempts kept in history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("./.elevenplus")
}
fn default_history_cap() -> usize {
    HISTORY_CAP
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_dir: default_storage_dir(),
            timer: TimerSection::default(),
            option_groups: OptionGroups::default(),
            history_cap: default_history_cap(),
        }
    }
}

impl AppConfig {
    /// Built-in timer minutes with the configured overrides applied.
    pub fn timer_config(&self) -> TimerConfig {
        let mut timer = TimerConfig::default();
        for (&subject, &minutes) in &self.timer.base_minutes {
            if minutes == 0 {
                timer.base_minutes.remove(&subject);
            } else {
                timer.base_minutes.insert(subject, minutes);
            }
        }
        timer
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timer: self.timer_config(),
            option_groups: self.option_groups.clone(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `elevenplus.toml` in the current directory
/// 2. `~/.config/elevenplus/config.toml`
///
/// Environment variable overrides: `ELEVENPLUS_DATA_DIR`, `ELEVENPLUS_STORAGE_DIR`.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("using config {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AppConfig::default(),
    };

    if let Ok(dir) = std::env::var("ELEVENPLUS_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("ELEVENPLUS_STORAGE_DIR") {
        config.storage_dir = PathBuf::from(dir);
    }

    config.data_dir = resolve_path(&config.data_dir);
    config.storage_dir = resolve_path(&config.storage_dir);
    Ok(config)
}

/// Parse a TOML config string.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if config.history_cap == 0 {
        anyhow::bail!("history_cap must be at least 1");
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("elevenplus"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ELEVENPLUS_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ELEVENPLUS_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ELEVENPLUS_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no ${closing"), "no ${closing");
        std::env::remove_var("_ELEVENPLUS_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_expand_substituted_values() {
        std::env::set_var("_ELEVENPLUS_SELF_REF", "${_ELEVENPLUS_SELF_REF}/x");
        assert_eq!(
            resolve_env_vars("${_ELEVENPLUS_SELF_REF}-${_ELEVENPLUS_UNSET_VAR}"),
            "${_ELEVENPLUS_SELF_REF}/x-"
        );
        std::env::remove_var("_ELEVENPLUS_SELF_REF");
    }

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.history_cap, 100);
        let timer = config.timer_config();
        assert_eq!(timer.base_minutes(Subject::VerbalReasoning), Some(60));
        assert_eq!(timer.base_minutes(Subject::VerbalSkills), None);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
data_dir = "/srv/banks"
history_cap = 25
option_groups = [["A", "B"], ["P", "Q"]]

[timer.base_minutes]
maths = 45
verbal-skills = 30
non-verbal-reasoning = 0
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/banks"));
        assert_eq!(config.storage_dir, PathBuf::from("./.elevenplus"));
        assert_eq!(config.history_cap, 25);

        let session = config.session_config();
        assert_eq!(session.timer.base_minutes(Subject::Maths), Some(45));
        assert_eq!(session.timer.base_minutes(Subject::English), Some(50));
        assert_eq!(session.timer.base_minutes(Subject::VerbalSkills), Some(30));
        assert_eq!(session.timer.base_minutes(Subject::NonVerbalReasoning), None);
        assert_eq!(session.option_groups.group_of("Q"), Some(1));
    }

    #[test]
    fn rejects_bad_config() {
        assert!(parse_config("history_cap = 0").is_err());
        assert!(parse_config("[timer.base_minutes]\nscience = 10").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "history_cap = 7\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.history_cap, 7);
    }
}
