//! `sources.yaml`: store location, tracked repositories, report commands.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub defaults: SourcesDefaults,
    pub repos: Vec<RepoSource>,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourcesDefaults {
    /// SQLite store path. Default: `data/sqlite/opendigger.db`.
    pub sqlite_path: Option<PathBuf>,
}

/// One tracked repository, identified by `org/repo` in the store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepoSource {
    pub org: String,
    pub repo: String,
    /// Default: true.
    pub enabled: Option<bool>,
}

impl RepoSource {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Commands run after a successful signal pass, each an argv list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportsConfig {
    pub commands: Vec<Vec<String>>,
}

impl SourcesConfig {
    /// Full names (`org/repo`) of every enabled repository, in declared order.
    pub fn enabled_full_names(&self) -> Vec<String> {
        self.repos
            .iter()
            .filter(|r| r.is_enabled())
            .map(RepoSource::full_name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_document;

    #[test]
    fn enabled_defaults_to_true() {
        let cfg: SourcesConfig = parse_document(
            r#"
repos:
  - { org: apache, repo: kafka }
  - { org: apache, repo: flink, enabled: false }
  - { org: rust-lang, repo: cargo, enabled: true }
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.enabled_full_names(),
            vec!["apache/kafka".to_string(), "rust-lang/cargo".to_string()]
        );
    }

    #[test]
    fn report_commands_are_argv_lists() {
        let cfg: SourcesConfig = parse_document(
            r#"
reports:
  commands:
    - ["python3", "scripts/export_signal_evidence.py"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.reports.commands.len(), 1);
        assert_eq!(cfg.reports.commands[0][0], "python3");
    }
}
