//! Static run configuration, loaded once from a JSON file and handed to
//! the workflow at construction time.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AuditError;
use crate::retry::RetryPolicy;

/// Which pipeline stages this invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// List and inspect only; report public files in the log.
    Scan,
    /// Scan, then rewrite each folder's tracking sheet.
    #[default]
    Audit,
    /// Read each tracking sheet back and remove non-exempted public
    /// grants. Must not run concurrently with an audit of the same
    /// sheet.
    Remediate,
}

/// One audited shared folder and the sheet that tracks it.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderTarget {
    pub folder_id: String,
    #[serde(default)]
    pub sheet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub mode: RunMode,

    /// Human-readable folder name to audit target. BTreeMap keeps the
    /// processing order stable across runs.
    pub folders: BTreeMap<String, FolderTarget>,

    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Extends or overrides the built-in MIME label table.
    #[serde(default)]
    pub mime_labels: HashMap<String, String>,

    #[serde(default = "default_token_cache")]
    pub token_cache: PathBuf,

    /// Service-account key file, used when the key is not supplied via
    /// the environment.
    #[serde(default)]
    pub service_account_key_file: Option<PathBuf>,
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AuditError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&raw).map_err(|e| AuditError::Config(format!("{}: {e}", path.display())))
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let mut config: Self = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        if config.folders.is_empty() {
            return Err("no folders configured".to_string());
        }
        if config.mode != RunMode::Scan {
            for (name, folder) in &config.folders {
                if folder.sheet_id.is_empty() {
                    return Err(format!("folder {name} has no sheet_id"));
                }
            }
        }
        let overrides = std::mem::take(&mut config.mime_labels);
        let mut labels = default_mime_labels();
        labels.extend(overrides);
        config.mime_labels = labels;
        Ok(config)
    }
}

fn default_worksheet() -> String {
    "Public files".to_string()
}

fn default_token_cache() -> PathBuf {
    PathBuf::from("tokencache.json")
}

/// Display labels for the Workspace-native MIME codes operators see most.
/// Codes not listed here pass through to the sheet unchanged.
pub fn default_mime_labels() -> HashMap<String, String> {
    [
        ("application/vnd.google-apps.document", "Google Docs"),
        ("application/vnd.google-apps.spreadsheet", "Google Sheets"),
        ("application/vnd.google-apps.presentation", "Google Slides"),
        ("application/vnd.google-apps.form", "Google Forms"),
        ("application/vnd.google-apps.folder", "Folder"),
        ("application/vnd.google-apps.shortcut", "Shortcut"),
        ("application/pdf", "PDF"),
    ]
    .into_iter()
    .map(|(code, label)| (code.to_string(), label.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AuditConfig::parse(
            r#"{
                "folders": {
                    "Boot Camp": {"folder_id": "drv1", "sheet_id": "s1"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, RunMode::Audit);
        assert_eq!(config.worksheet, "Public files");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.token_cache, PathBuf::from("tokencache.json"));
        assert_eq!(
            config.mime_labels.get("application/pdf").unwrap(),
            "PDF"
        );
    }

    #[test]
    fn mime_labels_extend_and_override_the_builtin_table() {
        let config = AuditConfig::parse(
            r#"{
                "folders": {"F": {"folder_id": "drv1", "sheet_id": "s1"}},
                "mime_labels": {
                    "application/pdf": "PDF document",
                    "video/mp4": "Video"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mime_labels.get("application/pdf").unwrap(), "PDF document");
        assert_eq!(config.mime_labels.get("video/mp4").unwrap(), "Video");
        assert_eq!(
            config
                .mime_labels
                .get("application/vnd.google-apps.document")
                .unwrap(),
            "Google Docs"
        );
    }

    #[test]
    fn scan_mode_does_not_need_sheet_ids() {
        let config = AuditConfig::parse(
            r#"{
                "mode": "scan",
                "folders": {"F": {"folder_id": "drv1"}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, RunMode::Scan);
    }

    #[test]
    fn audit_mode_rejects_a_folder_without_a_sheet() {
        let err = AuditConfig::parse(
            r#"{
                "mode": "audit",
                "folders": {"F": {"folder_id": "drv1"}}
            }"#,
        )
        .unwrap_err();
        assert!(err.contains("no sheet_id"));
    }

    #[test]
    fn empty_folder_map_is_rejected() {
        let err = AuditConfig::parse(r#"{"folders": {}}"#).unwrap_err();
        assert!(err.contains("no folders"));
    }
}
