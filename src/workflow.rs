//! One parameterized workflow over the shared drives: scan, audit, or
//! remediate, selected by configuration.

use google_drive3::chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{AuditConfig, FolderTarget, RunMode};
use crate::drive::{DriveApi, FileRecord};
use crate::error::AuditError;
use crate::remediate::RemediationRunner;
use crate::report::AuditReporter;
use crate::scan::{is_public, list_folder_files, PUBLIC_VISIBILITY_QUERY};
use crate::sheets::SheetsApi;

pub struct Workflow<'a> {
    drive: &'a dyn DriveApi,
    sheets: &'a dyn SheetsApi,
    config: &'a AuditConfig,
}

impl<'a> Workflow<'a> {
    pub fn new(drive: &'a dyn DriveApi, sheets: &'a dyn SheetsApi, config: &'a AuditConfig) -> Self {
        Self {
            drive,
            sheets,
            config,
        }
    }

    /// Processes every configured folder in order, one at a time. The
    /// first fatal error halts the run; anything already written stays
    /// written.
    pub async fn run(&self, started_at: DateTime<Utc>) -> Result<(), AuditError> {
        for (name, folder) in &self.config.folders {
            info!(folder = %name, "processing folder");
            match self.config.mode {
                RunMode::Scan => {
                    self.scan_folder(name, folder).await?;
                }
                RunMode::Audit => {
                    let files = self.scan_folder(name, folder).await?;
                    let reporter = AuditReporter::new(
                        self.sheets,
                        &self.config.retry,
                        &self.config.mime_labels,
                        &self.config.worksheet,
                    );
                    reporter.publish(&folder.sheet_id, &files, started_at).await?;
                }
                RunMode::Remediate => {
                    let runner =
                        RemediationRunner::new(self.drive, self.sheets, &self.config.worksheet);
                    let summary = runner.run(&folder.sheet_id).await?;
                    info!(
                        folder = %name,
                        made_private = summary.made_private,
                        exempted = summary.exempted,
                        already_private = summary.already_private,
                        missing = summary.missing,
                        failed = summary.failed,
                        "remediation finished"
                    );
                }
            }
        }
        Ok(())
    }

    async fn scan_folder(
        &self,
        name: &str,
        folder: &FolderTarget,
    ) -> Result<Vec<FileRecord>, AuditError> {
        let files =
            list_folder_files(self.drive, &folder.folder_id, PUBLIC_VISIBILITY_QUERY).await?;

        let mut public = 0usize;
        for file in &files {
            if is_public(self.drive, &file.id).await? {
                info!(file = %file.name, link = %file.web_view_link, "public file");
                public += 1;
            }
        }
        if public == 0 {
            info!(folder = %name, files = files.len(), "no public files");
        } else {
            info!(folder = %name, files = files.len(), public, "scan finished");
        }
        Ok(files)
    }
}
