//! Writes the audit snapshot into the tracking worksheet.
//!
//! Each run replaces the whole worksheet: clear, one header append, one
//! bulk data append. The exemption column is written empty and belongs
//! to the operator from then on.

use std::collections::HashMap;

use google_drive3::chrono::{DateTime, Utc};
use tracing::info;

use crate::drive::FileRecord;
use crate::error::AuditError;
use crate::retry::{write_with_backoff, RetryPolicy};
use crate::sheets::SheetsApi;

pub const COL_ID: &str = "ID";
pub const COL_NAME: &str = "Name";
pub const COL_LINK: &str = "Link";
pub const COL_TYPE: &str = "Type";
pub const COL_MODIFIED: &str = "Modified";
/// The operator-owned exemption column. A non-empty cell keeps the file
/// public through remediation.
pub const COL_KEEP: &str = "Keep public";

pub struct AuditReporter<'a> {
    sheets: &'a dyn SheetsApi,
    policy: &'a RetryPolicy,
    mime_labels: &'a HashMap<String, String>,
    worksheet: &'a str,
}

impl<'a> AuditReporter<'a> {
    pub fn new(
        sheets: &'a dyn SheetsApi,
        policy: &'a RetryPolicy,
        mime_labels: &'a HashMap<String, String>,
        worksheet: &'a str,
    ) -> Self {
        Self {
            sheets,
            policy,
            mime_labels,
            worksheet,
        }
    }

    /// Replaces the worksheet contents with this run's snapshot.
    pub async fn publish(
        &self,
        sheet_id: &str,
        files: &[FileRecord],
        audited_at: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        write_with_backoff(self.policy, || self.sheets.clear(sheet_id, self.worksheet)).await?;

        let header = header_row(audited_at);
        write_with_backoff(self.policy, || {
            self.sheets
                .append_rows(sheet_id, self.worksheet, vec![header.clone()])
        })
        .await?;

        if !files.is_empty() {
            let rows: Vec<Vec<String>> = files.iter().map(|file| self.data_row(file)).collect();
            write_with_backoff(self.policy, || {
                self.sheets
                    .append_rows(sheet_id, self.worksheet, rows.clone())
            })
            .await?;
        }

        info!(
            worksheet = self.worksheet,
            rows = files.len(),
            "tracking sheet rewritten"
        );
        Ok(())
    }

    fn data_row(&self, file: &FileRecord) -> Vec<String> {
        vec![
            file.id.clone(),
            file.name.clone(),
            file.web_view_link.clone(),
            type_label(self.mime_labels, &file.mime_type),
            format_modified(file.modified_time.as_ref()),
            String::new(),
        ]
    }
}

fn header_row(audited_at: DateTime<Utc>) -> Vec<String> {
    vec![
        COL_ID.to_string(),
        COL_NAME.to_string(),
        COL_LINK.to_string(),
        COL_TYPE.to_string(),
        COL_MODIFIED.to_string(),
        COL_KEEP.to_string(),
        format!("audited {}", audited_at.format("%Y-%m-%d %H:%M:%S")),
    ]
}

/// Unknown codes pass through unchanged.
pub fn type_label(labels: &HashMap<String, String>, mime_type: &str) -> String {
    labels
        .get(mime_type)
        .cloned()
        .unwrap_or_else(|| mime_type.to_string())
}

/// Renders the wire timestamp truncated to whole seconds, or an empty
/// cell when the API omitted it.
pub fn format_modified(modified: Option<&DateTime<Utc>>) -> String {
    modified
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mime_labels;
    use crate::testing::{file_record, FakeSheets};
    use google_drive3::chrono::TimeZone;

    fn audited_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn publish_writes_header_then_one_bulk_append() {
        let sheets = FakeSheets::default();
        let labels = default_mime_labels();
        let policy = RetryPolicy::default();
        let reporter = AuditReporter::new(&sheets, &policy, &labels, "Public files");

        let files = vec![file_record("a"), file_record("b")];
        reporter.publish("s1", &files, audited_at()).await.unwrap();

        assert_eq!(*sheets.append_sizes.lock().unwrap(), vec![1, 2]);
        let rows = sheets.rows("s1", "Public files");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], COL_ID);
        assert_eq!(rows[0][5], COL_KEEP);
        assert_eq!(rows[0][6], "audited 2024-06-01 09:30:00");
        assert_eq!(rows[1][0], "a");
        assert_eq!(rows[1][5], "", "exemption column starts empty");
    }

    #[tokio::test]
    async fn second_publish_replaces_the_first() {
        let sheets = FakeSheets::default();
        let labels = default_mime_labels();
        let policy = RetryPolicy::default();
        let reporter = AuditReporter::new(&sheets, &policy, &labels, "Public files");

        reporter
            .publish("s1", &[file_record("a"), file_record("b")], audited_at())
            .await
            .unwrap();
        reporter
            .publish("s1", &[file_record("c")], audited_at())
            .await
            .unwrap();

        let rows = sheets.rows("s1", "Public files");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "c");
    }

    #[tokio::test]
    async fn empty_folder_still_rewrites_the_header() {
        let sheets = FakeSheets::default();
        let labels = default_mime_labels();
        let policy = RetryPolicy::default();
        let reporter = AuditReporter::new(&sheets, &policy, &labels, "Public files");

        reporter.publish("s1", &[], audited_at()).await.unwrap();
        assert_eq!(sheets.rows("s1", "Public files").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_rides_out_a_rate_limit_burst() {
        let sheets = FakeSheets::default();
        let labels = default_mime_labels();
        let policy = RetryPolicy::default();
        let reporter = AuditReporter::new(&sheets, &policy, &labels, "Public files");

        sheets.rate_limit_next_writes(2);
        reporter
            .publish("s1", &[file_record("a")], audited_at())
            .await
            .unwrap();
        assert_eq!(sheets.rows("s1", "Public files").len(), 2);
    }

    #[test]
    fn known_types_map_and_unknown_types_pass_through() {
        let labels = default_mime_labels();
        assert_eq!(
            type_label(&labels, "application/vnd.google-apps.document"),
            "Google Docs"
        );
        assert_eq!(
            type_label(&labels, "application/x-unheard-of"),
            "application/x-unheard-of"
        );
    }

    #[test]
    fn modified_time_truncates_to_whole_seconds() {
        let dt = DateTime::parse_from_rfc3339("2023-04-05T06:07:08.912Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_modified(Some(&dt)), "2023-04-05 06:07:08");
        assert_eq!(format_modified(None), "");
    }
}
