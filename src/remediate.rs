//! Second pass: read the tracking sheet back and make every
//! non-exempted file private.

use tracing::{info, warn};

use crate::drive::DriveApi;
use crate::error::AuditError;
use crate::report::{COL_ID, COL_KEEP, COL_NAME};
use crate::scan::public_grants;
use crate::sheets::SheetsApi;

/// Per-run outcome counts, one file per bucket.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RemediationSummary {
    pub made_private: usize,
    pub exempted: usize,
    pub already_private: usize,
    pub missing: usize,
    pub failed: usize,
}

pub struct RemediationRunner<'a> {
    drive: &'a dyn DriveApi,
    sheets: &'a dyn SheetsApi,
    worksheet: &'a str,
}

impl<'a> RemediationRunner<'a> {
    pub fn new(drive: &'a dyn DriveApi, sheets: &'a dyn SheetsApi, worksheet: &'a str) -> Self {
        Self {
            drive,
            sheets,
            worksheet,
        }
    }

    /// Walks every sheet row; deletes each `anyone` grant on files whose
    /// exemption cell is empty. Deleting a grant that is already gone is
    /// a no-op for the row; a vanished file is reported and skipped.
    pub async fn run(&self, sheet_id: &str) -> Result<RemediationSummary, AuditError> {
        let rows = self.sheets.read_records(sheet_id, self.worksheet).await?;
        let mut summary = RemediationSummary::default();

        for row in rows {
            let name = row.get(COL_NAME).cloned().unwrap_or_default();

            if row.get(COL_KEEP).is_some_and(|cell| !cell.is_empty()) {
                info!(file = %name, "exempt, stays public");
                summary.exempted += 1;
                continue;
            }

            let Some(file_id) = row.get(COL_ID).filter(|id| !id.is_empty()) else {
                warn!(file = %name, "row has no file id, skipped");
                summary.failed += 1;
                continue;
            };

            let grants = match public_grants(self.drive, file_id).await {
                Ok(grants) => grants,
                Err(err) if err.is_missing() => {
                    warn!(file = %name, "file no longer exists");
                    summary.missing += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            if grants.is_empty() {
                info!(file = %name, "already private");
                summary.already_private += 1;
                continue;
            }

            let mut all_removed = true;
            for grant_id in &grants {
                match self.drive.delete_permission(file_id, grant_id).await {
                    Ok(()) => {}
                    Err(err) if err.is_missing() => {
                        info!(file = %name, grant = %grant_id, "public grant was already gone");
                    }
                    Err(err) => {
                        warn!(
                            file = %name,
                            grant = %grant_id,
                            error = %err,
                            "failed to remove public grant"
                        );
                        all_removed = false;
                    }
                }
            }

            if all_removed {
                info!(file = %name, "made private");
                summary.made_private += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{COL_LINK, COL_MODIFIED, COL_TYPE};
    use crate::testing::{anyone_grant, user_grant, FakeDrive, FakeSheets};

    const WS: &str = "Public files";

    fn header() -> Vec<String> {
        [COL_ID, COL_NAME, COL_LINK, COL_TYPE, COL_MODIFIED, COL_KEEP]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn row(id: &str, keep: &str) -> Vec<String> {
        vec![
            id.to_string(),
            format!("{id}.txt"),
            String::new(),
            String::new(),
            String::new(),
            keep.to_string(),
        ]
    }

    #[tokio::test]
    async fn exempt_rows_are_never_touched() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();
        drive.set_permissions("a", vec![anyone_grant("pa")]);
        sheets.seed_rows("s1", WS, vec![header(), row("a", "keep: shared slides")]);

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();

        assert_eq!(summary.exempted, 1);
        assert!(drive.deleted.lock().unwrap().is_empty());
        assert!(
            drive.permission_lookups.lock().unwrap().is_empty(),
            "exempt rows skip permission inspection"
        );
    }

    #[tokio::test]
    async fn non_exempt_public_file_loses_exactly_its_public_grant() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();
        drive.set_permissions("a", vec![user_grant("p1"), anyone_grant("p2")]);
        sheets.seed_rows("s1", WS, vec![header(), row("a", "")]);

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();

        assert_eq!(summary.made_private, 1);
        assert_eq!(
            *drive.deleted.lock().unwrap(),
            vec![("a".to_string(), "p2".to_string())]
        );
        assert_eq!(drive.grants("a"), vec![user_grant("p1")]);
    }

    #[tokio::test]
    async fn vanished_file_is_reported_not_fatal() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();
        drive.mark_missing("gone");
        drive.set_permissions("b", vec![anyone_grant("pb")]);
        sheets.seed_rows("s1", WS, vec![header(), row("gone", ""), row("b", "")]);

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();

        assert_eq!(summary.missing, 1);
        assert_eq!(summary.made_private, 1);
    }

    #[tokio::test]
    async fn already_private_file_counts_without_delete_calls() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();
        drive.set_permissions("a", vec![user_grant("p1")]);
        sheets.seed_rows("s1", WS, vec![header(), row("a", "")]);

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();

        assert_eq!(summary.already_private, 1);
        assert!(drive.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_is_reported_per_row_and_run_continues() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();
        drive.set_permissions("a", vec![anyone_grant("pa")]);
        drive.fail_delete("a", "pa");
        drive.set_permissions("b", vec![anyone_grant("pb")]);
        sheets.seed_rows("s1", WS, vec![header(), row("a", ""), row("b", "")]);

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.made_private, 1);
        assert_eq!(
            *drive.deleted.lock().unwrap(),
            vec![("b".to_string(), "pb".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_sheet_yields_an_empty_summary() {
        let drive = FakeDrive::default();
        let sheets = FakeSheets::default();

        let summary = RemediationRunner::new(&drive, &sheets, WS)
            .run("s1")
            .await
            .unwrap();
        assert_eq!(summary, RemediationSummary::default());
    }
}
