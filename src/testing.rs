//! In-memory fakes for the remote API seams.
//!
//! Both fakes hold real state behind mutexes so tests can assert on what
//! was written, deleted, or asked for, without any engine or network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::drive::{DriveApi, FilePage, FileRecord, PermissionGrant, PUBLIC_GRANT_TYPE};
use crate::error::RemoteError;
use crate::sheets::SheetsApi;

pub fn file_record(id: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        name: format!("{id}.txt"),
        web_view_link: format!("https://drive.example.test/{id}"),
        mime_type: "text/plain".to_string(),
        modified_time: None,
    }
}

pub fn anyone_grant(id: &str) -> PermissionGrant {
    PermissionGrant {
        id: id.to_string(),
        grant_type: PUBLIC_GRANT_TYPE.to_string(),
        role: "reader".to_string(),
    }
}

pub fn user_grant(id: &str) -> PermissionGrant {
    PermissionGrant {
        id: id.to_string(),
        grant_type: "user".to_string(),
        role: "writer".to_string(),
    }
}

/// Scripted [`DriveApi`]: pages are served in push order, permissions
/// come from a per-file table, deletions mutate that table and are
/// recorded.
#[derive(Default)]
pub struct FakeDrive {
    pages: Mutex<Vec<FilePage>>,
    permissions: Mutex<HashMap<String, Vec<PermissionGrant>>>,
    missing: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<(String, String)>>,
    /// `(file_id, permission_id)` of every successful delete, in order.
    pub deleted: Mutex<Vec<(String, String)>>,
    /// The `pageToken` of every list call, in order.
    pub page_tokens_seen: Mutex<Vec<Option<String>>>,
    /// Every file id whose permissions were listed, in order.
    pub permission_lookups: Mutex<Vec<String>>,
}

impl FakeDrive {
    pub fn push_page(&self, files: Vec<FileRecord>, next_page_token: Option<&str>) {
        self.pages.lock().unwrap().push(FilePage {
            files,
            next_page_token: next_page_token.map(ToOwned::to_owned),
        });
    }

    pub fn set_permissions(&self, file_id: &str, grants: Vec<PermissionGrant>) {
        self.permissions
            .lock()
            .unwrap()
            .insert(file_id.to_string(), grants);
    }

    /// Marks a file id as no longer existing; lookups and deletes on it
    /// return [`RemoteError::NotFound`].
    pub fn mark_missing(&self, file_id: &str) {
        self.missing.lock().unwrap().insert(file_id.to_string());
    }

    pub fn fail_delete(&self, file_id: &str, permission_id: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert((file_id.to_string(), permission_id.to_string()));
    }

    pub fn grants(&self, file_id: &str) -> Vec<PermissionGrant> {
        self.permissions
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files_page(
        &self,
        _folder_id: &str,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError> {
        self.page_tokens_seen
            .lock()
            .unwrap()
            .push(page_token.map(ToOwned::to_owned));
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(FilePage::default())
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionGrant>, RemoteError> {
        self.permission_lookups
            .lock()
            .unwrap()
            .push(file_id.to_string());
        if self.missing.lock().unwrap().contains(file_id) {
            return Err(RemoteError::NotFound(format!("file {file_id}")));
        }
        Ok(self.grants(file_id))
    }

    async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
    ) -> Result<(), RemoteError> {
        if self.missing.lock().unwrap().contains(file_id) {
            return Err(RemoteError::NotFound(format!("file {file_id}")));
        }
        if self
            .failing_deletes
            .lock()
            .unwrap()
            .contains(&(file_id.to_string(), permission_id.to_string()))
        {
            return Err(RemoteError::Api(format!(
                "permission {permission_id} on file {file_id}: forced failure"
            )));
        }
        let mut permissions = self.permissions.lock().unwrap();
        let grants = permissions.entry(file_id.to_string()).or_default();
        let Some(position) = grants.iter().position(|g| g.id == permission_id) else {
            return Err(RemoteError::NotFound(format!(
                "permission {permission_id} on file {file_id}"
            )));
        };
        grants.remove(position);
        self.deleted
            .lock()
            .unwrap()
            .push((file_id.to_string(), permission_id.to_string()));
        Ok(())
    }
}

/// In-memory [`SheetsApi`] holding actual worksheet contents, so a
/// rewrite provably replaces the previous run and remediation reads back
/// exactly what the reporter wrote.
#[derive(Default)]
pub struct FakeSheets {
    state: Mutex<HashMap<(String, String), Vec<Vec<String>>>>,
    rate_limit_next: Mutex<u32>,
    /// `(sheet_id, worksheet)` of every clear call, in order.
    pub clears: Mutex<Vec<(String, String)>>,
    /// Row count of every append call, in order.
    pub append_sizes: Mutex<Vec<usize>>,
}

impl FakeSheets {
    /// Makes the next `n` write calls fail with a rate-limit error.
    pub fn rate_limit_next_writes(&self, n: u32) {
        *self.rate_limit_next.lock().unwrap() = n;
    }

    pub fn seed_rows(&self, sheet_id: &str, worksheet: &str, rows: Vec<Vec<String>>) {
        self.state
            .lock()
            .unwrap()
            .insert((sheet_id.to_string(), worksheet.to_string()), rows);
    }

    pub fn rows(&self, sheet_id: &str, worksheet: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .get(&(sheet_id.to_string(), worksheet.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn check_quota(&self) -> Result<(), RemoteError> {
        let mut remaining = self.rate_limit_next.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(RemoteError::RateLimited("sheet write quota".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn clear(&self, sheet_id: &str, worksheet: &str) -> Result<(), RemoteError> {
        self.check_quota()?;
        self.state
            .lock()
            .unwrap()
            .remove(&(sheet_id.to_string(), worksheet.to_string()));
        self.clears
            .lock()
            .unwrap()
            .push((sheet_id.to_string(), worksheet.to_string()));
        Ok(())
    }

    async fn append_rows(
        &self,
        sheet_id: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), RemoteError> {
        self.check_quota()?;
        self.append_sizes.lock().unwrap().push(rows.len());
        self.state
            .lock()
            .unwrap()
            .entry((sheet_id.to_string(), worksheet.to_string()))
            .or_default()
            .extend(rows);
        Ok(())
    }

    async fn read_records(
        &self,
        sheet_id: &str,
        worksheet: &str,
    ) -> Result<Vec<HashMap<String, String>>, RemoteError> {
        let rows = self.rows(sheet_id, worksheet);
        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        Ok(data
            .iter()
            .map(|row| {
                header
                    .iter()
                    .cloned()
                    .zip(
                        row.iter()
                            .cloned()
                            .chain(std::iter::repeat(String::new())),
                    )
                    .collect()
            })
            .collect())
    }
}
