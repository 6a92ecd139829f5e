//! The Drive API boundary: file listing and permission management.

use async_trait::async_trait;
use google_drive3 as drive3;

use drive3::api;
use drive3::chrono::{DateTime, Utc};
use drive3::hyper::client::HttpConnector;
use drive3::hyper_rustls::HttpsConnector;
use drive3::DriveHub;

use crate::error::{from_google, RemoteError};

/// Grant type the Drive API uses for "anyone" sharing.
pub const PUBLIC_GRANT_TYPE: &str = "anyone";

/// Only the fields the audit needs, to keep list payloads small.
const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, webViewLink, mimeType, modifiedTime)";
const PERMISSION_FIELDS: &str = "permissions(id, type, role)";
const PAGE_SIZE: i32 = 1000;

/// Per-run snapshot of one file, as much of it as the sheet needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub web_view_link: String,
    pub mime_type: String,
    pub modified_time: Option<DateTime<Utc>>,
}

impl FileRecord {
    fn from_api(file: api::File) -> Option<Self> {
        Some(Self {
            id: file.id?,
            name: file.name.unwrap_or_default(),
            web_view_link: file.web_view_link.unwrap_or_default(),
            mime_type: file.mime_type.unwrap_or_default(),
            modified_time: file.modified_time,
        })
    }
}

/// One page of a file listing plus the continuation token, if any.
#[derive(Debug, Clone, Default)]
pub struct FilePage {
    pub files: Vec<FileRecord>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub id: String,
    pub grant_type: String,
    pub role: String,
}

impl PermissionGrant {
    fn from_api(permission: api::Permission) -> Option<Self> {
        Some(Self {
            id: permission.id?,
            grant_type: permission.type_.unwrap_or_default(),
            role: permission.role.unwrap_or_default(),
        })
    }

    pub fn is_public(&self) -> bool {
        self.grant_type == PUBLIC_GRANT_TYPE
    }
}

/// The file-storage operations the workflow consumes.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetches one page of files in a shared drive matching `query`.
    async fn list_files_page(
        &self,
        folder_id: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError>;

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionGrant>, RemoteError>;

    /// Deletes a single grant. Grants are deleted by their own id; the
    /// remote API has no delete-by-type.
    async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
    ) -> Result<(), RemoteError>;
}

/// Production [`DriveApi`] backed by the Drive v3 hub.
pub struct GoogleDrive {
    hub: DriveHub<HttpsConnector<HttpConnector>>,
}

impl GoogleDrive {
    pub fn new(hub: DriveHub<HttpsConnector<HttpConnector>>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl DriveApi for GoogleDrive {
    async fn list_files_page(
        &self,
        folder_id: &str,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError> {
        let mut call = self
            .hub
            .files()
            .list()
            .corpora("drive")
            .drive_id(folder_id)
            .include_items_from_all_drives(true)
            .supports_all_drives(true)
            .page_size(PAGE_SIZE)
            .param("fields", LIST_FIELDS)
            .add_scope(api::Scope::Full);
        if !query.is_empty() {
            call = call.q(query);
        }
        if let Some(token) = page_token {
            call = call.page_token(token);
        }
        let (_, list) = call
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("folder {folder_id}")))?;

        let files = list
            .files
            .unwrap_or_default()
            .into_iter()
            .filter_map(FileRecord::from_api)
            .collect();
        Ok(FilePage {
            files,
            next_page_token: list.next_page_token,
        })
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<PermissionGrant>, RemoteError> {
        let (_, list) = self
            .hub
            .permissions()
            .list(file_id)
            .supports_all_drives(true)
            .param("fields", PERMISSION_FIELDS)
            .add_scope(api::Scope::Full)
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("file {file_id}")))?;

        Ok(list
            .permissions
            .unwrap_or_default()
            .into_iter()
            .filter_map(PermissionGrant::from_api)
            .collect())
    }

    async fn delete_permission(
        &self,
        file_id: &str,
        permission_id: &str,
    ) -> Result<(), RemoteError> {
        self.hub
            .permissions()
            .delete(file_id, permission_id)
            .supports_all_drives(true)
            .add_scope(api::Scope::Full)
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("permission {permission_id} on file {file_id}")))?;
        Ok(())
    }
}
