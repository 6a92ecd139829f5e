//! First-pass scanning: list a shared drive's files and inspect their
//! permission sets for public grants.

use std::collections::HashSet;

use tracing::debug;

use crate::drive::{DriveApi, FileRecord};
use crate::error::RemoteError;

/// Drive search filter for files visible to anyone, findable or by link.
pub const PUBLIC_VISIBILITY_QUERY: &str =
    "visibility = 'anyoneCanFind' or visibility = 'anyoneWithLink'";

/// Collects every file in the shared drive matching `query`, across all
/// pages, deduplicated by id.
///
/// The page loop ends on an absent continuation token or on an empty
/// page, whichever comes first. Both are normal termination.
pub async fn list_folder_files(
    drive: &dyn DriveApi,
    folder_id: &str,
    query: &str,
) -> Result<Vec<FileRecord>, RemoteError> {
    let mut records: Vec<FileRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = drive
            .list_files_page(folder_id, query, page_token.as_deref())
            .await?;
        if page.files.is_empty() {
            break;
        }
        for file in page.files {
            if seen.insert(file.id.clone()) {
                records.push(file);
            }
        }
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!(folder = folder_id, files = records.len(), "listing complete");
    Ok(records)
}

/// True iff the file carries a grant of type `anyone`.
pub async fn is_public(drive: &dyn DriveApi, file_id: &str) -> Result<bool, RemoteError> {
    for grant in drive.list_permissions(file_id).await? {
        if grant.is_public() {
            debug!(
                file = file_id,
                grant = %grant.id,
                role = %grant.role,
                "found public grant"
            );
            return Ok(true);
        }
    }
    Ok(false)
}

/// The grant ids of every `anyone` grant on the file, for deletion.
pub async fn public_grants(
    drive: &dyn DriveApi,
    file_id: &str,
) -> Result<Vec<String>, RemoteError> {
    Ok(drive
        .list_permissions(file_id)
        .await?
        .into_iter()
        .filter(|grant| grant.is_public())
        .map(|grant| grant.id)
        .collect())
}
