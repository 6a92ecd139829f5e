//! The tracking-sheet boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use google_sheets4 as sheets4;

use sheets4::api::{ClearValuesRequest, Scope, ValueRange};
use sheets4::hyper::client::HttpConnector;
use sheets4::hyper_rustls::HttpsConnector;
use sheets4::Sheets;

use crate::error::{from_google, RemoteError};

/// The worksheet operations the reporter and remediation runner consume.
///
/// A worksheet is addressed by spreadsheet id plus worksheet title, which
/// the Sheets API accepts directly as an A1 range.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Empties the worksheet. The sheet itself stays.
    async fn clear(&self, sheet_id: &str, worksheet: &str) -> Result<(), RemoteError>;

    /// Appends `rows` after the current contents in one call.
    async fn append_rows(
        &self,
        sheet_id: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), RemoteError>;

    /// Reads every data row as a header-label to cell-value mapping.
    /// The first row is the header; short rows pad with empty cells.
    async fn read_records(
        &self,
        sheet_id: &str,
        worksheet: &str,
    ) -> Result<Vec<HashMap<String, String>>, RemoteError>;
}

/// Production [`SheetsApi`] backed by the Sheets v4 hub.
pub struct GoogleSheets {
    hub: Sheets<HttpsConnector<HttpConnector>>,
}

impl GoogleSheets {
    pub fn new(hub: Sheets<HttpsConnector<HttpConnector>>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl SheetsApi for GoogleSheets {
    async fn clear(&self, sheet_id: &str, worksheet: &str) -> Result<(), RemoteError> {
        self.hub
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), sheet_id, worksheet)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("worksheet {worksheet} in {sheet_id}")))?;
        Ok(())
    }

    async fn append_rows(
        &self,
        sheet_id: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), RemoteError> {
        let values = rows
            .into_iter()
            .map(|row| row.into_iter().map(serde_json::Value::String).collect())
            .collect();
        let request = ValueRange {
            values: Some(values),
            ..Default::default()
        };
        self.hub
            .spreadsheets()
            .values_append(request, sheet_id, worksheet)
            .value_input_option("RAW")
            .insert_data_option("INSERT_ROWS")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("worksheet {worksheet} in {sheet_id}")))?;
        Ok(())
    }

    async fn read_records(
        &self,
        sheet_id: &str,
        worksheet: &str,
    ) -> Result<Vec<HashMap<String, String>>, RemoteError> {
        let (_, range) = self
            .hub
            .spreadsheets()
            .values_get(sheet_id, worksheet)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| from_google(e, &format!("worksheet {worksheet} in {sheet_id}")))?;

        let mut rows = range.values.unwrap_or_default().into_iter();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };
        let header: Vec<String> = header.iter().map(cell_to_string).collect();

        Ok(rows
            .map(|row| {
                header
                    .iter()
                    .cloned()
                    .zip(
                        row.iter()
                            .map(cell_to_string)
                            .chain(std::iter::repeat(String::new())),
                    )
                    .collect()
            })
            .collect())
    }
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_render_as_plain_strings() {
        assert_eq!(cell_to_string(&json!("x")), "x");
        assert_eq!(cell_to_string(&json!(null)), "");
        assert_eq!(cell_to_string(&json!(12)), "12");
    }
}
