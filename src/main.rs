use std::env;
use std::path::PathBuf;

use anyhow::Result;
use google_drive3 as drive3;

use drive3::{chrono, hyper, hyper_rustls, DriveHub};
use google_sheets4::Sheets;
use tracing_subscriber::EnvFilter;

use drive_public_audit::auth;
use drive_public_audit::config::AuditConfig;
use drive_public_audit::drive::GoogleDrive;
use drive_public_audit::sheets::GoogleSheets;
use drive_public_audit::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("audit.json"));
    let config = AuditConfig::load(&config_path)?;

    let credentials = auth::credentials(&config).await?;

    // One hyper client and one credential behind both API hubs.
    let client = hyper::Client::builder().build(
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build(),
    );
    let drive = GoogleDrive::new(DriveHub::new(client.clone(), credentials.clone()));
    let sheets = GoogleSheets::new(Sheets::new(client, credentials));

    Workflow::new(&drive, &sheets, &config)
        .run(chrono::Utc::now())
        .await?;
    Ok(())
}
