//! Service-account credentials for both API hubs.
//!
//! The key arrives either base64-encoded in `GOOGLE_SERVICE_ACCOUNT_KEY`
//! or from the key file named in the configuration. Obtained tokens are
//! cached on disk and refreshed by the authenticator as needed.

use std::env;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use google_drive3 as drive3;

use drive3::hyper::client::HttpConnector;
use drive3::hyper_rustls::HttpsConnector;
use drive3::oauth2;

use crate::config::AuditConfig;
use crate::error::AuditError;

pub const SERVICE_ACCOUNT_KEY_ENV: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";

pub type Credential = oauth2::authenticator::Authenticator<HttpsConnector<HttpConnector>>;

/// Builds the shared authenticator. One credential serves the Drive and
/// Sheets hubs for the whole run; it is read-only after this point.
pub async fn credentials(config: &AuditConfig) -> Result<Credential, AuditError> {
    let key = load_key(config).await?;
    oauth2::ServiceAccountAuthenticator::builder(key)
        .persist_tokens_to_disk(&config.token_cache)
        .build()
        .await
        .map_err(|e| AuditError::Credentials(format!("failed to build authenticator: {e}")))
}

async fn load_key(config: &AuditConfig) -> Result<oauth2::ServiceAccountKey, AuditError> {
    if let Ok(encoded) = env::var(SERVICE_ACCOUNT_KEY_ENV) {
        let decoded = URL_SAFE.decode(encoded.as_bytes()).map_err(|e| {
            AuditError::Credentials(format!("{SERVICE_ACCOUNT_KEY_ENV} is not valid base64: {e}"))
        })?;
        let json = String::from_utf8(decoded).map_err(|e| {
            AuditError::Credentials(format!("{SERVICE_ACCOUNT_KEY_ENV} is not valid UTF-8: {e}"))
        })?;
        return oauth2::parse_service_account_key(&json)
            .map_err(|e| AuditError::Credentials(format!("invalid service account key: {e}")));
    }

    let Some(path) = &config.service_account_key_file else {
        return Err(AuditError::Credentials(format!(
            "set {SERVICE_ACCOUNT_KEY_ENV} or configure service_account_key_file"
        )));
    };
    oauth2::read_service_account_key(path)
        .await
        .map_err(|e| AuditError::Credentials(format!("{}: {e}", path.display())))
}
