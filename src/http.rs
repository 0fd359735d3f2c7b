//! Global HTTP client singleton
//!
//! Provides a shared HTTP client instance to avoid recreating clients for
//! each synthesis request. This eliminates the TLS handshake overhead and
//! root certificate store population that happens when creating a new
//! client per call.
//!
//! ```rust,ignore
//! use speak_core::http::get_http_client;
//!
//! let client = get_http_client()?;
//! ```

use anyhow::{Context, Result};
use std::sync::OnceLock;

use crate::provider::DEFAULT_TIMEOUT_SECS;

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get the global HTTP client, creating it if necessary.
pub fn get_http_client() -> Result<&'static reqwest::Client> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client);
    }

    let client = create_http_client()?;
    Ok(HTTP_CLIENT.get_or_init(|| client))
}

/// Pre-warm the HTTP client by initializing it before the first request.
pub fn warmup_http_client() -> Result<()> {
    get_http_client()?;
    Ok(())
}

/// Check if the HTTP client is already initialized.
pub fn is_http_client_ready() -> bool {
    HTTP_CLIENT.get().is_some()
}

fn create_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .context("failed to create HTTP client")
}
