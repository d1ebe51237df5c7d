//! Access token loading and re-authorization links.
//!
//! Acquiring and refreshing tokens happens outside this server. We only read
//! the token that setup left behind and, when it is missing or rejected,
//! point the user at the consent page.

use std::path::Path;

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::config::Config;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";

/// Token file as written by the OAuth setup step.
#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expiry: Option<DateTime<FixedOffset>>,
}

/// Client secret file downloaded from the cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecrets {
    #[serde(default)]
    installed: Option<ClientSection>,
    #[serde(default)]
    web: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    #[serde(default)]
    auth_uri: Option<String>,
}

/// What the REST client needs to authenticate.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub reauth_url: String,
}

impl Credentials {
    pub fn load(config: &Config) -> Self {
        let access_token = config
            .access_token
            .clone()
            .or_else(|| read_token(&config.token_file, Utc::now()));
        if access_token.is_none() {
            tracing::warn!(
                token_file = %config.token_file.display(),
                "No usable access token; calendar calls will ask for re-authorization"
            );
        }
        Self {
            access_token,
            reauth_url: reauth_url(&config.credentials_file, &config.redirect_uri),
        }
    }
}

/// Read the access token, ignoring files that are missing, malformed, or
/// hold an expired token.
fn read_token(path: &Path, now: DateTime<Utc>) -> Option<String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Token file not readable");
            return None;
        }
    };
    let token: StoredToken = match serde_json::from_str(&raw) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Token file is not valid JSON");
            return None;
        }
    };
    // A zero-valued expiry (year 1) means the token does not expire.
    if let Some(expiry) = token.expiry.filter(|e| e.year() > 1) {
        if expiry <= now {
            tracing::warn!(%expiry, "Stored access token has expired");
            return None;
        }
    }
    Some(token.access_token).filter(|t| !t.is_empty())
}

/// Consent page URL for the calendar scope. Without a readable client secret
/// the link lacks a client id, but still names the scope to grant.
pub fn reauth_url(credentials_file: &Path, redirect_uri: &str) -> String {
    let section = std::fs::read_to_string(credentials_file)
        .ok()
        .and_then(|raw| serde_json::from_str::<ClientSecrets>(&raw).ok())
        .and_then(|secrets| secrets.installed.or(secrets.web));

    let endpoint = section
        .as_ref()
        .and_then(|s| s.auth_uri.as_deref())
        .unwrap_or(AUTH_ENDPOINT);
    let mut url = match Url::parse(endpoint) {
        Ok(url) => url,
        Err(_) => return AUTH_ENDPOINT.to_string(),
    };
    {
        let mut query = url.query_pairs_mut();
        if let Some(section) = &section {
            query.append_pair("client_id", &section.client_id);
        }
        query
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", CALENDAR_SCOPE)
            .append_pair("access_type", "offline");
    }
    url.into()
}
