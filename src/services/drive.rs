//! Google Drive integration: OAuth code exchange and document listing.
//!
//! Only the read paths the dashboard needs are implemented, against the
//! Drive v3 REST surface via reqwest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ApiError;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const CONSENT_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Documents created before this date are never surfaced
const CREATED_CUTOFF: &str = "2020-01-01T00:00:00Z";

/// Google Docs, Sheets, Presentations, and PDFs
const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.presentation",
    "application/pdf",
];

const EXCLUDED_MIME_PREFIXES: &[&str] = &[
    "video/",
    "audio/",
    "image/",
    "application/octet-stream",
    "application/zip",
    "application/x-rar-compressed",
];

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub created_time: String,
    pub modified_time: Option<String>,
    pub size: Option<String>,
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Document row shaped for the frontend
#[derive(Debug, Serialize)]
pub struct DriveDocument {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub created_time: String,
    pub modified_time: Option<String>,
    pub size: String,
    pub web_view_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<DriveDocument>,
    pub total: usize,
    pub next_page_token: Option<String>,
    pub has_more: bool,
    pub page_size: u32,
}

/// Build the OAuth consent URL (email/profile plus read-only Drive scope)
pub fn consent_url() -> Result<String, ApiError> {
    let google = &config::config().google;
    let (Some(client_id), Some(redirect_uri)) = (&google.client_id, &google.redirect_uri) else {
        return Err(ApiError::service_unavailable("Google OAuth is not configured"));
    };

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &format!("email profile {}", DRIVE_SCOPE))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .finish();

    Ok(format!("{}?{}", CONSENT_ENDPOINT, query))
}

/// Exchange an authorization code for access/refresh tokens
pub async fn exchange_code(code: &str) -> Result<GoogleTokenResponse, ApiError> {
    let google = &config::config().google;
    let (Some(client_id), Some(client_secret), Some(redirect_uri)) =
        (&google.client_id, &google.client_secret, &google.redirect_uri)
    else {
        return Err(ApiError::service_unavailable("Google OAuth is not configured"));
    };

    let params = [
        ("code", code),
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let response = reqwest::Client::new()
        .post(TOKEN_ENDPOINT)
        .form(&params)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Google token endpoint unreachable: {}", e);
            ApiError::bad_gateway("Failed to reach Google OAuth")
        })?;

    if !response.status().is_success() {
        let status = response.status();
        tracing::warn!("Google token exchange failed with status {}", status);
        return Err(ApiError::bad_gateway("Google rejected the authorization code"));
    }

    response.json::<GoogleTokenResponse>().await.map_err(|e| {
        tracing::error!("Unexpected token response from Google: {}", e);
        ApiError::bad_gateway("Unexpected response from Google OAuth")
    })
}

/// Drive query string: allowed mime types, not trashed, created since cutoff,
/// optionally restricted by a fullText term.
pub fn build_query(search: Option<&str>) -> String {
    let mime_clause = ALLOWED_MIME_TYPES
        .iter()
        .map(|m| format!("mimeType='{}'", m))
        .collect::<Vec<_>>()
        .join(" or ");

    let base = format!(
        "trashed = false and ({}) and createdTime > '2020-01-01T00:00:00'",
        mime_clause
    );

    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => format!(
            "(fullText contains '{}') and {}",
            term.replace('\\', "\\\\").replace('\'', "\\'"),
            base
        ),
        None => base,
    }
}

/// Post-fetch filter mirroring the server-side query: the Drive API applies
/// the q-filters, this re-checks them on the way through.
pub fn is_wanted_document(mime_type: &str, created_time: &str) -> bool {
    if EXCLUDED_MIME_PREFIXES.iter().any(|p| mime_type.starts_with(p)) {
        return false;
    }
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return false;
    }

    let Ok(created) = DateTime::parse_from_rfc3339(created_time) else {
        return false;
    };
    let cutoff = DateTime::parse_from_rfc3339(CREATED_CUTOFF)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    created.with_timezone(&Utc) >= cutoff
}

/// Human-readable file size: "0 B", "512 B", "1.5 KB", "2 MB"
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.1}", value);
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{} {}", trimmed, UNITS[unit])
}

fn present(file: DriveFile) -> DriveDocument {
    let size_bytes = file.size.as_deref().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
    DriveDocument {
        id: file.id,
        name: file.name,
        mime_type: file.mime_type,
        created_time: file.created_time,
        modified_time: file.modified_time,
        size: format_file_size(size_bytes),
        web_view_link: file.web_view_link,
    }
}

/// List (or search, when `search` is set) the user's Drive documents.
///
/// The Drive API refuses orderBy together with fullText queries, so ordering
/// is only requested for plain listings.
pub async fn list_documents(
    access_token: &str,
    page_size: u32,
    page_token: Option<&str>,
    search: Option<&str>,
) -> Result<DocumentPage, ApiError> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let query = build_query(search);

    let mut params: Vec<(&str, String)> = vec![
        ("q", query),
        ("pageSize", page_size.to_string()),
        (
            "fields",
            "nextPageToken,files(id,name,mimeType,createdTime,modifiedTime,size,webViewLink)"
                .to_string(),
        ),
    ];
    if search.map(str::trim).filter(|s| !s.is_empty()).is_none() {
        params.push(("orderBy", "createdTime desc".to_string()));
    }
    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }

    let response = reqwest::Client::new()
        .get(FILES_ENDPOINT)
        .bearer_auth(access_token)
        .query(&params)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Drive API unreachable: {}", e);
            ApiError::bad_gateway("Failed to reach Google Drive")
        })?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ApiError::GoogleAuthRequired(
            "Please sign in with Google to access your Drive documents".to_string(),
        ));
    }
    if !response.status().is_success() {
        let status = response.status();
        tracing::warn!("Drive API returned status {}", status);
        return Err(ApiError::bad_gateway("Google Drive request failed"));
    }

    let list: DriveFileList = response.json().await.map_err(|e| {
        tracing::error!("Unexpected Drive file list payload: {}", e);
        ApiError::bad_gateway("Unexpected response from Google Drive")
    })?;

    let documents: Vec<DriveDocument> = list
        .files
        .into_iter()
        .filter(|f| is_wanted_document(&f.mime_type, &f.created_time))
        .map(present)
        .collect();

    Ok(DocumentPage {
        total: documents.len(),
        has_more: list.next_page_token.is_some(),
        next_page_token: list.next_page_token,
        page_size,
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_search_keeps_base_filters() {
        let q = build_query(None);
        assert!(q.starts_with("trashed = false"));
        assert!(q.contains("mimeType='application/pdf'"));
        assert!(q.contains("createdTime > '2020-01-01T00:00:00'"));
        assert!(!q.contains("fullText"));
    }

    #[test]
    fn query_with_search_escapes_quotes() {
        let q = build_query(Some("Q3 'budget'"));
        assert!(q.starts_with("(fullText contains 'Q3 \\'budget\\'')"));
    }

    #[test]
    fn blank_search_is_treated_as_listing() {
        assert_eq!(build_query(Some("   ")), build_query(None));
    }

    #[test]
    fn filters_by_mime_and_creation_date() {
        assert!(is_wanted_document(
            "application/vnd.google-apps.document",
            "2023-06-01T12:00:00Z"
        ));
        assert!(!is_wanted_document("video/mp4", "2023-06-01T12:00:00Z"));
        assert!(!is_wanted_document("application/msword", "2023-06-01T12:00:00Z"));
        assert!(!is_wanted_document("application/pdf", "2019-12-31T23:59:59Z"));
        assert!(!is_wanted_document("application/pdf", "not-a-date"));
    }

    #[test]
    fn formats_file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }
}
