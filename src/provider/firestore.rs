//! Profile documents in a hosted document database (REST).
//!
//! Documents live at `projects/{project}/databases/(default)/documents/users/{uid}`
//! and are authorized with the signed-in user's ID token.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ProfileDocument, ProfileStore, ProviderError, ProviderUser, codes};
use crate::config::{ConfigError, ProviderTimeouts};

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const USERS_COLLECTION: &str = "users";

/// REST client for the `users` collection.
pub struct FirestoreProfiles {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

impl FirestoreProfiles {
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(project_id: String, base_url: &str, timeouts: ProviderTimeouts) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), project_id })
    }

    fn document_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{USERS_COLLECTION}/{uid}",
            self.base_url, self.project_id
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder, user: &ProviderUser) -> reqwest::RequestBuilder {
        match &user.credential {
            Some(credential) => request.bearer_auth(credential.expose()),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl ProfileStore for FirestoreProfiles {
    async fn read_profile(&self, user: &ProviderUser) -> Result<Option<ProfileDocument>, ProviderError> {
        let request = self.http.get(self.document_url(&user.uid));
        let response = self
            .authorized(request, user)
            .send()
            .await
            .map_err(ProviderError::network)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response.text().await.map_err(ProviderError::network)?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let document: FirestoreDocument = serde_json::from_str(&text)
            .map_err(ProviderError::unexpected)?;
        Ok(Some(document.into_profile()))
    }

    async fn write_profile(&self, user: &ProviderUser, doc: &ProfileDocument) -> Result<(), ProviderError> {
        let request = self
            .http
            .patch(self.document_url(&user.uid))
            .json(&encode_profile(doc));
        let response = self
            .authorized(request, user)
            .send()
            .await
            .map_err(ProviderError::network)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, &text))
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    fn into_profile(self) -> ProfileDocument {
        ProfileDocument {
            name: scalar_field(&self.fields, "name").unwrap_or_default(),
            email: scalar_field(&self.fields, "email"),
            created_at: scalar_field(&self.fields, "createdAt").unwrap_or_default(),
        }
    }
}

/// Read a string-like typed value (`stringValue` or `timestampValue`).
fn scalar_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let value = fields.get(key)?;
    value
        .get("stringValue")
        .or_else(|| value.get("timestampValue"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

pub(crate) fn encode_profile(doc: &ProfileDocument) -> Value {
    let email = match &doc.email {
        Some(email) => json!({ "stringValue": email }),
        None => json!({ "nullValue": null }),
    };
    json!({
        "fields": {
            "name": { "stringValue": doc.name },
            "email": email,
            "createdAt": { "timestampValue": doc.created_at },
        }
    })
}

fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let code = match status.as_u16() {
        401 | 403 => codes::PERMISSION_DENIED,
        _ => codes::INTERNAL_ERROR,
    };
    tracing::warn!(status = status.as_u16(), body, "document store request failed");
    ProviderError::new(code, "")
}

#[cfg(test)]
#[path = "firestore_test.rs"]
mod tests;
