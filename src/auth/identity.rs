use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AuthProvider, AuthUser, ProfileStore, ProviderError, UserProfile};
use crate::logging::SanitizedEmail;

fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Email/password accounts over the identity toolkit REST API.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn password_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let url = format!("{}/accounts:{endpoint}", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Decode(err.to_string()))?;

        Ok(AuthUser {
            uid: account.local_id,
            email: account.email,
            id_token: account.id_token,
        })
    }
}

/// Only a client error carrying the provider's error envelope is a rejection
/// of the credentials; anything else means the provider is not answering.
async fn rejection(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    if status.is_server_error() {
        return ProviderError::Unavailable(status.as_u16());
    }
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => ProviderError::rejected(envelope.error.message),
        Err(_) => ProviderError::Unavailable(status.as_u16()),
    }
}

#[async_trait]
impl AuthProvider for IdentityClient {
    #[tracing::instrument(name = "identity_sign_in", skip_all, fields(email = %SanitizedEmail::new(email)))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    #[tracing::instrument(name = "identity_sign_up", skip_all, fields(email = %SanitizedEmail::new(email)))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self, user: &AuthUser) -> Result<(), ProviderError> {
        // ID tokens are short-lived and cannot be revoked from a client; forgetting them is enough.
        tracing::debug!(uid = %user.uid, "Signed out of identity provider");
        Ok(())
    }
}

/// Profile documents in the `users` collection of the document store.
#[derive(Debug, Clone)]
pub struct FirestoreProfiles {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: DocumentFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentFields {
    username: Option<StringValue>,
    email: Option<StringValue>,
    created_at: Option<StringValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StringValue {
    string_value: String,
}

impl FirestoreProfiles {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        })
    }

    fn document_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/users/{}",
            self.base_url, self.project_id, uid
        )
    }
}

#[async_trait]
impl ProfileStore for FirestoreProfiles {
    async fn save_profile(
        &self,
        user: &AuthUser,
        profile: &UserProfile,
    ) -> Result<(), ProviderError> {
        let body = json!({
            "fields": {
                "username": { "stringValue": profile.username },
                "email": { "stringValue": profile.email },
                "createdAt": { "stringValue": profile.created_at.to_rfc3339() },
            }
        });

        let response = self
            .http
            .patch(self.document_url(&user.uid))
            .bearer_auth(&user.id_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        tracing::debug!(uid = %user.uid, "Profile document written");
        Ok(())
    }

    async fn load_profile(&self, user: &AuthUser) -> Result<Option<UserProfile>, ProviderError> {
        let response = self
            .http
            .get(self.document_url(&user.uid))
            .bearer_auth(&user.id_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(rejection(response).await),
            _ => {}
        }

        let document: Document = response
            .json()
            .await
            .map_err(|err| ProviderError::Decode(err.to_string()))?;

        let fields = document.fields;
        let created_at = match fields.created_at {
            Some(value) => DateTime::parse_from_rfc3339(&value.string_value)
                .map_err(|err| ProviderError::Decode(format!("createdAt: {err}")))?
                .with_timezone(&Utc),
            None => return Ok(None),
        };

        Ok(Some(UserProfile {
            username: fields.username.map(|v| v.string_value).unwrap_or_default(),
            email: fields
                .email
                .map(|v| v.string_value)
                .unwrap_or_else(|| user.email.clone()),
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthErrorKind;
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC_PATH: &str = "/projects/cineverse-test/databases/(default)/documents/users/uid-1";

    fn user() -> AuthUser {
        AuthUser {
            uid: "uid-1".to_string(),
            email: "user@example.com".to_string(),
            id_token: "id-token".to_string(),
        }
    }

    fn identity(server: &MockServer) -> IdentityClient {
        IdentityClient::new(server.uri(), "api-key", Duration::from_secs(5)).unwrap()
    }

    fn profiles(server: &MockServer) -> FirestoreProfiles {
        FirestoreProfiles::new(server.uri(), "cineverse-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_returns_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .and(query_param("key", "api-key"))
            .and(body_partial_json(json!({
                "email": "user@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "user@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh",
                "expiresIn": "3600"
            })))
            .mount(&server)
            .await;

        let account = identity(&server)
            .sign_in("user@example.com", "Abcdef1!")
            .await
            .unwrap();
        assert_eq!(account, user());
    }

    #[tokio::test]
    async fn test_sign_in_unknown_email_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let err = identity(&server)
            .sign_in("nobody@example.com", "Abcdef1!")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::UserNotFound);
    }

    #[tokio::test]
    async fn test_sign_up_existing_email_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_EXISTS"}
            })))
            .mount(&server)
            .await;

        let err = identity(&server)
            .sign_up("user@example.com", "Abcdef1!")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::EmailAlreadyInUse);
    }

    #[tokio::test]
    async fn test_unparsable_error_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let err = identity(&server)
            .sign_up("user@example.com", "Abcdef1!")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(400)));
        assert_eq!(err.kind(), AuthErrorKind::Other);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable_not_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = identity(&server)
            .sign_in("user@example.com", "Abcdef1!")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(503)));
    }

    #[tokio::test]
    async fn test_server_error_with_envelope_is_still_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"code": 500, "message": "INTERNAL"}
            })))
            .mount(&server)
            .await;

        let err = identity(&server)
            .sign_in("user@example.com", "Abcdef1!")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(500)));
    }

    #[tokio::test]
    async fn test_save_profile_writes_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .and(header("authorization", "Bearer id-token"))
            .and(body_partial_json(json!({
                "fields": {
                    "username": {"stringValue": "moviefan"},
                    "email": {"stringValue": "user@example.com"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let profile = UserProfile {
            username: "moviefan".to_string(),
            email: "user@example.com".to_string(),
            created_at: Utc::now(),
        };
        profiles(&server).save_profile(&user(), &profile).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_profile_parses_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/cineverse-test/databases/(default)/documents/users/uid-1",
                "fields": {
                    "username": {"stringValue": "moviefan"},
                    "email": {"stringValue": "user@example.com"},
                    "createdAt": {"stringValue": "2024-03-01T10:00:00+00:00"}
                }
            })))
            .mount(&server)
            .await;

        let profile = profiles(&server).load_profile(&user()).await.unwrap().unwrap();
        assert_eq!(profile.username, "moviefan");
        assert_eq!(
            profile.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let server = MockServer::start().await;
        let profile = profiles(&server).load_profile(&user()).await.unwrap();
        assert!(profile.is_none());
    }
}
