//! Supabase-style REST adapter.
//!
//! Talks to the backend-as-a-service over its two HTTP surfaces:
//!
//! - **PostgREST** for the relational tables: `GET`/`PATCH` against
//!   `{base}/rest/v1/{table}` with `column=eq.{value}` filters and
//!   `Prefer: return=minimal` on writes.
//! - **GoTrue** for the identity store: `{base}/auth/v1/signup`, `recover`,
//!   `resend`, `token`, and the `admin/users` surface.
//!
//! Every request authenticates with the service-role key (`apikey` header +
//! bearer token). Idempotent reads go through the backoff wrapper; writes
//! execute exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use anaokulu_types::{
    Application, ApplicationId, ApplicationStatus, Identity, IdentityId, IdentityMetadata,
    NewIdentity, Profile, Role, Session,
};

use crate::{
    DirectoryStore, IdentityStore, Result,
    config::StoreConfig,
    error::StoreError,
    retry::with_read_retry,
};

/// REST implementation of [`DirectoryStore`] and [`IdentityStore`].
#[derive(Debug)]
pub struct RestStore {
    http: reqwest::Client,
    config: StoreConfig,
}

impl RestStore {
    /// Builds the adapter from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the HTTP client cannot be
    /// constructed from the configured timeouts.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| StoreError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.base_url)
    }

    /// Attaches the service-role credentials to a request.
    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Maps a non-success response to a [`StoreError`], reading the body for
    /// the backend's message.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status.as_u16(), extract_message(&body)))
    }
}

/// Pulls a human-readable message out of a backend error body.
///
/// PostgREST uses `message`, GoTrue uses `msg` or `error_description`; fall
/// back to the raw body.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}

/// Maps an HTTP status + message to the store error taxonomy.
fn classify(status: u16, message: String) -> StoreError {
    match status {
        404 => StoreError::NotFound { entity: message },
        409 | 422 => StoreError::Conflict { message },
        _ => StoreError::Api { status, message },
    }
}

/// Wraps a body-decoding failure as a serialization error.
#[track_caller]
fn decode_error(source: reqwest::Error) -> StoreError {
    let loc = std::panic::Location::caller();
    StoreError::Serialization {
        message: source.to_string(),
        location: snafu::Location::new(loc.file(), loc.line(), loc.column()),
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// `profiles` row as PostgREST returns it; `name` may be NULL until patched.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: IdentityId,
    #[serde(default)]
    name: Option<String>,
    role: Role,
    #[serde(default = "default_active")]
    is_active: bool,
    created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// User object as GoTrue returns it.
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    user_metadata: Option<GoTrueMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl From<GoTrueUser> for Identity {
    fn from(user: GoTrueUser) -> Self {
        let metadata = user.user_metadata.unwrap_or_default();
        Self {
            id: IdentityId::new(user.id),
            email: user.email.unwrap_or_default(),
            email_confirmed_at: user.email_confirmed_at,
            created_at: user.created_at,
            metadata: IdentityMetadata {
                full_name: metadata.full_name.unwrap_or_default(),
                role: metadata.role.as_deref().map(Role::from_name).unwrap_or_default(),
            },
        }
    }
}

/// Page envelope from `GET /auth/v1/admin/users`.
#[derive(Debug, Deserialize)]
struct AdminUsersPage {
    users: Vec<GoTrueUser>,
}

/// Response from `POST /auth/v1/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: GoTrueUser,
}

#[async_trait]
impl DirectoryStore for RestStore {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        with_read_retry(&self.config.retry, "list_applications", || async {
            let response = self
                .authed(self.http.get(self.rest_url("applications")))
                .query(&[("select", "*"), ("order", "created_at.asc")])
                .send()
                .await?;
            Self::check(response)
                .await?
                .json::<Vec<Application>>()
                .await
                .map_err(decode_error)
        })
        .await
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Option<Application>> {
        with_read_retry(&self.config.retry, "get_application", || async {
            let response = self
                .authed(self.http.get(self.rest_url("applications")))
                .query(&[("select", "*")])
                .query(&[("id", format!("eq.{}", id.value()))])
                .send()
                .await?;
            let rows: Vec<Application> = Self::check(response)
                .await?
                .json()
                .await
                .map_err(decode_error)?;
            Ok(rows.into_iter().next())
        })
        .await
    }

    async fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<()> {
        let response = self
            .authed(self.http.patch(self.rest_url("applications")))
            .query(&[("id", format!("eq.{}", id.value()))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_application_email(&self, id: ApplicationId, email: &str) -> Result<()> {
        let response = self
            .authed(self.http.patch(self.rest_url("applications")))
            .query(&[("id", format!("eq.{}", id.value()))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        with_read_retry(&self.config.retry, "list_profiles", || async {
            let response = self
                .authed(self.http.get(self.rest_url("profiles")))
                .query(&[("select", "*")])
                .send()
                .await?;
            let rows: Vec<ProfileRow> = Self::check(response)
                .await?
                .json()
                .await
                .map_err(decode_error)?;
            Ok(rows.into_iter().map(Profile::from).collect())
        })
        .await
    }

    async fn get_profile(&self, id: IdentityId) -> Result<Option<Profile>> {
        with_read_retry(&self.config.retry, "get_profile", || async {
            let response = self
                .authed(self.http.get(self.rest_url("profiles")))
                .query(&[("select", "*")])
                .query(&[("id", format!("eq.{}", id.value()))])
                .send()
                .await?;
            let rows: Vec<ProfileRow> = Self::check(response)
                .await?
                .json()
                .await
                .map_err(decode_error)?;
            Ok(rows.into_iter().next().map(Profile::from))
        })
        .await
    }

    async fn update_profile_name(&self, id: IdentityId, name: &str) -> Result<()> {
        let response = self
            .authed(self.http.patch(self.rest_url("profiles")))
            .query(&[("id", format!("eq.{}", id.value()))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_profile_active(&self, id: IdentityId, active: bool) -> Result<()> {
        let response = self
            .authed(self.http.patch(self.rest_url("profiles")))
            .query(&[("id", format!("eq.{}", id.value()))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "is_active": active }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for RestStore {
    async fn create_identity(&self, request: NewIdentity) -> Result<Identity> {
        let response = self
            .authed(self.http.post(self.auth_url("signup")))
            .query(&[("redirect_to", &request.redirect_to)])
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": {
                    "full_name": request.metadata.full_name,
                    "role": request.metadata.role,
                },
            }))
            .send()
            .await?;
        let user: GoTrueUser = Self::check(response)
            .await?
            .json()
            .await
            .map_err(decode_error)?;
        Ok(user.into())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        with_read_retry(&self.config.retry, "list_identities", || async {
            let response = self
                .authed(self.http.get(self.auth_url("admin/users")))
                .query(&[("page", "1"), ("per_page", "1000")])
                .send()
                .await?;
            let page: AdminUsersPage = Self::check(response)
                .await?
                .json()
                .await
                .map_err(decode_error)?;
            Ok(page.users.into_iter().map(Identity::from).collect())
        })
        .await
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        // The admin listing has no reliable email filter across GoTrue
        // versions; list and match locally.
        let identities = self.list_identities().await?;
        Ok(identities.into_iter().find(|i| i.email.eq_ignore_ascii_case(email)))
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .authed(self.http.post(self.auth_url("recover")))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn resend_signup_confirmation(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .authed(self.http.post(self.auth_url("resend")))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn confirm_email(&self, email: &str) -> Result<()> {
        let identity = self
            .find_identity_by_email(email)
            .await?
            .ok_or_else(|| StoreError::NotFound { entity: format!("identity for {email}") })?;

        let response = self
            .authed(self.http.put(self.auth_url(&format!("admin/users/{}", identity.id.value()))))
            .json(&json!({ "email_confirm": true }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .authed(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(decode_error)?;
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user.into(),
        })
    }

    async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        // Validate the access token first; fall back to a refresh exchange
        // when it has expired, mirroring the client library's setSession.
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.config.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status().as_u16() != 401 {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, extract_message(&body)));
        }

        let response = self
            .authed(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
