//! Identity provider speaking the hosted auth REST API (`/auth/v1/...`).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use quiz_core::model::{AuthProvider, AuthenticatedUser, UserId, display_name_for};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{IdentityProvider, OtpKind, Session, UserAttributes};
use crate::config::IdentityConfig;
use crate::error::IdentityError;

pub struct RestIdentityProvider {
    client: Client,
    config: IdentityConfig,
    session: Mutex<Option<Session>>,
}

impl RestIdentityProvider {
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.api_key)
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(IdentityError::NotSignedIn)
    }

    async fn store(&self, session: Session) -> Session {
        *self.session.lock().await = Some(session.clone());
        session
    }
}

/// Map a non-success response onto `IdentityError`, keeping the service message.
async fn check(response: Response) -> Result<Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .msg
        .or(body.error_description)
        .or(body.message)
        .unwrap_or_else(|| status.to_string());
    let lowered = message.to_lowercase();
    if lowered.contains("invalid login credentials") {
        return Err(IdentityError::InvalidCredentials);
    }
    if lowered.contains("already registered") || lowered.contains("already exists") {
        return Err(IdentityError::UserAlreadyExists);
    }
    if lowered.contains("expired") || lowered.contains("invalid token") {
        return Err(IdentityError::InvalidOtp);
    }
    if lowered.contains("signups not allowed") || lowered.contains("user not found") {
        return Err(IdentityError::UserNotFound);
    }
    Err(IdentityError::HttpStatus { status, message })
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let payload = SignUpRequest {
            email,
            password,
            data: Metadata {
                name,
                has_password: Some(true),
            },
        };
        let response = self
            .request(self.client.post(self.endpoint("signup")))
            .json(&payload)
            .send()
            .await?;
        let body: SessionBody = check(response).await?.json().await?;
        let session = body.into_session()?;
        Ok(self.store(session).await)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let response = self
            .request(self.client.post(self.endpoint("token?grant_type=password")))
            .json(&PasswordRequest { email, password })
            .send()
            .await?;
        let body: SessionBody = check(response).await?.json().await?;
        let session = body.into_session()?;
        Ok(self.store(session).await)
    }

    async fn sign_in_with_otp(
        &self,
        email: &str,
        name: Option<&str>,
        create_user: bool,
    ) -> Result<(), IdentityError> {
        let payload = OtpRequest {
            email,
            create_user,
            data: Metadata {
                name,
                has_password: None,
            },
        };
        let response = self
            .request(self.client.post(self.endpoint("otp")))
            .json(&payload)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn verify_otp(
        &self,
        email: &str,
        token: &str,
        kind: OtpKind,
    ) -> Result<Session, IdentityError> {
        let payload = VerifyRequest {
            kind: kind.as_str(),
            email,
            token: token.trim(),
        };
        let response = self
            .request(self.client.post(self.endpoint("verify")))
            .json(&payload)
            .send()
            .await?;
        let body: SessionBody = check(response).await?.json().await?;
        let session = body.into_session()?;
        Ok(self.store(session).await)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), IdentityError> {
        let mut url = reqwest::Url::parse(&self.endpoint("recover"))
            .map_err(|e| IdentityError::InvalidUrl(e.to_string()))?;
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }
        let response = self
            .request(self.client.post(url))
            .json(&RecoverRequest { email })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let current = self.session.lock().await.clone();
        Ok(current.filter(|s| s.expires_at.is_none_or(|at| at > Utc::now())))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Ok(token) = self.access_token().await else {
            return Ok(());
        };
        let response = self
            .request(self.client.post(self.endpoint("logout")))
            .bearer_auth(token)
            .send()
            .await?;
        *self.session.lock().await = None;
        check(response).await?;
        Ok(())
    }

    async fn update_user(
        &self,
        attrs: &UserAttributes,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let token = self.access_token().await?;
        let payload = UpdateRequest {
            password: attrs.password.as_deref(),
            data: Metadata {
                name: attrs.name.as_deref(),
                has_password: attrs.password.as_ref().map(|_| true),
            },
        };
        let response = self
            .request(self.client.put(self.endpoint("user")))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        let body: UserBody = check(response).await?.json().await?;
        let user = body.into_user()?;
        if let Some(current) = self.session.lock().await.as_mut() {
            current.user = user.clone();
        }
        Ok(user)
    }

    fn oauth_url(
        &self,
        provider: AuthProvider,
        redirect_to: &str,
    ) -> Result<String, IdentityError> {
        let mut url = reqwest::Url::parse(&self.endpoint("authorize"))
            .map_err(|e| IdentityError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.into())
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_password: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: Metadata<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
    data: Metadata<'a>,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    email: &'a str,
    token: &'a str,
}

#[derive(Debug, Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    data: Metadata<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<UserBody>,
}

impl SessionBody {
    fn into_session(self) -> Result<Session, IdentityError> {
        let access_token = self
            .access_token
            .ok_or(IdentityError::ConfirmationRequired)?;
        let user = self
            .user
            .ok_or_else(|| IdentityError::UnexpectedResponse("session without user".into()))?
            .into_user()?;
        Ok(Session {
            access_token,
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            user,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    name: Option<String>,
    full_name: Option<String>,
    has_password: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityBody {
    provider: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
    #[serde(default)]
    app_metadata: AppMetadata,
    #[serde(default)]
    identities: Vec<IdentityBody>,
}

impl UserBody {
    fn into_user(self) -> Result<AuthenticatedUser, IdentityError> {
        let id: UserId = self
            .id
            .parse()
            .map_err(|e| IdentityError::UnexpectedResponse(format!("user id: {e}")))?;
        let email = self.email.unwrap_or_default();
        let provider = self
            .app_metadata
            .provider
            .as_deref()
            .and_then(AuthProvider::parse)
            .unwrap_or(AuthProvider::Email);
        let name_hint = self
            .user_metadata
            .name
            .as_deref()
            .or(self.user_metadata.full_name.as_deref());
        let name = display_name_for(name_hint, &email);
        // only set once a password has actually been stored
        let has_password = self.user_metadata.has_password.unwrap_or(false);
        let google_linked = provider == AuthProvider::Google
            || self
                .identities
                .iter()
                .filter_map(|identity| AuthProvider::parse(&identity.provider))
                .any(|linked| linked == AuthProvider::Google);
        Ok(AuthenticatedUser {
            id,
            email,
            name,
            provider,
            has_password,
            google_linked,
        })
    }
}
