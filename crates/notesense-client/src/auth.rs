//! Login, signup and logout against the auth routes.
//!
//! A successful login or signup binds the returned credential to the
//! [`Session`]; logout always clears it locally, even when the server call
//! fails.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::field::Empty;
use tracing::{info, instrument, warn};

use notesense_core::{Credentials, Error, Result, Session};

use crate::config::ClientConfig;
use crate::http::{build_client, check_status, decode, send_authorized};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

/// Client for `/login`, `/signup` and `/logout`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl AuthClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.auth_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sign in with email and password and bind the credential.
    #[instrument(skip(self, password), fields(op = "login", status = Empty))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(Error::InvalidInput("password cannot be empty".to_string()));
        }
        self.authenticate("/login", &LoginRequest { email, password }).await
    }

    /// Create an account and bind the credential it comes back with.
    #[instrument(skip(self, password), fields(op = "signup", status = Empty))]
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Credentials> {
        validate_email(email)?;
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("name cannot be empty".to_string()));
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password cannot be empty".to_string()));
        }
        self.authenticate(
            "/signup",
            &SignupRequest {
                email,
                password,
                name,
            },
        )
        .await
    }

    /// Revoke the token server-side and clear the session.
    ///
    /// The local credential is dropped whatever the server answers; a
    /// failing server call is still reported to the caller.
    #[instrument(skip(self), fields(op = "logout", request_id = Empty, status = Empty, duration_ms = Empty))]
    pub async fn logout(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            return Ok(());
        }
        let request = self.client.post(format!("{}/logout", self.base_url));
        let result = send_authorized(&self.session, request).await;
        self.session.clear()?;
        match result {
            Ok(_) => {
                info!("Logged out");
                Ok(())
            }
            // an expired token is as good as revoked
            Err(Error::Unauthorized(_)) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Server logout failed; local session cleared");
                Err(e)
            }
        }
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Result<Credentials> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());

        // a 401 here means bad email/password, not an expired session
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized("invalid email or password".to_string()));
        }
        let response = check_status(&self.session, response).await?;
        let credentials: Credentials = decode(response).await?;
        self.session.bind(credentials.clone())?;
        Ok(credentials)
    }
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidInput(format!("invalid email address: {email}")));
    }
    Ok(())
}
