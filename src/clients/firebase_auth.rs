use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clients::traits::AuthClient;
use crate::clients::types::{AuthUser, SignUpFields};
use crate::error::{Error, Result};

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    profile_picture: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

struct SignedIn {
    user: AuthUser,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// Email/password authentication against the Firebase Identity Toolkit REST API
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    state: Mutex<Option<SignedIn>>,
}

impl FirebaseAuth {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            state: Mutex::new(None),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await?;
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!(code = %code, "Auth request rejected");
            return Err(Error::Auth(auth_message(&code)));
        }
        Ok(response.json().await?)
    }

    fn remember(&self, response: SignInResponse) -> AuthUser {
        let user = AuthUser {
            id: response.local_id,
            display_name: response.display_name.filter(|n| !n.is_empty()),
            email: response.email,
            photo_url: response.profile_picture,
        };
        *self.state.lock() = Some(SignedIn {
            user: user.clone(),
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: expiry(&response.expires_in),
        });
        user
    }
}

fn expiry(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    // Refresh a minute early so a token never expires mid-request
    Utc::now() + ChronoDuration::seconds(seconds - 60)
}

/// Translate provider error codes into the messages shown on the auth screens
fn auth_message(code: &str) -> String {
    let code = code.split(' ').next().unwrap_or(code);
    match code {
        "EMAIL_EXISTS" => "Cet email est déjà utilisé par un autre compte".to_string(),
        "INVALID_EMAIL" => "L'adresse email n'est pas valide".to_string(),
        "OPERATION_NOT_ALLOWED" => {
            "La création de compte est temporairement désactivée".to_string()
        }
        "WEAK_PASSWORD" => "Le mot de passe doit contenir au moins 6 caractères".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Email ou mot de passe incorrect".to_string()
        }
        "USER_DISABLED" => {
            "Votre compte a été bloqué. Veuillez contacter l'administrateur.".to_string()
        }
        other => format!("Erreur de connexion ({})", other),
    }
}

#[async_trait]
impl AuthClient for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let response: SignInResponse = self
            .post(
                &format!("{}/accounts:signInWithPassword", IDENTITY_BASE),
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let user = self.remember(response);
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    async fn sign_up(&self, fields: &SignUpFields) -> Result<AuthUser> {
        let created: SignInResponse = self
            .post(
                &format!("{}/accounts:signUp", IDENTITY_BASE),
                json!({ "email": fields.email, "password": fields.password, "returnSecureToken": true }),
            )
            .await?;

        let id_token = created.id_token.clone();
        let mut user = self.remember(created);

        let profile: serde_json::Value = self
            .post(
                &format!("{}/accounts:update", IDENTITY_BASE),
                json!({ "idToken": id_token, "displayName": fields.display_name, "returnSecureToken": false }),
            )
            .await?;
        debug!(?profile, "Display name set");

        user.display_name = Some(fields.display_name.clone());
        if let Some(state) = self.state.lock().as_mut() {
            state.user.display_name = user.display_name.clone();
        }
        info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.state.lock().as_ref().map(|s| s.user.clone())
    }

    async fn get_token(&self) -> Result<Option<String>> {
        let refresh_token = {
            let state = self.state.lock();
            match state.as_ref() {
                None => return Ok(None),
                Some(s) if s.expires_at > Utc::now() => return Ok(Some(s.id_token.clone())),
                Some(s) => s.refresh_token.clone(),
            }
        };

        debug!("Refreshing id token");
        let response = self
            .client
            .post(TOKEN_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Auth("Session expirée, veuillez vous reconnecter".to_string()));
        }
        let refreshed: RefreshResponse = response.json().await?;

        let mut state = self.state.lock();
        let Some(signed_in) = state.as_mut() else {
            // Signed out while the refresh was in flight
            return Ok(None);
        };
        signed_in.id_token = refreshed.id_token.clone();
        signed_in.refresh_token = refreshed.refresh_token;
        signed_in.expires_at = expiry(&refreshed.expires_in);
        Ok(Some(refreshed.id_token))
    }

    async fn sign_out(&self) -> Result<()> {
        *self.state.lock() = None;
        Ok(())
    }
}
