//! Explicit session object handed to the wizard and the query pipeline

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{AuthClient, AuthUser, SignUpFields};
use crate::error::{Error, Result};

/// Created at app start (or sign-in), torn down at sign-out
#[derive(Clone)]
pub struct Session {
    auth: Arc<dyn AuthClient>,
    user: Option<AuthUser>,
}

impl Session {
    /// Resume whatever the auth provider currently knows; may be anonymous
    pub async fn restore(auth: Arc<dyn AuthClient>) -> Self {
        let user = auth.current_user().await;
        Self { auth, user }
    }

    pub async fn sign_in(auth: Arc<dyn AuthClient>, email: &str, password: &str) -> Result<Self> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Auth("Veuillez remplir tous les champs".to_string()));
        }
        let user = auth.sign_in(email.trim(), password).await?;
        Ok(Self {
            auth,
            user: Some(user),
        })
    }

    pub async fn sign_up(auth: Arc<dyn AuthClient>, fields: &SignUpFields) -> Result<Self> {
        let user = auth.sign_up(fields).await?;
        Ok(Self {
            auth,
            user: Some(user),
        })
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&AuthUser> {
        self.user.as_ref().ok_or(Error::Unauthenticated)
    }

    /// Bearer token for API calls; a token failure degrades to an anonymous request
    pub async fn token(&self) -> Option<String> {
        self.user.as_ref()?;
        match self.auth.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not obtain bearer token: {}", e);
                None
            }
        }
    }

    pub async fn sign_out(self) -> Result<()> {
        if let Some(user) = &self.user {
            info!(user_id = %user.id, "Signing out");
        }
        self.auth.sign_out().await
    }
}
