use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;
use tracing::info;

/// Identity of the signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

struct SignedIn {
    profile: UserProfile,
    access_token: String,
}

/// Holds the authenticated user for the lifetime of the application.
///
/// The access token is obtained elsewhere; the session only stores it and
/// hands it to the gateway.
#[derive(Default)]
pub struct Session {
    state: RwLock<Option<SignedIn>>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that is already signed in.
    pub fn signed_in(profile: UserProfile, access_token: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(Some(SignedIn {
                profile,
                access_token: access_token.into(),
            })),
        }
    }

    /// Replaces any current identity.
    pub async fn sign_in(&self, profile: UserProfile, access_token: impl Into<String>) {
        info!(email = %profile.email, "User signed in");
        *self.state.write().await = Some(SignedIn {
            profile,
            access_token: access_token.into(),
        });
    }

    pub async fn sign_out(&self) {
        if let Some(previous) = self.state.write().await.take() {
            info!(email = %previous.profile.email, "User signed out");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|signed_in| signed_in.profile.clone())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|signed_in| signed_in.access_token.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self
            .state
            .try_read()
            .ok()
            .and_then(|state| state.as_ref().map(|s| s.profile.email.clone()));
        f.debug_struct("Session")
            .field("user", &user)
            .field("access_token", &"[redacted]")
            .finish()
    }
}
