use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Sign-in method that produced an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
}

impl AuthProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
        }
    }

    /// Parse a provider name as reported by the identity service.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

/// Display name of a guest who did not pick one.
pub const GUEST_NAME: &str = "Guest";

/// Someone playing without an account. Nothing about them is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestUser {
    pub id: String,
    pub name: String,
}

/// A user resolved from an identity-provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub provider: AuthProvider,
    pub has_password: bool,
    /// A Google identity is attached, either as the sign-up method or linked later.
    pub google_linked: bool,
}

/// The current user of the client, resolved once at the identity boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum User {
    Guest(GuestUser),
    Authenticated(AuthenticatedUser),
}

impl User {
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            User::Guest(guest) => &guest.name,
            User::Authenticated(user) => &user.name,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> Option<UserId> {
        match self {
            User::Guest(_) => None,
            User::Authenticated(user) => Some(user.id),
        }
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        matches!(self, User::Guest(_))
    }

    /// Human-readable account kind shown on the profile page.
    #[must_use]
    pub fn account_type(&self) -> &'static str {
        match self {
            User::Guest(_) => "Guest",
            User::Authenticated(AuthenticatedUser {
                provider: AuthProvider::Google,
                ..
            }) => "Google",
            User::Authenticated(_) => "Email",
        }
    }

    #[must_use]
    pub fn has_google_linked(&self) -> bool {
        match self {
            User::Authenticated(user) => {
                user.google_linked || user.provider == AuthProvider::Google
            }
            User::Guest(_) => false,
        }
    }

    /// OAuth accounts must set a password before they can use password sign-in.
    #[must_use]
    pub fn needs_password(&self) -> bool {
        match self {
            User::Authenticated(user) => user.provider == AuthProvider::Google && !user.has_password,
            User::Guest(_) => false,
        }
    }
}

/// Fallback display name: explicit name, else the local part of the email, else "Player".
#[must_use]
pub fn display_name_for(name: Option<&str>, email: &str) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            email
                .split('@')
                .next()
                .map(str::trim)
                .filter(|local| !local.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "Player".to_owned())
}
