//! Identity resolution for flushes

use std::fmt;
use std::future::Future;

use super::{AuthSession, SessionPersistence, SupabaseAuthClient};

/// The authenticated identity a flush runs as
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id, stamped into records as their owner
    pub user_id: String,
    /// Bearer token for the remote store, when the identity has one
    pub access_token: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl From<AuthSession> for Identity {
    fn from(session: AuthSession) -> Self {
        Self {
            user_id: session.user.id,
            access_token: Some(session.access_token),
        }
    }
}

/// Resolves who is currently signed in.
///
/// `None` means "nobody yet" and is an expected state, not a failure.
pub trait IdentityProvider: Send + Sync {
    fn resolve_identity(&self) -> impl Future<Output = Option<Identity>> + Send;
}

/// Fixed identity, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub const fn new(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    async fn resolve_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Identity backed by a persisted Supabase session
#[derive(Clone)]
pub struct SessionIdentityProvider<S: SessionPersistence> {
    client: SupabaseAuthClient<S>,
}

impl<S: SessionPersistence> SessionIdentityProvider<S> {
    pub const fn new(client: SupabaseAuthClient<S>) -> Self {
        Self { client }
    }
}

impl<S: SessionPersistence> IdentityProvider for SessionIdentityProvider<S> {
    async fn resolve_identity(&self) -> Option<Identity> {
        match self.client.restore_session().await {
            Ok(session) => session.map(Identity::from),
            Err(error) => {
                tracing::warn!("Could not restore auth session: {}", error);
                None
            }
        }
    }
}
