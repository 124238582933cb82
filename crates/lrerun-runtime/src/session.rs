//! Authenticated session scope around the remote gateway.

use lrerun_gateway::{Credentials, GatewayError, RemoteJobGateway};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("login failed: {0}")]
    Login(#[source] GatewayError),
    #[error("login rejected for user '{username}'")]
    Rejected { username: String },
}

/// A logged-in session. Call [`Session::release`] on every exit path.
pub struct Session<'a, G: RemoteJobGateway> {
    gateway: &'a G,
    released: bool,
}

impl<'a, G: RemoteJobGateway> Session<'a, G> {
    pub async fn open(gateway: &'a G, credentials: &Credentials) -> Result<Self, SessionError> {
        tracing::info!(
            username = %credentials.username,
            token_auth = credentials.token_auth,
            "logging in"
        );
        let accepted = gateway
            .login(credentials)
            .await
            .map_err(SessionError::Login)?;
        if !accepted {
            return Err(SessionError::Rejected {
                username: credentials.username.clone(),
            });
        }
        tracing::info!(username = %credentials.username, "login successful");
        Ok(Self {
            gateway,
            released: false,
        })
    }

    /// Logout errors are logged, never raised.
    pub async fn release(mut self) {
        self.released = true;
        match self.gateway.logout().await {
            Ok(()) => tracing::info!("logged out"),
            Err(e) => tracing::warn!(error = %e, "logout failed"),
        }
    }
}

impl<G: RemoteJobGateway> Drop for Session<'_, G> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("session dropped without logout");
        }
    }
}
