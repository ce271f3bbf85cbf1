use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use porton::Porton;
use porton_core::repositories::RepositoryProvider;

use crate::error::ApiError;

/// Shared state for the routes and middleware.
pub struct AuthState<R: RepositoryProvider> {
    pub porton: Arc<Porton<R>>,
}

impl<R: RepositoryProvider> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            porton: self.porton.clone(),
        }
    }
}

/// Require a valid bearer access token and attach the resolved [`Identity`]
/// to the request. Any validation failure is a 401; the specific reason is
/// logged, never sent to the client.
///
/// [`Identity`]: porton_core::Identity
pub async fn require_auth<R>(
    State(state): State<AuthState<R>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    R: RepositoryProvider,
{
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;

    let identity = state.porton.authenticate(token).await.map_err(|err| {
        tracing::debug!(error = %err, "access token rejected");
        ApiError::from(err)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}
