use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use super::Gateway;
use crate::axum_integration::{extract_bearer_token, CurrentProfile};
use crate::error::{GatewayError, ResolutionError};

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            GatewayError::Unauthorized(message) => (status, message).into_response(),
            GatewayError::InvalidToken(_) => (status, "Invalid or missing token.").into_response(),
            GatewayError::Resolution(ResolutionError::Timeout) => {
                (status, "Identity provider timed out.").into_response()
            }
            GatewayError::Resolution(_) => (status, "Identity provider unavailable.").into_response(),
            other => {
                tracing::error!("Gateway internal error: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.").into_response()
            }
        }
    }
}

/// Middleware layer that requires the bearer of the request to hold a role
#[derive(Clone)]
pub struct RequireRole {
    gateway: Arc<Gateway>,
    required_role: Arc<str>,
}

impl RequireRole {
    pub fn new(gateway: Arc<Gateway>, required_role: impl Into<Arc<str>>) -> Self {
        Self {
            gateway,
            required_role: required_role.into(),
        }
    }
}

impl<S> Layer<S> for RequireRole {
    type Service = RequireRoleMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRoleMiddleware {
            inner,
            gateway: self.gateway.clone(),
            required_role: self.required_role.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequireRoleMiddleware<S> {
    inner: S,
    gateway: Arc<Gateway>,
    required_role: Arc<str>,
}

impl<S> Service<Request> for RequireRoleMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // Swap in a fresh clone so the instance driven by poll_ready is the one called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gateway = self.gateway.clone();
        let required_role = self.required_role.clone();

        Box::pin(async move {
            let token = extract_bearer_token(request.headers());

            match gateway.authorize(token.as_deref(), &required_role).await.into_result() {
                Ok(profile) => {
                    request.extensions_mut().insert(CurrentProfile(profile));
                    inner.call(request).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
