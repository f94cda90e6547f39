//! Bearer-token authentication for Axum

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::common::ApiResponse;
use crate::application::Actor;
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims, UserRole};

#[derive(Debug, Clone, Copy)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    InsufficientPermissions,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing authentication token",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or expired authentication token",
            ),
            Self::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", "Insufficient permissions")
            }
        };
        (status, Json(ApiResponse::<()>::error(message).with_code(code))).into_response()
    }
}

/// State for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Caller identity placed in request extensions by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    fn from_claims(claims: TokenClaims) -> Option<Self> {
        Some(Self {
            user_id: claims.user_id()?,
            username: claims.username,
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn actor(&self) -> Actor {
        if self.is_admin() {
            Actor::admin(self.user_id)
        } else {
            Actor::user(self.user_id)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    value.strip_prefix("Bearer ").ok_or(AuthError::InvalidToken)
}

/// Require a valid bearer token
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    // Expiry and issuer are checked by the decoder
    let user = verify_token(token, &auth_state.jwt_config)
        .ok()
        .and_then(AuthenticatedUser::from_claims);
    let Some(user) = user else {
        return AuthError::InvalidToken.into_response();
    };

    tracing::debug!(user_id = user.user_id, username = %user.username, "Authenticated request");
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Admin-only gate; must run after [`auth_middleware`]
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) if user.is_admin() => next.run(request).await,
        Some(_) => AuthError::InsufficientPermissions.into_response(),
        None => AuthError::MissingToken.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::crypto::jwt::create_token;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    async fn whoami(user: AuthenticatedUser) -> String {
        format!("{}:{}", user.user_id, user.is_admin())
    }

    fn app(config: &JwtConfig) -> Router {
        let state = AuthState {
            jwt_config: config.clone(),
        };
        let admin = Router::new()
            .route("/admin", get(whoami))
            .layer(middleware::from_fn(admin_middleware));
        Router::new()
            .route("/me", get(whoami))
            .merge(admin)
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    async fn call(app: Router, uri: &str, auth: Option<String>) -> StatusCode {
        let mut req = Request::builder().uri(uri);
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        app.oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn valid_token_passes() {
        let config = JwtConfig::default();
        let token = create_token(7, "ana", UserRole::User, &config).unwrap();
        let status = call(app(&config), "/me", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_foreign_token_is_401() {
        let config = JwtConfig::default();
        assert_eq!(call(app(&config), "/me", None).await, StatusCode::UNAUTHORIZED);

        let other = JwtConfig {
            secret: "another-secret".into(),
            ..JwtConfig::default()
        };
        let token = create_token(7, "ana", UserRole::User, &other).unwrap();
        let status = call(app(&config), "/me", Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let status = call(app(&config), "/me", Some("Basic abc".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_route_requires_admin_role() {
        let config = JwtConfig::default();
        let user = create_token(7, "ana", UserRole::User, &config).unwrap();
        let admin = create_token(1, "root", UserRole::Admin, &config).unwrap();

        let status = call(app(&config), "/admin", Some(format!("Bearer {}", user))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let status = call(app(&config), "/admin", Some(format!("Bearer {}", admin))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
