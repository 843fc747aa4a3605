// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::Role};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued-at as Unix timestamp.
    pub iat: u64,
    /// Expiration time as Unix timestamp.
    pub exp: u64,
}

/// Identity resolved from a verified token.
///
/// Inserted into the request extensions by [`auth_middleware`] and extracted by
/// handlers directly, so downstream code never re-verifies the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Signs and verifies session tokens with a single secret.
///
/// The secret is fixed at construction. Tokens are stateless, so there is no
/// way to revoke one before it expires.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_seconds: u64,
}

impl TokenCodec {
    pub fn new(secret: &str, expiration_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiration_seconds,
        }
    }

    pub fn expiration_seconds(&self) -> u64 {
        self.expiration_seconds
    }

    /// Signs a new token for the user, valid for the configured lifetime.
    pub fn issue(&self, id: i64, email: &str, role: Role) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .as_secs();

        self.issue_at(id, email, role, now)
    }

    fn issue_at(&self, id: i64, email: &str, role: Role, now: u64) -> Result<String, AppError> {
        let claims = Claims {
            sub: id.to_string(),
            email: email.to_owned(),
            role,
            iat: now,
            exp: now.checked_add(self.expiration_seconds).ok_or_else(|| {
                AppError::InternalServerError("Token expiry overflows".to_string())
            })?,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Verifies and decodes a token string.
    ///
    /// Bad signature, malformed structure, a non-numeric subject and an elapsed
    /// expiry all fail the same way.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                AppError::AuthError("Invalid token".to_string())
            })?;

        let claims = token_data.claims;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        Ok(AuthUser {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Resolves the `Authorization: Bearer <token>` header to an identity.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<AuthUser, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Missing authorization token".to_string()))?;

    let auth_header = auth_header
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid authorization format".to_string()))?;

    let token = match auth_header.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] if !token.is_empty() => *token,
        _ => return Err(AppError::AuthError("Invalid authorization format".to_string())),
    };

    codec.verify(token)
}

/// Fails with `Forbidden` unless the identity holds the admin role.
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied. Administrator privileges required".to_string(),
        ));
    }
    Ok(())
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `AuthUser` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(codec): State<TokenCodec>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match authenticate(req.headers(), &codec) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", req.uri().path(), e);
            Err(e)
        }
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks that the injected `AuthUser` has
/// the admin role. If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::AuthError("Missing authorization token".to_string()))?;

    require_admin(user)?;

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::AuthError("Missing authorization token".to_string()))
    }
}
