use crate::core::{AppError, AppState};
use crate::repositories::Read;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// JWT token payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub username: String,
}

/// External identity collaborator: turns an opaque token into an identity.
///
/// Credential issuance lives elsewhere; the chat core only ever asks
/// "who is this token?" and treats any failure as `AuthError`.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<i32, AppError>;
}

/// HS256 JWT verifier sharing its secret with the issuer
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<i32, AppError> {
        decode_jwt(token, &self.secret)
            .map(|data| data.claims.id)
            .map_err(|_| AppError::unauthorized("Unable to decode token"))
    }
}

/// Issues a token valid for 24 hours. Only tooling and tests mint tokens here.
#[instrument(skip(secret), fields(username = %username, id = %id))]
pub fn encode_jwt(username: &str, id: i32, secret: &str) -> Result<String, AppError> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire = Duration::hours(24);
    let claim = Claims {
        iat: now.timestamp() as usize,
        exp: (now + expire).timestamp() as usize,
        username: username.to_string(),
        id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        AppError::internal_server_error("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(
    jwt_token: &str,
    secret: &str,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    debug!("Decoding JWT token");
    decode(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .inspect_err(|e| warn!("Failed to decode JWT token: {:?}", e))
}

/// Pulls the token out of `Authorization: Bearer <token>` or, for WebSocket
/// upgrades coming from browsers, out of the `token` query parameter
fn extract_token(req: &Request) -> Result<String, AppError> {
    if let Some(header) = req.headers().get(http::header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid authorization header")
        })?;
        let mut parts = header.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
                Ok(token.to_string())
            }
            _ => {
                warn!("Malformed bearer token");
                Err(AppError::unauthorized("Expected a bearer token"))
            }
        };
    }

    req.uri()
        .query()
        .and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("token="))
                .filter(|token| !token.is_empty())
        })
        .map(str::to_string)
        .ok_or_else(|| {
            warn!("Missing authorization header");
            AppError::unauthorized("Please add the JWT token to the header")
        })
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = extract_token(&req)?;
    let user_id = state.verifier.verify(&token)?;

    // the identity must still exist on our side
    let current_user = match state.user.read(&user_id).await? {
        Some(user) => {
            info!("User authenticated: {}", user.username);
            user
        }
        None => {
            warn!("User not found in database: {}", user_id);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn test_round_trip_through_verifier() {
        let token = encode_jwt("alice", 7, "secret").unwrap();
        let verifier = JwtVerifier::new("secret");
        assert_eq!(verifier.verify(&token).unwrap(), 7);
    }

    #[test]
    fn test_wrong_secret_is_auth_error() {
        let token = encode_jwt("alice", 7, "secret").unwrap();
        let verifier = JwtVerifier::new("another secret");
        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthError);
    }

    #[test]
    fn test_token_from_query_string() {
        let req = http::Request::builder()
            .uri("/ws?foo=1&token=abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).unwrap(), "abc.def.ghi");

        let req = http::Request::builder().uri("/ws").body(Body::empty()).unwrap();
        assert_eq!(extract_token(&req).unwrap_err().kind(), ErrorKind::AuthError);
    }
}
