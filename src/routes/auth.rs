//! Session token verification and role-aware extractors.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use super::AppState;
use crate::core::Viewer;
use crate::error::ApiError;
use crate::services::Credential;

/// Claims carried by the hosted auth service's session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
}

/// Verifies HS256 session tokens against the shared secret
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        decode::<SessionClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                ApiError::Unauthorized
            })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Signed-in caller with their granted roles
///
/// The raw token is kept so backend calls run under the caller's identity.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub viewer: Viewer,
    pub email: Option<String>,
    token: String,
}

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.viewer.user_id
    }

    pub fn credential(&self) -> Credential<'_> {
        Credential::User(&self.token)
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Forbidden("Application state missing".to_string()))?;
            let token = token.ok_or(ApiError::Unauthorized)?;

            let claims = state.tokens.verify(&token)?;
            let roles = state.roles_for(claims.sub, &token).await?;

            Ok(AuthUser {
                viewer: Viewer::new(claims.sub, roles),
                email: claims.email,
                token,
            })
        })
    }
}

/// Requires the `admin` role, 403 otherwise
pub struct RequireAdmin(pub AuthUser);

impl FromRequest for RequireAdmin {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = AuthUser::from_request(req, payload);

        Box::pin(async move {
            let user = user.await?;
            if !user.viewer.is_admin() {
                return Err(ApiError::Forbidden("Admin role required".to_string()));
            }
            Ok(RequireAdmin(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: Some("a@b.test".to_string()),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            aud: Some(aud.to_string()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_verify_accepts_valid_token() {
        let verifier = TokenVerifier::new("secret", "authenticated");
        let claims = verifier.verify(&token("secret", "authenticated", 600)).unwrap();
        assert_eq!(claims.email.as_deref(), Some("a@b.test"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret_audience_and_expiry() {
        let verifier = TokenVerifier::new("secret", "authenticated");
        assert!(verifier.verify(&token("other", "authenticated", 600)).is_err());
        assert!(verifier.verify(&token("secret", "anon", 600)).is_err());
        assert!(verifier.verify(&token("secret", "authenticated", -600)).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
