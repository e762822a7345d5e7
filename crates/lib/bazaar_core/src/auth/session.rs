//! Access and refresh token issuance and verification.
//!
//! Both token kinds are HMAC-signed JWTs with the same claim shape. Access
//! tokens are verified statelessly. A refresh token is only valid while it
//! is the exact string held in the user's single [`TokenStore`] slot, so
//! issuing a new one silently retires the previous one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::dto::TokenPair;
use crate::models::{RefreshTokenRecord, Role, SessionClaims, TokenClaims};
use crate::store::{StoreError, TokenStore};

/// Signing algorithms accepted on verification.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid token signature or signing method")]
    InvalidSignature,

    #[error("malformed token")]
    MalformedToken,

    #[error("token claims are missing or malformed")]
    MalformedClaims,

    #[error("token has expired")]
    Expired,

    #[error("refresh token not found")]
    RefreshTokenNotFound,

    #[error("refresh token does not match the current session")]
    RefreshTokenMismatch,

    #[error("refresh token has expired")]
    RefreshTokenExpired,

    #[error("refresh token has been revoked")]
    RefreshTokenRevoked,

    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("refresh token could not be stored: {0}")]
    TokenPersistence(StoreError),

    #[error("token store error: {0}")]
    Store(StoreError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Signing(_) | SessionError::TokenPersistence(_) => "TOKEN_GENERATION",
            SessionError::Store(_) => "REPOSITORY",
            _ => "INVALID_TOKEN",
        }
    }
}

fn classify(e: jsonwebtoken::errors::Error) -> SessionError {
    match e.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => SessionError::InvalidSignature,
        ErrorKind::ExpiredSignature => SessionError::Expired,
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => SessionError::MalformedClaims,
        _ => SessionError::MalformedToken,
    }
}

/// Issues and verifies session tokens.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    tokens: Arc<dyn TokenStore>,
}

impl SessionManager {
    pub fn new(
        secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
            tokens,
        }
    }

    fn sign(
        &self,
        user_id: Uuid,
        role: Role,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), SessionError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            user_type: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)?;
        Ok((token, expires_at))
    }

    /// Short-lived, never persisted.
    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<String, SessionError> {
        let (token, _) = self.sign(user_id, role, self.access_ttl)?;
        Ok(token)
    }

    /// Sign a refresh token and make it the user's only valid one.
    ///
    /// The token must be discarded when this returns
    /// [`SessionError::TokenPersistence`]; it was signed but never stored.
    pub async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<String, SessionError> {
        let (token, expires_at) = self.sign(user_id, role, self.refresh_ttl)?;
        let now = Utc::now();
        let record = RefreshTokenRecord {
            user_id,
            token: token.clone(),
            expires_at,
            revoked: false,
            created_at: now,
            updated_at: now,
        };
        self.tokens.upsert(&record).await.map_err(|e| {
            error!(%user_id, error = %e, "failed to persist refresh token");
            SessionError::TokenPersistence(e)
        })?;
        info!(%user_id, %role, "refresh token issued");
        Ok(token)
    }

    pub async fn issue_pair(&self, user_id: Uuid, role: Role) -> Result<TokenPair, SessionError> {
        let access_token = self.issue_access_token(user_id, role)?;
        let refresh_token = self.issue_refresh_token(user_id, role).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Signature, expiry, and claim checks only.
    pub fn verify_access_token(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let header = decode_header(token).map_err(|_| SessionError::MalformedToken)?;
        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(SessionError::InvalidSignature);
        }
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(classify)?
            .claims;
        let user_id =
            Uuid::parse_str(&claims.user_id).map_err(|_| SessionError::MalformedClaims)?;
        let role = claims
            .user_type
            .parse::<Role>()
            .map_err(|_| SessionError::MalformedClaims)?;
        Ok(SessionClaims {
            user_id,
            role,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Token checks plus the store: the token must be the user's current,
    /// unexpired, unrevoked record.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = self.verify_access_token(token)?;
        let record = self
            .tokens
            .find_by_user(claims.user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => SessionError::RefreshTokenNotFound,
                other => SessionError::Store(other),
            })?;

        if record.token != token {
            debug!(user_id = %claims.user_id, "refresh token superseded");
            return Err(SessionError::RefreshTokenMismatch);
        }
        if record.expires_at <= Utc::now() {
            return Err(SessionError::RefreshTokenExpired);
        }
        if record.revoked {
            return Err(SessionError::RefreshTokenRevoked);
        }
        Ok(claims)
    }

    /// Mark the user's refresh token revoked.
    pub async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<(), SessionError> {
        self.tokens.revoke(user_id).await.map_err(|e| match e {
            StoreError::NotFound => SessionError::RefreshTokenNotFound,
            other => SessionError::Store(other),
        })?;
        info!(%user_id, "refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use crate::store::IdentityRepository;
    use crate::store::memory::MemoryStore;

    const SECRET: &[u8] = b"test-secret";

    async fn setup() -> (Arc<MemoryStore>, SessionManager, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let user = Identity {
            id: Uuid::new_v4(),
            role: Role::Customer,
            username: "alice123".into(),
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            created_at: now,
            updated_at: now,
        };
        IdentityRepository::create(store.as_ref(), &user).await.unwrap();
        let sessions = SessionManager::new(
            SECRET,
            Duration::minutes(15),
            Duration::days(30),
            store.clone(),
        );
        (store, sessions, user.id)
    }

    fn raw_token(claims: &serde_json::Value, alg: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[tokio::test]
    async fn access_token_round_trips_identity() {
        let (_, sessions, user_id) = setup().await;
        let token = sessions.issue_access_token(user_id, Role::Customer).unwrap();
        let claims = sessions.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.expires_at - claims.issued_at, 15 * 60);
    }

    #[tokio::test]
    async fn tokens_issued_together_differ() {
        let (_, sessions, user_id) = setup().await;
        let a = sessions.issue_access_token(user_id, Role::Customer).unwrap();
        let b = sessions.issue_access_token(user_id, Role::Customer).unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_signature() {
        let (store, sessions, user_id) = setup().await;
        let other = SessionManager::new(b"other", Duration::minutes(15), Duration::days(30), store);
        let token = other.issue_access_token(user_id, Role::Customer).unwrap();
        assert!(matches!(
            sessions.verify_access_token(&token),
            Err(SessionError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn other_hmac_algorithms_are_accepted() {
        let (_, sessions, user_id) = setup().await;
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let token = raw_token(
            &serde_json::json!({
                "user_id": user_id.to_string(),
                "user_type": "customer",
                "iat": Utc::now().timestamp(),
                "exp": exp,
            }),
            Algorithm::HS512,
            SECRET,
        );
        assert_eq!(sessions.verify_access_token(&token).unwrap().user_id, user_id);
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let (_, sessions, user_id) = setup().await;
        let token = raw_token(
            &serde_json::json!({
                "user_id": user_id.to_string(),
                "user_type": "customer",
                "iat": Utc::now().timestamp() - 120,
                "exp": Utc::now().timestamp() - 60,
            }),
            Algorithm::HS256,
            SECRET,
        );
        assert!(matches!(
            sessions.verify_access_token(&token),
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn missing_claims_are_malformed() {
        let (_, sessions, _) = setup().await;
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let token = raw_token(&serde_json::json!({ "exp": exp }), Algorithm::HS256, SECRET);
        assert!(matches!(
            sessions.verify_access_token(&token),
            Err(SessionError::MalformedClaims)
        ));

        let token = raw_token(
            &serde_json::json!({
                "user_id": Uuid::new_v4().to_string(),
                "user_type": "admin",
                "iat": 0,
                "exp": exp,
            }),
            Algorithm::HS256,
            SECRET,
        );
        assert!(matches!(
            sessions.verify_access_token(&token),
            Err(SessionError::MalformedClaims)
        ));
    }

    #[tokio::test]
    async fn garbage_is_malformed_token() {
        let (_, sessions, _) = setup().await;
        assert!(matches!(
            sessions.verify_access_token("not.a.jwt"),
            Err(SessionError::MalformedToken)
        ));
    }

    #[tokio::test]
    async fn second_refresh_token_supersedes_first() {
        let (_, sessions, user_id) = setup().await;
        let first = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap();
        assert!(sessions.verify_refresh_token(&first).await.is_ok());

        let second = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap();
        assert!(matches!(
            sessions.verify_refresh_token(&first).await,
            Err(SessionError::RefreshTokenMismatch)
        ));
        assert!(sessions.verify_refresh_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_rejected() {
        let (_, sessions, user_id) = setup().await;
        let token = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap();
        sessions.revoke_refresh_token(user_id).await.unwrap();
        assert!(matches!(
            sessions.verify_refresh_token(&token).await,
            Err(SessionError::RefreshTokenRevoked)
        ));
    }

    #[tokio::test]
    async fn stored_expiry_is_enforced() {
        let (store, sessions, user_id) = setup().await;
        let token = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap();
        let mut record = store.find_by_user(user_id).await.unwrap();
        record.expires_at = Utc::now() - Duration::seconds(1);
        store.upsert(&record).await.unwrap();
        assert!(matches!(
            sessions.verify_refresh_token(&token).await,
            Err(SessionError::RefreshTokenExpired)
        ));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let (store, sessions, user_id) = setup().await;
        let token = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap();
        store.remove_token(user_id);
        assert!(matches!(
            sessions.verify_refresh_token(&token).await,
            Err(SessionError::RefreshTokenNotFound)
        ));
        assert!(matches!(
            sessions.revoke_refresh_token(user_id).await,
            Err(SessionError::RefreshTokenNotFound)
        ));
    }

    #[tokio::test]
    async fn failed_upsert_is_token_persistence() {
        let (store, sessions, user_id) = setup().await;
        store.fail_token_upserts(true);
        let err = sessions
            .issue_refresh_token(user_id, Role::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenPersistence(_)));
        assert_eq!(err.code(), "TOKEN_GENERATION");
    }
}
