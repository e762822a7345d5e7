//! Account lifecycle: register, login, credential and profile changes,
//! deletion.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{AuthError, PasswordHasher, SessionError, SessionManager};
use crate::dto::{
    LoginRequest, ProfileResponse, ProfileUpdate, RegisterRequest, TokenPair,
    UpdateCredentialsRequest, describe,
};
use crate::models::{Identity, Role};
use crate::store::{IdentityRepository, StoreError};

fn validate<T: Validate>(req: &T) -> Result<(), AuthError> {
    req.validate().map_err(|e| {
        let reason = describe(&e);
        warn!(%reason, "request rejected");
        AuthError::Validation(reason)
    })
}

fn parse_role(raw: &str) -> Result<Role, AuthError> {
    raw.parse::<Role>()
        .map_err(|e| AuthError::UnsupportedRole(e.0))
}

/// A uniqueness probe hit. "Not found" from the store is a miss.
fn taken(probe: Result<Option<Identity>, StoreError>) -> Result<bool, AuthError> {
    match probe {
        Ok(found) => Ok(found.is_some()),
        Err(StoreError::NotFound) => Ok(false),
        Err(e) => Err(AuthError::UniquenessCheckFailed(e)),
    }
}

/// Orchestrates identities, passwords, and sessions.
pub struct AuthService {
    identities: Arc<dyn IdentityRepository>,
    sessions: Arc<SessionManager>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        sessions: Arc<SessionManager>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            identities,
            sessions,
            hasher,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create an identity with an empty profile and open its first session.
    pub async fn register(&self, req: RegisterRequest) -> Result<TokenPair, AuthError> {
        validate(&req)?;
        let role = parse_role(&req.user_type)?;

        let email_taken = taken(self.identities.find_by_email(role, &req.email).await)?;
        let username_taken = taken(self.identities.find_by_username(role, &req.username).await)?;
        if email_taken || username_taken {
            warn!(%role, email_taken, username_taken, "registration rejected: duplicate identity");
            return Err(AuthError::DuplicateIdentity);
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            role,
            username: req.username,
            email: req.email,
            password_hash: self.hasher.hash(&req.password)?,
            created_at: now,
            updated_at: now,
        };
        self.identities.create(&identity).await?;

        let tokens = self.sessions.issue_pair(identity.id, role).await?;
        info!(user_id = %identity.id, %role, "user registered");
        Ok(tokens)
    }

    /// Exchange credentials for a new token pair, replacing any prior
    /// session of the user.
    pub async fn login(&self, mut req: LoginRequest) -> Result<TokenPair, AuthError> {
        req.username = req.username.filter(|s| !s.is_empty());
        req.email = req.email.filter(|s| !s.is_empty());
        match (&req.username, &req.email) {
            (Some(_), Some(_)) => return Err(AuthError::AmbiguousIdentifier),
            (None, None) => return Err(AuthError::MissingIdentifier),
            _ => {}
        }
        validate(&req)?;
        let role = parse_role(&req.user_type)?;

        let found = match (&req.username, &req.email) {
            (Some(username), _) => self.identities.find_by_username(role, username).await?,
            (None, Some(email)) => self.identities.find_by_email(role, email).await?,
            (None, None) => None,
        };
        let Some(identity) = found else {
            debug!(%role, "login failed: unknown identity");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.verify(&req.password, &identity.password_hash)? {
            debug!(user_id = %identity.id, "login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.sessions.issue_pair(identity.id, role).await?;
        info!(user_id = %identity.id, %role, "user logged in");
        Ok(tokens)
    }

    /// Apply a partial credential change for `user_id`, then end its
    /// session.
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        req: UpdateCredentialsRequest,
    ) -> Result<(), AuthError> {
        validate(&req)?;
        let claims = self.sessions.verify_refresh_token(&req.refresh_token).await?;
        if claims.user_id != user_id {
            warn!(%user_id, token_user = %claims.user_id, "refresh token belongs to another user");
            return Err(AuthError::InvalidToken(SessionError::RefreshTokenMismatch));
        }

        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        let password_hash = match (&req.new_password, &req.old_password) {
            (Some(new_password), Some(old_password)) => {
                if !self.hasher.verify(old_password, &identity.password_hash)? {
                    warn!(%user_id, "credential update rejected: old password mismatch");
                    return Err(AuthError::InvalidCredentials);
                }
                self.hasher.hash(new_password)?
            }
            (Some(_), None) => {
                return Err(AuthError::Validation(
                    "old_password is required to set new_password".into(),
                ));
            }
            (None, _) => identity.password_hash,
        };
        let username = req.username.unwrap_or(identity.username);
        let email = req.email.unwrap_or(identity.email);

        self.identities
            .update_credentials(user_id, &username, &email, &password_hash)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::IdentityNotFound,
                other => AuthError::from(other),
            })?;
        info!(%user_id, "credentials updated");

        if let Err(e) = self.sessions.revoke_refresh_token(user_id).await {
            warn!(%user_id, error = %e, "failed to revoke refresh token after credential update");
        }
        Ok(())
    }

    /// Replace the caller's role profile.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        role: Role,
        update: ProfileUpdate,
    ) -> Result<(), AuthError> {
        if update.role() != role {
            warn!(%user_id, %role, payload = %update.role(), "profile payload type mismatch");
            return Err(AuthError::PayloadTypeMismatch(role));
        }
        update.validate().map_err(|e| {
            let reason = describe(&e);
            warn!(%reason, "request rejected");
            AuthError::Validation(reason)
        })?;

        self.identities
            .update_profile(user_id, &update.into_profile(), Utc::now())
            .await?;
        info!(%user_id, %role, "profile updated");
        Ok(())
    }

    /// The caller's identity joined with its role profile.
    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileResponse, AuthError> {
        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;
        let profile = self
            .identities
            .find_profile(user_id, identity.role)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;
        Ok(ProfileResponse::new(&identity, profile))
    }

    /// Revoke the session if one exists, then delete the identity.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        match self.sessions.revoke_refresh_token(user_id).await {
            Ok(()) => {}
            Err(SessionError::RefreshTokenNotFound) => {
                debug!(%user_id, "no refresh token to revoke");
            }
            Err(e) => return Err(e.into()),
        }

        self.identities
            .delete(user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::IdentityNotFound,
                other => AuthError::Repository(other),
            })?;
        info!(%user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::dto::{CustomerProfileUpdate, SellerProfileUpdate};
    use crate::store::memory::MemoryStore;

    struct Harness {
        store: Arc<MemoryStore>,
        auth: AuthService,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionManager::new(
            b"test-secret",
            Duration::minutes(15),
            Duration::days(30),
            store.clone(),
        ));
        let auth = AuthService::new(store.clone(), sessions, PasswordHasher::new(4));
        Harness { store, auth }
    }

    fn register_req(username: &str, email: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "longenough".into(),
            user_type: role.into(),
        }
    }

    fn login_req(username: Option<&str>, email: Option<&str>, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.map(Into::into),
            email: email.map(Into::into),
            password: password.into(),
            user_type: "customer".into(),
        }
    }

    fn user_of(h: &Harness, token: &str) -> Uuid {
        h.auth.sessions().verify_access_token(token).unwrap().user_id
    }

    #[tokio::test]
    async fn login_after_register_yields_new_pair() {
        let h = harness();
        let registered = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let logged_in = h
            .auth
            .login(login_req(Some("alice123"), None, "longenough"))
            .await
            .unwrap();

        assert_ne!(registered.access_token, logged_in.access_token);
        assert_ne!(registered.refresh_token, logged_in.refresh_token);
        assert_eq!(
            user_of(&h, &registered.access_token),
            user_of(&h, &logged_in.access_token)
        );

        let by_email = h
            .auth
            .login(login_req(None, Some("a@x.com"), "longenough"))
            .await;
        assert!(by_email.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_within_role_is_rejected() {
        let h = harness();
        h.auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let err = h
            .auth
            .register(register_req("alice456", "a@x.com", "customer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn same_username_across_roles_is_allowed() {
        let h = harness();
        h.auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        h.auth
            .register(register_req("alice123", "a@x.com", " Seller "))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let h = harness();
        let err = h
            .auth
            .register(register_req("alice123", "a@x.com", "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedRole(_)));
    }

    #[tokio::test]
    async fn failing_uniqueness_probe_is_reported() {
        let h = harness();
        h.store.fail_identity_lookups(true);
        let err = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UniquenessCheckFailed(_)));
    }

    #[tokio::test]
    async fn failed_token_persistence_fails_registration() {
        let h = harness();
        h.store.fail_token_upserts(true);
        let err = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenGeneration(_)));
    }

    #[tokio::test]
    async fn both_identifiers_are_ambiguous_without_lookup() {
        let h = harness();
        h.store.fail_identity_lookups(true);
        let err = h
            .auth
            .login(login_req(Some("alice123"), Some("a@x.com"), "longenough"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AmbiguousIdentifier));
    }

    #[tokio::test]
    async fn no_identifier_is_missing() {
        let h = harness();
        let err = h
            .auth
            .login(login_req(Some(""), None, "longenough"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentifier));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let h = harness();
        h.auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let wrong_password = h
            .auth
            .login(login_req(Some("alice123"), None, "wrongpassword"))
            .await
            .unwrap_err();
        let unknown = h
            .auth
            .login(login_req(Some("nobody"), None, "longenough"))
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn second_login_invalidates_first_refresh_token() {
        let h = harness();
        let first = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        h.auth
            .login(login_req(Some("alice123"), None, "longenough"))
            .await
            .unwrap();
        assert!(matches!(
            h.auth.sessions().verify_refresh_token(&first.refresh_token).await,
            Err(SessionError::RefreshTokenMismatch)
        ));
    }

    fn credentials(refresh_token: &str) -> UpdateCredentialsRequest {
        UpdateCredentialsRequest {
            refresh_token: refresh_token.into(),
            email: None,
            username: None,
            old_password: None,
            new_password: None,
        }
    }

    #[tokio::test]
    async fn new_password_requires_old_password() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);
        let req = UpdateCredentialsRequest {
            new_password: Some("brandnewpass".into()),
            ..credentials(&pair.refresh_token)
        };
        let err = h.auth.update_credentials(user_id, req).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_old_password_leaves_hash_unchanged() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);
        let before = h.store.password_hash(user_id).unwrap();

        let req = UpdateCredentialsRequest {
            old_password: Some("notthepassword".into()),
            new_password: Some("brandnewpass".into()),
            ..credentials(&pair.refresh_token)
        };
        let err = h.auth.update_credentials(user_id, req).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(h.store.password_hash(user_id).unwrap(), before);
    }

    #[tokio::test]
    async fn credential_update_applies_and_ends_session() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);

        let req = UpdateCredentialsRequest {
            email: Some("alice@x.com".into()),
            old_password: Some("longenough".into()),
            new_password: Some("brandnewpass".into()),
            ..credentials(&pair.refresh_token)
        };
        h.auth.update_credentials(user_id, req).await.unwrap();

        assert!(matches!(
            h.auth.sessions().verify_refresh_token(&pair.refresh_token).await,
            Err(SessionError::RefreshTokenRevoked)
        ));
        // Username kept, email and password replaced.
        assert!(
            h.auth
                .login(login_req(Some("alice123"), None, "brandnewpass"))
                .await
                .is_ok()
        );
        assert!(
            h.auth
                .login(login_req(None, Some("alice@x.com"), "brandnewpass"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn refresh_token_of_another_user_is_rejected() {
        let h = harness();
        let alice = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let bob = h
            .auth
            .register(register_req("bob12345", "b@x.com", "customer"))
            .await
            .unwrap();
        let bob_id = user_of(&h, &bob.access_token);

        let err = h
            .auth
            .update_credentials(bob_id, credentials(&alice.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn profile_update_must_match_role() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);

        let err = h
            .auth
            .update_profile(
                user_id,
                Role::Customer,
                ProfileUpdate::Seller(SellerProfileUpdate::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PayloadTypeMismatch(Role::Customer)));
    }

    #[tokio::test]
    async fn profile_update_replaces_fields() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);

        let update = ProfileUpdate::Customer(CustomerProfileUpdate {
            phone: Some("+14155552671".into()),
            first_name: Some("Alice".into()),
            ..Default::default()
        });
        h.auth
            .update_profile(user_id, Role::Customer, update)
            .await
            .unwrap();

        let ProfileResponse::Customer(profile) = h.auth.profile(user_id).await.unwrap() else {
            panic!("expected customer profile");
        };
        assert_eq!(profile.first_name.as_deref(), Some("Alice"));
        assert_eq!(profile.phone.as_deref(), Some("+14155552671"));
        assert_eq!(profile.username, "alice123");
    }

    #[tokio::test]
    async fn invalid_profile_fields_are_rejected() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("acme_inc", "s@x.com", "seller"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);
        let update = ProfileUpdate::Seller(SellerProfileUpdate {
            company_name: Some("Acme".into()),
            rating: Some(7.0),
        });
        let err = h
            .auth
            .update_profile(user_id, Role::Seller, update)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_token_record() {
        let h = harness();
        let pair = h
            .auth
            .register(register_req("alice123", "a@x.com", "customer"))
            .await
            .unwrap();
        let user_id = user_of(&h, &pair.access_token);
        h.store.remove_token(user_id);

        h.auth.delete_user(user_id).await.unwrap();
        assert!(matches!(
            h.auth.delete_user(user_id).await,
            Err(AuthError::IdentityNotFound)
        ));
        assert!(
            h.auth
                .login(login_req(Some("alice123"), None, "longenough"))
                .await
                .is_err()
        );
    }
}
