pub(crate) use crate::auth::dto::{Claims, JwtKeys};
use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, Theme, User},
    },
    config::JwtConfig,
    error::{AppError, AppResult, FieldErrors},
    state::AppState,
};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::{sync::Arc, time::Duration};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_FULL_NAME_LEN: usize = 2;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: jsonwebtoken::DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.max(1) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Registration, login and token resolution over a [`UserRepo`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    keys: JwtKeys,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), JwtKeys::from_ref(state))
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepo>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> AppResult<User> {
        let full_name = full_name.trim();
        let email = email.trim();

        let mut errs = FieldErrors::new();
        if full_name.chars().count() < MIN_FULL_NAME_LEN {
            errs.push(format!(
                "fullName must be at least {MIN_FULL_NAME_LEN} characters"
            ));
        }
        if !is_valid_email(email) {
            errs.push("email is invalid");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errs.push(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        errs.into_result()?;

        if self.users.find_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(NewUser {
                full_name: full_name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Returns a freshly signed token and the user it belongs to.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let email = email.trim();
        let mut errs = FieldErrors::new();
        errs.require("email", email);
        errs.require("password", password);
        errs.into_result()?;

        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(invalid_credentials());
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(invalid_credentials());
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok((token, user))
    }

    /// Resolves the value of an `Authorization` header to a stored user.
    pub async fn authenticate(&self, header: Option<&str>) -> AppResult<User> {
        let header = header
            .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("Invalid Authorization header".into()))?;

        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::InvalidCredential("Invalid or expired token".into())
        })?;

        self.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            AppError::InvalidCredential("Invalid or expired token".into())
        })
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &User,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> AppResult<()> {
        let mut errs = FieldErrors::new();
        errs.require("currentPassword", current);
        if new.chars().count() < MIN_PASSWORD_LEN {
            errs.push(format!(
                "newPassword must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        if new != confirm {
            errs.push("confirmPassword does not match newPassword");
        }
        errs.into_result()?;

        if !verify_password(current, &user.password_hash)? {
            warn!("current password mismatch");
            return Err(AppError::InvalidCredential(
                "Current password is incorrect".into(),
            ));
        }

        let hash = hash_password(new)?;
        self.users.update_password(user.id, &hash).await?;
        info!("password changed");
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_theme(&self, user: &User, theme: &str) -> AppResult<Theme> {
        let theme: Theme = theme
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("theme must be one of light, dark, system".into()))?;
        let updated = self.users.update_theme(user.id, theme).await?;
        Ok(updated.theme)
    }
}

fn invalid_credentials() -> AppError {
    AppError::InvalidCredential("Invalid email or password".into())
}

/// The user resolved from the request's bearer token.
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        auth.authenticate(header).await.map(CurrentUser)
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.io"));
        assert!(!is_valid_email(""));
    }
}
