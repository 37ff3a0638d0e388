use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::MAX_SESSION_HOURS;
use crate::database::schema::User;
use crate::error::ServiceError;
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let lifetime = Duration::hours(lifetime_hours.clamp(1, MAX_SESSION_HOURS));
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The requesting principal, handed explicitly to every operation that needs one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ServiceError> {
        if !action.authenticate(self) {
            return Err(ServiceError::PermissionDenied(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, ServiceError> {
    Hmac::new_from_slice(secret)
        .map_err(|e| ServiceError::Internal(format!("Invalid signing key: {e}")))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &[u8],
    lifetime_hours: i64,
) -> Result<String, ServiceError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role,
        lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|e| ServiceError::Internal(format!("Failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<SessionData, ServiceError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ServiceError::Unauthenticated(String::from("Invalid session; Invalid token")))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ServiceError::Unauthenticated(String::from(
            "Invalid session; Token expired",
        )));
    }

    Ok(session.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn user() -> User {
        User {
            id: 7,
            username: String::from("anna"),
            email: String::from("anna@example.com"),
            first_name: String::from("Anna"),
            last_name: String::from("Virtanen"),
            password: String::new(),
            role: UserRole::User,
        }
    }

    #[test]
    fn issued_session_identifies_the_user() {
        let token = generate_jwt_session(&user(), SECRET, 1).unwrap();
        let session = verify_jwt_session(&token, SECRET).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "anna");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn foreign_key_is_rejected() {
        let token = generate_jwt_session(&user(), SECRET, 1).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, b"other-secret"),
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let claims = JwtSessionData::new(7, String::from("anna"), UserRole::User, i64::MAX);

        assert_eq!(claims.exp - claims.iat, MAX_SESSION_HOURS * 3600);
    }

    #[test]
    fn expired_session_is_rejected() {
        let key = signing_key(SECRET).unwrap();
        let mut claims = JwtSessionData::new(7, String::from("anna"), UserRole::User, 1);
        claims.exp = claims.iat - 60;
        let token = claims.sign_with_key(&key).unwrap();

        assert_eq!(
            verify_jwt_session(&token, SECRET),
            Err(ServiceError::Unauthenticated(String::from(
                "Invalid session; Token expired"
            )))
        );
    }
}
