use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::constants::SESSION_COOKIE;

use super::jwt::{verify_jwt_session, SessionData};

/// Requires a valid session cookie; rejects with the verification error otherwise.
pub fn with_session(
    secret: Arc<[u8]>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::<String>(SESSION_COOKIE).and_then(move |session: String| {
        let secret = secret.clone();
        async move { verify_jwt_session(&session, &secret).map_err(warp::reject::custom) }
    })
}

/// Anonymous requests and invalid sessions both resolve to `None`.
pub fn with_possible_session(
    secret: Arc<[u8]>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session.and_then(|token| match verify_jwt_session(&token, &secret) {
            Ok(data) => Some(data),
            Err(e) => {
                log::trace!("> Ignoring session cookie: {e}");
                None
            }
        })
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwt::generate_jwt_session, schema::{User, UserRole}};

    fn secret() -> Arc<[u8]> {
        Arc::from(&b"middleware-secret"[..])
    }

    fn token() -> String {
        let user = User {
            id: 3,
            username: String::from("mika"),
            email: String::from("mika@example.com"),
            first_name: String::from("Mika"),
            last_name: String::from("Laine"),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, &secret(), 1).unwrap()
    }

    #[tokio::test]
    async fn session_cookie_is_decoded() {
        let session = warp::test::request()
            .header("cookie", format!("session={}", token()))
            .filter(&with_session(secret()))
            .await
            .unwrap();

        assert_eq!(session.user_id, 3);
    }

    #[tokio::test]
    async fn missing_cookie_is_rejected() {
        let result = warp::test::request()
            .filter(&with_session(secret()))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn anonymous_request_has_no_session() {
        let session = warp::test::request()
            .filter(&with_possible_session(secret()))
            .await
            .unwrap();

        assert!(session.is_none());
    }

    #[tokio::test]
    async fn tampered_cookie_is_treated_as_anonymous() {
        let session = warp::test::request()
            .header("cookie", "session=not.a.token")
            .filter(&with_possible_session(secret()))
            .await
            .unwrap();

        assert!(session.is_none());
    }
}
