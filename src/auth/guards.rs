use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};

use crate::auth::{AuthError, AuthRejection, Session, SessionStore};

/// Request guard for endpoints that require an established session.
///
/// Extracts the bearer token, resolves it against the [`SessionStore`] and
/// exposes the session's provider credential to the handler. The token
/// doubles as the key scoping per-session state (page cache).
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub token: String,
    pub session: Session,
}

impl SessionUser {
    pub fn access_token(&self) -> &str {
        &self.session.access_token
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match bearer_token_from_request(request) {
            Some(token) => token.to_string(),
            None => {
                request.local_cache(|| AuthRejection::NotAuthenticated);
                return Outcome::Error((Status::Unauthorized, AuthError::Unauthorized));
            }
        };

        let store = match request.guard::<&State<SessionStore>>().await.succeeded() {
            Some(store) => store,
            None => {
                request.local_cache(|| AuthRejection::NotAuthenticated);
                return Outcome::Error((Status::Unauthorized, AuthError::Unauthorized));
            }
        };

        match store.get(&token) {
            Ok(session) => Outcome::Success(SessionUser { token, session }),
            Err(err) => {
                let rejection = match err {
                    AuthError::SessionExpired => AuthRejection::Expired,
                    AuthError::Unauthorized => AuthRejection::NotAuthenticated,
                };
                request.local_cache(|| rejection);
                Outcome::Error((Status::Unauthorized, err))
            }
        }
    }
}

impl<'r> OpenApiFromRequest<'r> for SessionUser {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    let header = request.headers().get_one("Authorization")?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
