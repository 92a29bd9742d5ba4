use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use tracing::{debug, error};

use super::mongo::types::{User, UserId};
use super::store::{Db, UserRepository};

/// Caller identified by an `Authorization: Token <key>` header.
///
/// Tokens are issued by the identity service and only looked up here.
pub struct CurrentUser(pub User);

/// Caller of a route open to anonymous access. Only a missing header counts as
/// anonymous: an unknown token is still rejected with 401.
pub struct Viewer(pub Option<CurrentUser>);

/// Why authentication failed. The last failure is kept in the request-local
/// cache so the 401 catcher can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Invalid,
    Unavailable,
}

impl AuthError {
    pub fn detail(self) -> &'static str {
        match self {
            AuthError::Missing => "Authentication credentials were not provided.",
            AuthError::Invalid => "Invalid token.",
            AuthError::Unavailable => "Internal server error.",
        }
    }
}

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

impl Viewer {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(CurrentUser::id)
    }
}

fn token_key(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn reject<T>(req: &Request<'_>, status: Status, err: AuthError) -> Outcome<T, AuthError> {
    req.local_cache(|| err);
    Outcome::Error((status, err))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let key = match req.headers().get_one("Authorization").and_then(token_key) {
            Some(key) => key,
            None => return reject(req, Status::Unauthorized, AuthError::Missing),
        };
        let db = match req.rocket().state::<Db>() {
            Some(db) => db,
            None => return reject(req, Status::InternalServerError, AuthError::Unavailable),
        };
        match db.find_user_by_token(key) {
            Ok(Some(user)) => Outcome::Success(CurrentUser(user)),
            Ok(None) => {
                debug!("rejected unknown token");
                reject(req, Status::Unauthorized, AuthError::Invalid)
            }
            Err(e) => {
                error!(error = ?e, "token lookup failed");
                reject(req, Status::InternalServerError, AuthError::Unavailable)
            }
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Viewer {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match CurrentUser::from_request(req).await {
            Outcome::Success(user) => Outcome::Success(Viewer(Some(user))),
            Outcome::Error((_, AuthError::Missing)) => Outcome::Success(Viewer(None)),
            Outcome::Error(failure) => Outcome::Error(failure),
            Outcome::Forward(status) => Outcome::Forward(status),
        }
    }
}
