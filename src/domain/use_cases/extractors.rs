use actix_web::{FromRequest, HttpRequest, HttpMessage};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use crate::{entities::token::Claims, errors::AuthError};

/// Id of the authenticated user, parsed from the `sub` claim.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = match req.extensions().get::<Claims>() {
            Some(claims) => claims.user_id().map(AuthUser).map_err(Into::into),
            None => Err(AuthError::MissingCredentials.into()),
        };
        ready(result)
    }
}
