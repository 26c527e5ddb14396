use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::identity::{
    self, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, IdentityHeaders, TELEGRAM_ID_HEADER,
};
use crate::state::AppState;
use crate::workflow::Actor;

use super::HttpError;

impl FromRequestParts<AppState> for Actor {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = IdentityHeaders {
            telegram_id: header(parts, TELEGRAM_ID_HEADER)?,
            actor_id: header(parts, ACTOR_ID_HEADER)?,
            actor_role: header(parts, ACTOR_ROLE_HEADER)?,
        };
        let actor =
            identity::resolve_actor(&state.database, headers, state.auth.allow_header_actor)
                .await?;
        Ok(actor)
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<Option<&'a str>, HttpError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| HttpError::new(StatusCode::BAD_REQUEST, format!("Invalid {name} header")))?;
    Ok(Some(value))
}
