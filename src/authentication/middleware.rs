use warp::{reject::Rejection, Filter};

use crate::api::AppState;
use crate::error::{Error, HtmlError};

use super::jwt::{verify_jwt_session, SessionData};

/// Token from an `Authorization: Token <t>` (or `Bearer <t>`) header.
fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

async fn resolve_session(header: &str, state: &AppState) -> Result<SessionData, Error> {
    let token = parse_authorization(header)
        .ok_or_else(|| HtmlError::Unauthorized.new("Invalid token header."))?;
    let claims = verify_jwt_session(token, &state.config.secret_key)?;

    if !state.store.session_exists(&claims.jti).await? {
        return Err(HtmlError::Unauthorized.new("Invalid token."));
    }

    let user = state
        .store
        .get_user(claims.user_id)
        .await?
        .ok_or_else(|| HtmlError::Unauthorized.new("User not found."))?;

    Ok(SessionData {
        user,
        token_id: claims.jti,
    })
}

/// Requires a valid session; rejects with 401 otherwise.
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |header: Option<String>| {
            let state = state.clone();
            async move {
                let header = header.ok_or_else(|| HtmlError::Unauthorized.default())?;
                let session = resolve_session(&header, &state).await?;
                Ok::<_, Rejection>(session)
            }
        },
    )
}

/// Anonymous requests pass through as `None`; a bad token is still a 401.
pub fn with_possible_session(
    state: AppState,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |header: Option<String>| {
            let state = state.clone();
            async move {
                match header {
                    Some(header) => {
                        let session = resolve_session(&header, &state).await?;
                        Ok::<_, Rejection>(Some(session))
                    }
                    None => Ok(None),
                }
            }
        },
    )
}
