use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection};

use crate::error::HtmlError;
use crate::schema::Id;

use super::{json_reply, with_state, AppState};

pub fn routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_tags);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_tag);

    list.or(detail).unify().boxed()
}

/// Tags are few, so the list is not paginated.
async fn list_tags(state: AppState) -> Result<Response, Rejection> {
    let tags = state.store.list_tags().await?;

    Ok(json_reply(&tags, StatusCode::OK))
}

async fn get_tag(id: Id, state: AppState) -> Result<Response, Rejection> {
    let tag = state
        .store
        .get_tag(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_reply(&tag, StatusCode::OK))
}
