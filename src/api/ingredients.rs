use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection};

use crate::database::form::Query;
use crate::error::HtmlError;
use crate::schema::Id;

use super::{json_reply, query_params, with_state, AppState};

pub fn routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(query_params())
        .and(with_state(state.clone()))
        .and_then(list_ingredients);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_ingredient);

    list.or(detail).unify().boxed()
}

/// `?name=` narrows the list to names starting with it, ignoring case.
async fn list_ingredients(query: Query, state: AppState) -> Result<Response, Rejection> {
    let prefix = query.get_str("name").map(str::trim).filter(|name| !name.is_empty());
    let ingredients = state.store.list_ingredients(prefix).await?;

    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn get_ingredient(id: Id, state: AppState) -> Result<Response, Rejection> {
    let ingredient = state
        .store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}
