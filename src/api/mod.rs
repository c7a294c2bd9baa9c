//! HTTP surface under `/api/`, plus the media files.

use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use warp::filters::body::BodyDeserializeError;
use warp::filters::path::FullPath;
use warp::http::StatusCode;
use warp::reject::{
    InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
};
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::config::Config;
use crate::constants::{MAX_BODY_BYTES, MAX_PAGE_SIZE};
use crate::database::form::{Form, FormData, Query};
use crate::error::{Error, HtmlError};
use crate::media::MediaStore;
use crate::pagination::PageRequest;
use crate::store::Store;

pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

/// Everything a handler needs, cloned into each route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<MediaStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let media = MediaStore::new(config.media_root.to_owned(), &config.media_url);

        Self {
            store,
            media: Arc::new(media),
            config: Arc::new(config),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// JSON object body, size limited.
pub fn json_body() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json::<FormData>())
        .map(Form::from_data)
}

pub fn query_params() -> impl Filter<Extract = (Query,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>().map(Query::new)
}

/// Page selection from `page` and `limit`; an unusable page number is a 404.
pub fn page_request(query: &Query, path: &FullPath, config: &Config) -> Result<PageRequest, Error> {
    let page = match query.get_str("page") {
        Some(page) => page
            .parse::<i64>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| HtmlError::NotFound.new("Invalid page."))?,
        None => 1,
    };
    let limit = query
        .get_number::<i64>("limit")
        .ok()
        .flatten()
        .filter(|limit| *limit >= 1)
        .map_or(config.page_size, |limit| limit.min(MAX_PAGE_SIZE));

    let request = PageRequest::new(page, limit, path.as_str(), query.pairs().to_vec());
    match request.checked_offset() {
        Some(_) => Ok(request),
        None => Err(HtmlError::NotFound.new("Invalid page.")),
    }
}

pub fn json_reply<T: Serialize>(value: &T, code: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), code).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// All api routes and the media directory, with errors rendered as JSON.
pub fn routes(state: AppState) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        users::routes(&state)
            .or(tags::routes(&state))
            .unify()
            .or(ingredients::routes(&state))
            .unify()
            .or(recipes::routes(&state))
            .unify(),
    );

    let media_path = state.config.media_path().unwrap_or("media").to_string();
    let media = warp::path(media_path)
        .and(warp::get())
        .and(warp::fs::dir(state.config.media_root.to_owned()))
        .map(|file: warp::fs::File| file.into_response());

    api.or(media).unify().recover(handle_rejection).unify()
}

pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (code, body) = if let Some(error) = rejection.find::<Error>() {
        if error.code.is_server_error() {
            log::error!("{error}");
        }
        (error.code, error.body())
    } else if rejection.is_not_found() {
        let error = HtmlError::NotFound.default();
        (error.code, error.body())
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "errors": format!("JSON parse error - {e}") }),
        )
    } else if rejection.find::<InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "errors": "Invalid query string." }),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "Method not allowed." }),
        )
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "detail": "Request body is too large." }),
        )
    } else if rejection.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "detail": "Content-Length header is required." }),
        )
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "detail": "Unsupported media type in request." }),
        )
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        let error = HtmlError::InternalServerError.default();
        (error.code, error.body())
    };

    Ok(json_reply(&body, code))
}
