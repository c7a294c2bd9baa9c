use warp::filters::path::FullPath;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection};

use crate::cryptography::{hash_password, verify_password};
use crate::database::form::{Form, Query};
use crate::error::{Error, HtmlError};
use crate::jwt::{generate_jwt_session, SessionData};
use crate::middleware::{with_possible_session, with_session};
use crate::pagination::PageContext;
use crate::permissions::ActionType;
use crate::schema::{Id, NewUser, User};
use crate::serializers::{subscription_read, user_read, SubscriptionRead, TokenRead, UserCreated};
use crate::validation::{validate_login, validate_password_change, validate_registration};

use super::{
    json_body, json_reply, no_content, page_request, query_params, with_state, AppState,
};

pub fn routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(query_params())
        .and(warp::path::full())
        .and(with_state(state.clone()))
        .and_then(list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(me);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(query_params())
        .and(warp::path::full())
        .and(with_state(state.clone()))
        .and_then(subscriptions);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(query_params())
        .and(with_state(state.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(logout);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .boxed()
}

async fn find_user(state: &AppState, id: Id) -> Result<User, Error> {
    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// `recipes_limit` caps the recipes embedded in each subscription.
fn recipes_limit(query: &Query) -> Option<i64> {
    query
        .get_number::<i64>("recipes_limit")
        .ok()
        .flatten()
        .filter(|limit| *limit >= 0)
}

async fn register(form: Form, state: AppState) -> Result<Response, Rejection> {
    let registration = validate_registration(&form)?;

    let user = state
        .store
        .create_user(NewUser {
            email: registration.email,
            username: registration.username,
            first_name: registration.first_name,
            last_name: registration.last_name,
            password: hash_password(&registration.password)?,
        })
        .await?;

    log::info!("Registered user {} ({})", user.id, user.username);
    Ok(json_reply(&UserCreated::from(&user), StatusCode::CREATED))
}

async fn list_users(
    session: Option<SessionData>,
    query: Query,
    path: FullPath,
    state: AppState,
) -> Result<Response, Rejection> {
    let request = page_request(&query, &path, &state.config)?;
    let (users, total) = state
        .store
        .list_users(request.limit, request.offset())
        .await?;

    let page = PageContext::from_rows(users, total, &request)?;
    let mut results = Vec::with_capacity(page.results.len());
    for user in &page.results {
        results.push(user_read(state.store.as_ref(), session.as_ref(), user).await?);
    }

    Ok(json_reply(&page.with_results(results), StatusCode::OK))
}

async fn get_user(
    id: Id,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let user = find_user(&state, id).await?;
    let read = user_read(state.store.as_ref(), session.as_ref(), &user).await?;

    Ok(json_reply(&read, StatusCode::OK))
}

async fn me(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let read = user_read(state.store.as_ref(), Some(&session), &session.user).await?;

    Ok(json_reply(&read, StatusCode::OK))
}

async fn set_password(
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<Response, Rejection> {
    let change = validate_password_change(&form)?;

    if !verify_password(&change.current_password, &session.user.password)? {
        return Err(Error::field("current_password", "Invalid password.").into());
    }

    let password = hash_password(&change.new_password)?;
    state.store.set_password(session.user_id(), &password).await?;

    log::info!("User {} changed their password", session.user_id());
    Ok(no_content())
}

async fn login(form: Form, state: AppState) -> Result<Response, Rejection> {
    let credentials = validate_login(&form)?;
    let invalid = || HtmlError::InvalidRequest.new("Unable to log in with provided credentials.");

    let user = state
        .store
        .find_user_by_email(&credentials.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&credentials.password, &user.password)? {
        return Err(invalid().into());
    }

    let (token, token_id) = generate_jwt_session(
        &user,
        &state.config.secret_key,
        state.config.token_ttl_hours,
    )?;
    state.store.create_session(user.id, &token_id).await?;

    log::trace!("> Issued token for user {}", user.id);
    Ok(json_reply(&TokenRead { auth_token: token }, StatusCode::OK))
}

async fn logout(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    state.store.delete_session(&session.token_id).await?;

    log::trace!("> Revoked token for user {}", session.user_id());
    Ok(no_content())
}

async fn subscriptions(
    session: SessionData,
    query: Query,
    path: FullPath,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;

    let request = page_request(&query, &path, &state.config)?;
    let limit = recipes_limit(&query);
    let (authors, total) = state
        .store
        .list_subscriptions(session.user_id(), request.limit, request.offset())
        .await?;

    let page = PageContext::from_rows(authors, total, &request)?;
    let mut results: Vec<SubscriptionRead> = Vec::with_capacity(page.results.len());
    for author in &page.results {
        results.push(
            subscription_read(
                state.store.as_ref(),
                &state.media,
                &session,
                author,
                limit,
            )
            .await?,
        );
    }

    Ok(json_reply(&page.with_results(results), StatusCode::OK))
}

async fn subscribe(
    id: Id,
    session: SessionData,
    query: Query,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    let author = find_user(&state, id).await?;

    if author.id == session.user_id() {
        return Err(HtmlError::InvalidRequest
            .new("You cannot subscribe to yourself.")
            .into());
    }
    if !state.store.subscribe(session.user_id(), author.id).await? {
        return Err(HtmlError::InvalidRequest
            .new("You are already subscribed to this author.")
            .into());
    }

    log::trace!("> User {} subscribed to {}", session.user_id(), author.id);
    let read = subscription_read(
        state.store.as_ref(),
        &state.media,
        &session,
        &author,
        recipes_limit(&query),
    )
    .await?;

    Ok(json_reply(&read, StatusCode::CREATED))
}

async fn unsubscribe(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    let author = find_user(&state, id).await?;

    if !state.store.unsubscribe(session.user_id(), author.id).await? {
        return Err(HtmlError::InvalidRequest
            .new("You are not subscribed to this author.")
            .into());
    }

    log::trace!("> User {} unsubscribed from {}", session.user_id(), author.id);
    Ok(no_content())
}
