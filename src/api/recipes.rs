use warp::filters::path::FullPath;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::database::form::{Form, Query};
use crate::error::{Error, HtmlError};
use crate::jwt::SessionData;
use crate::middleware::{with_possible_session, with_session};
use crate::pagination::PageContext;
use crate::permissions::ActionType;
use crate::schema::{Id, IngredientAmount, Recipe, RecipeDraft, RecipeFilter, RecipeMark};
use crate::serializers::{recipe_read, short_recipe};
use crate::shopping_list::{self, SHOPPING_LIST_FILENAME};
use crate::validation::{check_references, parse_recipe, RecipeInput};

use super::{
    json_body, json_reply, no_content, page_request, query_params, with_state, AppState,
};

pub fn routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(query_params())
        .and(warp::path::full())
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(mark_routes(state, RecipeMark::Favorite))
        .unify()
        .or(mark_routes(state, RecipeMark::ShoppingCart))
        .unify()
        .boxed()
}

fn mark_segment(mark: RecipeMark) -> &'static str {
    match mark {
        RecipeMark::Favorite => "favorite",
        RecipeMark::ShoppingCart => "shopping_cart",
    }
}

/// `recipes/{id}/favorite/` and `recipes/{id}/shopping_cart/`.
fn mark_routes(state: &AppState, mark: RecipeMark) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(mark_segment(mark)))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id: Id, session: SessionData, state: AppState| {
            add_mark(mark, id, session, state)
        });

    let remove = path
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(move |id: Id, session: SessionData, state: AppState| {
            remove_mark(mark, id, session, state)
        });

    add.or(remove).unify().boxed()
}

async fn find_recipe(state: &AppState, id: Id) -> Result<Recipe, Error> {
    state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// The favorite and cart flags only apply to an authenticated viewer.
fn recipe_filter(query: &Query, viewer: Option<&SessionData>) -> Result<RecipeFilter, Error> {
    let author = query
        .get_number::<Id>("author")
        .map_err(|_| Error::field("author", "Select a valid choice."))?;
    let viewer_id = viewer.map(SessionData::user_id);

    Ok(RecipeFilter {
        author,
        tags: query
            .get_all("tags")
            .into_iter()
            .filter(|slug| !slug.is_empty())
            .collect(),
        favorited_by: viewer_id.filter(|_| query.get_flag("is_favorited")),
        in_cart_of: viewer_id.filter(|_| query.get_flag("is_in_shopping_cart")),
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::field(field, "This field is required."))
}

async fn list_recipes(
    session: Option<SessionData>,
    query: Query,
    path: FullPath,
    state: AppState,
) -> Result<Response, Rejection> {
    let request = page_request(&query, &path, &state.config)?;
    let filter = recipe_filter(&query, session.as_ref())?;
    let (recipes, total) = state
        .store
        .list_recipes(&filter, request.limit, request.offset())
        .await?;

    let page = PageContext::from_rows(recipes, total, &request)?;
    let mut results = Vec::with_capacity(page.results.len());
    for recipe in &page.results {
        results.push(recipe_read(state.store.as_ref(), &state.media, session.as_ref(), recipe).await?);
    }

    Ok(json_reply(&page.with_results(results), StatusCode::OK))
}

async fn get_recipe(
    id: Id,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = find_recipe(&state, id).await?;
    let read = recipe_read(state.store.as_ref(), &state.media, session.as_ref(), &recipe).await?;

    Ok(json_reply(&read, StatusCode::OK))
}

async fn create_recipe(
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;

    let input = parse_recipe(&form, false)?;
    check_references(state.store.as_ref(), &input).await?;

    let RecipeInput {
        name,
        text,
        cooking_time,
        image,
        tags,
        ingredients,
    } = input;
    let name = required(name, "name")?;
    let text = required(text, "text")?;
    let cooking_time = required(cooking_time, "cooking_time")?;
    let tags = required(tags, "tags")?;
    let ingredients = required(ingredients, "ingredients")?;
    let image = state.media.save_image(&required(image, "image")?).await?;

    let draft = RecipeDraft {
        name,
        text,
        cooking_time,
        image: Some(image.to_owned()),
        tags,
        ingredients,
    };
    let id = match state.store.create_recipe(session.user_id(), draft).await {
        Ok(id) => id,
        Err(e) => {
            state.media.remove(&image).await;
            return Err(e.into());
        }
    };

    log::info!("User {} created recipe {id}", session.user_id());
    let recipe = find_recipe(&state, id).await?;
    let read = recipe_read(state.store.as_ref(), &state.media, Some(&session), &recipe).await?;

    Ok(json_reply(&read, StatusCode::CREATED))
}

/// Partial update; fields left out keep their stored values.
async fn update_recipe(
    id: Id,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = find_recipe(&state, id).await?;
    session.authenticate_recipe(&recipe)?;

    let input = parse_recipe(&form, true)?;
    check_references(state.store.as_ref(), &input).await?;

    let tags = match input.tags {
        Some(tags) => tags,
        None => state
            .store
            .recipe_tags(id)
            .await?
            .iter()
            .map(|tag| tag.id)
            .collect(),
    };
    let ingredients = match input.ingredients {
        Some(ingredients) => ingredients,
        None => state
            .store
            .recipe_ingredients(id)
            .await?
            .iter()
            .map(|ingredient| IngredientAmount {
                id: ingredient.id,
                amount: ingredient.amount,
            })
            .collect(),
    };
    let image = match &input.image {
        Some(data) => Some(state.media.save_image(data).await?),
        None => None,
    };

    let draft = RecipeDraft {
        name: input.name.unwrap_or_else(|| recipe.name.to_owned()),
        text: input.text.unwrap_or_else(|| recipe.text.to_owned()),
        cooking_time: input.cooking_time.unwrap_or(recipe.cooking_time),
        image: image.to_owned(),
        tags,
        ingredients,
    };
    if let Err(e) = state.store.update_recipe(id, draft).await {
        if let Some(image) = &image {
            state.media.remove(image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        state.media.remove(&recipe.image).await;
    }

    log::info!("User {} updated recipe {id}", session.user_id());
    let recipe = find_recipe(&state, id).await?;
    let read = recipe_read(state.store.as_ref(), &state.media, Some(&session), &recipe).await?;

    Ok(json_reply(&read, StatusCode::OK))
}

async fn delete_recipe(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let recipe = find_recipe(&state, id).await?;
    session.authenticate_recipe(&recipe)?;

    if !state.store.delete_recipe(id).await? {
        return Err(HtmlError::NotFound.default().into());
    }
    state.media.remove(&recipe.image).await;

    log::info!("User {} deleted recipe {id}", session.user_id());
    Ok(no_content())
}

async fn add_mark(
    mark: RecipeMark,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let recipe = find_recipe(&state, id).await?;

    if !state.store.add_mark(mark, session.user_id(), recipe.id).await? {
        return Err(HtmlError::InvalidRequest.new(mark.already_marked()).into());
    }

    log::trace!("> User {} marked recipe {id} ({mark:?})", session.user_id());
    Ok(json_reply(&short_recipe(&state.media, &recipe), StatusCode::CREATED))
}

async fn remove_mark(
    mark: RecipeMark,
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let recipe = find_recipe(&state, id).await?;

    if !state.store.remove_mark(mark, session.user_id(), recipe.id).await? {
        return Err(HtmlError::InvalidRequest.new(mark.not_marked()).into());
    }

    log::trace!("> User {} unmarked recipe {id} ({mark:?})", session.user_id());
    Ok(no_content())
}

async fn download_shopping_cart(
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let list = shopping_list::download(state.store.as_ref(), session.user_id()).await?;

    let reply = warp::reply::with_header(
        list,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );
    Ok(reply.into_response())
}
