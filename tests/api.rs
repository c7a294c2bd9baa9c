use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use warp::http::StatusCode;

use foodgram::api::{routes, AppState};
use foodgram::config::Config;
use foodgram::memory::MemoryStore;
use foodgram::schema::{Id, NewIngredient, NewTag, TagColor, UserRole};
use foodgram::store::Store;

const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

struct TestApp {
    state: AppState,
    store: Arc<MemoryStore>,
    _media: TempDir,
}

struct Reply {
    status: StatusCode,
    body: Value,
    text: String,
    headers: warp::http::HeaderMap,
}

impl TestApp {
    fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            media_root: media.path().to_path_buf(),
            ..Config::default()
        };

        Self {
            state: AppState::new(store.clone(), config),
            store,
            _media: media,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Token {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.reply(&routes(self.state.clone())).await;
        let text = String::from_utf8_lossy(response.body()).to_string();

        Reply {
            status: response.status(),
            body: serde_json::from_str(&text).unwrap_or(Value::Null),
            text,
            headers: response.headers().clone(),
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Reply {
        self.request("GET", path, token, None).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.request("POST", path, token, Some(body)).await
    }

    /// Registers and logs in; returns the user id and token.
    async fn user(&self, name: &str) -> (Id, String) {
        let reply = self
            .post(
                "/api/users/",
                None,
                json!({
                    "email": format!("{name}@example.com"),
                    "username": name,
                    "first_name": "First",
                    "last_name": "Last",
                    "password": "correct horse",
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text);
        let id = reply.body["id"].as_i64().unwrap() as Id;

        let reply = self
            .post(
                "/api/auth/token/login/",
                None,
                json!({ "email": format!("{name}@example.com"), "password": "correct horse" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);

        (id, reply.body["auth_token"].as_str().unwrap().to_string())
    }

    async fn tag(&self, slug: &str, color: TagColor) -> Id {
        self.store
            .create_tag(NewTag {
                name: slug.to_uppercase(),
                color,
                slug: slug.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn ingredient(&self, name: &str, unit: &str) -> Id {
        self.store
            .create_ingredient(NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn recipe(&self, token: &str, name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> Id {
        let reply = self
            .post("/api/recipes/", Some(token), recipe_payload(name, tags, ingredients))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text);

        reply.body["id"].as_i64().unwrap() as Id
    }
}

fn recipe_payload(name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> Value {
    json!({
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<Value>>(),
        "tags": tags,
        "image": PIXEL,
        "name": name,
        "text": "Mix everything.",
        "cooking_time": 10,
    })
}

#[tokio::test]
async fn registration_and_login() {
    let app = TestApp::new();
    let (id, token) = app.user("cook").await;

    let me = app.get("/api/users/me/", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(
        me.body,
        json!({
            "email": "cook@example.com",
            "id": id,
            "username": "cook",
            "first_name": "First",
            "last_name": "Last",
            "is_subscribed": false,
        })
    );

    let anonymous = app.get("/api/users/me/", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert!(anonymous.body["detail"].is_string());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.user("cook").await;

    let reply = app
        .post(
            "/api/users/",
            None,
            json!({
                "email": "COOK@example.com",
                "username": "another",
                "first_name": "First",
                "last_name": "Last",
                "password": "secret",
            }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["email"].is_array());
}

#[tokio::test]
async fn wrong_password_does_not_log_in() {
    let app = TestApp::new();
    app.user("cook").await;

    let reply = app
        .post(
            "/api/auth/token/login/",
            None,
            json!({ "email": "cook@example.com", "password": "wrong" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.get("auth_token").is_none());
}

#[tokio::test]
async fn logged_out_token_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;

    let reply = app
        .request("POST", "/api/auth/token/logout/", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app.get("/api/users/me/", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;

    let reply = app
        .post(
            "/api/users/set_password/",
            Some(&token),
            json!({ "new_password": "new secret", "current_password": "wrong" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .post(
            "/api/users/set_password/",
            Some(&token),
            json!({ "new_password": "new secret", "current_password": "correct horse" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app
        .post(
            "/api/auth/token/login/",
            None,
            json!({ "email": "cook@example.com", "password": "new secret" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn recipe_is_created_with_media_url() {
    let app = TestApp::new();
    let (author, token) = app.user("cook").await;
    let breakfast = app.tag("breakfast", TagColor::Orange).await;
    let flour = app.ingredient("Flour", "g").await;

    let id = app.recipe(&token, "Pancakes", &[breakfast], &[(flour, 200)]).await;

    let reply = app.get(&format!("/api/recipes/{id}/"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["author"]["id"], json!(author));
    assert_eq!(reply.body["tags"][0]["color"], json!("#FFA500"));
    assert_eq!(
        reply.body["ingredients"],
        json!([{ "id": flour, "name": "Flour", "measurement_unit": "g", "amount": 200 }])
    );
    assert_eq!(reply.body["is_favorited"], json!(false));

    let image = reply.body["image"].as_str().unwrap();
    assert!(image.starts_with("/media/recipes/images/"));

    let file = app.get(image, None).await;
    assert_eq!(file.status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_recipes_are_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;

    let repeated = recipe_payload("Bread", &[tag], &[(flour, 100), (flour, 200)]);
    let reply = app.post("/api/recipes/", Some(&token), repeated).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["ingredients"].is_array());

    let mut quick = recipe_payload("Bread", &[tag], &[(flour, 100)]);
    quick["cooking_time"] = json!(0);
    let reply = app.post("/api/recipes/", Some(&token), quick).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["cooking_time"].is_array());

    let unknown = recipe_payload("Bread", &[tag], &[(9999, 100)]);
    let reply = app.post("/api/recipes/", Some(&token), unknown).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .post("/api/recipes/", None, recipe_payload("Bread", &[tag], &[(flour, 100)]))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let list = app.get("/api/recipes/", None).await;
    assert_eq!(list.body["count"], json!(0));
}

#[tokio::test]
async fn duplicate_recipe_name_is_a_conflict() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;
    app.recipe(&token, "Bread", &[tag], &[(flour, 100)]).await;

    let reply = app
        .post("/api/recipes/", Some(&token), recipe_payload("Bread", &[tag], &[(flour, 100)]))
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["errors"].is_string());
}

#[tokio::test]
async fn only_the_author_may_change_a_recipe() {
    let app = TestApp::new();
    let (_, author) = app.user("author").await;
    let (other_id, other) = app.user("other").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;
    let id = app.recipe(&author, "Bread", &[tag], &[(flour, 100)]).await;
    let path = format!("/api/recipes/{id}/");

    let patch = json!({ "name": "Stolen bread" });
    let reply = app.request("PATCH", &path, Some(&other), Some(patch.clone())).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.request("PATCH", &path, None, Some(patch.clone())).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.request("DELETE", &path, Some(&other), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    app.store.set_role(other_id, UserRole::Admin).await.unwrap();
    let reply = app.request("PATCH", &path, Some(&other), Some(patch)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], json!("Stolen bread"));
    assert_eq!(reply.body["ingredients"][0]["amount"], json!(100));
}

#[tokio::test]
async fn author_updates_and_deletes() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let lunch = app.tag("lunch", TagColor::Green).await;
    let dinner = app.tag("dinner", TagColor::Purple).await;
    let flour = app.ingredient("Flour", "g").await;
    let egg = app.ingredient("Egg", "pcs").await;
    let id = app.recipe(&token, "Bread", &[lunch], &[(flour, 100)]).await;
    let path = format!("/api/recipes/{id}/");

    let reply = app
        .request(
            "PATCH",
            &path,
            Some(&token),
            Some(json!({
                "tags": [dinner],
                "ingredients": [{ "id": egg, "amount": 2 }],
                "cooking_time": 25,
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(reply.body["tags"][0]["slug"], json!("dinner"));
    assert_eq!(reply.body["ingredients"][0]["name"], json!("Egg"));
    assert_eq!(reply.body["cooking_time"], json!(25));
    assert_eq!(reply.body["name"], json!("Bread"));

    let reply = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app.get(&path, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "detail": "Not found." }));
}

#[tokio::test]
async fn favorites_and_cart_reject_duplicates() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;
    let id = app.recipe(&token, "Bread", &[tag], &[(flour, 100)]).await;

    for mark in ["favorite", "shopping_cart"] {
        let path = format!("/api/recipes/{id}/{mark}/");

        let reply = app.request("POST", &path, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["name"], json!("Bread"));
        assert!(reply.body.get("author").is_none());

        let reply = app.request("POST", &path, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = app.request("DELETE", &path, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        let reply = app.request("DELETE", &path, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    let reply = app
        .request("POST", "/api/recipes/9999/favorite/", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shopping_cart_download_sums_ingredients() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let tag = app.tag("baking", TagColor::Orange).await;
    let flour = app.ingredient("Flour", "g").await;
    let sugar = app.ingredient("Sugar", "g").await;
    let egg = app.ingredient("Egg", "pcs").await;

    let a = app.recipe(&token, "Recipe A", &[tag], &[(flour, 200), (sugar, 50)]).await;
    let b = app.recipe(&token, "Recipe B", &[tag], &[(flour, 100), (egg, 2)]).await;

    let empty = app.get("/api/recipes/download_shopping_cart/", Some(&token)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.text, "");

    for id in [b, a] {
        let path = format!("/api/recipes/{id}/shopping_cart/");
        app.request("POST", &path, Some(&token), None).await;
    }

    let reply = app.get("/api/recipes/download_shopping_cart/", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text, "Egg (pcs) - 2\nFlour (g) - 300\nSugar (g) - 50");
    assert_eq!(
        reply.headers["content-disposition"],
        "attachment; filename=\"shopping_list.txt\""
    );
    assert!(reply.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let anonymous = app.get("/api/recipes/download_shopping_cart/", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscriptions() {
    let app = TestApp::new();
    let (reader_id, reader) = app.user("reader").await;
    let (author_id, author) = app.user("author").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;
    for name in ["Bread", "Buns", "Rolls"] {
        app.recipe(&author, name, &[tag], &[(flour, 100)]).await;
    }

    let own = format!("/api/users/{reader_id}/subscribe/");
    let reply = app.request("POST", &own, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let path = format!("/api/users/{author_id}/subscribe/?recipes_limit=2");
    let reply = app.request("POST", &path, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["is_subscribed"], json!(true));
    assert_eq!(reply.body["recipes_count"], json!(3));
    assert_eq!(reply.body["recipes"].as_array().unwrap().len(), 2);

    let reply = app.request("POST", &path, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.get("/api/users/subscriptions/", Some(&reader)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], json!(1));
    assert_eq!(reply.body["results"][0]["username"], json!("author"));

    let reply = app.get(&format!("/api/users/{author_id}/"), Some(&reader)).await;
    assert_eq!(reply.body["is_subscribed"], json!(true));

    let path = format!("/api/users/{author_id}/subscribe/");
    let reply = app.request("DELETE", &path, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = app.request("DELETE", &path, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .request("POST", "/api/users/9999/subscribe/", Some(&reader), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recipe_list_filters() {
    let app = TestApp::new();
    let (_, cook) = app.user("cook").await;
    let (other_id, other) = app.user("other").await;
    let breakfast = app.tag("breakfast", TagColor::Orange).await;
    let dinner = app.tag("dinner", TagColor::Purple).await;
    let flour = app.ingredient("Flour", "g").await;

    let pancakes = app.recipe(&cook, "Pancakes", &[breakfast], &[(flour, 100)]).await;
    let stew = app.recipe(&cook, "Stew", &[dinner], &[(flour, 10)]).await;
    let toast = app.recipe(&other, "Toast", &[breakfast], &[(flour, 5)]).await;

    let ids = |reply: &Reply| -> Vec<i64> {
        reply.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|recipe| recipe["id"].as_i64().unwrap())
            .collect()
    };

    let reply = app.get("/api/recipes/", None).await;
    assert_eq!(reply.body["count"], json!(3));
    assert_eq!(ids(&reply), vec![toast as i64, stew as i64, pancakes as i64]);

    let reply = app.get("/api/recipes/?tags=breakfast", None).await;
    assert_eq!(ids(&reply), vec![toast as i64, pancakes as i64]);

    let reply = app.get("/api/recipes/?tags=breakfast&tags=dinner", None).await;
    assert_eq!(reply.body["count"], json!(3));

    let reply = app.get(&format!("/api/recipes/?author={other_id}"), None).await;
    assert_eq!(ids(&reply), vec![toast as i64]);

    app.request("POST", &format!("/api/recipes/{stew}/favorite/"), Some(&cook), None)
        .await;
    let reply = app.get("/api/recipes/?is_favorited=1", Some(&cook)).await;
    assert_eq!(ids(&reply), vec![stew as i64]);
    assert_eq!(reply.body["results"][0]["is_favorited"], json!(true));

    let reply = app.get("/api/recipes/?is_in_shopping_cart=1", Some(&cook)).await;
    assert_eq!(reply.body["count"], json!(0));
}

#[tokio::test]
async fn recipe_list_is_paginated() {
    let app = TestApp::new();
    let (_, token) = app.user("cook").await;
    let tag = app.tag("lunch", TagColor::Green).await;
    let flour = app.ingredient("Flour", "g").await;
    for n in 0..3 {
        app.recipe(&token, &format!("Bread {n}"), &[tag], &[(flour, 100)]).await;
    }

    let reply = app.get("/api/recipes/?limit=2", None).await;
    assert_eq!(reply.body["count"], json!(3));
    assert_eq!(reply.body["results"].as_array().unwrap().len(), 2);
    assert_eq!(reply.body["next"], json!("/api/recipes/?limit=2&page=2"));
    assert_eq!(reply.body["previous"], Value::Null);

    let reply = app.get("/api/recipes/?limit=2&page=2", None).await;
    assert_eq!(reply.body["results"].as_array().unwrap().len(), 1);
    assert_eq!(reply.body["next"], Value::Null);

    let reply = app.get("/api/recipes/?limit=2&page=5", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.get("/api/recipes/?page=9223372036854775807", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "detail": "Invalid page." }));

    let reply = app
        .get("/api/users/?page=9223372036854775807&limit=100", Some(&token))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tags_and_ingredients() {
    let app = TestApp::new();
    let lunch = app.tag("lunch", TagColor::Green).await;
    app.ingredient("Salt", "g").await;
    app.ingredient("sugar", "g").await;
    app.ingredient("Flour", "g").await;

    let reply = app.get("/api/tags/", None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);

    let reply = app.get(&format!("/api/tags/{lunch}/"), None).await;
    assert_eq!(
        reply.body,
        json!({ "id": lunch, "name": "LUNCH", "color": "#008000", "slug": "lunch" })
    );

    let reply = app.get("/api/tags/9999/", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.get("/api/ingredients/?name=S", None).await;
    let names: Vec<&str> = reply
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Salt", "sugar"]);
}

#[tokio::test]
async fn framework_errors_render_as_json() {
    let app = TestApp::new();

    let reply = app.get("/api/nothing-here/", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "detail": "Not found." }));

    let reply = app.request("PUT", "/api/tags/", None, None).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);

    let response = warp::test::request()
        .method("POST")
        .path("/api/users/")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&routes(app.state.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
