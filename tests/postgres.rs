use sqlx::PgPool;

use foodgram::error::HtmlError;
use foodgram::postgres::PgStore;
use foodgram::schema::{
    Id, IngredientAmount, NewIngredient, NewTag, NewUser, RecipeDraft, RecipeMark, TagColor,
};
use foodgram::shopping_list::{aggregate, render};
use foodgram::store::Store;

async fn user(store: &PgStore, name: &str) -> Id {
    store
        .create_user(NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: String::from("First"),
            last_name: String::from("Last"),
            password: String::from("hash"),
        })
        .await
        .unwrap()
        .id
}

async fn ingredient(store: &PgStore, name: &str, unit: &str) -> Id {
    store
        .create_ingredient(NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn tag(store: &PgStore, slug: &str) -> Id {
    store
        .create_tag(NewTag {
            name: slug.to_uppercase(),
            color: TagColor::Orange,
            slug: slug.to_string(),
        })
        .await
        .unwrap()
        .id
}

fn draft(name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        text: String::from("Mix everything."),
        cooking_time: 10,
        image: Some(String::from("recipes/images/test.png")),
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn shopping_list_sums_cart_ingredients(pool: PgPool) {
    let store = PgStore::new(pool);
    let cook = user(&store, "cook").await;
    let baking = tag(&store, "baking").await;
    let flour = ingredient(&store, "Flour", "g").await;
    let sugar = ingredient(&store, "Sugar", "g").await;
    let egg = ingredient(&store, "Egg", "pcs").await;

    let a = store
        .create_recipe(cook, draft("Recipe A", &[baking], &[(flour, 200), (sugar, 50)]))
        .await
        .unwrap();
    let b = store
        .create_recipe(cook, draft("Recipe B", &[baking], &[(flour, 100), (egg, 2)]))
        .await
        .unwrap();

    assert!(store.shopping_list(cook).await.unwrap().is_empty());

    for id in [b, a] {
        assert!(store.add_mark(RecipeMark::ShoppingCart, cook, id).await.unwrap());
    }

    let items = store.shopping_list(cook).await.unwrap();
    assert_eq!(render(&items), "Egg (pcs) - 2\nFlour (g) - 300\nSugar (g) - 50");

    let mut parts = store.recipe_ingredients(a).await.unwrap();
    parts.extend(store.recipe_ingredients(b).await.unwrap());
    assert_eq!(items, aggregate(&parts));
}

#[sqlx::test(migrations = "./migrations")]
async fn same_name_with_other_units_stays_apart(pool: PgPool) {
    let store = PgStore::new(pool);
    let cook = user(&store, "cook").await;
    let baking = tag(&store, "baking").await;
    let grams = ingredient(&store, "sugar", "g").await;
    let spoons = ingredient(&store, "sugar", "tbsp").await;
    let apple = ingredient(&store, "Apple", "pcs").await;

    let id = store
        .create_recipe(
            cook,
            draft("Pie", &[baking], &[(spoons, 2), (grams, 40), (apple, 3)]),
        )
        .await
        .unwrap();
    store
        .add_mark(RecipeMark::ShoppingCart, cook, id)
        .await
        .unwrap();

    let items = store.shopping_list(cook).await.unwrap();
    assert_eq!(render(&items), "Apple (pcs) - 3\nsugar (g) - 40\nsugar (tbsp) - 2");
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_update_keeps_the_old_links(pool: PgPool) {
    let store = PgStore::new(pool);
    let cook = user(&store, "cook").await;
    let baking = tag(&store, "baking").await;
    let lunch = tag(&store, "lunch").await;
    let flour = ingredient(&store, "Flour", "g").await;
    let egg = ingredient(&store, "Egg", "pcs").await;

    store
        .create_recipe(cook, draft("Bread", &[baking], &[(flour, 500)]))
        .await
        .unwrap();
    let buns = store
        .create_recipe(cook, draft("Buns", &[baking], &[(flour, 300), (egg, 1)]))
        .await
        .unwrap();
    let before = store.recipe_ingredients(buns).await.unwrap();

    let error = store
        .update_recipe(buns, draft("Bread", &[lunch], &[(egg, 4)]))
        .await
        .unwrap_err();
    assert!(error.is(HtmlError::InvalidRequest));

    let error = store
        .update_recipe(buns, draft("Buns", &[lunch], &[(egg, 4), (99_999, 1)]))
        .await
        .unwrap_err();
    assert!(error.is(HtmlError::InternalServerError));

    assert_eq!(store.recipe_ingredients(buns).await.unwrap(), before);
    let tags = store.recipe_tags(buns).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, baking);
    assert_eq!(store.get_recipe(buns).await.unwrap().unwrap().name, "Buns");
}

#[sqlx::test(migrations = "./migrations")]
async fn ingredients_sort_bytewise(pool: PgPool) {
    let store = PgStore::new(pool);
    for name in ["salt", "Sugar", "apple", "Flour"] {
        ingredient(&store, name, "g").await;
    }

    let names: Vec<String> = store
        .list_ingredients(None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["Flour", "Sugar", "apple", "salt"]);

    let names: Vec<String> = store
        .list_ingredients(Some("s"))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["Sugar", "salt"]);
}
