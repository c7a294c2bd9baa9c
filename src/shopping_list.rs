//! Shopping list: ingredient totals over every recipe in a user's cart.

use std::collections::BTreeMap;

use crate::database::{
    error::Error,
    schema::{Id, RecipeIngredient, ShoppingListItem},
    store::Store,
};

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

/// Sums amounts per (name, unit) over the ingredients of every cart recipe.
///
/// The result is ordered by name, then unit, whatever order the recipes
/// were added in.
pub fn aggregate<'a, I>(parts: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = &'a RecipeIngredient>,
{
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for part in parts {
        *totals
            .entry((part.name.as_str(), part.measurement_unit.as_str()))
            .or_default() += i64::from(part.amount);
    }

    totals
        .into_iter()
        .map(|((name, unit), total_amount)| ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount,
        })
        .collect()
}

pub fn render(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} ({}) - {}",
                item.name, item.measurement_unit, item.total_amount
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// Renders the user's shopping list. An empty cart gives an empty list.
pub async fn download(store: &dyn Store, user_id: Id) -> Result<String, Error> {
    let items = store.shopping_list(user_id).await?;
    log::trace!("> Shopping list for user {user_id}: {} lines", items.len());

    Ok(render(&items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: Id, name: &str, unit: &str, amount: i32) -> RecipeIngredient {
        RecipeIngredient {
            id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_shared_ingredients_across_recipes() {
        let recipe_a = vec![part(1, "Flour", "g", 200), part(2, "Sugar", "g", 50)];
        let recipe_b = vec![part(1, "Flour", "g", 100), part(3, "Egg", "pcs", 2)];

        let items = aggregate(recipe_a.iter().chain(recipe_b.iter()));

        assert_eq!(
            render(&items),
            "Egg (pcs) - 2\nFlour (g) - 300\nSugar (g) - 50"
        );
    }

    #[test]
    fn cart_order_does_not_change_totals() {
        let recipe_a = vec![part(1, "Flour", "g", 200), part(2, "Sugar", "g", 50)];
        let recipe_b = vec![part(1, "Flour", "g", 100), part(3, "Egg", "pcs", 2)];

        let forward = aggregate(recipe_a.iter().chain(recipe_b.iter()));
        let backward = aggregate(recipe_b.iter().chain(recipe_a.iter()));

        assert_eq!(forward, backward);
    }

    #[test]
    fn same_name_with_other_unit_stays_separate() {
        let parts = vec![part(1, "Milk", "ml", 200), part(7, "Milk", "cup", 1)];

        let items = aggregate(parts.iter());

        assert_eq!(items.len(), 2);
        assert_eq!(render(&items), "Milk (cup) - 1\nMilk (ml) - 200");
    }

    #[test]
    fn empty_cart_renders_empty_list() {
        assert!(aggregate(std::iter::empty()).is_empty());
        assert_eq!(render(&[]), "");
    }
}
