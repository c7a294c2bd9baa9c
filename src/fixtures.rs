//! Seed data for the ingredient and tag catalogs.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::Error;
use crate::schema::{NewIngredient, NewTag};
use crate::store::Store;

#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub tags: Vec<NewTag>,
}

/// A fixture file holds either the full object or just the ingredient list.
#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Ingredients(Vec<NewIngredient>),
    Full(Fixtures),
}

impl Fixtures {
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let file: FixtureFile =
            serde_json::from_str(contents).context("Fixture file is not valid JSON")?;

        Ok(match file {
            FixtureFile::Ingredients(ingredients) => Self {
                ingredients,
                tags: vec![],
            },
            FixtureFile::Full(fixtures) => fixtures,
        })
    }

    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?;

        Self::parse(&contents)
    }

    /// Inserts everything not stored yet; running it twice changes nothing.
    pub async fn load(self, store: &dyn Store) -> Result<(usize, usize), Error> {
        let (ingredients, tags) = (self.ingredients.len(), self.tags.len());

        for ingredient in self.ingredients {
            store.create_ingredient(ingredient).await?;
        }
        for tag in self.tags {
            store.create_tag(tag).await?;
        }

        log::info!("Loaded {ingredients} ingredients and {tags} tags");
        Ok((ingredients, tags))
    }
}
