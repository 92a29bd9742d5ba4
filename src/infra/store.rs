use std::collections::HashMap;

use mongodb::{bson::document::ValueAccessError, error::Error as mongoError};
use thiserror::Error;

use super::mongo::types::{
    Ingredient, IngredientId, IngredientLine, LineRecord, Recipe, RecipeId, Tag, TagId, User,
    UserId,
};

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("error querying value")]
    QueryError(#[from] mongoError),
    #[error("malformed document: {0}")]
    MalformedDocument(#[from] ValueAccessError),
}

/// Restrictions applied by the recipe listing. Empty fields do not filter.
#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    /// Tag slugs, a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    /// Case-insensitive substring of the recipe name.
    pub search: Option<String>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientLine>,
}

#[derive(Debug, Default, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<u32>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientLine>>,
}

impl RecipeChanges {
    pub fn apply(self, recipe: &mut Recipe) {
        if let Some(name) = self.name {
            recipe.name = name;
        }
        if let Some(text) = self.text {
            recipe.text = text;
        }
        if let Some(cooking_time) = self.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        if let Some(tags) = self.tags {
            recipe.tags = tags;
        }
        if let Some(ingredients) = self.ingredients {
            recipe.ingredients = ingredients;
        }
    }
}

/// Joins every line of `recipes` with its ingredient, keeping recipe order then line order.
/// Lines whose ingredient no longer exists are dropped.
pub fn join_lines(recipes: &[Recipe], ingredients: &[Ingredient]) -> Vec<LineRecord> {
    let by_id: HashMap<IngredientId, &Ingredient> =
        ingredients.iter().map(|i| (i.id, i)).collect();
    recipes
        .iter()
        .flat_map(|recipe| {
            recipe.ingredients.iter().filter_map(|line| {
                by_id.get(&line.ingredient).map(|ingredient| LineRecord {
                    recipe_id: recipe.id,
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: line.amount,
                })
            })
        })
        .collect()
}

pub trait RecipeRepository {
    fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError>;

    fn find_recipes_by_ids(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, RepoError>;

    /// Every recipe identifier, ascending.
    fn recipe_ids(&self) -> Result<Vec<RecipeId>, RepoError>;

    /// Recipes matching `filter`, newest first.
    fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, RepoError>;

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError>;

    fn replace_recipe(&self, recipe: &Recipe) -> Result<(), RepoError>;

    /// Removes the recipe together with the cart and favorite entries pointing at it.
    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError>;
}

pub trait CartRepository {
    fn find_cart_recipes(&self, user_id: UserId) -> Result<Vec<RecipeId>, RepoError>;

    /// Returns `false` when the pair is already in the cart.
    fn add_to_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;

    /// Returns `false` when there was nothing to remove.
    fn remove_from_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;

    fn is_in_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;
}

pub trait IngredientLineRepository {
    /// Lines of the given recipes joined with their ingredient, in recipe order.
    fn find_ingredient_lines(&self, recipe_ids: &[RecipeId]) -> Result<Vec<LineRecord>, RepoError>;
}

pub trait FavoriteRepository {
    fn add_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;

    fn remove_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;

    fn is_favorited(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError>;
}

pub trait CatalogRepository {
    fn list_tags(&self) -> Result<Vec<Tag>, RepoError>;

    fn get_tag(&self, id: TagId) -> Result<Option<Tag>, RepoError>;

    fn find_tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>, RepoError>;

    fn list_ingredients(&self, search: Option<&str>) -> Result<Vec<Ingredient>, RepoError>;

    fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError>;

    fn find_ingredients_by_ids(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, RepoError>;
}

pub trait UserRepository {
    fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepoError>;

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;

    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;

    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;

    fn subscribed_authors(&self, user_id: UserId) -> Result<Vec<User>, RepoError>;
}

/// Everything the HTTP layer needs from a store.
pub trait Repository:
    RecipeRepository
    + CartRepository
    + IngredientLineRepository
    + FavoriteRepository
    + CatalogRepository
    + UserRepository
    + Send
    + Sync
{
}

impl<T> Repository for T where
    T: RecipeRepository
        + CartRepository
        + IngredientLineRepository
        + FavoriteRepository
        + CatalogRepository
        + UserRepository
        + Send
        + Sync
{
}

pub type Db = Box<dyn Repository>;
