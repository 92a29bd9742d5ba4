//! JSON shapes returned by the API, assembled from stored records.
use std::collections::HashMap;

use serde::Serialize;

use super::mongo::types::{Ingredient, IngredientId, Recipe, RecipeId, Tag, TagId, User, UserId};
use super::store::{
    CartRepository, CatalogRepository, Db, FavoriteRepository, RecipeFilter, RecipeRepository,
    RepoError, UserRepository,
};

pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        TagView {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        IngredientView {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientAmountView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<TagView>,
    pub author: Option<UserView>,
    pub ingredients: Vec<IngredientAmountView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub created_at: String,
}

/// Compact form used in favorite, cart and subscription responses.
#[derive(Debug, Serialize)]
pub struct RecipeShortView {
    pub id: RecipeId,
    pub name: String,
    pub cooking_time: u32,
}

impl From<&Recipe> for RecipeShortView {
    fn from(recipe: &Recipe) -> Self {
        RecipeShortView {
            id: recipe.id,
            name: recipe.name.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: usize,
}

pub fn user_view(db: &Db, user: User, viewer: Option<UserId>) -> Result<UserView, RepoError> {
    let is_subscribed = match viewer {
        Some(viewer) if viewer != user.id => db.is_subscribed(viewer, user.id)?,
        _ => false,
    };
    Ok(UserView {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    })
}

pub fn recipe_view(db: &Db, recipe: Recipe, viewer: Option<UserId>) -> Result<RecipeView, RepoError> {
    let author = match db.get_user(recipe.author)? {
        Some(user) => Some(user_view(db, user, viewer)?),
        None => None,
    };
    let mut known_tags: HashMap<TagId, Tag> = db
        .find_tags_by_ids(&recipe.tags)?
        .into_iter()
        .map(|tag| (tag.id, tag))
        .collect();
    // Keeps the order the author gave the tags in.
    let tags = recipe
        .tags
        .iter()
        .filter_map(|id| known_tags.remove(id))
        .map(TagView::from)
        .collect();

    let ingredient_ids: Vec<IngredientId> =
        recipe.ingredients.iter().map(|line| line.ingredient).collect();
    let known: HashMap<IngredientId, Ingredient> = db
        .find_ingredients_by_ids(&ingredient_ids)?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();
    let ingredients = recipe
        .ingredients
        .iter()
        .filter_map(|line| {
            known.get(&line.ingredient).map(|ingredient| IngredientAmountView {
                id: ingredient.id,
                name: ingredient.name.clone(),
                measurement_unit: ingredient.measurement_unit.clone(),
                amount: line.amount,
            })
        })
        .collect();

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            db.is_favorited(viewer, recipe.id)?,
            db.is_in_cart(viewer, recipe.id)?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at.format(CREATED_AT_FORMAT).to_string(),
    })
}

pub fn recipe_views(
    db: &Db,
    recipes: Vec<Recipe>,
    viewer: Option<UserId>,
) -> Result<Vec<RecipeView>, RepoError> {
    recipes
        .into_iter()
        .map(|recipe| recipe_view(db, recipe, viewer))
        .collect()
}

/// Author as seen by a subscriber, with at most `recipes_limit` of their newest recipes.
pub fn subscription_view(
    db: &Db,
    author: User,
    viewer: UserId,
    recipes_limit: Option<usize>,
) -> Result<SubscriptionView, RepoError> {
    let recipes = db.list_recipes(&RecipeFilter {
        author: Some(author.id),
        ..RecipeFilter::default()
    })?;
    let recipes_count = recipes.len();
    let shown = recipes_limit.unwrap_or(recipes_count);
    Ok(SubscriptionView {
        author: user_view(db, author, Some(viewer))?,
        recipes: recipes.iter().take(shown).map(RecipeShortView::from).collect(),
        recipes_count,
    })
}
