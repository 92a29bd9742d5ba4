use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type RecipeId = i64;
pub type TagId = i64;
pub type IngredientId = i64;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Token issued by the identity service, keyed by its value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Token {
    #[serde(rename = "_id")]
    pub key: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Tag {
    #[serde(rename = "_id")]
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Ingredient {
    #[serde(rename = "_id")]
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

/// Quantity of one ingredient required by one recipe.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct IngredientLine {
    pub ingredient: IngredientId,
    pub amount: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: RecipeId,
    pub author: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientLine>,
}

/// Ingredient line joined with its ingredient, as consumed by the shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub recipe_id: RecipeId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CartEntry {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Favorite {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub author_id: UserId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}
