use rocket::serde::json::{from_value, Value};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;
use super::mongo::types::{IngredientId, IngredientLine, TagId, UserId};
use super::store::{CatalogRepository, Db, NewRecipe, RecipeChanges};

pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32_000;
pub const MAX_NAME_LEN: usize = 256;

#[derive(Debug, Deserialize)]
pub struct IngredientAmount {
    pub id: IngredientId,
    pub amount: i64,
}

/// Body of recipe create and update requests. Every field is optional so the
/// same shape serves partial updates; creation requires all of them.
#[derive(Debug, Default)]
pub struct RecipePayload {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<TagId>>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// Takes `name` out of `body`, naming the field when its value has the wrong type.
fn field<T: DeserializeOwned>(
    body: &mut Value,
    name: &'static str,
    message: &'static str,
) -> Result<Option<T>, ApiError> {
    match body.get_mut(name).map(Value::take) {
        None => Ok(None),
        Some(Value::Null) => Err(ApiError::invalid(name, "This field may not be null.")),
        Some(value) => from_value(value)
            .map(Some)
            .map_err(|_| ApiError::invalid(name, message)),
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::invalid(field, "This field is required."))
}

fn not_blank(value: String, field: &'static str) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(field, "This field may not be blank."));
    }
    Ok(value)
}

impl RecipePayload {
    /// Decodes a request body field by field so a type mismatch is reported
    /// against the field that caused it.
    pub fn from_json(mut body: Value) -> Result<Self, ApiError> {
        if !body.is_object() {
            return Err(ApiError::invalid(
                "non_field_errors",
                "Invalid data. Expected a dictionary.",
            ));
        }
        Ok(RecipePayload {
            ingredients: field(
                &mut body,
                "ingredients",
                "Expected a list of items with an integer id and amount.",
            )?,
            tags: field(&mut body, "tags", "Expected a list of integer tag ids.")?,
            name: field(&mut body, "name", "Not a valid string.")?,
            text: field(&mut body, "text", "Not a valid string.")?,
            cooking_time: field(&mut body, "cooking_time", "A valid integer is required.")?,
        })
    }

    /// Checks the fields present in the payload against the catalog.
    pub fn validate(self, db: &Db) -> Result<RecipeChanges, ApiError> {
        let ingredients = match self.ingredients {
            Some(amounts) => Some(validate_ingredients(db, amounts)?),
            None => None,
        };
        let tags = match self.tags {
            Some(tags) => Some(validate_tags(db, tags)?),
            None => None,
        };
        let name = match self.name {
            Some(name) => {
                let name = not_blank(name, "name")?;
                if name.chars().count() > MAX_NAME_LEN {
                    return Err(ApiError::invalid(
                        "name",
                        format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
                    ));
                }
                Some(name)
            }
            None => None,
        };
        let text = match self.text {
            Some(text) => Some(not_blank(text, "text")?),
            None => None,
        };
        let cooking_time = match self.cooking_time {
            Some(minutes) => Some(
                u32::try_from(minutes)
                    .ok()
                    .filter(|&m| m >= 1)
                    .ok_or_else(|| {
                        ApiError::invalid(
                            "cooking_time",
                            "Ensure this value is greater than or equal to 1.",
                        )
                    })?,
            ),
            None => None,
        };
        Ok(RecipeChanges {
            name,
            text,
            cooking_time,
            tags,
            ingredients,
        })
    }

    pub fn into_new_recipe(self, db: &Db, author: UserId) -> Result<NewRecipe, ApiError> {
        let changes = self.validate(db)?;
        Ok(NewRecipe {
            author,
            ingredients: required(changes.ingredients, "ingredients")?,
            tags: required(changes.tags, "tags")?,
            name: required(changes.name, "name")?,
            text: required(changes.text, "text")?,
            cooking_time: required(changes.cooking_time, "cooking_time")?,
        })
    }
}

fn validate_ingredients(
    db: &Db,
    amounts: Vec<IngredientAmount>,
) -> Result<Vec<IngredientLine>, ApiError> {
    if amounts.is_empty() {
        return Err(ApiError::invalid(
            "ingredients",
            "At least one ingredient is required.",
        ));
    }
    let ids: Vec<IngredientId> = amounts.iter().map(|a| a.id).collect();
    let known = db.find_ingredients_by_ids(&ids)?;

    let mut lines = Vec::with_capacity(amounts.len());
    for IngredientAmount { id, amount } in amounts {
        if !known.iter().any(|ingredient| ingredient.id == id) {
            return Err(ApiError::invalid(
                "ingredients",
                format!("Ingredient with id {id} not found"),
            ));
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&amount) {
            return Err(ApiError::invalid(
                "ingredients",
                format!("Amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}."),
            ));
        }
        lines.push(IngredientLine {
            ingredient: id,
            amount: amount as u32,
        });
    }
    Ok(lines)
}

fn validate_tags(db: &Db, mut tags: Vec<TagId>) -> Result<Vec<TagId>, ApiError> {
    if tags.is_empty() {
        return Err(ApiError::invalid("tags", "At least one tag is required."));
    }
    let mut seen = Vec::with_capacity(tags.len());
    tags.retain(|id| {
        let fresh = !seen.contains(id);
        seen.push(*id);
        fresh
    });
    let known = db.find_tags_by_ids(&tags)?;
    if let Some(missing) = tags.iter().find(|id| !known.iter().any(|tag| tag.id == **id)) {
        return Err(ApiError::invalid(
            "tags",
            format!("Tag with id {missing} not found"),
        ));
    }
    Ok(tags)
}
