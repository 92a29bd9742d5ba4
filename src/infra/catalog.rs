use rocket::serde::json::Json;
use rocket::{get, State};

use super::error::ApiError;
use super::mongo::types::{IngredientId, TagId};
use super::store::{CatalogRepository, Db};
use super::views::{IngredientView, TagView};

#[get("/tags")]
pub fn list_tags(db: &State<Db>) -> Result<Json<Vec<TagView>>, ApiError> {
    let tags = db.list_tags()?;
    Ok(Json(tags.into_iter().map(TagView::from).collect()))
}

#[get("/tags/<id>")]
pub fn get_tag(db: &State<Db>, id: TagId) -> Result<Json<TagView>, ApiError> {
    match db.get_tag(id)? {
        Some(tag) => Ok(Json(tag.into())),
        None => Err(ApiError::NotFound("Tag not found")),
    }
}

#[get("/ingredients?<search>")]
pub fn list_ingredients(
    db: &State<Db>,
    search: Option<&str>,
) -> Result<Json<Vec<IngredientView>>, ApiError> {
    let ingredients = db.list_ingredients(search)?;
    Ok(Json(ingredients.into_iter().map(IngredientView::from).collect()))
}

#[get("/ingredients/<id>")]
pub fn get_ingredient(db: &State<Db>, id: IngredientId) -> Result<Json<IngredientView>, ApiError> {
    match db.get_ingredient(id)? {
        Some(ingredient) => Ok(Json(ingredient.into())),
        None => Err(ApiError::NotFound("Ingredient not found")),
    }
}
