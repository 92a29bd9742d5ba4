use rocket::http::{Header, Status};
use rocket::response::{status, Redirect};
use rocket::serde::json::{json, Json, Value};
use rocket::{delete, get, patch, post, Responder, State};
use tracing::{debug, info};

use super::auth::{CurrentUser, Viewer};
use super::error::ApiError;
use super::mongo::types::{Recipe, RecipeId, UserId};
use super::payload::RecipePayload;
use super::store::{
    CartRepository, Db, FavoriteRepository, RecipeFilter, RecipeRepository, Repository,
};
use super::views::{recipe_view, recipe_views, RecipeShortView, RecipeView};
use crate::config::Config;
use crate::shopping::{shopping_list, FILE_NAME};
use crate::short_link::{resolve, short_url};

#[derive(Responder)]
#[response(content_type = "plain")]
pub struct ShoppingListFile {
    body: String,
    disposition: Header<'static>,
}

fn find_recipe(db: &Db, id: RecipeId) -> Result<Recipe, ApiError> {
    db.get_recipe(id)?.ok_or(ApiError::NotFound("Recipe not found"))
}

fn recipe_location(id: RecipeId) -> String {
    format!("/api/recipes/{id}")
}

#[get("/recipes?<author>&<tags>&<is_favorited>&<is_in_shopping_cart>&<search>")]
pub fn list_recipes(
    db: &State<Db>,
    viewer: Viewer,
    author: Option<UserId>,
    tags: Option<Vec<String>>,
    is_favorited: Option<&str>,
    is_in_shopping_cart: Option<&str>,
    search: Option<String>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let viewer = viewer.id();
    let only_for_viewer = |flag: Option<&str>| viewer.filter(|_| flag == Some("1"));
    let filter = RecipeFilter {
        author,
        tags: tags.unwrap_or_default(),
        search,
        favorited_by: only_for_viewer(is_favorited),
        in_cart_of: only_for_viewer(is_in_shopping_cart),
    };
    let recipes = db.list_recipes(&filter)?;
    Ok(Json(recipe_views(db, recipes, viewer)?))
}

#[get("/recipes/<id>")]
pub fn get_recipe(
    db: &State<Db>,
    viewer: Viewer,
    id: RecipeId,
) -> Result<Json<RecipeView>, ApiError> {
    let recipe = find_recipe(db, id)?;
    Ok(Json(recipe_view(db, recipe, viewer.id())?))
}

#[post("/recipes", data = "<payload>")]
pub fn create_recipe(
    db: &State<Db>,
    user: CurrentUser,
    payload: Json<Value>,
) -> Result<status::Created<Json<RecipeView>>, ApiError> {
    let new_recipe =
        RecipePayload::from_json(payload.into_inner())?.into_new_recipe(db, user.id())?;
    let recipe = db.insert_recipe(new_recipe)?;
    info!(recipe_id = recipe.id, author = user.id(), "recipe created");
    let location = recipe_location(recipe.id);
    Ok(status::Created::new(location).body(Json(recipe_view(db, recipe, Some(user.id()))?)))
}

#[patch("/recipes/<id>", data = "<payload>")]
pub fn update_recipe(
    db: &State<Db>,
    user: CurrentUser,
    id: RecipeId,
    payload: Json<Value>,
) -> Result<Json<RecipeView>, ApiError> {
    let mut recipe = find_recipe(db, id)?;
    if recipe.author != user.id() {
        return Err(ApiError::Forbidden);
    }
    RecipePayload::from_json(payload.into_inner())?
        .validate(db)?
        .apply(&mut recipe);
    db.replace_recipe(&recipe)?;
    Ok(Json(recipe_view(db, recipe, Some(user.id()))?))
}

#[delete("/recipes/<id>")]
pub fn delete_recipe(db: &State<Db>, user: CurrentUser, id: RecipeId) -> Result<Status, ApiError> {
    let recipe = find_recipe(db, id)?;
    if recipe.author != user.id() {
        return Err(ApiError::Forbidden);
    }
    db.delete_recipe(id)?;
    info!(recipe_id = id, "recipe deleted");
    Ok(Status::NoContent)
}

#[post("/recipes/<id>/favorite")]
pub fn add_favorite(
    db: &State<Db>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<status::Created<Json<RecipeShortView>>, ApiError> {
    let recipe = find_recipe(db, id)?;
    if !db.add_favorite(user.id(), id)? {
        return Err(ApiError::BadRequest("Recipe is already in favorites."));
    }
    Ok(status::Created::new(recipe_location(id)).body(Json(RecipeShortView::from(&recipe))))
}

#[delete("/recipes/<id>/favorite")]
pub fn remove_favorite(db: &State<Db>, user: CurrentUser, id: RecipeId) -> Result<Status, ApiError> {
    find_recipe(db, id)?;
    if !db.remove_favorite(user.id(), id)? {
        return Err(ApiError::BadRequest("Recipe is not in favorites."));
    }
    Ok(Status::NoContent)
}

#[post("/recipes/<id>/shopping_cart")]
pub fn add_to_cart(
    db: &State<Db>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<status::Created<Json<RecipeShortView>>, ApiError> {
    let recipe = find_recipe(db, id)?;
    if !db.add_to_cart(user.id(), id)? {
        return Err(ApiError::BadRequest("Recipe is already in the shopping list."));
    }
    debug!(user_id = user.id(), recipe_id = id, "added to cart");
    Ok(status::Created::new(recipe_location(id)).body(Json(RecipeShortView::from(&recipe))))
}

#[delete("/recipes/<id>/shopping_cart")]
pub fn remove_from_cart(
    db: &State<Db>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<Status, ApiError> {
    find_recipe(db, id)?;
    if !db.remove_from_cart(user.id(), id)? {
        return Err(ApiError::BadRequest("Recipe is not in the shopping list."));
    }
    debug!(user_id = user.id(), recipe_id = id, "removed from cart");
    Ok(Status::NoContent)
}

#[get("/recipes/download_shopping_cart")]
pub fn download_shopping_cart(
    db: &State<Db>,
    user: CurrentUser,
) -> Result<ShoppingListFile, ApiError> {
    let repo: &dyn Repository = db.inner().as_ref();
    let list = shopping_list(repo, user.id())?;
    Ok(ShoppingListFile {
        body: list.render(),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{FILE_NAME}\""),
        ),
    })
}

#[get("/recipes/<id>/get-link")]
pub fn get_short_link(
    db: &State<Db>,
    config: &State<Config>,
    id: RecipeId,
) -> Result<Json<Value>, ApiError> {
    find_recipe(db, id)?;
    Ok(Json(json!({ "short-link": short_url(&config.base_url, id) })))
}

#[get("/r/<code>")]
pub fn resolve_short_link(db: &State<Db>, code: &str) -> Result<Redirect, ApiError> {
    let repo: &dyn Repository = db.inner().as_ref();
    let id = resolve(repo, code)?;
    Ok(Redirect::found(recipe_location(id)))
}
