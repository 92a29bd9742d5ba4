//! In-process repository used by the unit and HTTP tests.
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, TimeZone, Utc};
use mongodb::bson::document::ValueAccessError;

use super::mongo::types::{
    Ingredient, IngredientId, IngredientLine, LineRecord, Recipe, RecipeId, Tag, TagId, User,
    UserId,
};
use super::store::{
    join_lines, CartRepository, CatalogRepository, FavoriteRepository, IngredientLineRepository,
    NewRecipe, RecipeFilter, RecipeRepository, RepoError, UserRepository,
};

#[derive(Default)]
struct Data {
    users: Vec<User>,
    tokens: Vec<(String, UserId)>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    cart: Vec<(UserId, RecipeId)>,
    favorites: Vec<(UserId, RecipeId)>,
    subscriptions: Vec<(UserId, UserId)>,
    next_recipe: RecipeId,
    tokens_unavailable: bool,
}

#[derive(Default)]
pub struct MemoryRep {
    data: Mutex<Data>,
}

impl MemoryRep {
    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    pub fn with_user(self, id: UserId, username: &str, token: &str) -> Self {
        {
            let mut data = self.data();
            data.users.push(User {
                id,
                email: format!("{username}@example.com"),
                username: username.into(),
                first_name: username.into(),
                last_name: "Tester".into(),
            });
            data.tokens.push((token.into(), id));
        }
        self
    }

    pub fn with_tag(self, id: TagId, name: &str, slug: &str) -> Self {
        self.data().tags.push(Tag {
            id,
            name: name.into(),
            slug: slug.into(),
        });
        self
    }

    pub fn with_ingredient(self, id: IngredientId, name: &str, unit: &str) -> Self {
        self.data().ingredients.push(Ingredient {
            id,
            name: name.into(),
            measurement_unit: unit.into(),
        });
        self
    }

    /// Stores a recipe under an explicit identifier.
    pub fn with_recipe(self, id: RecipeId, author: UserId, lines: &[(IngredientId, u32)]) -> Self {
        {
            let mut data = self.data();
            data.recipes.push(Recipe {
                id,
                author,
                name: format!("recipe {id}"),
                text: "mix and serve".into(),
                cooking_time: 10,
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(id),
                tags: vec![],
                ingredients: lines
                    .iter()
                    .map(|&(ingredient, amount)| IngredientLine { ingredient, amount })
                    .collect(),
            });
            data.recipes.sort_by_key(|r| r.id);
            data.next_recipe = data.next_recipe.max(id);
        }
        self
    }

    /// Makes every token lookup fail as a broken store would.
    pub fn with_token_outage(self) -> Self {
        self.data().tokens_unavailable = true;
        self
    }

    pub fn with_cart(self, user_id: UserId, recipe_id: RecipeId) -> Self {
        self.data().cart.push((user_id, recipe_id));
        self
    }
}

fn toggle_on(pairs: &mut Vec<(i64, i64)>, pair: (i64, i64)) -> bool {
    if pairs.contains(&pair) {
        return false;
    }
    pairs.push(pair);
    true
}

fn toggle_off(pairs: &mut Vec<(i64, i64)>, pair: (i64, i64)) -> bool {
    let before = pairs.len();
    pairs.retain(|p| *p != pair);
    pairs.len() != before
}

impl RecipeRepository for MemoryRep {
    fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError> {
        Ok(self.data().recipes.iter().find(|r| r.id == id).cloned())
    }

    fn find_recipes_by_ids(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, RepoError> {
        Ok(self
            .data()
            .recipes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn recipe_ids(&self) -> Result<Vec<RecipeId>, RepoError> {
        Ok(self.data().recipes.iter().map(|r| r.id).collect())
    }

    fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, RepoError> {
        let data = self.data();
        let tag_ids: Vec<TagId> = data
            .tags
            .iter()
            .filter(|t| filter.tags.contains(&t.slug))
            .map(|t| t.id)
            .collect();
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut recipes: Vec<Recipe> = data
            .recipes
            .iter()
            .filter(|r| filter.author.map_or(true, |a| r.author == a))
            .filter(|r| filter.tags.is_empty() || r.tags.iter().any(|t| tag_ids.contains(t)))
            .filter(|r| {
                search
                    .as_deref()
                    .map_or(true, |s| r.name.to_lowercase().contains(s))
            })
            .filter(|r| {
                filter
                    .favorited_by
                    .map_or(true, |u| data.favorites.contains(&(u, r.id)))
            })
            .filter(|r| filter.in_cart_of.map_or(true, |u| data.cart.contains(&(u, r.id))))
            .cloned()
            .collect();
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(recipes)
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError> {
        let mut data = self.data();
        data.next_recipe += 1;
        let recipe = Recipe {
            id: data.next_recipe,
            author: recipe.author,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            created_at: Utc::now(),
            tags: recipe.tags,
            ingredients: recipe.ingredients,
        };
        data.recipes.push(recipe.clone());
        Ok(recipe)
    }

    fn replace_recipe(&self, recipe: &Recipe) -> Result<(), RepoError> {
        let mut data = self.data();
        if let Some(stored) = data.recipes.iter_mut().find(|r| r.id == recipe.id) {
            *stored = recipe.clone();
        }
        Ok(())
    }

    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError> {
        let mut data = self.data();
        let before = data.recipes.len();
        data.recipes.retain(|r| r.id != id);
        if data.recipes.len() == before {
            return Ok(false);
        }
        data.cart.retain(|&(_, r)| r != id);
        data.favorites.retain(|&(_, r)| r != id);
        Ok(true)
    }
}

impl CartRepository for MemoryRep {
    fn find_cart_recipes(&self, user_id: UserId) -> Result<Vec<RecipeId>, RepoError> {
        let mut ids: Vec<RecipeId> = self
            .data()
            .cart
            .iter()
            .filter(|&&(u, _)| u == user_id)
            .map(|&(_, r)| r)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn add_to_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(toggle_on(&mut self.data().cart, (user_id, recipe_id)))
    }

    fn remove_from_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(toggle_off(&mut self.data().cart, (user_id, recipe_id)))
    }

    fn is_in_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(self.data().cart.contains(&(user_id, recipe_id)))
    }
}

impl IngredientLineRepository for MemoryRep {
    fn find_ingredient_lines(&self, recipe_ids: &[RecipeId]) -> Result<Vec<LineRecord>, RepoError> {
        let recipes = self.find_recipes_by_ids(recipe_ids)?;
        let data = self.data();
        Ok(join_lines(&recipes, &data.ingredients))
    }
}

impl FavoriteRepository for MemoryRep {
    fn add_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(toggle_on(&mut self.data().favorites, (user_id, recipe_id)))
    }

    fn remove_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(toggle_off(&mut self.data().favorites, (user_id, recipe_id)))
    }

    fn is_favorited(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        Ok(self.data().favorites.contains(&(user_id, recipe_id)))
    }
}

impl CatalogRepository for MemoryRep {
    fn list_tags(&self) -> Result<Vec<Tag>, RepoError> {
        Ok(self.data().tags.clone())
    }

    fn get_tag(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        Ok(self.data().tags.iter().find(|t| t.id == id).cloned())
    }

    fn find_tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>, RepoError> {
        Ok(self
            .data()
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    fn list_ingredients(&self, search: Option<&str>) -> Result<Vec<Ingredient>, RepoError> {
        let search = search.map(str::to_lowercase);
        Ok(self
            .data()
            .ingredients
            .iter()
            .filter(|i| {
                search
                    .as_deref()
                    .map_or(true, |s| i.name.to_lowercase().contains(s))
            })
            .cloned()
            .collect())
    }

    fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError> {
        Ok(self.data().ingredients.iter().find(|i| i.id == id).cloned())
    }

    fn find_ingredients_by_ids(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, RepoError> {
        Ok(self
            .data()
            .ingredients
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }
}

impl UserRepository for MemoryRep {
    fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.data().users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepoError> {
        let user_id = {
            let data = self.data();
            if data.tokens_unavailable {
                return Err(ValueAccessError::NotPresent.into());
            }
            data.tokens
                .iter()
                .find(|(k, _)| k == key)
                .map(|&(_, id)| id)
        };
        match user_id {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(toggle_on(&mut self.data().subscriptions, (user_id, author_id)))
    }

    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(toggle_off(&mut self.data().subscriptions, (user_id, author_id)))
    }

    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(self.data().subscriptions.contains(&(user_id, author_id)))
    }

    fn subscribed_authors(&self, user_id: UserId) -> Result<Vec<User>, RepoError> {
        let data = self.data();
        Ok(data
            .users
            .iter()
            .filter(|u| data.subscriptions.contains(&(user_id, u.id)))
            .cloned()
            .collect())
    }
}
