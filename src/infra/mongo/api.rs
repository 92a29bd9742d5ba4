use super::types::{
    CartEntry, Counter, Favorite, Ingredient, IngredientId, LineRecord, Recipe, RecipeId,
    Subscription, Tag, TagId, Token, User, UserId,
};
use crate::infra::store::{
    join_lines, CartRepository, CatalogRepository, FavoriteRepository, IngredientLineRepository,
    NewRecipe, RecipeFilter, RecipeRepository, RepoError, UserRepository,
};
use chrono::Utc;
use mongodb::{
    bson::{doc, Document},
    error::{Error as mongoError, ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    sync::{Client, Collection},
    IndexModel,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoRep {
    pub users: Collection<User>,
    pub tokens: Collection<Token>,
    pub tags: Collection<Tag>,
    pub ingredients: Collection<Ingredient>,
    pub recipes: Collection<Recipe>,
    pub shopping_cart: Collection<CartEntry>,
    pub favorites: Collection<Favorite>,
    pub subscriptions: Collection<Subscription>,
    pub counters: Collection<Counter>,
}

impl MongoRep {
    pub fn init(uri: String, database: &str) -> Result<Self, RepoError> {
        let client = Client::with_uri_str(uri)?;
        let database = client.database(database);
        let rep = MongoRep {
            users: database.collection("users"),
            tokens: database.collection("tokens"),
            tags: database.collection("tags"),
            ingredients: database.collection("ingredients"),
            recipes: database.collection("recipes"),
            shopping_cart: database.collection("shopping_cart"),
            favorites: database.collection("favorites"),
            subscriptions: database.collection("subscriptions"),
            counters: database.collection("counters"),
        };
        rep.ensure_indexes()?;
        info!(database = %database.name(), "mongo repository ready");
        Ok(rep)
    }

    fn ensure_indexes(&self) -> Result<(), RepoError> {
        self.shopping_cart
            .create_index(unique_index(doc! {"user_id": 1, "recipe_id": 1}), None)?;
        self.favorites
            .create_index(unique_index(doc! {"user_id": 1, "recipe_id": 1}), None)?;
        self.subscriptions
            .create_index(unique_index(doc! {"user_id": 1, "author_id": 1}), None)?;
        self.tags.create_index(unique_index(doc! {"slug": 1}), None)?;
        self.tags.create_index(unique_index(doc! {"name": 1}), None)?;
        Ok(())
    }

    fn next_id(&self, sequence: &str) -> Result<i64, RepoError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self.counters.find_one_and_update(
            doc! {"_id": sequence},
            doc! {"$inc": {"seq": 1_i64}},
            options,
        )?;
        Ok(counter.map(|c| c.seq).unwrap_or(1))
    }

    fn recipe_ids_where(
        &self,
        collection: &Collection<Document>,
        user_id: UserId,
    ) -> Result<Vec<RecipeId>, RepoError> {
        let options = FindOptions::builder()
            .projection(doc! {"recipe_id": 1})
            .sort(doc! {"recipe_id": 1})
            .build();
        let cursor = collection.find(doc! {"user_id": user_id}, options)?;
        let mut ids = Vec::new();
        for entry in cursor {
            ids.push(entry?.get_i64("recipe_id")?);
        }
        Ok(ids)
    }
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn is_duplicate_key(err: &mongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Maps an insert into a unique collection to `false` when the key already exists.
fn inserted<T>(result: Result<T, mongoError>) -> Result<bool, RepoError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_key(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn collect<T: DeserializeOwned + Unpin + Send + Sync>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
) -> Result<Vec<T>, RepoError> {
    let options = FindOptions::builder().sort(sort).build();
    let cursor = collection.find(filter, options)?;
    Ok(cursor.collect::<Result<Vec<T>, mongoError>>()?)
}

/// Escapes `value` for literal use inside a `$regex`.
fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$-#".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_ignore_case(value: &str) -> Document {
    doc! {"$regex": escape_regex(value), "$options": "i"}
}

impl RecipeRepository for MongoRep {
    fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError> {
        Ok(self.recipes.find_one(doc! {"_id": id}, None)?)
    }

    fn find_recipes_by_ids(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, RepoError> {
        collect(
            &self.recipes,
            doc! {"_id": {"$in": ids.to_vec()}},
            doc! {"_id": 1},
        )
    }

    fn recipe_ids(&self) -> Result<Vec<RecipeId>, RepoError> {
        let options = FindOptions::builder()
            .projection(doc! {"_id": 1})
            .sort(doc! {"_id": 1})
            .build();
        let cursor = self
            .recipes
            .clone_with_type::<Document>()
            .find(None, options)?;
        let mut ids = Vec::new();
        for recipe in cursor {
            ids.push(recipe?.get_i64("_id")?);
        }
        Ok(ids)
    }

    fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, RepoError> {
        let mut query = Document::new();
        if let Some(author) = filter.author {
            query.insert("author", author);
        }
        if !filter.tags.is_empty() {
            let tag_ids: Vec<TagId> = collect(
                &self.tags,
                doc! {"slug": {"$in": filter.tags.clone()}},
                doc! {"_id": 1},
            )?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
            query.insert("tags", doc! {"$in": tag_ids});
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query.insert("name", contains_ignore_case(search));
        }

        let mut allowed: Option<Vec<RecipeId>> = None;
        if let Some(user_id) = filter.favorited_by {
            allowed = Some(self.recipe_ids_where(&self.favorites.clone_with_type(), user_id)?);
        }
        if let Some(user_id) = filter.in_cart_of {
            let in_cart = self.recipe_ids_where(&self.shopping_cart.clone_with_type(), user_id)?;
            allowed = Some(match allowed {
                Some(ids) => ids.into_iter().filter(|id| in_cart.contains(id)).collect(),
                None => in_cart,
            });
        }
        if let Some(ids) = allowed {
            query.insert("_id", doc! {"$in": ids});
        }

        debug!(?query, "listing recipes");
        collect(&self.recipes, query, doc! {"created_at": -1, "_id": -1})
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError> {
        let recipe = Recipe {
            id: self.next_id("recipes")?,
            author: recipe.author,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            created_at: Utc::now(),
            tags: recipe.tags,
            ingredients: recipe.ingredients,
        };
        self.recipes.insert_one(&recipe, None)?;
        Ok(recipe)
    }

    fn replace_recipe(&self, recipe: &Recipe) -> Result<(), RepoError> {
        self.recipes
            .replace_one(doc! {"_id": recipe.id}, recipe, None)?;
        Ok(())
    }

    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError> {
        let result = self.recipes.delete_one(doc! {"_id": id}, None)?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.shopping_cart
            .delete_many(doc! {"recipe_id": id}, None)?;
        self.favorites.delete_many(doc! {"recipe_id": id}, None)?;
        Ok(true)
    }
}

impl CartRepository for MongoRep {
    fn find_cart_recipes(&self, user_id: UserId) -> Result<Vec<RecipeId>, RepoError> {
        self.recipe_ids_where(&self.shopping_cart.clone_with_type(), user_id)
    }

    fn add_to_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        inserted(
            self.shopping_cart
                .insert_one(CartEntry { user_id, recipe_id }, None),
        )
    }

    fn remove_from_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        let result = self
            .shopping_cart
            .delete_one(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(result.deleted_count > 0)
    }

    fn is_in_cart(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        let count = self
            .shopping_cart
            .count_documents(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(count > 0)
    }
}

impl IngredientLineRepository for MongoRep {
    fn find_ingredient_lines(&self, recipe_ids: &[RecipeId]) -> Result<Vec<LineRecord>, RepoError> {
        let recipes = self.find_recipes_by_ids(recipe_ids)?;
        let mut ingredient_ids: Vec<IngredientId> = recipes
            .iter()
            .flat_map(|recipe| recipe.ingredients.iter().map(|line| line.ingredient))
            .collect();
        ingredient_ids.sort_unstable();
        ingredient_ids.dedup();
        let ingredients = self.find_ingredients_by_ids(&ingredient_ids)?;
        Ok(join_lines(&recipes, &ingredients))
    }
}

impl FavoriteRepository for MongoRep {
    fn add_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        inserted(self.favorites.insert_one(Favorite { user_id, recipe_id }, None))
    }

    fn remove_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        let result = self
            .favorites
            .delete_one(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(result.deleted_count > 0)
    }

    fn is_favorited(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool, RepoError> {
        let count = self
            .favorites
            .count_documents(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(count > 0)
    }
}

impl CatalogRepository for MongoRep {
    fn list_tags(&self) -> Result<Vec<Tag>, RepoError> {
        collect(&self.tags, doc! {}, doc! {"_id": 1})
    }

    fn get_tag(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        Ok(self.tags.find_one(doc! {"_id": id}, None)?)
    }

    fn find_tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>, RepoError> {
        collect(&self.tags, doc! {"_id": {"$in": ids.to_vec()}}, doc! {"_id": 1})
    }

    fn list_ingredients(&self, search: Option<&str>) -> Result<Vec<Ingredient>, RepoError> {
        let query = match search.filter(|s| !s.is_empty()) {
            Some(search) => doc! {"name": contains_ignore_case(search)},
            None => doc! {},
        };
        collect(&self.ingredients, query, doc! {"_id": 1})
    }

    fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError> {
        Ok(self.ingredients.find_one(doc! {"_id": id}, None)?)
    }

    fn find_ingredients_by_ids(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, RepoError> {
        collect(
            &self.ingredients,
            doc! {"_id": {"$in": ids.to_vec()}},
            doc! {"_id": 1},
        )
    }
}

impl UserRepository for MongoRep {
    fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.find_one(doc! {"_id": id}, None)?)
    }

    fn find_user_by_token(&self, key: &str) -> Result<Option<User>, RepoError> {
        match self.tokens.find_one(doc! {"_id": key}, None)? {
            Some(token) => self.get_user(token.user_id),
            None => Ok(None),
        }
    }

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        inserted(
            self.subscriptions
                .insert_one(Subscription { user_id, author_id }, None),
        )
    }

    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let result = self
            .subscriptions
            .delete_one(doc! {"user_id": user_id, "author_id": author_id}, None)?;
        Ok(result.deleted_count > 0)
    }

    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let count = self
            .subscriptions
            .count_documents(doc! {"user_id": user_id, "author_id": author_id}, None)?;
        Ok(count > 0)
    }

    fn subscribed_authors(&self, user_id: UserId) -> Result<Vec<User>, RepoError> {
        let author_ids: Vec<UserId> = collect(
            &self.subscriptions,
            doc! {"user_id": user_id},
            doc! {"author_id": 1},
        )?
        .into_iter()
        .map(|s| s.author_id)
        .collect();
        collect(&self.users, doc! {"_id": {"$in": author_ids}}, doc! {"_id": 1})
    }
}
