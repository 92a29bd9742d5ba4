//! Short codes for sharing recipes.
//!
//! A code is the first six hex digits of the MD5 of the recipe id written in
//! decimal. Nothing is persisted: resolving a code recomputes the code of every
//! recipe in ascending id order and returns the first match, so on a collision
//! the lowest id wins.
use md5::{Digest, Md5};
use thiserror::Error;
use tracing::debug;

use crate::infra::mongo::types::RecipeId;
use crate::infra::store::{RecipeRepository, RepoError};

pub const CODE_LEN: usize = 6;

#[derive(Error, Debug)]
pub enum ShortLinkError {
    #[error("no recipe matches short code {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] RepoError),
}

pub fn generate(id: RecipeId) -> String {
    let digest = Md5::digest(id.to_string().as_bytes());
    let mut code = hex::encode(digest);
    code.truncate(CODE_LEN);
    code
}

/// Full shareable URL for `id` under `base_url`.
pub fn short_url(base_url: &str, id: RecipeId) -> String {
    format!("{}/r/{}", base_url, generate(id))
}

fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

pub fn resolve<R>(repo: &R, code: &str) -> Result<RecipeId, ShortLinkError>
where
    R: RecipeRepository + ?Sized,
{
    if !is_well_formed(code) {
        return Err(ShortLinkError::NotFound(code.to_string()));
    }
    let ids = repo.recipe_ids()?;
    let scanned = ids.len();
    match ids.into_iter().find(|&id| generate(id) == code) {
        Some(id) => {
            debug!(code, id, "resolved short link");
            Ok(id)
        }
        None => {
            debug!(code, scanned, "short link matched no recipe");
            Err(ShortLinkError::NotFound(code.to_string()))
        }
    }
}
