//! Shopping list built from the recipes in a user's cart.
//!
//! Lines are grouped by ingredient name and measurement unit rather than by
//! ingredient id, so two ingredient records spelled the same way end up on a
//! single row. Nothing is cached: every call reads the cart again.
use std::collections::{hash_map::Entry, HashMap};

use tracing::debug;

use crate::infra::mongo::types::{LineRecord, UserId};
use crate::infra::store::{CartRepository, IngredientLineRepository, RepoError};

pub const HEADER: &str = "Shopping list:";
pub const FILE_NAME: &str = "shopping_list.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingRow {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub rows: Vec<ShoppingRow>,
}

impl ShoppingList {
    /// Sums `lines` per (name, unit) and orders the groups by name.
    /// Groups sharing a name keep the order in which they were first seen.
    pub fn aggregate(lines: &[LineRecord]) -> Self {
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();
        let mut rows: Vec<ShoppingRow> = Vec::new();

        for line in lines {
            let key = (line.name.as_str(), line.measurement_unit.as_str());
            match index.entry(key) {
                Entry::Occupied(slot) => rows[*slot.get()].total_amount += u64::from(line.amount),
                Entry::Vacant(slot) => {
                    slot.insert(rows.len());
                    rows.push(ShoppingRow {
                        name: line.name.clone(),
                        measurement_unit: line.measurement_unit.clone(),
                        total_amount: u64::from(line.amount),
                    });
                }
            }
        }

        rows.sort_by(|a, b| a.name.cmp(&b.name));
        ShoppingList { rows }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(HEADER.to_string());
        for (i, row) in self.rows.iter().enumerate() {
            lines.push(format!(
                "{}. {} - {} {}",
                i + 1,
                row.name,
                row.total_amount,
                row.measurement_unit
            ));
        }
        lines
    }

    /// Text of the downloadable file, one newline-terminated line per entry.
    pub fn render(&self) -> String {
        self.lines().into_iter().map(|line| line + "\n").collect()
    }
}

pub fn shopping_list<R>(repo: &R, user_id: UserId) -> Result<ShoppingList, RepoError>
where
    R: CartRepository + IngredientLineRepository + ?Sized,
{
    let recipe_ids = repo.find_cart_recipes(user_id)?;
    if recipe_ids.is_empty() {
        return Ok(ShoppingList::default());
    }
    let lines = repo.find_ingredient_lines(&recipe_ids)?;
    let list = ShoppingList::aggregate(&lines);
    debug!(
        user_id,
        recipes = recipe_ids.len(),
        rows = list.rows.len(),
        "built shopping list"
    );
    Ok(list)
}
