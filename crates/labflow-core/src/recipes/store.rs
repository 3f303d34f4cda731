//! Recipe storage and persistence.
//!
//! Recipes live in one TOML file under the data directory. Every write
//! replaces the whole file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{Result, StoreError};
use super::recipe::Recipe;
use crate::storage::data_dir;

/// Persistence for named recipes.
///
/// Implementors supply `load_all`/`save_all`; the rest is derived.
pub trait RecipeStore {
    fn load_all(&self) -> Result<Vec<Recipe>>;

    fn save_all(&mut self, recipes: &[Recipe]) -> Result<()>;

    fn load(&self, name: &str) -> Result<Option<Recipe>> {
        Ok(self.load_all()?.into_iter().find(|r| r.name == name))
    }

    /// Like [`load`](Self::load) but a missing recipe is an error.
    fn get(&self, name: &str) -> Result<Recipe> {
        self.load(name)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.load_all()?.into_iter().map(|r| r.name).collect())
    }

    /// Insert or replace by name. Returns true if a recipe was replaced.
    fn save(&mut self, mut recipe: Recipe) -> Result<bool> {
        recipe.updated_at = Utc::now();
        let mut recipes = self.load_all()?;
        let replaced = match recipes.iter_mut().find(|r| r.name == recipe.name) {
            Some(existing) => {
                *existing = recipe;
                true
            }
            None => {
                recipes.push(recipe);
                false
            }
        };
        self.save_all(&recipes)?;
        Ok(replaced)
    }

    fn remove(&mut self, name: &str) -> Result<Recipe> {
        let mut recipes = self.load_all()?;
        let index = recipes
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let removed = recipes.remove(index);
        self.save_all(&recipes)?;
        Ok(removed)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let mut recipes = self.load_all()?;
        if recipes.iter().any(|r| r.name == to) {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        let recipe = recipes
            .iter_mut()
            .find(|r| r.name == from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        recipe.name = to.to_string();
        recipe.updated_at = Utc::now();
        self.save_all(&recipes)
    }
}

/// Wrapper for serializing recipes to TOML
#[derive(Serialize, Deserialize, Default)]
struct RecipesFile {
    #[serde(default)]
    recipes: Vec<Recipe>,
}

/// File-backed store (`recipes.toml`)
#[derive(Debug, Clone)]
pub struct TomlRecipeStore {
    path: PathBuf,
}

impl TomlRecipeStore {
    /// Open the store at `<data dir>/<file_name>`
    pub fn open(file_name: &str) -> Result<Self> {
        let dir = data_dir().map_err(|e| StoreError::DataDirError(e.to_string()))?;
        Ok(Self::with_path(dir.join(file_name)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the recipes file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecipeStore for TomlRecipeStore {
    fn load_all(&self) -> Result<Vec<Recipe>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: RecipesFile = toml::from_str(&content)?;
        Ok(file.recipes)
    }

    fn save_all(&mut self, recipes: &[Recipe]) -> Result<()> {
        let file = RecipesFile {
            recipes: recipes.to_vec(),
        };
        let content = toml::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), count = recipes.len(), "recipes saved");
        Ok(())
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryRecipeStore {
    recipes: Vec<Recipe>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecipeStore for MemoryRecipeStore {
    fn load_all(&self) -> Result<Vec<Recipe>> {
        Ok(self.recipes.clone())
    }

    fn save_all(&mut self, recipes: &[Recipe]) -> Result<()> {
        self.recipes = recipes.to_vec();
        Ok(())
    }
}
