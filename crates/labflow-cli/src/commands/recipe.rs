//! Recipe management CLI commands.

use clap::Subcommand;
use labflow_core::recipes::{Recipe, RecipeStore};

use super::CliResult;
use crate::session::Session;

#[derive(Subcommand)]
pub enum RecipeAction {
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe's steps and whether it still validates
    Show {
        /// Recipe name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe by name
    Remove {
        /// Recipe name to remove
        name: String,
    },
    /// Rename a recipe
    Rename {
        from: String,
        to: String,
    },
}

pub fn run(action: RecipeAction, session: &mut Session) -> CliResult {
    match action {
        RecipeAction::List { json } => list_recipes(session, json),
        RecipeAction::Show { name, json } => show_recipe(session, &name, json),
        RecipeAction::Remove { name } => {
            session.store.remove(&name)?;
            println!("Recipe '{name}' removed.");
            Ok(())
        }
        RecipeAction::Rename { from, to } => {
            session.store.rename(&from, &to)?;
            println!("Recipe '{from}' renamed to '{to}'.");
            Ok(())
        }
    }
}

fn list_recipes(session: &Session, json: bool) -> CliResult {
    let recipes = session.store.load_all()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        println!("No recipes found.");
        return Ok(());
    }

    println!("Recipes ({}):", recipes.len());
    for recipe in &recipes {
        let variables = recipe.variables();
        let vars = if variables.is_empty() {
            String::new()
        } else {
            format!(" [{}]", variables.into_iter().collect::<Vec<_>>().join(", "))
        };
        println!("  {} ({} step(s)){vars}", recipe.name, recipe.steps.len());
        if !recipe.description.is_empty() {
            println!("    {}", recipe.description);
        }
    }
    Ok(())
}

fn show_recipe(session: &Session, name: &str, json: bool) -> CliResult {
    let recipe = session.store.get(name)?;
    let validation = recipe.validate(&session.registry);

    if json {
        let value = serde_json::json!({
            "recipe": recipe,
            "variables": recipe.variables(),
            "valid": validation.is_ok(),
            "problem": validation.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_recipe(&recipe);
    match validation {
        Ok(()) => println!("Valid."),
        Err(e) => println!("Invalid: {e}"),
    }
    Ok(())
}

fn print_recipe(recipe: &Recipe) {
    println!("{}", recipe.name);
    if !recipe.description.is_empty() {
        println!("  {}", recipe.description);
    }
    println!("  updated {}", recipe.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    for (i, step) in recipe.steps.iter().enumerate() {
        let bindings = step
            .bindings
            .iter()
            .map(|(param, binding)| format!("{param}={binding}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {}. {} {bindings}", i + 1, step.action);
    }
    let variables = recipe.variables();
    if !variables.is_empty() {
        println!(
            "  variables: {}",
            variables.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
}
