//! Integration tests for the define, save, reload and run path.

use labflow_core::actions::{register_builtin_actions, ActionRegistry, Invoker, RawArgs};
use labflow_core::context::ExecutionContext;
use labflow_core::devices::{DeviceRegistry, SimulatedInstrument};
use labflow_core::recipes::{RecipeBuilder, RecipeStore, TomlRecipeStore, Turn};
use labflow_core::sweep::{LoopExecutor, LoopSpec, Silent};

fn builtins() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_builtin_actions(&mut registry).unwrap();
    registry
}

fn args(pairs: &[(&str, &str)]) -> RawArgs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Define and persist
// ============================================================================

#[test]
fn test_defined_recipe_survives_reload() {
    let registry = builtins();
    let dir = tempfile::tempdir().unwrap();
    let mut store = TomlRecipeStore::with_path(dir.path().join("recipes.toml"));

    let mut builder = RecipeBuilder::new(&registry, "warmup")
        .unwrap()
        .with_description("ramp the platform");
    assert_eq!(builder.begin_step("set-temperature").unwrap(), Turn::NeedValue(
        registry.lookup("set-temperature").unwrap().parameters[0].clone(),
    ));
    builder.supply("{kelvin}").unwrap();
    builder.supply("").unwrap();
    builder
        .add_step("note", &args(&[("message", "at {{kelvin}} = {kelvin} K")]))
        .unwrap();
    let Turn::Committed(recipe) = builder.begin_step("finish").unwrap() else {
        panic!("expected commit");
    };

    assert!(!store.save(recipe.clone()).unwrap());
    let reloaded = store.get("warmup").unwrap();
    assert_eq!(reloaded.steps, recipe.steps);
    assert_eq!(reloaded.description, "ramp the platform");
    assert_eq!(
        reloaded.steps[1].bindings["message"].as_str(),
        "at {{kelvin}} = {kelvin} K"
    );
    assert!(reloaded.validate(&registry).is_ok());
}

#[test]
fn test_aborted_definition_saves_nothing() {
    let registry = builtins();
    let dir = tempfile::tempdir().unwrap();
    let store = TomlRecipeStore::with_path(dir.path().join("recipes.toml"));

    let mut builder = RecipeBuilder::new(&registry, "broken").unwrap();
    builder.add_step("wait", &args(&[("seconds", "1")])).unwrap();
    assert!(builder.begin_step("teleport").is_err());
    assert!(builder.begin_step("finish").is_err());

    assert!(store.names().unwrap().is_empty());
}

// ============================================================================
// Run a reloaded recipe
// ============================================================================

#[tokio::test]
async fn test_reloaded_recipe_runs_in_loop() {
    let registry = builtins();
    let dir = tempfile::tempdir().unwrap();
    let mut store = TomlRecipeStore::with_path(dir.path().join("recipes.toml"));

    let mut builder = RecipeBuilder::new(&registry, "warmup").unwrap();
    builder
        .add_step("set-temperature", &args(&[("kelvin", "{kelvin}")]))
        .unwrap();
    builder.add_step("read-temperature", &RawArgs::new()).unwrap();
    builder
        .add_step("note", &args(&[("message", "{{done}} {kelvin}")]))
        .unwrap();
    store.save(builder.finish().unwrap()).unwrap();

    let recipe = store.get("warmup").unwrap();
    let mut devices = DeviceRegistry::new();
    devices
        .add(Box::new(SimulatedInstrument::new("cryo-01", "Montana Cryostation")))
        .unwrap();
    let mut ctx = ExecutionContext::with_devices(devices);

    let executor = LoopExecutor::new(Invoker::new(&registry));
    let spec = LoopSpec::new("kelvin", 4.0, 10.0, 3.0);
    let report = executor
        .run(&recipe, &spec, &mut ctx, &mut Silent)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.invocation_count(), 9);
    assert_eq!(ctx.var_f64("last_temperature_k"), Some(10.0));
    assert_eq!(
        ctx.var("notes").unwrap(),
        &serde_json::json!(["{done} 4", "{done} 7", "{done} 10"])
    );
}
