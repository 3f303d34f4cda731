//! State shared by every command of one CLI invocation (or one shell).

use labflow_core::actions::{register_builtin_actions, ActionRegistry, Invoker};
use labflow_core::context::ExecutionContext;
use labflow_core::devices::DeviceRegistry;
use labflow_core::recipes::TomlRecipeStore;
use labflow_core::error::Result;
use labflow_core::Config;
use tracing::{debug, warn};

pub struct Session {
    pub config: Config,
    pub registry: ActionRegistry,
    pub ctx: ExecutionContext,
    pub store: TomlRecipeStore,
}

impl Session {
    /// Load the config, register the built-in actions and connect the
    /// configured equipment. A registration clash is fatal.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;

        let mut registry = ActionRegistry::new();
        register_builtin_actions(&mut registry)?;

        let devices = DeviceRegistry::from_config(&config.equipment)?;
        let store = TomlRecipeStore::with_path(config.recipes_path()?);
        debug!(
            actions = registry.len(),
            devices = devices.len(),
            recipes = %store.path().display(),
            "session ready"
        );

        Ok(Self {
            config,
            registry,
            ctx: ExecutionContext::with_devices(devices),
            store,
        })
    }

    /// Invoker configured with the session timeouts, plus the context to
    /// run it against.
    pub fn split(&mut self) -> (Invoker<'_>, &mut ExecutionContext) {
        let invoker = Invoker::new(&self.registry).with_timeouts(self.config.timeout_policy());
        (invoker, &mut self.ctx)
    }

    /// Re-read the config after `config set` inside a shell.
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = Config::load()?;
        self.store = TomlRecipeStore::with_path(self.config.recipes_path()?);
        Ok(())
    }

    /// Route Ctrl-C to the abort signal. A second Ctrl-C exits at once.
    pub fn watch_interrupts(&self) {
        let signal = self.ctx.abort_signal();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if signal.is_aborted() {
                    eprintln!("interrupted");
                    std::process::exit(130);
                }
                warn!("abort requested; stopping after the current step");
                signal.abort();
            }
        });
    }
}
