//! Session coordinator and process-wide module registry.
//!
//! A [`Coordinator`] bundles what one session's extension points share: the
//! hook registry, the cancellation token, and the events mounted modules
//! declared. The [`ModuleRegistry`] is the only process-wide state: it is
//! built once, installed, and read thereafter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use tracing::info;

use crate::cancellation::CancellationToken;
use crate::config::HooksConfig;
use crate::error::{KernelError, Result};
use crate::hooks::{HookContext, HookRegistry};
use crate::providers::LLMProvider;
use crate::session::EventLog;
use crate::tools::{Tool, ToolContext, ToolRegistry};

// ============================================================================
// Hook modules
// ============================================================================

/// A bundle of hook handlers installed as a unit.
///
/// `events` is fixed for the module's lifetime and is recorded as the
/// session's declared capabilities when the module is mounted.
pub trait HookModule: Send + Sync {
    fn name(&self) -> &str;

    /// Events this module subscribes to or emits.
    fn events(&self) -> Vec<&'static str>;

    /// Register the module's handlers.
    fn mount(&self, hooks: &HookRegistry) -> Result<()>;
}

// ============================================================================
// Coordinator
// ============================================================================

/// Per-session extension-point state.
#[derive(Debug, Clone)]
pub struct Coordinator {
    session_id: String,
    hooks: Arc<HookRegistry>,
    cancellation: CancellationToken,
    declared_events: Arc<RwLock<Vec<String>>>,
}

impl Coordinator {
    pub fn new(session_id: &str, config: &HooksConfig, event_log: EventLog) -> Self {
        let cancellation = CancellationToken::new();
        let hooks = HookRegistry::new(session_id, cancellation.clone(), config, event_log);
        Self {
            session_id: session_id.to_string(),
            hooks: Arc::new(hooks),
            cancellation,
            declared_events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Mount `module` into this session's hook registry.
    pub fn mount(&self, module: &dyn HookModule) -> Result<()> {
        module.mount(&self.hooks)?;
        let events = module.events();
        info!(module = module.name(), events = ?events, "Mounted hook module");

        let mut declared = self
            .declared_events
            .write()
            .unwrap_or_else(|e| e.into_inner());
        for event in events {
            if !declared.iter().any(|e| e == event) {
                declared.push(event.to_string());
            }
        }
        Ok(())
    }

    /// Events declared by every module mounted so far, in mount order.
    pub fn declared_events(&self) -> Vec<String> {
        self.declared_events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn hook_context(&self) -> HookContext {
        HookContext {
            session_id: self.session_id.clone(),
            cancellation: self.cancellation.clone(),
        }
    }

    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new(&self.session_id, self.cancellation.clone(), Arc::clone(&self.hooks))
    }
}

// ============================================================================
// Module registry
// ============================================================================

static GLOBAL_MODULES: OnceCell<ModuleRegistry> = OnceCell::new();

/// Immutable catalogue of hook modules, tools and providers.
#[derive(Default)]
pub struct ModuleRegistry {
    hook_modules: Vec<Arc<dyn HookModule>>,
    tools: ToolRegistry,
    providers: HashMap<String, Arc<dyn LLMProvider>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        providers.sort_unstable();
        f.debug_struct("ModuleRegistry")
            .field("hook_modules", &self.hook_module_names())
            .field("tools", &self.tools.names())
            .field("providers", &providers)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder::default()
    }

    /// Install `registry` as the process-wide registry.
    ///
    /// # Errors
    /// Returns [`KernelError::Config`] if a registry is already installed.
    pub fn install(registry: ModuleRegistry) -> Result<&'static ModuleRegistry> {
        GLOBAL_MODULES
            .set(registry)
            .map_err(|_| KernelError::Config("module registry already installed".to_string()))?;
        GLOBAL_MODULES
            .get()
            .ok_or_else(|| KernelError::Config("module registry not installed".to_string()))
    }

    /// The process-wide registry, if one was installed.
    pub fn global() -> Option<&'static ModuleRegistry> {
        GLOBAL_MODULES.get()
    }

    pub fn hook_module(&self, name: &str) -> Option<&Arc<dyn HookModule>> {
        self.hook_modules.iter().find(|m| m.name() == name)
    }

    pub fn hook_module_names(&self) -> Vec<&str> {
        self.hook_modules.iter().map(|m| m.name()).collect()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn provider(&self, name: &str) -> Result<Arc<dyn LLMProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::NotFound(format!("provider '{}'", name)))
    }

    /// Mount every hook module, in registration order.
    pub fn mount_all(&self, coordinator: &Coordinator) -> Result<()> {
        for module in &self.hook_modules {
            coordinator.mount(module.as_ref())?;
        }
        Ok(())
    }
}

/// Builder for [`ModuleRegistry`].
#[derive(Default)]
pub struct ModuleRegistryBuilder {
    inner: ModuleRegistry,
}

impl ModuleRegistryBuilder {
    pub fn with_hook_module(mut self, module: Arc<dyn HookModule>) -> Self {
        self.inner.hook_modules.push(module);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.inner.tools.register(tool);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.inner
            .providers
            .insert(provider.name().to_string(), provider);
        self
    }

    pub fn build(self) -> ModuleRegistry {
        self.inner
    }
}
