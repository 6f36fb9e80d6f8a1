//! # Plugin Host
//!
//! Process-wide registry holding the raw-query gate. Plugins are
//! registered by name. Contexts are built per call for a plugin and
//! tenant and borrow the gate by reference, so the host keeps no
//! per-tenant state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::observability::Logger;

use super::context::{PluginContext, RawQueryGate};
use super::errors::{HostError, HostResult};

/// A registered plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRegistration {
    pub name: String,
    pub registered_at: DateTime<Utc>,
}

/// Registry of plugins sharing one gate and connection
pub struct PluginHost {
    gate: Arc<RawQueryGate>,
    running: AtomicBool,

    /// Registrations by plugin name
    plugins: RwLock<HashMap<String, PluginRegistration>>,
}

impl PluginHost {
    pub fn new(gate: Arc<RawQueryGate>) -> Self {
        Self {
            gate,
            running: AtomicBool::new(false),
            plugins: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start handing out contexts; repeated calls are no-ops
    pub fn init(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        Logger::info(
            "PLUGIN_HOST_INIT",
            &[("allowed_table", self.gate.validator().allowed_table())],
        );
    }

    /// Stop the host and close the shared connection
    pub async fn teardown(&self) -> HostResult<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let registered = self
            .plugins
            .read()
            .map_err(|_| HostError::Internal("Lock poisoned".into()))?
            .len();

        self.gate.connection().close().await;
        Logger::info(
            "PLUGIN_HOST_TEARDOWN",
            &[("plugins", &registered.to_string())],
        );
        Ok(())
    }

    /// Register a plugin by name
    pub fn register(&self, name: &str) -> HostResult<()> {
        let mut plugins = self
            .plugins
            .write()
            .map_err(|_| HostError::Internal("Lock poisoned".into()))?;
        if plugins.contains_key(name) {
            return Err(HostError::AlreadyRegistered(name.to_string()));
        }

        plugins.insert(
            name.to_string(),
            PluginRegistration {
                name: name.to_string(),
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Registered plugins sorted by name
    pub fn plugins(&self) -> Vec<PluginRegistration> {
        let mut list: Vec<PluginRegistration> = match self.plugins.read() {
            Ok(plugins) => plugins.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Context for `plugin` acting on tenant `sid`
    pub fn context(&self, plugin: &str, sid: &str) -> HostResult<PluginContext> {
        if !self.is_running() {
            return Err(HostError::HostNotRunning);
        }

        let plugins = self
            .plugins
            .read()
            .map_err(|_| HostError::Internal("Lock poisoned".into()))?;
        if !plugins.contains_key(plugin) {
            return Err(HostError::UnknownPlugin(plugin.to_string()));
        }

        Ok(PluginContext::new(
            self.gate.clone(),
            plugin.to_string(),
            sid.to_string(),
        ))
    }
}
