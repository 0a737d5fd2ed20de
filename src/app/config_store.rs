// LogCore - app/config_store.rs
//
// Single source of truth for logging configuration, with live push updates
// to every subscribed logger.
//
// Locking contract:
//   - Module configs, subscribers, level configs and the global config sit
//     behind ONE mutex. Every read and write takes it, so no reader ever sees
//     a half-applied reload.
//   - Subscriber callbacks run while that mutex is held. A notification is
//     therefore never observable before the state it describes. In return,
//     callbacks must be short and must not call back into the store: the
//     mutex is not reentrant and doing so deadlocks.
//   - A poisoned mutex is recovered rather than propagated; a logging
//     facility must not take its host down.

use crate::core::model::{ConfigSnapshot, GlobalConfig, LevelConfig, LogLevel, ModuleConfig};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Callback invoked with a module's new effective configuration.
pub type ConfigCallback = Box<dyn Fn(&ModuleConfig) + Send + Sync>;

/// Identifies one registration. Only the current owner of a module's slot
/// can remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    callback: ConfigCallback,
}

/// Outcome of applying a [`ConfigSnapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Modules present in the snapshot.
    pub modules: usize,
    /// Modules dropped from the store because the snapshot no longer names them.
    pub removed: usize,
    /// Subscriber callbacks invoked.
    pub notified: usize,
}

#[derive(Default)]
struct StoreState {
    module_configs: HashMap<String, ModuleConfig>,
    subscribers: HashMap<String, Subscription>,
    next_subscription: u64,
    level_configs: HashMap<LogLevel, LevelConfig>,
    global: GlobalConfig,
}

impl StoreState {
    /// Store `config` for `module` and notify its subscriber, if any.
    /// Returns `true` when a callback ran.
    fn put_module_config(&mut self, module: &str, config: ModuleConfig) -> bool {
        self.module_configs.insert(module.to_string(), config);
        match (self.module_configs.get(module), self.subscribers.get(module)) {
            (Some(stored), Some(sub)) => {
                (sub.callback)(stored);
                true
            }
            _ => false,
        }
    }
}

/// Process-wide configuration store.
///
/// Constructed explicitly and shared via `Arc` with every logger and the
/// delivery worker; there is no global instance.
pub struct ConfigStore {
    state: Mutex<StoreState>,
}

impl ConfigStore {
    /// Create a store holding only defaults.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store pre-populated from `snapshot`.
    pub fn from_snapshot(snapshot: ConfigSnapshot) -> Self {
        let store = Self::new();
        store.reload(snapshot);
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Register `callback` for `module`, replacing any previous registration.
    ///
    /// If a config for `module` is already stored the callback runs at once,
    /// still under the store lock, so the subscriber starts from the loaded
    /// state rather than defaults. The returned id is needed to unsubscribe.
    pub fn subscribe<F>(&self, module: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&ModuleConfig) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscribers.insert(
            module.to_string(),
            Subscription {
                id,
                callback: Box::new(callback),
            },
        );

        let state = &*state;
        if let (Some(config), Some(sub)) = (
            state.module_configs.get(module),
            state.subscribers.get(module),
        ) {
            (sub.callback)(config);
        }
        tracing::trace!(module, id = id.0, "Logger subscribed");
        id
    }

    /// Remove the registration for `module` if `id` still owns it.
    ///
    /// Returns `false` when there is nothing to remove, including when a
    /// later `subscribe` has taken the slot over. Idempotent.
    pub fn unsubscribe(&self, module: &str, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        if state.subscribers.get(module).map(|sub| sub.id) != Some(id) {
            return false;
        }
        state.subscribers.remove(module);
        tracing::trace!(module, id = id.0, "Logger unsubscribed");
        true
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    // -------------------------------------------------------------------------
    // Module configs
    // -------------------------------------------------------------------------

    /// Insert or overwrite the config for `module` and push it to the
    /// module's subscriber.
    pub fn set_module_config(&self, module: &str, config: ModuleConfig) {
        self.lock().put_module_config(module, config);
    }

    /// Stored config for `module`, or `None` when defaults apply.
    pub fn module_config(&self, module: &str) -> Option<ModuleConfig> {
        self.lock().module_configs.get(module).cloned()
    }

    // -------------------------------------------------------------------------
    // Level and global configs
    // -------------------------------------------------------------------------

    pub fn set_level_config(&self, level: LogLevel, config: LevelConfig) {
        self.lock().level_configs.insert(level, config);
    }

    /// Config for `level`, or the zero-value default. Never fails.
    pub fn level_config(&self, level: LogLevel) -> LevelConfig {
        self.lock()
            .level_configs
            .get(&level)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_global_config(&self, global: GlobalConfig) {
        self.lock().global = global;
    }

    /// Copy of the current global config. Never fails.
    pub fn global_config(&self) -> GlobalConfig {
        self.lock().global.clone()
    }

    /// Everything the store currently holds, as one consistent snapshot.
    pub fn snapshot(&self) -> ConfigSnapshot {
        let state = self.lock();
        ConfigSnapshot {
            global: state.global.clone(),
            levels: state
                .level_configs
                .iter()
                .map(|(level, config)| (*level, *config))
                .collect(),
            modules: state
                .module_configs
                .iter()
                .map(|(name, config)| (name.clone(), config.clone()))
                .collect(),
        }
    }

    // -------------------------------------------------------------------------
    // Reload
    // -------------------------------------------------------------------------

    /// Apply a complete snapshot in one critical section.
    ///
    /// Level configs and the global config are replaced wholesale. Module
    /// subscribers are notified only when their effective config changed;
    /// a module the snapshot no longer names reverts to
    /// [`ModuleConfig::default`].
    pub fn reload(&self, snapshot: ConfigSnapshot) -> ReloadSummary {
        let mut state = self.lock();
        let mut summary = ReloadSummary {
            modules: snapshot.modules.len(),
            ..ReloadSummary::default()
        };

        state.global = snapshot.global;
        state.level_configs = snapshot.levels.into_iter().collect();

        let stale: Vec<String> = state
            .module_configs
            .keys()
            .filter(|name| !snapshot.modules.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            if let Some(old) = state.module_configs.remove(&name) {
                summary.removed += 1;
                let default = ModuleConfig::default();
                if old != default {
                    if let Some(sub) = state.subscribers.get(&name) {
                        (sub.callback)(&default);
                        summary.notified += 1;
                    }
                }
            }
        }

        for (name, config) in snapshot.modules {
            let unchanged = state.module_configs.get(&name) == Some(&config);
            if unchanged {
                continue;
            }
            // A module new to the store is pushed even if it equals the default.
            if state.put_module_config(&name, config) {
                summary.notified += 1;
            }
        }

        tracing::debug!(
            modules = summary.modules,
            removed = summary.removed,
            notified = summary.notified,
            "Config reloaded"
        );
        summary
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
