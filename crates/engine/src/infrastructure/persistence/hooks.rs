//! Post-commit hook registry shared by the stores.

use std::sync::{Arc, RwLock};

use crate::infrastructure::ports::PersistHook;

pub struct HookRegistry<R> {
    hooks: RwLock<Vec<Arc<dyn PersistHook<R>>>>,
}

impl<R> HookRegistry<R> {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, hook: Arc<dyn PersistHook<R>>) {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.push(hook);
    }

    fn snapshot(&self) -> Vec<Arc<dyn PersistHook<R>>> {
        self.hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn saved(&self, entity: &R) {
        for hook in self.snapshot() {
            hook.after_save(entity);
        }
    }

    pub fn removed(&self, entity: &R) {
        for hook in self.snapshot() {
            hook.after_remove(entity);
        }
    }
}

impl<R> Default for HookRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
