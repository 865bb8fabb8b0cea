//! Evaluation Context

use tally_core::{EngineConfig, Number};
use crate::PluginRegistry;
use std::sync::Arc;

/// Evaluation context passed to plugins
#[derive(Clone)]
pub struct EvalContext {
    pub config: EngineConfig,
    pub registry: Arc<PluginRegistry>,
}

impl EvalContext {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            config: EngineConfig::default(),
            registry,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Precision in significant digits
    pub fn precision(&self) -> u32 {
        self.config.digits()
    }

    /// Rescale an argument to the configured precision
    pub fn lift(&self, n: Number) -> Number {
        self.config.lift(n)
    }
}
