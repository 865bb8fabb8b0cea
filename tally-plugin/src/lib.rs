//! Tally Plugin System
//!
//! Every calculator is a `FunctionPlugin`: static metadata describing its
//! arguments plus a pure `call`. The registry looks calculators up by name
//! and binds positional or named arguments.

mod traits;
mod registry;
mod context;

pub use traits::{FunctionPlugin, FunctionMeta, ArgMeta, ArgKind};
pub use registry::PluginRegistry;
pub use context::EvalContext;

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{FunctionPlugin, FunctionMeta, ArgMeta, ArgKind, PluginRegistry, EvalContext};
    pub use tally_core::prelude::*;
}
