//! The data contract between the pipeline and renderers.
//!
//! Everything here is `Serialize`, so a renderer can consume the model
//! through any templating engine. [`CONTEXT_VERSION`] changes whenever the
//! serialized shape changes incompatibly.

pub mod normalized;
pub mod operations;
pub mod schemas;
pub mod security;
pub mod types;

pub use operations::*;
pub use schemas::*;
pub use security::*;
pub use types::{ApiInfo, ApiModel, ApiServer, GeneratedModule, ModuleKind, NormalizedName};

/// Version of the render-context shape.
pub const CONTEXT_VERSION: u32 = 1;
