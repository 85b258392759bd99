//! OpenAPI 3.x → client SDK generation pipeline.
//!
//! [`transform::generate`] runs every stage (resolve, normalize, map, build,
//! group) and returns an [`ir::ApiModel`] that a [`CodeGenerator`] renders.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod parse;
pub mod resolve;
pub mod transform;

pub use error::{GenerateError, PipelineFailure};
pub use transform::{GenerateOptions, generate};

/// A generated file with path and content.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: String,
    pub content: String,
}

/// Trait for code generators that produce files from an API model.
pub trait CodeGenerator {
    type Config;
    type Error: std::error::Error;
    fn generate(
        &self,
        model: &ir::ApiModel,
        config: &Self::Config,
    ) -> Result<Vec<GeneratedFile>, Self::Error>;
}
