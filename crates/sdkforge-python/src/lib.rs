//! Python client renderer for sdkforge.
//!
//! Turns an [`sdkforge_core::ir::ApiModel`] into an importable package:
//! dataclass models, one resource class per module, a `Client` and a small
//! runtime shared by the generated code.

pub mod emitters;
pub mod generator;
pub mod identifiers;
pub mod type_mapper;

pub use generator::{GeneratorError, PythonClientConfig, PythonClientGenerator, RESERVED_NAMES};
