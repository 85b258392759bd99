pub mod dependency_order;
pub mod grouping;
pub mod name_normalizer;
pub mod name_registry;
pub mod normalizer;
pub mod operation_builder;
pub mod pipeline;
pub mod type_mapper;

pub use normalizer::{NormalizedTable, normalize_graph};
pub use pipeline::{GenerateOptions, generate};
pub use type_mapper::{TypeMapper, TypeTable};
