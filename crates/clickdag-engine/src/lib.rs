//! Pipeline generation for clickstream workflows.
//!
//! Reads denormalized workflow documents through a
//! [`ConfigStore`](clickdag_store::ConfigStore) and turns each into a
//! [`PipelineDefinition`](clickdag_types::PipelineDefinition).

pub mod activity;
pub mod builder;
pub mod config;
pub mod errors;
pub mod generate;
pub mod naming;

// Re-export public API for convenience
pub use activity::ClickstreamActivity;
pub use builder::PipelineBuilder;
pub use config::settings::GeneratorSettings;
pub use errors::GenerateError;
pub use generate::{
    check_store, generate, generate_from_store, list_workflows, read_activities, WorkflowActivity,
    WorkflowSummary,
};
