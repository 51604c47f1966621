//! Shared clickdag data model.
//!
//! Workflow documents as read from the config store, and the pipeline
//! definitions generated from them. Kept free of store and engine
//! dependencies so every crate can share it.

#![warn(clippy::pedantic)]

pub mod id;
pub mod pipeline;
pub mod workflow;

pub use id::DocumentId;
pub use pipeline::{
    ContainerJobSpec, CopyJobConfig, DefaultArgs, FrameworkConnection, GenerationOutput,
    KeySensorSpec, Operator, PipelineDefinition, TaskSpec,
};
pub use workflow::{Activity, ActivityConfig, ConnectionConfig, WorkflowConfig};
