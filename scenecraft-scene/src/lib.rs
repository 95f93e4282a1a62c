//! # Scenecraft Scene
//!
//! The scene side of scenecraft: a mutable entity store, the closed command
//! set that mutates it, and the observation codec that turns the store into
//! the bounded text the agent reasons over.
//!
//! ## Core Concepts
//! - **Store**: ordered entities + camera + environment, the single source of truth
//! - **Commands**: a closed sum type over supported actions, validated from wire envelopes
//! - **Executor**: exhaustive command application with step-level failures as data
//! - **Observation**: rounded, helper-free snapshot with a deterministic text rendering
//! - **Helpers**: marker entities linked to lights, co-moved/co-deleted, never observable

pub mod command;
pub mod entity;
pub mod executor;
pub mod export;
pub mod observe;
pub mod store;

pub use command::{Command, CommandEnvelope, CommandRejection, ACTIONS, COMPLETE_ACTION};
pub use entity::{
    round2, EntityKind, Geometry, Light, LightKind, Material, SceneEntity, Transform, Vec3,
};
pub use executor::{execute, EntitySummary, ExecFailure, ExecOutcome};
pub use export::export_json;
pub use observe::{observe, render, EntityObservation, ObservationSnapshot};
pub use store::{Camera, Environment, Fog, SceneStore, DEFAULT_BACKGROUND, HELPER_SUFFIX};
