//! # Scene Store
//!
//! The mutable store of scene entities, camera, and environment. This is the
//! single source of truth the agent observes and mutates; rendering (if any)
//! only reads it. Entities keep insertion order so that observations of an
//! unchanged store serialize identically.
//!
//! The store is mutated exclusively by the command executor from within one
//! loop iteration at a time; callers outside the loop must halt it before
//! resetting the scene.

use crate::entity::{EntityKind, Light, LightKind, SceneEntity, Transform, Vec3};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix convention linking a marker helper to its parent entity
pub const HELPER_SUFFIX: &str = "_helper";

/// Background color of a freshly initialized scene
pub const DEFAULT_BACKGROUND: &str = "#f0f4ff";

/// Linear fog over the scene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fog {
    pub color: String,
    pub near: f64,
    pub far: f64,
}

/// Global environment state (mutated unconditionally by environment commands)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub background: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog: Option<Fog>,
    pub ambient_intensity: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND.to_string(),
            fog: None,
            ambient_intensity: 0.3,
        }
    }
}

/// Camera position and look-at target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(15.0, 12.0, 15.0),
            target: Vec3::ZERO,
        }
    }
}

/// The scene store: ordered entities plus camera and environment
#[derive(Debug, Clone)]
pub struct SceneStore {
    entities: Vec<SceneEntity>,
    camera: Camera,
    environment: Environment,
    /// Monotonic component of allocated ids
    next_id: u64,
    initialized: bool,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    /// Create an empty, uninitialized store
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            camera: Camera::default(),
            environment: Environment::default(),
            next_id: 0,
            initialized: false,
        }
    }

    /// Create a store with scaffolding already installed
    pub fn initialized() -> Self {
        let mut store = Self::new();
        store.init();
        store
    }

    /// Install the default scaffolding: ambient light, directional key light,
    /// and a ground grid. None of it is agent-created, so none of it appears
    /// in observations or resolves as a command target.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }

        self.entities.push(
            SceneEntity::new("ambient_light", EntityKind::Light, "Ambient Light").with_light(
                Light {
                    kind: LightKind::Point,
                    color: "#ffffff".to_string(),
                    intensity: 0.4,
                },
            ),
        );
        self.entities.push(
            SceneEntity::new("default_directional", EntityKind::Light, "Key Light")
                .with_transform(Transform::at(Vec3::new(10.0, 20.0, 10.0)))
                .with_light(Light {
                    kind: LightKind::Directional,
                    color: "#ffffff".to_string(),
                    intensity: 0.8,
                }),
        );
        self.entities.push(
            SceneEntity::new("grid_helper", EntityKind::Group, "Grid")
                .with_transform(Transform::at(Vec3::new(0.0, -0.01, 0.0))),
        );

        self.environment.ambient_intensity = 0.4;
        self.initialized = true;
    }

    /// Whether `init` has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Allocate a fresh globally-unique entity id.
    ///
    /// Combines a monotonic per-store counter with a millisecond timestamp,
    /// so collisions are structurally impossible within a session.
    pub fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("obj_{}_{}", self.next_id, unix_millis())
    }

    // =========================================================================
    // Entity access
    // =========================================================================

    /// Number of entities, scaffolding and helpers included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert an entity at the end of the traversal order
    pub fn add_entity(&mut self, entity: SceneEntity) {
        debug_assert!(
            self.entity(&entity.id).is_none(),
            "duplicate entity id {}",
            entity.id
        );
        self.entities.push(entity);
    }

    /// Look up any entity by id, helpers and scaffolding included
    pub fn entity(&self, id: &str) -> Option<&SceneEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut SceneEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Resolve an id proposed by the agent to a mutable entity.
    ///
    /// Helpers and scaffolding are never addressable: a command aimed at a
    /// `_helper` id or a pre-existing entity misses, exactly like an unknown
    /// id.
    pub fn resolve_agent_target(&mut self, id: &str) -> Option<&mut SceneEntity> {
        self.entities
            .iter_mut()
            .find(|e| e.id == id && e.agent_created && !e.is_helper())
    }

    /// Remove an entity by id, returning it
    pub fn remove_entity(&mut self, id: &str) -> Option<SceneEntity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    /// Iterate entities in insertion order
    pub fn traverse(&self) -> impl Iterator<Item = &SceneEntity> {
        self.entities.iter()
    }

    // =========================================================================
    // Camera and environment
    // =========================================================================

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn set_background(&mut self, color: impl Into<String>) {
        self.environment.background = color.into();
    }

    pub fn set_fog(&mut self, fog: Fog) {
        self.environment.fog = Some(fog);
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Remove everything the agent built (entities and their helpers) and
    /// restore the default background and fog. Scaffolding survives.
    pub fn clear_agent_content(&mut self) {
        self.entities.retain(|e| !e.agent_created && !e.is_helper());
        self.environment.background = DEFAULT_BACKGROUND.to_string();
        self.environment.fog = None;
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
