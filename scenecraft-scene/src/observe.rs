//! # Scene Observation Codec
//!
//! Serializes the scene store into a bounded, versioned snapshot and renders
//! it as the fixed text layout the proposal endpoint receives. Numeric
//! fields are rounded to 2 decimal places so repeated observations of an
//! unchanged scene are byte-identical and small coordinate noise never
//! reaches the model.
//!
//! Marker helpers and pre-existing scaffolding are excluded: the agent only
//! ever sees (and can only ever address) what it created itself.

use crate::entity::{round2, EntityKind, Geometry, Light, Material, SceneEntity, Vec3};
use crate::store::{SceneStore, HELPER_SUFFIX};
use serde::Serialize;

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1";

/// One entity as the agent sees it (rounded, helpers excluded)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityObservation {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<Light>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl EntityObservation {
    fn of(entity: &SceneEntity) -> Self {
        let mut material = entity.material.clone();
        if let Some(m) = material.as_mut() {
            m.metalness = round2(m.metalness);
            m.roughness = round2(m.roughness);
            m.emissive_intensity = round2(m.emissive_intensity);
            m.opacity = round2(m.opacity);
        }
        let mut light = entity.light.clone();
        if let Some(l) = light.as_mut() {
            l.intensity = round2(l.intensity);
        }

        Self {
            id: entity.id.clone(),
            kind: entity.kind,
            name: entity.name.clone(),
            position: entity.transform.position.rounded(),
            rotation: entity.transform.rotation.rounded(),
            scale: entity.transform.scale.rounded(),
            material,
            light,
            geometry: entity.geometry.clone(),
        }
    }

    /// Color shown in the text rendering: material first, then light
    fn primary_color(&self) -> &str {
        if let Some(material) = &self.material {
            &material.color
        } else if let Some(light) = &self.light {
            &light.color
        } else {
            "N/A"
        }
    }
}

/// Camera as the agent sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraObservation {
    pub position: Vec3,
    pub target: Vec3,
}

/// Environment as the agent sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentObservation {
    pub background: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog: Option<crate::store::Fog>,
    pub ambient_intensity: f64,
}

/// Immutable snapshot of the scene, produced fresh on every loop iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSnapshot {
    pub version: &'static str,
    pub objects: Vec<EntityObservation>,
    pub camera: CameraObservation,
    pub environment: EnvironmentObservation,
}

/// Serialize the store into a snapshot.
///
/// Traversal order is the store's insertion order, so an unchanged store
/// always yields an identical snapshot.
pub fn observe(store: &SceneStore) -> ObservationSnapshot {
    let objects = store
        .traverse()
        .filter(|e| e.agent_created && !e.is_helper() && !e.id.ends_with(HELPER_SUFFIX))
        .map(EntityObservation::of)
        .collect();

    let mut fog = store.environment().fog.clone();
    if let Some(f) = fog.as_mut() {
        f.near = round2(f.near);
        f.far = round2(f.far);
    }

    ObservationSnapshot {
        version: SNAPSHOT_VERSION,
        objects,
        camera: CameraObservation {
            position: store.camera().position.rounded(),
            target: store.camera().target.rounded(),
        },
        environment: EnvironmentObservation {
            background: store.environment().background.clone(),
            fog,
            ambient_intensity: round2(store.environment().ambient_intensity),
        },
    }
}

/// Render the snapshot as the text the proposal endpoint receives.
///
/// This is the single integration point between scene and model: the layout
/// is fixed and deterministic given the snapshot.
pub fn render(snapshot: &ObservationSnapshot) -> String {
    let mut lines = Vec::new();

    lines.push("=== CURRENT SCENE ===".to_string());
    lines.push(format!("Objects: {}", snapshot.objects.len()));
    lines.push(format!(
        "Camera: ({:.2}, {:.2}, {:.2})",
        snapshot.camera.position.x, snapshot.camera.position.y, snapshot.camera.position.z
    ));
    lines.push(format!("Background: {}", snapshot.environment.background));
    if let Some(fog) = &snapshot.environment.fog {
        lines.push(format!(
            "Fog: {} (near {:.2}, far {:.2})",
            fog.color, fog.near, fog.far
        ));
    }

    if snapshot.objects.is_empty() {
        lines.push(String::new());
        lines.push("Scene is empty. Start building!".to_string());
    } else {
        lines.push(String::new());
        lines.push("Objects in scene:".to_string());
        for obj in &snapshot.objects {
            lines.push(format!(
                "  - {} [{}] at ({:.2}, {:.2}, {:.2}), color: {}",
                obj.name,
                obj.kind.as_str(),
                obj.position.x,
                obj.position.y,
                obj.position.z,
                obj.primary_color()
            ));
        }
    }

    lines.join("\n")
}
