//! # Command Executor
//!
//! Applies typed commands to the scene store and reports what happened as
//! data. Step-level failures (unknown command, missing target, bad params)
//! are outcome values, never errors: one bad command degrades to a failed
//! step and the session keeps running.
//!
//! Point lights also create a linked `<id>_helper` marker entity that is
//! co-moved and co-deleted with its parent and is never addressable on its
//! own.

use crate::command::{
    AddFogParams, Command, CommandRejection, CreateBoxParams, CreateConeParams,
    CreateCylinderParams, CreatePlaneParams, CreateSphereParams, DeleteObjectParams,
    DirectionalLightParams, MoveObjectParams, PointLightParams, RotateObjectParams,
    ScaleObjectParams, SetMaterialParams,
};
use crate::entity::{
    EntityKind, Geometry, Light, LightKind, Material, SceneEntity, Transform, Vec3,
};
use crate::store::{Fog, SceneStore, HELPER_SUFFIX};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;
use std::fmt;

/// Radius of the marker sphere visualizing a point light
const LIGHT_HELPER_RADIUS: f64 = 0.1;

/// Snapshot of a created entity, returned to the loop so the thought log can
/// show exactly what came into existence (defaults already applied).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
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

impl EntitySummary {
    fn of(entity: &SceneEntity) -> Self {
        Self {
            id: entity.id.clone(),
            kind: entity.kind,
            name: entity.name.clone(),
            position: entity.transform.position,
            rotation: entity.transform.rotation,
            scale: entity.transform.scale,
            material: entity.material.clone(),
            light: entity.light.clone(),
            geometry: entity.geometry.clone(),
        }
    }
}

/// What executing one command did to the store
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// A creation command inserted this entity
    Created(EntitySummary),
    /// A modification or environment command succeeded
    Applied,
    /// The command was rejected or missed; the store is unchanged
    Failed(ExecFailure),
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecOutcome::Failed(_))
    }
}

/// Step-level failure: recorded against the thought entry, loop continues
#[derive(Debug, Clone, PartialEq)]
pub enum ExecFailure {
    /// Action not in the supported set
    UnknownCommand { action: String },
    /// objectId did not resolve to an addressable agent entity
    TargetNotFound { object_id: String },
    /// Parameters violate the command's contract (e.g. non-finite vector)
    InvalidParams { action: String, reason: String },
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecFailure::UnknownCommand { action } => write!(f, "unknown command '{}'", action),
            ExecFailure::TargetNotFound { object_id } => {
                write!(f, "object '{}' not found", object_id)
            }
            ExecFailure::InvalidParams { action, reason } => {
                write!(f, "invalid params for '{}': {}", action, reason)
            }
        }
    }
}

impl From<CommandRejection> for ExecFailure {
    fn from(rejection: CommandRejection) -> Self {
        match rejection {
            CommandRejection::UnknownAction { action } => ExecFailure::UnknownCommand { action },
            CommandRejection::InvalidParams { action, reason } => {
                ExecFailure::InvalidParams { action, reason }
            }
        }
    }
}

/// Execute one typed command against the store.
///
/// The completion sentinel never reaches this function from the loop; its
/// arm rejects it rather than mutating anything.
pub fn execute(store: &mut SceneStore, command: &Command) -> ExecOutcome {
    match command {
        Command::CreateBox(params) => create_box(store, params),
        Command::CreateSphere(params) => create_sphere(store, params),
        Command::CreateCylinder(params) => create_cylinder(store, params),
        Command::CreatePlane(params) => create_plane(store, params),
        Command::CreateCone(params) => create_cone(store, params),
        Command::AddPointLight(params) => add_point_light(store, params),
        Command::AddDirectionalLight(params) => add_directional_light(store, params),
        Command::SetMaterial(params) => set_material(store, params),
        Command::MoveObject(params) => move_object(store, params),
        Command::RotateObject(params) => rotate_object(store, params),
        Command::ScaleObject(params) => scale_object(store, params),
        Command::DeleteObject(params) => delete_object(store, params),
        Command::SetBackgroundColor(params) => {
            store.set_background(params.color.clone());
            ExecOutcome::Applied
        }
        Command::AddFog(params) => add_fog(store, params),
        Command::Complete(_) => ExecOutcome::Failed(ExecFailure::InvalidParams {
            action: "complete".to_string(),
            reason: "completion sentinel is handled by the control loop".to_string(),
        }),
    }
}

// =============================================================================
// Creation commands
// =============================================================================

fn finite(action: &'static str, field: &'static str, v: Vec3) -> Result<Vec3, ExecFailure> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ExecFailure::InvalidParams {
            action: action.to_string(),
            reason: format!("'{}' has a non-finite component", field),
        })
    }
}

fn finite_scalar(action: &'static str, field: &'static str, v: f64) -> Result<f64, ExecFailure> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ExecFailure::InvalidParams {
            action: action.to_string(),
            reason: format!("'{}' is not a finite number", field),
        })
    }
}

fn create_box(store: &mut SceneStore, params: &CreateBoxParams) -> ExecOutcome {
    let (position, size) = match (
        finite("createBox", "position", params.position),
        finite("createBox", "size", params.size),
    ) {
        (Ok(p), Ok(s)) => (p, s),
        (Err(f), _) | (_, Err(f)) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(&id, EntityKind::Box, params.name.as_deref().unwrap_or("Box"))
        .with_transform(Transform::at(position))
        .with_material(Material::flat(&params.color))
        .with_geometry(Geometry::Box {
            width: size.x,
            height: size.y,
            depth: size.z,
        })
        .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

fn create_sphere(store: &mut SceneStore, params: &CreateSphereParams) -> ExecOutcome {
    let position = match finite("createSphere", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };
    let radius = match finite_scalar("createSphere", "radius", params.radius) {
        Ok(r) => r,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(
        &id,
        EntityKind::Sphere,
        params.name.as_deref().unwrap_or("Sphere"),
    )
    .with_transform(Transform::at(position))
    .with_material(Material::flat(&params.color))
    .with_geometry(Geometry::Sphere { radius })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

fn create_cylinder(store: &mut SceneStore, params: &CreateCylinderParams) -> ExecOutcome {
    let position = match finite("createCylinder", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(
        &id,
        EntityKind::Cylinder,
        params.name.as_deref().unwrap_or("Cylinder"),
    )
    .with_transform(Transform::at(position))
    .with_material(Material::flat(&params.color))
    .with_geometry(Geometry::Cylinder {
        radius: params.radius,
        height: params.height,
    })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

fn create_plane(store: &mut SceneStore, params: &CreatePlaneParams) -> ExecOutcome {
    let position = match finite("createPlane", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    // Planes lie flat by default (rotated -90 degrees around X)
    let mut transform = Transform::at(position);
    transform.rotation = Vec3::new(-FRAC_PI_2, 0.0, 0.0);

    let entity = SceneEntity::new(
        &id,
        EntityKind::Plane,
        params.name.as_deref().unwrap_or("Plane"),
    )
    .with_transform(transform)
    .with_material(Material::flat(&params.color))
    .with_geometry(Geometry::Plane {
        width: params.size.x,
        height: params.size.y,
    })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

fn create_cone(store: &mut SceneStore, params: &CreateConeParams) -> ExecOutcome {
    let position = match finite("createCone", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(
        &id,
        EntityKind::Cone,
        params.name.as_deref().unwrap_or("Cone"),
    )
    .with_transform(Transform::at(position))
    .with_material(Material::flat(&params.color))
    .with_geometry(Geometry::Cone {
        radius: params.radius,
        height: params.height,
    })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

fn add_point_light(store: &mut SceneStore, params: &PointLightParams) -> ExecOutcome {
    let position = match finite("addPointLight", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(
        &id,
        EntityKind::Light,
        params.name.as_deref().unwrap_or("Point Light"),
    )
    .with_transform(Transform::at(position))
    .with_light(Light {
        kind: LightKind::Point,
        color: params.color.clone(),
        intensity: params.intensity,
    })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);

    // Small marker sphere so the light has a visible position in the scene
    let helper = SceneEntity::new(
        format!("{}{}", id, HELPER_SUFFIX),
        EntityKind::Sphere,
        "Light marker",
    )
    .with_transform(Transform::at(position))
    .with_material(Material::flat(&params.color))
    .with_geometry(Geometry::Sphere {
        radius: LIGHT_HELPER_RADIUS,
    })
    .helper_of(&id);
    store.add_entity(helper);

    ExecOutcome::Created(summary)
}

fn add_directional_light(store: &mut SceneStore, params: &DirectionalLightParams) -> ExecOutcome {
    let position = match finite("addDirectionalLight", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let id = store.fresh_id();
    let entity = SceneEntity::new(
        &id,
        EntityKind::Light,
        params.name.as_deref().unwrap_or("Directional Light"),
    )
    .with_transform(Transform::at(position))
    .with_light(Light {
        kind: LightKind::Directional,
        color: params.color.clone(),
        intensity: params.intensity,
    })
    .agent_created();

    let summary = EntitySummary::of(&entity);
    store.add_entity(entity);
    ExecOutcome::Created(summary)
}

// =============================================================================
// Modification commands
// =============================================================================

fn set_material(store: &mut SceneStore, params: &SetMaterialParams) -> ExecOutcome {
    for (name, value) in [
        ("metalness", params.metalness),
        ("roughness", params.roughness),
        ("emissiveIntensity", params.emissive_intensity),
    ] {
        if let Some(v) = value {
            if let Err(f) = finite_scalar("setMaterial", name, v) {
                return ExecOutcome::Failed(f);
            }
        }
    }

    let Some(entity) = store.resolve_agent_target(&params.object_id) else {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    };
    // Lights have no surface material; treat them as a miss, like the store
    // would for an absent id
    let Some(material) = entity.material.as_mut() else {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    };

    if let Some(color) = &params.color {
        material.color = color.clone();
    }
    if let Some(metalness) = params.metalness {
        material.metalness = metalness;
    }
    if let Some(roughness) = params.roughness {
        material.roughness = roughness;
    }
    if let Some(emissive) = &params.emissive {
        material.emissive = Some(emissive.clone());
    }
    if let Some(intensity) = params.emissive_intensity {
        material.emissive_intensity = intensity;
    }

    ExecOutcome::Applied
}

fn move_object(store: &mut SceneStore, params: &MoveObjectParams) -> ExecOutcome {
    let position = match finite("moveObject", "position", params.position) {
        Ok(p) => p,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let Some(entity) = store.resolve_agent_target(&params.object_id) else {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    };
    entity.transform.position = position;

    // A light's marker helper follows its parent
    let helper_id = format!("{}{}", params.object_id, HELPER_SUFFIX);
    if let Some(helper) = store.entity_mut(&helper_id) {
        helper.transform.position = position;
    }

    ExecOutcome::Applied
}

fn rotate_object(store: &mut SceneStore, params: &RotateObjectParams) -> ExecOutcome {
    let rotation = match finite("rotateObject", "rotation", params.rotation) {
        Ok(r) => r,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let Some(entity) = store.resolve_agent_target(&params.object_id) else {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    };
    entity.transform.rotation = rotation;
    ExecOutcome::Applied
}

fn scale_object(store: &mut SceneStore, params: &ScaleObjectParams) -> ExecOutcome {
    let scale = match finite("scaleObject", "scale", params.scale) {
        Ok(s) => s,
        Err(f) => return ExecOutcome::Failed(f),
    };

    let Some(entity) = store.resolve_agent_target(&params.object_id) else {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    };
    entity.transform.scale = scale;
    ExecOutcome::Applied
}

fn delete_object(store: &mut SceneStore, params: &DeleteObjectParams) -> ExecOutcome {
    if store.resolve_agent_target(&params.object_id).is_none() {
        return ExecOutcome::Failed(ExecFailure::TargetNotFound {
            object_id: params.object_id.clone(),
        });
    }

    store.remove_entity(&params.object_id);
    // A light's marker helper dies with its parent
    store.remove_entity(&format!("{}{}", params.object_id, HELPER_SUFFIX));
    ExecOutcome::Applied
}

// =============================================================================
// Environment commands (no target lookup, cannot miss)
// =============================================================================

fn add_fog(store: &mut SceneStore, params: &AddFogParams) -> ExecOutcome {
    for (name, v) in [("near", params.near), ("far", params.far)] {
        if let Err(f) = finite_scalar("addFog", name, v) {
            return ExecOutcome::Failed(f);
        }
    }

    store.set_fog(Fog {
        color: params.color.clone(),
        near: params.near,
        far: params.far,
    });
    ExecOutcome::Applied
}
