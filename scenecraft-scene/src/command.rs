//! # Agent Commands
//!
//! The closed instruction set the agent can issue against the scene store.
//! On the wire a command is `{ "action": "...", "params": {...} }`; the
//! untyped [`CommandEnvelope`] is what proposals and history carry, and
//! [`Command::from_envelope`] is the single validation point that turns it
//! into a typed variant or a structured rejection.
//!
//! Missing parameters take the documented per-shape defaults, so a bare
//! `{"action": "createBox"}` is a valid command.

use crate::entity::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default color for created meshes
pub const DEFAULT_MESH_COLOR: &str = "#888888";
/// Default color for created planes
pub const DEFAULT_PLANE_COLOR: &str = "#444444";
/// Default color for created lights
pub const DEFAULT_LIGHT_COLOR: &str = "#ffffff";

/// The action that signals successful completion instead of a mutation
pub const COMPLETE_ACTION: &str = "complete";

/// Every supported action name, in wire spelling
pub const ACTIONS: &[&str] = &[
    "createBox",
    "createSphere",
    "createCylinder",
    "createPlane",
    "createCone",
    "addPointLight",
    "addDirectionalLight",
    "setMaterial",
    "moveObject",
    "rotateObject",
    "scaleObject",
    "deleteObject",
    "setBackgroundColor",
    "addFog",
    "complete",
];

// =============================================================================
// Wire envelope
// =============================================================================

/// A command as it arrives from the model: an action name and an untyped
/// parameter map, validated only at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CommandEnvelope {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = params {
            self.params = map;
        }
        self
    }

    /// Whether this envelope carries the completion sentinel
    pub fn is_complete(&self) -> bool {
        self.action == COMPLETE_ACTION
    }

    /// Compact `action({...})` rendering for history and prompts
    pub fn describe(&self) -> String {
        let params = serde_json::Value::Object(self.params.clone());
        format!("{}({})", self.action, params)
    }
}

// =============================================================================
// Typed parameter payloads
// =============================================================================

fn default_box_size() -> Vec3 {
    Vec3::ONE
}

fn default_radius() -> f64 {
    0.5
}

fn default_height() -> f64 {
    1.0
}

fn default_mesh_color() -> String {
    DEFAULT_MESH_COLOR.to_string()
}

fn default_plane_color() -> String {
    DEFAULT_PLANE_COLOR.to_string()
}

fn default_light_color() -> String {
    DEFAULT_LIGHT_COLOR.to_string()
}

fn default_intensity() -> f64 {
    1.0
}

fn default_point_light_position() -> Vec3 {
    Vec3::new(0.0, 5.0, 0.0)
}

fn default_directional_light_position() -> Vec3 {
    Vec3::new(5.0, 10.0, 5.0)
}

fn default_fog_near() -> f64 {
    10.0
}

fn default_fog_far() -> f64 {
    50.0
}

/// 2D extent of a plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSize {
    pub x: f64,
    pub y: f64,
}

impl Default for PlaneSize {
    fn default() -> Self {
        Self { x: 10.0, y: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoxParams {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_box_size")]
    pub size: Vec3,
    #[serde(default = "default_mesh_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSphereParams {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_mesh_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCylinderParams {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_mesh_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaneParams {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub size: PlaneSize,
    #[serde(default = "default_plane_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConeParams {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_mesh_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointLightParams {
    #[serde(default = "default_point_light_position")]
    pub position: Vec3,
    #[serde(default = "default_light_color")]
    pub color: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for PointLightParams {
    fn default() -> Self {
        Self {
            position: default_point_light_position(),
            color: default_light_color(),
            intensity: default_intensity(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionalLightParams {
    #[serde(default = "default_directional_light_position")]
    pub position: Vec3,
    #[serde(default = "default_light_color")]
    pub color: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for DirectionalLightParams {
    fn default() -> Self {
        Self {
            position: default_directional_light_position(),
            color: default_light_color(),
            intensity: default_intensity(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMaterialParams {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveObjectParams {
    pub object_id: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateObjectParams {
    pub object_id: String,
    /// Radians
    pub rotation: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleObjectParams {
    pub object_id: String,
    pub scale: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectParams {
    pub object_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBackgroundColorParams {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFogParams {
    pub color: String,
    #[serde(default = "default_fog_near")]
    pub near: f64,
    #[serde(default = "default_fog_far")]
    pub far: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompleteParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

// =============================================================================
// The command sum type
// =============================================================================

/// The closed set of supported actions, each with its typed payload.
///
/// The executor matches exhaustively over this enum; the only runtime
/// rejection left is an envelope that fails to deserialize into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "camelCase")]
pub enum Command {
    CreateBox(CreateBoxParams),
    CreateSphere(CreateSphereParams),
    CreateCylinder(CreateCylinderParams),
    CreatePlane(CreatePlaneParams),
    CreateCone(CreateConeParams),
    AddPointLight(PointLightParams),
    AddDirectionalLight(DirectionalLightParams),
    SetMaterial(SetMaterialParams),
    MoveObject(MoveObjectParams),
    RotateObject(RotateObjectParams),
    ScaleObject(ScaleObjectParams),
    DeleteObject(DeleteObjectParams),
    SetBackgroundColor(SetBackgroundColorParams),
    AddFog(AddFogParams),
    Complete(CompleteParams),
}

/// Why an envelope failed to become a typed command.
///
/// Both cases are step-level: the loop records them against the thought
/// entry and keeps running.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRejection {
    /// The action is not in the supported set
    UnknownAction { action: String },
    /// The action is known but the params don't fit its contract
    InvalidParams { action: String, reason: String },
}

impl fmt::Display for CommandRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandRejection::UnknownAction { action } => {
                write!(f, "unknown command '{}'", action)
            }
            CommandRejection::InvalidParams { action, reason } => {
                write!(f, "invalid params for '{}': {}", action, reason)
            }
        }
    }
}

impl Command {
    /// Validate an untyped envelope into a typed command.
    ///
    /// An absent `params` map is treated as empty, so defaults apply.
    pub fn from_envelope(envelope: &CommandEnvelope) -> Result<Self, CommandRejection> {
        if !ACTIONS.contains(&envelope.action.as_str()) {
            return Err(CommandRejection::UnknownAction {
                action: envelope.action.clone(),
            });
        }

        let value = serde_json::json!({
            "action": envelope.action,
            "params": serde_json::Value::Object(envelope.params.clone()),
        });
        serde_json::from_value(value).map_err(|err| CommandRejection::InvalidParams {
            action: envelope.action.clone(),
            reason: err.to_string(),
        })
    }

    /// The wire name of this command's action
    pub fn action(&self) -> &'static str {
        match self {
            Command::CreateBox(_) => "createBox",
            Command::CreateSphere(_) => "createSphere",
            Command::CreateCylinder(_) => "createCylinder",
            Command::CreatePlane(_) => "createPlane",
            Command::CreateCone(_) => "createCone",
            Command::AddPointLight(_) => "addPointLight",
            Command::AddDirectionalLight(_) => "addDirectionalLight",
            Command::SetMaterial(_) => "setMaterial",
            Command::MoveObject(_) => "moveObject",
            Command::RotateObject(_) => "rotateObject",
            Command::ScaleObject(_) => "scaleObject",
            Command::DeleteObject(_) => "deleteObject",
            Command::SetBackgroundColor(_) => "setBackgroundColor",
            Command::AddFog(_) => "addFog",
            Command::Complete(_) => "complete",
        }
    }

    /// Whether this is the completion sentinel (handled by the loop, never
    /// dispatched to the executor)
    pub fn is_complete(&self) -> bool {
        matches!(self, Command::Complete(_))
    }
}
