//! # Scene Entity Model
//!
//! The addressable objects of the scene store: meshes, lights, and groups.
//! Transforms are plain f64 triples; colors are hex strings as they travel
//! over the wire. Entities carry an `agent_created` marker so pre-existing
//! scaffolding (default lighting, grid) never shows up in observations.

use serde::{Deserialize, Serialize};

/// A 3-component vector (position, rotation in radians, or scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// All components are finite real numbers (store invariant)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Round each component to 2 decimal places (observation precision)
    pub fn rounded(&self) -> Vec3 {
        Vec3::new(round2(self.x), round2(self.y), round2(self.z))
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Vec3::ZERO
    }
}

/// Round to 2 decimal places
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// What kind of object an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Box,
    Sphere,
    Cylinder,
    Plane,
    Cone,
    Light,
    Group,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Box => "box",
            EntityKind::Sphere => "sphere",
            EntityKind::Cylinder => "cylinder",
            EntityKind::Plane => "plane",
            EntityKind::Cone => "cone",
            EntityKind::Light => "light",
            EntityKind::Group => "group",
        }
    }
}

/// Surface material of a mesh entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Hex color string, e.g. "#888888"
    pub color: String,
    pub metalness: f64,
    pub roughness: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive: Option<String>,
    pub emissive_intensity: f64,
    pub opacity: f64,
}

fn default_metalness() -> f64 {
    0.1
}

fn default_roughness() -> f64 {
    0.5
}

fn default_opacity() -> f64 {
    1.0
}

impl Material {
    /// A plain material with default surface properties
    pub fn flat(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            metalness: default_metalness(),
            roughness: default_roughness(),
            emissive: None,
            emissive_intensity: 0.0,
            opacity: default_opacity(),
        }
    }
}

/// Kind of light source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Point,
    Directional,
}

impl LightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightKind::Point => "point",
            LightKind::Directional => "directional",
        }
    }
}

/// Light properties of a light entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: String,
    pub intensity: f64,
}

/// Per-kind geometry dimensions, as created
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Geometry {
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    Cylinder { radius: f64, height: f64 },
    Cone { radius: f64, height: f64 },
    Plane { width: f64, height: f64 },
}

/// Position/rotation/scale of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// An addressable object in the scene store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEntity {
    /// Unique, stable for the entity lifetime
    pub id: String,
    pub kind: EntityKind,
    /// Human-readable display name, shown in observations
    pub name: String,
    pub transform: Transform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<Light>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    /// True for entities created by agent commands; scaffolding is false
    pub agent_created: bool,
    /// Id of the parent entity, for linked marker helpers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_of: Option<String>,
}

impl SceneEntity {
    pub fn new(id: impl Into<String>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            transform: Transform::default(),
            material: None,
            light: None,
            geometry: None,
            agent_created: false,
            helper_of: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn agent_created(mut self) -> Self {
        self.agent_created = true;
        self
    }

    pub fn helper_of(mut self, parent_id: impl Into<String>) -> Self {
        self.helper_of = Some(parent_id.into());
        self
    }

    /// Whether this entity is a linked marker helper
    pub fn is_helper(&self) -> bool {
        self.helper_of.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005), 1.0); // binary representation of 1.005 is just below
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(-0.996), -1.0);
    }

    #[test]
    fn test_vec3_rounded() {
        let v = Vec3::new(1.23456, -2.71828, 0.0);
        assert_eq!(v.rounded(), Vec3::new(1.23, -2.72, 0.0));
    }

    #[test]
    fn test_vec3_finite() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_material_flat() {
        let m = Material::flat("#ff0000");
        assert_eq!(m.color, "#ff0000");
        assert_eq!(m.metalness, 0.1);
        assert_eq!(m.roughness, 0.5);
        assert_eq!(m.opacity, 1.0);
        assert!(m.emissive.is_none());
    }

    #[test]
    fn test_entity_kind_serde() {
        let json = serde_json::to_string(&EntityKind::Box).unwrap();
        assert_eq!(json, "\"box\"");
        let kind: EntityKind = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(kind, EntityKind::Light);
    }

    #[test]
    fn test_helper_marker() {
        let light = SceneEntity::new("obj_1_0", EntityKind::Light, "Point Light").agent_created();
        let helper = SceneEntity::new("obj_1_0_helper", EntityKind::Sphere, "Point Light marker")
            .helper_of("obj_1_0");

        assert!(!light.is_helper());
        assert!(helper.is_helper());
        assert_eq!(helper.helper_of.as_deref(), Some("obj_1_0"));
    }
}
