//! Scene export - hand the finished store to the outside world.
//!
//! The core has no opinion on binary scene formats; it just provides a
//! complete, consistent document. Helpers and scaffolding are included so a
//! converter sees everything the store holds.

use crate::entity::SceneEntity;
use crate::store::{Camera, Environment, SceneStore};
use scenecraft_error::{Error, Result};
use serde::Serialize;

/// Export document format tag
pub const EXPORT_FORMAT: &str = "scenecraft_v1";

#[derive(Serialize)]
struct SceneDocument<'a> {
    format: &'static str,
    camera: &'a Camera,
    environment: &'a Environment,
    entities: Vec<&'a SceneEntity>,
}

/// Serialize the whole store as pretty JSON.
pub fn export_json(store: &SceneStore) -> Result<String> {
    let document = SceneDocument {
        format: EXPORT_FORMAT,
        camera: store.camera(),
        environment: store.environment(),
        entities: store.traverse().collect(),
    };

    serde_json::to_string_pretty(&document)
        .map_err(|e| Error::serialization_failed(e.to_string()).with_operation("export::json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandEnvelope};
    use crate::executor::execute;
    use serde_json::json;

    #[test]
    fn test_export_includes_everything() {
        let mut store = SceneStore::initialized();
        let cmd = Command::from_envelope(
            &CommandEnvelope::new("addPointLight").with_params(json!({"color": "#ffddaa"})),
        )
        .unwrap();
        assert!(execute(&mut store, &cmd).is_success());

        let text = export_json(&store).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(doc["format"], EXPORT_FORMAT);
        // 3 scaffolding entities + light + helper
        assert_eq!(doc["entities"].as_array().unwrap().len(), 5);
        assert_eq!(doc["environment"]["background"], "#f0f4ff");
    }
}
