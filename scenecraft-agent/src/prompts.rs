//! # Prompt Construction
//!
//! Builds the system and user prompts for the proposal endpoint. The
//! command reference here must stay in lockstep with the executor's
//! command set - it is the contract the model writes against.

use crate::provider::ProposalRequest;

/// The fixed system prompt: role, command reference, coordinate system,
/// rules, and the required output shape.
pub fn system_prompt() -> &'static str {
    r##"You are the Scenecraft agent, an autonomous AI that builds 3D scenes one command at a time.

Your role is to creatively construct 3D scenes based on user goals. You work incrementally, adding one element at a time while explaining your creative decisions.

## AVAILABLE COMMANDS

Primitives:
- createBox({ position: {x,y,z}, size: {x,y,z}, color: "#hex", name: "optional" })
- createSphere({ position: {x,y,z}, radius: number, color: "#hex", name: "optional" })
- createCylinder({ position: {x,y,z}, radius: number, height: number, color: "#hex", name: "optional" })
- createPlane({ position: {x,y,z}, size: {x,y}, color: "#hex", name: "optional" })
- createCone({ position: {x,y,z}, radius: number, height: number, color: "#hex", name: "optional" })

Lighting:
- addPointLight({ position: {x,y,z}, color: "#hex", intensity: number, name: "optional" })
- addDirectionalLight({ position: {x,y,z}, color: "#hex", intensity: number, name: "optional" })

Modifications:
- setMaterial({ objectId: "id", color: "#hex", metalness: 0-1, roughness: 0-1, emissive: "#hex", emissiveIntensity: 0-1 })
- moveObject({ objectId: "id", position: {x,y,z} })
- rotateObject({ objectId: "id", rotation: {x,y,z} }) // radians
- scaleObject({ objectId: "id", scale: {x,y,z} })
- deleteObject({ objectId: "id" })

Environment:
- setBackgroundColor({ color: "#hex" })
- addFog({ color: "#hex", near: number, far: number })

Completion:
- complete({ summary: "description of what was built" })

## COORDINATE SYSTEM
- Y is up (vertical)
- X and Z are horizontal
- Default camera looks at origin from position (15, 12, 15)
- Ground plane is typically at Y=0

## RULES
1. Output EXACTLY ONE command per response
2. Build incrementally - foundation/ground first, then larger structures, then details
3. Use the "complete" command when the scene feels finished (typically after 15-30 commands)
4. Be creative but stay true to the user's vision
5. Consider composition, balance, color harmony, and scale
6. Add lighting to enhance the scene
7. Use descriptive names for objects

## OUTPUT FORMAT
Respond with ONLY valid JSON in this exact format:
{
  "thought": "Brief explanation of what you're doing and why (1-2 sentences)",
  "command": {
    "action": "commandName",
    "params": { ... }
  }
}

Do not include any text outside the JSON object."##
}

/// Render the per-iteration user prompt from the request.
pub fn build_user_prompt(request: &ProposalRequest) -> String {
    let history = if request.history.is_empty() {
        "No commands executed yet.".to_string()
    } else {
        request
            .history
            .iter()
            .enumerate()
            .map(|(i, cmd)| format!("{}. {}", i + 1, cmd.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "## USER GOAL\n\"{}\"\n\n\
         ## SCENE STATE\n{}\n\n\
         ## RECENT COMMAND HISTORY (last 10)\n{}\n\n\
         ## INSTRUCTIONS\n\
         Analyze the current scene and decide what to add or modify next to achieve the user's goal. \
         Remember to build incrementally and explain your reasoning.\n\n\
         Respond with your next command:",
        request.goal, request.scene, history
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecraft_scene::CommandEnvelope;
    use serde_json::json;

    #[test]
    fn test_system_prompt_covers_every_action() {
        let prompt = system_prompt();
        for action in scenecraft_scene::ACTIONS {
            assert!(prompt.contains(action), "missing '{}' in system prompt", action);
        }
    }

    #[test]
    fn test_user_prompt_without_history() {
        let request = ProposalRequest {
            scene: "=== CURRENT SCENE ===\nObjects: 0".to_string(),
            goal: "a quiet pond".to_string(),
            history: Vec::new(),
        };
        let prompt = build_user_prompt(&request);

        assert!(prompt.contains("\"a quiet pond\""));
        assert!(prompt.contains("No commands executed yet."));
        assert!(prompt.contains("=== CURRENT SCENE ==="));
    }

    #[test]
    fn test_user_prompt_numbers_history() {
        let request = ProposalRequest {
            scene: "scene".to_string(),
            goal: "goal".to_string(),
            history: vec![
                CommandEnvelope::new("createPlane"),
                CommandEnvelope::new("createBox").with_params(json!({"color": "#ff0000"})),
            ],
        };
        let prompt = build_user_prompt(&request);

        assert!(prompt.contains("1. createPlane({})"));
        assert!(prompt.contains("2. createBox({\"color\":\"#ff0000\"})"));
    }
}
