use thiserror::Error;

mod gemini;
mod pipeline;

pub use gemini::{
    ConfigError, DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiClient, GeminiConfig, GenerationSettings,
    reply_text,
};
pub use pipeline::{
    ModelPipeline, PipelineError, PipelineOutput, STL_FILE_NAME, process_response,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a CAD assistant that turns a description of a physical object into a list of geometric primitives.

Respond with a JSON array and nothing else: no prose, no markdown, no code fences.
Each element is an object with a "type" field and the numeric fields for that type.
All dimensions are in millimeters and must be positive.

Supported types:
- {"type": "box", "width": <x extent>, "height": <y extent>, "depth": <z extent>}
  An axis-aligned box centered at the origin.
- {"type": "cylinder", "radius": <radius>, "height": <length along z>, "position": [x, y, z]}
  A capped cylinder along the z axis. "position" is optional and moves its center.
- {"type": "sphere", "radius": <radius>}
  A sphere centered at the origin.

Use several primitives for compound objects. Only use the types listed above.

Example for "a table top with one leg":
[{"type": "box", "width": 100, "height": 60, "depth": 4}, {"type": "cylinder", "radius": 3, "height": 70, "position": [0, 0, -37]}]
"#;

/// Wraps the user's description in the fixed instruction template.
pub fn build_prompt(user_input: &str) -> String {
    format!(
        "{DEFAULT_SYSTEM_PROMPT}\nDescribe this object: {}\n",
        user_input.trim()
    )
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request to the language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("language model reply could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Unavailable(String),
}

/// A hosted text-generation backend. One call per request, no history.
pub trait LanguageModel {
    fn generate(&mut self, prompt: &str) -> Result<String, ModelError>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn generate(&mut self, prompt: &str) -> Result<String, ModelError> {
        (**self).generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SYSTEM_PROMPT, build_prompt};

    #[test]
    fn system_prompt_names_every_supported_type() {
        for required in ["\"box\"", "\"cylinder\"", "\"sphere\"", "\"position\"", "JSON array"] {
            assert!(
                DEFAULT_SYSTEM_PROMPT.contains(required),
                "missing required prompt section: {required}"
            );
        }
    }

    #[test]
    fn prompt_wraps_trimmed_user_input() {
        let prompt = build_prompt("  a coffee mug \n");
        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.ends_with("Describe this object: a coffee mug\n"));
    }
}
