use cad_descriptor::{BuildError, BuildWarning, ParseError, build_mesh, parse_descriptors};
use cad_mesh::{Mesh, PreviewConfig, PreviewError, render_preview, to_binary_stl};
use thiserror::Error;

use crate::{LanguageModel, ModelError, build_prompt};

/// File name offered for the STL download.
pub const STL_FILE_NAME: &str = "model.stl";

/// Everything a successful request produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub raw_response: String,
    pub warnings: Vec<BuildWarning>,
    pub mesh: Mesh,
    pub stl: Vec<u8>,
    pub preview_png: Vec<u8>,
}

/// Terminal failures of a single request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please enter a description.")]
    EmptyInput,
    #[error("The model returned an empty response. Please check the input or try again later.")]
    EmptyResponse,
    #[error("The model did not return a valid shape list: {source}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: ParseError,
    },
    #[error("No valid shapes were generated.")]
    NoValidShapes {
        raw: String,
        warnings: Vec<BuildWarning>,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

impl PipelineError {
    /// The model text, for errors raised after the model replied.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PipelineError::MalformedResponse { raw, .. }
            | PipelineError::NoValidShapes { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        match self {
            PipelineError::NoValidShapes { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

/// Runs one description through prompt, model, parser, builder and exporter.
pub struct ModelPipeline<C: LanguageModel> {
    client: C,
    preview: PreviewConfig,
}

impl<C: LanguageModel> ModelPipeline<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            preview: PreviewConfig::default(),
        }
    }

    pub fn with_preview_config(mut self, preview: PreviewConfig) -> Self {
        self.preview = preview;
        self
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn run(&mut self, user_input: &str) -> Result<PipelineOutput, PipelineError> {
        if user_input.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        log::info!("generating model for a {} character description", user_input.len());
        let raw = self.client.generate(&build_prompt(user_input))?;
        process_response(raw, &self.preview)
    }
}

/// Turns a raw model reply into the exported artifacts.
///
/// This is the offline half of the pipeline, usable on a saved reply.
pub fn process_response(
    raw: String,
    preview: &PreviewConfig,
) -> Result<PipelineOutput, PipelineError> {
    if raw.trim().is_empty() {
        return Err(PipelineError::EmptyResponse);
    }

    let descriptors = match parse_descriptors(&raw) {
        Ok(descriptors) => descriptors,
        Err(source) => return Err(PipelineError::MalformedResponse { raw, source }),
    };

    let built = match build_mesh(&descriptors) {
        Ok(built) => built,
        Err(BuildError::NoValidShapes { warnings }) => {
            return Err(PipelineError::NoValidShapes { raw, warnings });
        }
    };

    let stl = to_binary_stl(&built.mesh, STL_FILE_NAME);
    let preview_png = render_preview(&built.mesh, preview)?;
    log::info!(
        "built {} primitive(s), {} triangles, {} warning(s)",
        built.primitive_count,
        built.mesh.triangle_count(),
        built.warnings.len()
    );

    Ok(PipelineOutput {
        raw_response: raw,
        warnings: built.warnings,
        mesh: built.mesh,
        stl,
        preview_png,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use cad_descriptor::BuildWarning;
    use cad_mesh::{CYLINDER_SEGMENTS, PreviewConfig};

    use crate::{DEFAULT_SYSTEM_PROMPT, LanguageModel, ModelError};

    use super::{ModelPipeline, PipelineError, process_response};

    #[derive(Default)]
    struct ScriptedModel {
        responses: VecDeque<Result<String, String>>,
        prompts: Vec<String>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            let mut model = Self::default();
            model.responses.push_back(Ok(reply.to_string()));
            model
        }

        fn failing(message: &str) -> Self {
            let mut model = Self::default();
            model.responses.push_back(Err(message.to_string()));
            model
        }
    }

    impl LanguageModel for ScriptedModel {
        fn generate(&mut self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.push(prompt.to_string());
            match self.responses.pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(ModelError::Unavailable(message)),
                None => Err(ModelError::Unavailable("no scripted response".to_string())),
            }
        }
    }

    fn small_preview() -> PreviewConfig {
        PreviewConfig {
            width: 64,
            height: 64,
            ..PreviewConfig::default()
        }
    }

    #[test]
    fn successful_request_produces_stl_and_preview() {
        let reply = r#"[{"type": "box", "width": 10, "height": 5, "depth": 3},
                        {"type": "cylinder", "radius": 2, "height": 8, "position": [5, 0, 0]}]"#;
        let mut pipeline =
            ModelPipeline::new(ScriptedModel::replying(reply)).with_preview_config(small_preview());

        let output = pipeline.run("a box with a peg").expect("pipeline should succeed");
        let triangles = 12 + 4 * CYLINDER_SEGMENTS;
        assert_eq!(output.mesh.triangle_count(), triangles);
        assert_eq!(output.stl.len(), 84 + triangles * 50);
        assert_eq!(&output.preview_png[1..4], b"PNG");
        assert!(output.warnings.is_empty());
        assert_eq!(output.raw_response, reply);

        let model = pipeline.into_client();
        assert_eq!(model.prompts.len(), 1);
        assert!(model.prompts[0].starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(model.prompts[0].contains("a box with a peg"));
    }

    #[test]
    fn empty_input_never_calls_the_model() {
        let mut pipeline = ModelPipeline::new(ScriptedModel::replying("[]"));
        let err = pipeline.run("   ").expect_err("blank input should fail");
        assert!(matches!(err, PipelineError::EmptyInput));
        assert!(pipeline.into_client().prompts.is_empty());
    }

    #[test]
    fn empty_reply_is_reported_before_parsing() {
        let mut pipeline = ModelPipeline::new(ScriptedModel::replying("  \n"));
        let err = pipeline.run("a cube").expect_err("empty reply should fail");
        assert!(matches!(err, PipelineError::EmptyResponse));
        assert!(err.raw_response().is_none());
    }

    #[test]
    fn malformed_reply_surfaces_raw_text() {
        let reply = "Sure! Here is your model: [{\"type\": \"box\"";
        let mut pipeline = ModelPipeline::new(ScriptedModel::replying(reply));

        let err = pipeline.run("a cube").expect_err("malformed reply should fail");
        assert!(matches!(err, PipelineError::MalformedResponse { .. }));
        assert_eq!(err.raw_response(), Some(reply));
        assert!(err.to_string().starts_with("The model did not return a valid shape list"));
    }

    #[test]
    fn partially_supported_reply_keeps_supported_shapes() {
        let reply = r#"[{"type": "sphere", "radius": 3},
                        {"type": "cone", "radius": 1, "height": 4},
                        {"type": "box", "width": 1, "height": 1, "depth": 1}]"#;
        let output = process_response(reply.to_string(), &small_preview())
            .expect("two shapes are supported");

        assert_eq!(output.mesh.triangle_count(), 1280 + 12);
        assert_eq!(
            output.warnings,
            vec![BuildWarning::Unsupported("cone".to_string())]
        );
    }

    #[test]
    fn unsupported_only_reply_has_no_valid_shapes() {
        let reply = r#"[{"type": "cone", "radius": 1, "height": 4}]"#;
        let err = process_response(reply.to_string(), &small_preview())
            .expect_err("nothing is buildable");

        assert_eq!(err.to_string(), "No valid shapes were generated.");
        assert_eq!(err.warnings().len(), 1);
        assert!(err.warnings()[0].to_string().contains("cone"));
        assert_eq!(err.raw_response(), Some(reply));
    }

    #[test]
    fn model_failures_are_propagated() {
        let mut pipeline = ModelPipeline::new(ScriptedModel::failing("quota exceeded"));
        let err = pipeline.run("a cube").expect_err("model failure should surface");
        assert!(matches!(err, PipelineError::Model(_)));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn boxed_models_drive_the_pipeline() {
        let model: Box<dyn LanguageModel> =
            Box::new(ScriptedModel::replying(r#"[{"type": "sphere", "radius": 1}]"#));
        let mut pipeline = ModelPipeline::new(model).with_preview_config(small_preview());
        let output = pipeline.run("a ball").expect("pipeline should succeed");
        assert_eq!(output.mesh.triangle_count(), 1280);
    }
}
