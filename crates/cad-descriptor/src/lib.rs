//! Primitive descriptors: the structured records a language model emits to
//! describe a model, their strict JSON decoding, and their translation into
//! triangle meshes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

mod build;

pub use build::{BuildError, BuildOutcome, BuildWarning, BuiltMesh, build_mesh, build_meshes};

/// Closed set of primitive kinds the mesh builder understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Box,
    Cylinder,
    Sphere,
    /// Any other `type` value, kept verbatim for warnings.
    Unsupported(String),
}

impl ShapeKind {
    /// Matches a descriptor `type`, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "box" => ShapeKind::Box,
            "cylinder" => ShapeKind::Cylinder,
            "sphere" => ShapeKind::Sphere,
            _ => ShapeKind::Unsupported(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Unsupported(name) => name,
        }
    }

    /// Dimension fields that must be present for this kind.
    pub fn required_dimensions(&self) -> &'static [&'static str] {
        match self {
            ShapeKind::Box => &["width", "height", "depth"],
            ShapeKind::Cylinder => &["radius", "height"],
            ShapeKind::Sphere => &["radius"],
            ShapeKind::Unsupported(_) => &[],
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One shape named by the model, with its numeric parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveDescriptor {
    pub kind: ShapeKind,
    pub dimensions: BTreeMap<String, f64>,
    pub position: Option<[f64; 3]>,
}

impl PrimitiveDescriptor {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            dimensions: BTreeMap::new(),
            position: None,
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: f64) -> Self {
        self.dimensions.insert(name.into(), value);
        self
    }

    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.position = Some(position);
        self
    }

    pub fn dimension(&self, name: &str) -> Option<f64> {
        self.dimensions.get(name).copied()
    }
}

/// The model reply could not be decoded as a descriptor list.
#[derive(Debug, Error)]
#[error("invalid descriptor JSON: {source}")]
pub struct ParseError {
    #[from]
    source: serde_json::Error,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    position: Option<[f64; 3]>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl From<RawDescriptor> for PrimitiveDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        let mut dimensions = BTreeMap::new();
        for (name, value) in raw.fields {
            match value.as_f64() {
                Some(number) => {
                    dimensions.insert(name, number);
                }
                None => log::debug!("ignoring non-numeric field `{name}` on `{}`", raw.kind),
            }
        }

        PrimitiveDescriptor {
            kind: ShapeKind::from_name(&raw.kind),
            dimensions,
            position: raw.position,
        }
    }
}

/// Strictly decodes `text` as a JSON array of descriptor objects.
///
/// The whole input must be the array: no code fences, prose or trailing data.
/// Every element needs a string `type`; `position`, when present, must be an
/// array of three numbers. Order and duplicates are preserved.
pub fn parse_descriptors(text: &str) -> Result<Vec<PrimitiveDescriptor>, ParseError> {
    let raw: Vec<RawDescriptor> = serde_json::from_str(text)?;
    Ok(raw.into_iter().map(PrimitiveDescriptor::from).collect())
}

#[cfg(test)]
mod tests {
    use super::{PrimitiveDescriptor, ShapeKind, parse_descriptors};

    #[test]
    fn parses_flat_descriptor_records_in_order() {
        let descriptors = parse_descriptors(
            r#"[
                {"type": "box", "width": 10, "height": 5, "depth": 3},
                {"type": "cylinder", "radius": 2, "height": 8, "position": [5, 0, 0]},
                {"type": "box", "width": 10, "height": 5, "depth": 3}
            ]"#,
        )
        .expect("descriptor list should parse");

        assert_eq!(descriptors.len(), 3);
        assert_eq!(
            descriptors[0],
            PrimitiveDescriptor::new(ShapeKind::Box)
                .with_dimension("width", 10.0)
                .with_dimension("height", 5.0)
                .with_dimension("depth", 3.0)
        );
        assert_eq!(descriptors[1].kind, ShapeKind::Cylinder);
        assert_eq!(descriptors[1].position, Some([5.0, 0.0, 0.0]));
        assert_eq!(descriptors[1].dimension("radius"), Some(2.0));
        assert_eq!(descriptors[0], descriptors[2]);
    }

    #[test]
    fn unknown_types_are_kept_verbatim() {
        let descriptors =
            parse_descriptors(r#"[{"type": "Cone", "radius": 1}]"#).expect("should parse");
        assert_eq!(descriptors[0].kind, ShapeKind::Unsupported("Cone".to_string()));
        assert_eq!(descriptors[0].kind.to_string(), "Cone");
    }

    #[test]
    fn type_matching_ignores_case_and_whitespace() {
        assert_eq!(ShapeKind::from_name(" Sphere "), ShapeKind::Sphere);
        assert_eq!(ShapeKind::from_name("BOX"), ShapeKind::Box);
    }

    #[test]
    fn non_numeric_fields_are_ignored() {
        let descriptors =
            parse_descriptors(r#"[{"type": "sphere", "radius": 4.5, "name": "head"}]"#)
                .expect("should parse");
        assert_eq!(descriptors[0].dimensions.len(), 1);
        assert_eq!(descriptors[0].dimension("radius"), Some(4.5));
        assert_eq!(descriptors[0].position, None);
    }

    #[test]
    fn empty_array_is_an_empty_list() {
        assert!(parse_descriptors("[]").expect("should parse").is_empty());
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let inputs = [
            "",
            "not json at all",
            "```json\n[{\"type\": \"box\"}]\n```",
            r#"{"type": "box", "width": 1}"#,
            r#"[{"type": "box"}] trailing"#,
            r#"[{"width": 1}]"#,
            r#"[{"type": 7}]"#,
            r#"["box"]"#,
            r#"[{"type": "cylinder", "position": [1, 2]}]"#,
            r#"[{"type": "cylinder", "position": "origin"}]"#,
        ];

        for input in inputs {
            assert!(
                parse_descriptors(input).is_err(),
                "input should be rejected: {input}"
            );
        }
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse_descriptors("[\n  {\"type\": }\n]").expect_err("should fail");
        assert!(err.to_string().starts_with("invalid descriptor JSON"));
        assert!(err.to_string().contains("line 2"));
    }
}
