use cad_mesh::{CYLINDER_SEGMENTS, Mesh, SPHERE_SUBDIVISIONS, box_mesh, cylinder, icosphere};
use thiserror::Error;

use crate::{PrimitiveDescriptor, ShapeKind};

/// Why a descriptor was dropped. Dropping is never fatal for the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildWarning {
    #[error("Shape type '{0}' not supported yet.")]
    Unsupported(String),
    #[error("Shape type '{kind}' is missing required field '{field}'.")]
    MissingDimension { kind: String, field: &'static str },
    #[error("Shape type '{kind}' has invalid {field} {value}; dimensions must be positive.")]
    InvalidDimension {
        kind: String,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("No valid shapes were generated.")]
    NoValidShapes { warnings: Vec<BuildWarning> },
}

impl BuildError {
    pub fn warnings(&self) -> &[BuildWarning] {
        match self {
            BuildError::NoValidShapes { warnings } => warnings,
        }
    }
}

/// Per-descriptor meshes plus the warnings for every dropped descriptor.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub meshes: Vec<Mesh>,
    pub warnings: Vec<BuildWarning>,
}

/// The single mesh produced for a request.
#[derive(Debug, Clone)]
pub struct BuiltMesh {
    pub mesh: Mesh,
    pub primitive_count: usize,
    pub warnings: Vec<BuildWarning>,
}

impl BuildOutcome {
    /// Merges the accepted meshes into one.
    pub fn combine(self) -> Result<BuiltMesh, BuildError> {
        let BuildOutcome {
            mut meshes,
            warnings,
        } = self;

        let primitive_count = meshes.len();
        let mesh = match primitive_count {
            0 => return Err(BuildError::NoValidShapes { warnings }),
            1 => meshes.swap_remove(0),
            _ => Mesh::concatenate(&meshes),
        };

        Ok(BuiltMesh {
            mesh,
            primitive_count,
            warnings,
        })
    }
}

/// Builds one mesh per accepted descriptor, in input order.
pub fn build_meshes(descriptors: &[PrimitiveDescriptor]) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();
    for descriptor in descriptors {
        match build_primitive(descriptor) {
            Ok(mesh) => outcome.meshes.push(mesh),
            Err(warning) => {
                log::warn!("dropping descriptor: {warning}");
                outcome.warnings.push(warning);
            }
        }
    }
    log::debug!(
        "built {} of {} descriptors",
        outcome.meshes.len(),
        descriptors.len()
    );
    outcome
}

/// Builds every descriptor and combines the survivors into one mesh.
pub fn build_mesh(descriptors: &[PrimitiveDescriptor]) -> Result<BuiltMesh, BuildError> {
    build_meshes(descriptors).combine()
}

fn build_primitive(descriptor: &PrimitiveDescriptor) -> Result<Mesh, BuildWarning> {
    if let ShapeKind::Unsupported(name) = &descriptor.kind {
        return Err(BuildWarning::Unsupported(name.clone()));
    }

    let values = required(descriptor)?;
    match (&descriptor.kind, values.as_slice()) {
        (ShapeKind::Box, &[width, height, depth]) => {
            ignore_position(descriptor);
            Ok(box_mesh([width, height, depth]))
        }
        (ShapeKind::Cylinder, &[radius, height]) => {
            let mesh = cylinder(radius, height, CYLINDER_SEGMENTS);
            Ok(match descriptor.position {
                Some(offset) => mesh.translated(offset),
                None => mesh,
            })
        }
        (ShapeKind::Sphere, &[radius]) => {
            ignore_position(descriptor);
            Ok(icosphere(radius, SPHERE_SUBDIVISIONS))
        }
        (kind, values) => unreachable!("`{kind}` resolved {} dimensions", values.len()),
    }
}

/// Reads the kind's required dimensions in declaration order.
fn required(descriptor: &PrimitiveDescriptor) -> Result<Vec<f64>, BuildWarning> {
    descriptor
        .kind
        .required_dimensions()
        .iter()
        .map(|&field| {
            let value = descriptor
                .dimension(field)
                .ok_or_else(|| BuildWarning::MissingDimension {
                    kind: descriptor.kind.to_string(),
                    field,
                })?;
            if !value.is_finite() || value <= 0.0 {
                return Err(BuildWarning::InvalidDimension {
                    kind: descriptor.kind.to_string(),
                    field,
                    value,
                });
            }
            Ok(value)
        })
        .collect()
}

fn ignore_position(descriptor: &PrimitiveDescriptor) {
    if let Some(position) = descriptor.position {
        log::debug!(
            "position {position:?} ignored for {}; only cylinders are translated",
            descriptor.kind
        );
    }
}
