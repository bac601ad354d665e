use std::io::Cursor;
use std::sync::Arc;

use crate::backend::{BackendCapabilities, BackendStats, LoadContext, ResourceBackend};
use crate::data::{MeshData, ModelData, ResourceData};
use crate::error::AssetResult;
use crate::source::ResourceSource;
use crate::types::ResourceType;

/// Loads Wavefront OBJ meshes and glTF documents, and builds primitives.
///
/// OBJ files are fully triangulated and carry positions and indices. For glTF
/// only the document is parsed: vertex and index counts come from the
/// accessors and buffers are left to the renderer.
pub struct ModelBackend {
    capabilities: BackendCapabilities,
    stats: BackendStats,
}

impl ModelBackend {
    pub const NAME: &'static str = "model";

    pub fn new() -> Self {
        Self {
            capabilities: Self::describe(),
            stats: BackendStats::default(),
        }
    }

    pub fn describe() -> BackendCapabilities {
        BackendCapabilities::new(&[ResourceType::Model], &["obj", "gltf", "glb"])
    }

    /// Build one of `triangle`, `quad`, `plane` or `cube`.
    pub fn primitive(name: &str) -> Option<ModelData> {
        let (positions, indices): (Vec<f32>, Vec<u32>) = match name {
            "triangle" => (
                vec![0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0],
                vec![0, 1, 2],
            ),
            "quad" => (
                vec![
                    -0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0,
                ],
                vec![0, 1, 2, 2, 3, 0],
            ),
            "plane" => (
                vec![
                    -0.5, 0.0, -0.5, 0.5, 0.0, -0.5, 0.5, 0.0, 0.5, -0.5, 0.0, 0.5,
                ],
                vec![0, 2, 1, 2, 0, 3],
            ),
            "cube" => (
                vec![
                    -0.5, -0.5, -0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, -0.5, 0.5, -0.5, //
                    -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, 0.5, 0.5, 0.5, -0.5, 0.5, 0.5,
                ],
                vec![
                    0, 2, 1, 0, 3, 2, // back
                    4, 5, 6, 4, 6, 7, // front
                    0, 1, 5, 0, 5, 4, // bottom
                    3, 6, 2, 3, 7, 6, // top
                    0, 4, 7, 0, 7, 3, // left
                    1, 2, 6, 1, 6, 5, // right
                ],
            ),
            _ => return None,
        };

        Some(ModelData {
            meshes: vec![MeshData {
                name: name.to_string(),
                vertex_count: positions.len() / 3,
                index_count: indices.len(),
                positions,
                indices,
            }],
        })
    }

    fn decode_obj(ctx: &LoadContext<'_>) -> AssetResult<ModelData> {
        let (models, _materials) = tobj::load_obj_buf(
            &mut Cursor::new(ctx.bytes),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            // Materials are not part of the model payload.
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .map_err(|e| ctx.error(format!("OBJ parse failed: {}", e)))?;

        if models.is_empty() {
            return Err(ctx.error("OBJ file contains no meshes"));
        }

        let meshes = models
            .into_iter()
            .map(|model| MeshData {
                name: model.name,
                vertex_count: model.mesh.positions.len() / 3,
                index_count: model.mesh.indices.len(),
                positions: model.mesh.positions,
                indices: model.mesh.indices,
            })
            .collect();
        Ok(ModelData { meshes })
    }

    fn decode_gltf(ctx: &LoadContext<'_>) -> AssetResult<ModelData> {
        let document = gltf::Gltf::from_slice(ctx.bytes)
            .map_err(|e| ctx.error(format!("glTF parse failed: {}", e)))?;

        let meshes: Vec<MeshData> = document
            .meshes()
            .map(|mesh| {
                let mut data = MeshData {
                    name: mesh
                        .name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("mesh{}", mesh.index())),
                    ..Default::default()
                };
                for primitive in mesh.primitives() {
                    if let Some(positions) = primitive.get(&gltf::Semantic::Positions) {
                        data.vertex_count += positions.count();
                    }
                    if let Some(indices) = primitive.indices() {
                        data.index_count += indices.count();
                    }
                }
                data
            })
            .collect();

        if meshes.is_empty() {
            return Err(ctx.error("glTF document contains no meshes"));
        }
        Ok(ModelData { meshes })
    }
}

impl Default for ModelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for ModelBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
        let result = match ctx.source {
            ResourceSource::Primitive { name } => Self::primitive(name)
                .ok_or_else(|| ctx.error(format!("unknown primitive '{}'", name))),
            ResourceSource::Generated { .. } => Err(ctx.error("generated models are not supported")),
            ResourceSource::File { .. } => match ctx.extension {
                Some("obj") => Self::decode_obj(&ctx),
                Some("gltf") | Some("glb") => Self::decode_gltf(&ctx),
                other => Err(ctx.error(format!("unsupported model format {:?}", other))),
            },
        }
        .map(|model| ResourceData::Model(Arc::new(model)));

        self.stats.record(result)
    }

    fn statistics(&self) -> String {
        self.stats.summary(Self::NAME)
    }
}
