use std::sync::Arc;

use crate::backend::{BackendCapabilities, BackendStats, LoadContext, ResourceBackend};
use crate::data::{ResourceData, ShaderData, ShaderStage};
use crate::error::AssetResult;
use crate::source::ResourceSource;
use crate::types::{ResourceType, SHADER_EXTENSIONS};

/// First word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Loads shader sources as text and SPIR-V modules as bytes.
///
/// No compilation happens here; the stage is inferred from the extension.
pub struct ShaderBackend {
    capabilities: BackendCapabilities,
    stats: BackendStats,
}

impl ShaderBackend {
    pub const NAME: &'static str = "shader";

    pub fn new() -> Self {
        Self {
            capabilities: Self::describe(),
            stats: BackendStats::default(),
        }
    }

    pub fn describe() -> BackendCapabilities {
        BackendCapabilities::new(&[ResourceType::Shader], SHADER_EXTENSIONS)
    }

    fn decode_file(ctx: &LoadContext<'_>) -> AssetResult<ShaderData> {
        let extension = ctx.extension.unwrap_or_default();
        let stage = ShaderStage::from_extension(extension);

        if extension == "spv" {
            let magic = ctx
                .bytes
                .get(0..4)
                .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
            if magic != Some(SPIRV_MAGIC) || ctx.bytes.len() % 4 != 0 {
                return Err(ctx.error("not a SPIR-V module"));
            }
            return Ok(ShaderData {
                stage,
                source: String::new(),
                binary: ctx.bytes.to_vec(),
            });
        }

        let source = std::str::from_utf8(ctx.bytes)
            .map_err(|e| ctx.error(format!("shader source is not UTF-8: {}", e)))?;
        if source.trim().is_empty() {
            return Err(ctx.error("shader source is blank"));
        }

        Ok(ShaderData {
            stage,
            source: source.to_string(),
            binary: Vec::new(),
        })
    }
}

impl Default for ShaderBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for ShaderBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
        let result = match ctx.source {
            ResourceSource::File { .. } => Self::decode_file(&ctx),
            // Runtime shaders are created through ShaderManager::create_from_source.
            _ => Err(ctx.error("no built-in shader by that name")),
        }
        .map(|shader| ResourceData::Shader(Arc::new(shader)));

        self.stats.record(result)
    }

    fn statistics(&self) -> String {
        self.stats.summary(Self::NAME)
    }
}
