//! Loaded payloads, one variant per resource family.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::ResourceType;

/// Decoded RGBA8 image data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, row-major.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// A texture filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A two-color checkerboard with square cells.
    pub fn checker(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let color = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&color);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Pipeline stage a shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Geometry,
    /// Multi-stage or unspecified (e.g. `.wgsl`, `.glsl`).
    Combined,
}

impl ShaderStage {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "vert" => ShaderStage::Vertex,
            "frag" => ShaderStage::Fragment,
            "comp" => ShaderStage::Compute,
            "geom" => ShaderStage::Geometry,
            _ => ShaderStage::Combined,
        }
    }
}

/// Shader source code. Compilation is left to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderData {
    pub stage: ShaderStage,
    pub source: String,
    /// Raw bytes for binary shaders (`.spv`); empty for text sources.
    pub binary: Vec<u8>,
}

/// A single mesh inside a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: String,
    pub vertex_count: usize,
    pub index_count: usize,
    /// Flat `[x, y, z, ...]` positions, when the format carries them inline.
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

/// A model made of one or more meshes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertex_count).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.index_count).sum()
    }
}

/// An encoded audio clip plus whatever the decoder could learn about it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Lowercased container extension (`wav`, `ogg`, ...).
    pub format: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// `None` when the format was not decoded far enough to know.
    pub duration: Option<Duration>,
    pub bytes: Arc<[u8]>,
}

/// The payload of a loaded resource.
///
/// Each family has its own variant so consumers match on the payload instead
/// of downcasting. `Custom` is the escape hatch for third-party backends.
#[derive(Clone)]
pub enum ResourceData {
    Texture(Arc<TextureData>),
    Shader(Arc<ShaderData>),
    Model(Arc<ModelData>),
    Audio(Arc<AudioClip>),
    Bytes(Arc<[u8]>),
    Custom {
        value: Arc<dyn Any + Send + Sync>,
        size: usize,
    },
}

impl ResourceData {
    /// The family this payload naturally belongs to.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceData::Texture(_) => ResourceType::Texture,
            ResourceData::Shader(_) => ResourceType::Shader,
            ResourceData::Model(_) => ResourceType::Model,
            ResourceData::Audio(_) => ResourceType::Audio,
            ResourceData::Bytes(_) => ResourceType::Data,
            ResourceData::Custom { .. } => ResourceType::Unknown,
        }
    }

    /// Rough memory footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            ResourceData::Texture(t) => t.pixels.len(),
            ResourceData::Shader(s) => s.source.len() + s.binary.len(),
            ResourceData::Model(m) => m
                .meshes
                .iter()
                .map(|mesh| {
                    mesh.positions.len() * std::mem::size_of::<f32>()
                        + mesh.indices.len() * std::mem::size_of::<u32>()
                })
                .sum(),
            ResourceData::Audio(a) => a.bytes.len(),
            ResourceData::Bytes(b) => b.len(),
            ResourceData::Custom { size, .. } => *size,
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<TextureData>> {
        match self {
            ResourceData::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&Arc<ShaderData>> {
        match self {
            ResourceData::Shader(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Arc<ModelData>> {
        match self {
            ResourceData::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&Arc<AudioClip>> {
        match self {
            ResourceData::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Arc<[u8]>> {
        match self {
            ResourceData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Downcast a `Custom` payload.
    pub fn custom<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            ResourceData::Custom { value, .. } => Arc::clone(value).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceData::Texture(t) => f
                .debug_struct("Texture")
                .field("width", &t.width)
                .field("height", &t.height)
                .finish(),
            ResourceData::Shader(s) => f.debug_struct("Shader").field("stage", &s.stage).finish(),
            ResourceData::Model(m) => f
                .debug_struct("Model")
                .field("meshes", &m.meshes.len())
                .finish(),
            ResourceData::Audio(a) => f
                .debug_struct("Audio")
                .field("format", &a.format)
                .field("duration", &a.duration)
                .finish(),
            ResourceData::Bytes(b) => f.debug_struct("Bytes").field("len", &b.len()).finish(),
            ResourceData::Custom { size, .. } => {
                f.debug_struct("Custom").field("size", size).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_texture() {
        let tex = TextureData::solid(2, 3, [1, 2, 3, 4]);
        assert_eq!(tex.pixels.len(), 2 * 3 * 4);
        assert_eq!(&tex.pixels[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_checker_alternates() {
        let tex = TextureData::checker(4, 2, [255; 4], [0; 4]);
        assert_eq!(&tex.pixels[0..4], &[255; 4]);
        // x = 2 is the second cell on the first row
        assert_eq!(&tex.pixels[8..12], &[0; 4]);
    }

    #[test]
    fn test_size_estimates() {
        let data = ResourceData::Bytes(Arc::from(vec![0u8; 16]));
        assert_eq!(data.size_bytes(), 16);
        assert_eq!(data.resource_type(), ResourceType::Data);

        let model = ModelData {
            meshes: vec![MeshData {
                name: "tri".into(),
                vertex_count: 3,
                index_count: 3,
                positions: vec![0.0; 9],
                indices: vec![0, 1, 2],
            }],
        };
        assert_eq!(ResourceData::Model(Arc::new(model)).size_bytes(), 9 * 4 + 3 * 4);
    }

    #[test]
    fn test_custom_downcast() {
        let data = ResourceData::Custom {
            value: Arc::new(42u32),
            size: 4,
        };
        assert_eq!(data.custom::<u32>().as_deref(), Some(&42));
        assert!(data.custom::<String>().is_none());
    }
}
