use std::sync::Arc;

use image::ImageFormat;

use crate::backend::{BackendCapabilities, BackendStats, LoadContext, ResourceBackend};
use crate::data::{ResourceData, TextureData};
use crate::error::AssetResult;
use crate::source::ResourceSource;
use crate::types::ResourceType;

/// Side length of the generated solid-color textures.
const SOLID_SIZE: u32 = 4;
/// Side length and cell size of `generated://checker`.
const CHECKER_SIZE: u32 = 64;
const CHECKER_CELL: u32 = 8;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];
const MAGENTA: [u8; 4] = [255, 0, 255, 255];

/// Decodes PNG, JPEG, BMP and TGA images into RGBA8.
///
/// Also serves `generated://white`, `black`, `magenta` and `checker`.
pub struct TextureBackend {
    capabilities: BackendCapabilities,
    stats: BackendStats,
}

impl TextureBackend {
    pub const NAME: &'static str = "texture";

    pub fn new() -> Self {
        Self {
            capabilities: Self::describe(),
            stats: BackendStats::default(),
        }
    }

    pub fn describe() -> BackendCapabilities {
        BackendCapabilities::new(&[ResourceType::Texture], &["png", "jpg", "jpeg", "bmp", "tga"])
    }

    /// Build one of the named generated textures.
    pub fn generated(name: &str) -> Option<TextureData> {
        match name {
            "white" => Some(TextureData::solid(SOLID_SIZE, SOLID_SIZE, WHITE)),
            "black" => Some(TextureData::solid(SOLID_SIZE, SOLID_SIZE, BLACK)),
            "magenta" => Some(TextureData::solid(SOLID_SIZE, SOLID_SIZE, MAGENTA)),
            "checker" => Some(TextureData::checker(CHECKER_SIZE, CHECKER_CELL, MAGENTA, BLACK)),
            _ => None,
        }
    }

    fn decode_image(&self, ctx: &LoadContext<'_>) -> AssetResult<TextureData> {
        let decoded = match ctx.extension.and_then(ImageFormat::from_extension) {
            Some(format) => image::load_from_memory_with_format(ctx.bytes, format),
            None => image::load_from_memory(ctx.bytes),
        }
        .map_err(|e| ctx.error(format!("image decode failed: {}", e)))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureData {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

impl Default for TextureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for TextureBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    fn decode(&self, ctx: LoadContext<'_>) -> AssetResult<ResourceData> {
        let result = match ctx.source {
            ResourceSource::Generated { name } => Self::generated(name)
                .ok_or_else(|| ctx.error(format!("unknown generated texture '{}'", name))),
            ResourceSource::Primitive { .. } => Err(ctx.error("primitives are not textures")),
            ResourceSource::File { .. } => self.decode_image(&ctx),
        }
        .map(|texture| ResourceData::Texture(Arc::new(texture)));

        self.stats.record(result)
    }

    fn statistics(&self) -> String {
        self.stats.summary(Self::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoadConfig;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode(backend: &TextureBackend, path: &str, bytes: &[u8]) -> AssetResult<ResourceData> {
        let source = ResourceSource::parse(path);
        let extension = source.extension();
        backend.decode(LoadContext {
            source: &source,
            resource_type: ResourceType::Texture,
            bytes,
            extension: extension.as_deref(),
            config: &LoadConfig::default(),
        })
    }

    #[test]
    fn test_decode_png() {
        let backend = TextureBackend::new();
        let data = decode(&backend, "a.png", &encode_png(3, 2)).unwrap();
        let texture = data.as_texture().unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(&texture.pixels[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_corrupt_image_fails() {
        let backend = TextureBackend::new();
        assert!(decode(&backend, "a.png", b"not a png").is_err());
        assert_eq!(backend.stats.failed(), 1);
    }

    #[test]
    fn test_generated_textures() {
        let backend = TextureBackend::new();
        let white = decode(&backend, "generated://white", &[]).unwrap();
        assert_eq!(white.as_texture().unwrap().pixels[0..4], WHITE);

        let checker = decode(&backend, "generated://checker", &[]).unwrap();
        assert_eq!(checker.as_texture().unwrap().width, CHECKER_SIZE);

        assert!(decode(&backend, "generated://plaid", &[]).is_err());
        assert_eq!(backend.statistics(), format!(
            "texture: 2 decoded, 1 failed, {} bytes",
            (SOLID_SIZE * SOLID_SIZE * 4 + CHECKER_SIZE * CHECKER_SIZE * 4)
        ));
    }
}
