//! Built-in backends for the texture, shader and model families.

mod model;
mod shader;
mod texture;

use std::sync::Arc;

pub use model::ModelBackend;
pub use shader::ShaderBackend;
pub use texture::TextureBackend;

use crate::backend::ResourceBackend;
use crate::registry::{BackendRegistry, DEFAULT_BACKEND_PRIORITY};

/// Register the texture, shader and model backends at the default priority.
///
/// Returns the number of backends newly registered; names already taken are
/// skipped.
pub fn register_builtin_backends(registry: &BackendRegistry) -> usize {
    let mut registered = 0;

    if registry.register_backend(
        TextureBackend::NAME,
        TextureBackend::describe(),
        DEFAULT_BACKEND_PRIORITY,
        || Ok(Arc::new(TextureBackend::new()) as Arc<dyn ResourceBackend>),
    ) {
        registered += 1;
    }

    if registry.register_backend(
        ShaderBackend::NAME,
        ShaderBackend::describe(),
        DEFAULT_BACKEND_PRIORITY,
        || Ok(Arc::new(ShaderBackend::new()) as Arc<dyn ResourceBackend>),
    ) {
        registered += 1;
    }

    if registry.register_backend(
        ModelBackend::NAME,
        ModelBackend::describe(),
        DEFAULT_BACKEND_PRIORITY,
        || Ok(Arc::new(ModelBackend::new()) as Arc<dyn ResourceBackend>),
    ) {
        registered += 1;
    }

    registered
}
