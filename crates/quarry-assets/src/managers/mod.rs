//! Type-specialized front-ends over [`ResourceManager`](crate::manager::ResourceManager).
//!
//! Each typed manager owns a plain resource manager, derefs to it, and adds
//! construction helpers for its family.

mod model;
mod shader;
mod texture;

pub use model::ModelManager;
pub use shader::ShaderManager;
pub use texture::TextureManager;
