//! Test utilities for Quarry.
//!
//! - [`StubBackend`] - a configurable [`ResourceBackend`](quarry_assets::ResourceBackend)
//!   that records every call, with injectable failures, panics and delays
//! - [`MockAudioEngine`] - an [`AudioEngine`](quarry_audio::AudioEngine) whose
//!   sounds end only when the test says so
//!
//! Mocks use `parking_lot::Mutex` for interior mutability so every method
//! takes `&self` and the mocks can be shared across worker threads.
//!
//! # Example
//!
//! ```ignore
//! use quarry_test_utils::StubBackend;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! let stub = StubBackend::new("stub", &[ResourceType::Texture], &["png"]).fail_on("broken.png");
//! stub.register(&registry, 0);
//!
//! // ... drive a manager ...
//! assert_eq!(stub.decode_count(), 2);
//! ```

pub mod mock_audio;
pub mod stub_backend;

pub use mock_audio::{MockAudioEngine, MockSoundHandle};
pub use stub_backend::{BackendCall, StubBackend};
