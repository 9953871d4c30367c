pub mod backend;
pub mod buffer_util;
pub mod compute_stage;
pub mod config;
pub mod controller;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod fps_estimator;
pub mod gpu;
pub mod gpu_backend;
pub mod host_backend;
pub mod kernel;
pub mod particle;
pub mod particle_buffer;
pub mod render_stage;
pub mod shader_utils;
pub mod view;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{DrawStats, ParticleBackend};
pub use controller::SimulationController;
pub use error::{FermatError, Result};
