//! Glint: a frame-level ReSTIR direct-lighting renderer.
//!
//! [`Renderer`] owns per-pixel reservoir buffers and, each frame, runs light
//! presampling, initial candidates, temporal and spatial reuse and shading
//! over them, in parallel over pixels; the per-pixel algorithms themselves
//! live in [`gpu`].

#![allow(clippy::len_without_is_empty)]

mod buffers;
mod presampling;
mod renderer;
mod schedule;
mod settings;
mod utils;
mod visibility_grid;

pub use glint_gpu as gpu;

pub use self::buffers::*;
pub use self::presampling::*;
pub use self::renderer::*;
pub use self::schedule::*;
pub use self::settings::*;
pub use self::utils::*;
pub use self::visibility_grid::*;
