//! Per-pixel algorithms used by Glint's renderer: reservoirs, candidate
//! generation, resampling, shading and path termination.
//!
//! Everything in here operates on a single pixel at a time and never
//! allocates, so that the renderer can run each pass as a data-parallel loop
//! over its output buffer.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]

mod brdf;
mod emitter;
mod envmap;
mod material;
mod noise;
mod passes;
mod ray;
mod resampling;
mod reservoir;
mod ris;
mod russian_roulette;
mod shading;
mod surface;
mod utils;
mod visibility;
mod world;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use self::brdf::*;
pub use self::emitter::*;
pub use self::envmap::*;
pub use self::material::*;
pub use self::noise::*;
pub use self::passes::*;
pub use self::ray::*;
pub use self::resampling::*;
pub use self::reservoir::*;
pub use self::ris::*;
pub use self::russian_roulette::*;
pub use self::shading::*;
pub use self::surface::*;
pub use self::utils::*;
pub use self::visibility::*;
pub use self::world::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;

    pub use crate::*;
}

/// Cosines below this value are treated as grazing (and thus contributing
/// nothing).
pub const GLINT_EPSILON: f32 = 0.000001;
