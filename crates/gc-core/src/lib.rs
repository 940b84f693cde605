/// Configuration, types, and shared structures for glyphcast.
///
/// This crate contains all shared types, traits, and configuration logic
/// used across the glyphcast workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod palette;
pub mod quality;
pub mod traits;

pub use config::RunConfig;
pub use error::{ConfigError, RunError, SinkError};
pub use frame::{Cell, CellColor, PixelGrid, RenderedFrame, SourceFrame};
pub use quality::{GlyphLut, QualityProfile};
