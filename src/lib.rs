// Tue Jan 20 2026 - Alex

pub mod codegen;
pub mod config;
pub mod structure;
pub mod ui;

pub use codegen::{ArgumentReader, Generator, ProgramTemplate};
pub use config::Config;
pub use structure::{Layout, LayoutArena, LayoutId, Segment, SegmentTag, StructureError};
