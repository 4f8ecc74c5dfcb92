// Tue Jan 20 2026 - Alex

pub mod generator;
pub mod harness;

pub use generator::{ArgumentReader, Generator, ReaderCode};
pub use harness::ProgramTemplate;
