// Wed Jan 21 2026 - Alex

pub mod cli;

pub use cli::{Args, Command, CommandHandler};
