// Wed Jan 21 2026 - Alex

pub mod args;
pub mod handler;

pub use args::{Args, Command, GenerateArgs, InputArgs};
pub use handler::CommandHandler;
