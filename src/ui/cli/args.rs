// Wed Jan 21 2026 - Alex

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "struct-reader-gen")]
#[command(author = "Alex")]
#[command(version = "0.1.0")]
#[command(about = "Infers record layouts from field accesses and generates C readers for them", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// JSON configuration file; overrides the config embedded in the evidence.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub pointer_width: Option<usize>,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print structure declarations for every record and argument.
    Render(InputArgs),
    /// Print reader and release code for the call arguments.
    Generate(GenerateArgs),
    /// Register layouts into a type database and dump it as JSON.
    Types(InputArgs),
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    pub input: PathBuf,
}

impl InputArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.input.exists() {
            return Err(format!("Evidence file does not exist: {:?}", self.input));
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    pub input: PathBuf,

    /// Call template; `{{args}}` is replaced by the argument list.
    #[arg(long)]
    pub call: Option<String>,

    /// Emit a complete C program instead of bare fragments.
    #[arg(long)]
    pub program: bool,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.input.exists() {
            return Err(format!("Evidence file does not exist: {:?}", self.input));
        }
        if let Some(call) = &self.call {
            if !call.contains("{{args}}") {
                return Err("Call template must contain {{args}}".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let args = Args::parse_from([
            "struct-reader-gen",
            "--pointer-width",
            "4",
            "generate",
            "evidence.json",
            "--call",
            "f({{args}})",
            "--program",
        ]);
        assert_eq!(args.pointer_width, Some(4));
        match args.command {
            Command::Generate(generate) => {
                assert!(generate.program);
                assert_eq!(generate.call.as_deref(), Some("f({{args}})"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_template_needs_placeholder() {
        let args = GenerateArgs {
            input: PathBuf::from("Cargo.toml"),
            call: Some("f()".to_string()),
            program: false,
            output: None,
        };
        assert!(args.validate().is_err());
    }
}
