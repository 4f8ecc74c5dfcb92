// Wed Jan 21 2026 - Alex

use super::args::{Args, Command, GenerateArgs, InputArgs};
use crate::codegen::{Generator, ProgramTemplate};
use crate::config::Config;
use crate::structure::{
    DeclarationRenderer, EvidenceBuilder, EvidenceDocument, LayoutArena, LayoutId, Registrar, TypeDatabase,
};
use anyhow::Context;
use colored::Colorize;
use std::fs;
use std::path::Path;

const DEFAULT_CALL: &str = "target({{args}})";

/// Layouts built from one evidence document.
struct Session {
    config: Config,
    arena: LayoutArena,
    records: Vec<LayoutId>,
    arguments: Vec<LayoutId>,
    call: Option<String>,
}

pub struct CommandHandler {
    config_path: Option<std::path::PathBuf>,
    pointer_width: Option<usize>,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            config_path: None,
            pointer_width: None,
        }
    }

    pub fn execute(&mut self, args: Args) -> anyhow::Result<()> {
        self.setup_logging(&args)?;
        if args.no_color {
            colored::control::set_override(false);
        }
        self.config_path = args.config;
        self.pointer_width = args.pointer_width;

        match args.command {
            Command::Render(input) => self.handle_render(input),
            Command::Generate(gen_args) => self.handle_generate(gen_args),
            Command::Types(input) => self.handle_types(input),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .try_init()?;

        Ok(())
    }

    fn load(&self, input: &Path) -> anyhow::Result<Session> {
        let document = EvidenceDocument::load(input)
            .with_context(|| format!("Failed to load evidence from {:?}", input))?;

        let mut config = match &self.config_path {
            Some(path) => Config::load(path).with_context(|| format!("Failed to load config {:?}", path))?,
            None => document.config.clone().unwrap_or_default(),
        };
        if let Some(width) = self.pointer_width {
            config.pointer_width_bytes = width;
        }
        config.validate().map_err(|e| anyhow::anyhow!(e))?;

        let mut arena = LayoutArena::with_prefix(&config.struct_prefix);
        let (records, arguments) = {
            let mut builder = EvidenceBuilder::new(&mut arena, &config);
            let records = document
                .records
                .iter()
                .map(|record| builder.build(record))
                .collect::<Result<Vec<_>, _>>()?;
            let arguments = builder.build_arguments(&document.arguments)?;
            (records, arguments)
        };
        log::info!("built {} layouts from {:?}", arena.len(), input);

        Ok(Session {
            config,
            arena,
            records,
            arguments,
            call: document.call,
        })
    }

    fn handle_render(&self, args: InputArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;
        let mut session = self.load(&args.input)?;
        let renderer = DeclarationRenderer::new(&session.config);

        for &id in session.records.iter().chain(session.arguments.iter()) {
            let text = renderer.render(&mut session.arena, id);
            let name = session.arena.get(id).name().to_string();
            if text.is_empty() {
                println!("{}", format!("// {}: nothing to declare", name).dimmed());
            } else {
                println!("{}\n", text);
            }
        }
        Ok(())
    }

    fn handle_generate(&self, args: GenerateArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;
        let mut session = self.load(&args.input)?;
        if session.arguments.is_empty() {
            return Err(anyhow::anyhow!("Evidence file has no arguments: {:?}", args.input));
        }

        let call = args
            .call
            .or(session.call.take())
            .unwrap_or_else(|| DEFAULT_CALL.to_string());

        let text = if args.program {
            ProgramTemplate::new(&call).build(&mut session.arena, &session.arguments, &session.config)
        } else {
            let renderer = DeclarationRenderer::new(&session.config);
            for &id in &session.arguments {
                renderer.render(&mut session.arena, id);
            }
            let reader = Generator::new(&session.config).generate_argument_reader(&session.arena, &session.arguments);
            format!(
                "// read\n{}\n// call\n{};\n\n// release\n{}",
                reader.read,
                reader.splice(&call),
                reader.release
            )
        };

        match args.output {
            Some(path) => {
                fs::write(&path, &text).with_context(|| format!("Failed to write {:?}", path))?;
                println!("{}", format!("Output written to: {:?}", path).green());
            }
            None => print!("{}", text),
        }
        Ok(())
    }

    fn handle_types(&self, args: InputArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;
        let mut session = self.load(&args.input)?;
        let mut database = TypeDatabase::new();
        let mut registrar = Registrar::new();

        let renderer = DeclarationRenderer::new(&session.config);
        for &id in session.records.iter().chain(session.arguments.iter()) {
            if session.arena.get(id).size() == 0 {
                continue;
            }
            renderer.render(&mut session.arena, id);
            registrar.register(&session.arena, id, &mut database, &session.config);
        }

        println!("{}", database.to_json()?);
        eprintln!("{}", format!("[+] {} types registered", database.len()).green());
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}
