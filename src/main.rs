// Wed Jan 21 2026 - Alex

use clap::Parser;
use colored::Colorize;
use struct_reader_gen::ui::{Args, CommandHandler};

fn main() {
    let args = Args::parse();

    if let Err(e) = CommandHandler::new().execute(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}
