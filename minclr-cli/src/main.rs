mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })?;

    let cli = Cli::parse();

    // minclr warnings on stderr unless --json; --verbose enables debug, --trace everything; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.trace {
            log::LevelFilter::Trace
        } else if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        };
        env_logger::Builder::new()
            .filter_module("minclr", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Run {
            path,
            corlib,
            r#type,
            method,
            args,
            engine,
        } => commands::run::run(
            path,
            corlib.as_deref(),
            r#type.as_deref(),
            method.as_deref(),
            args,
            engine,
            &cli.global,
        ),
        Command::Types {
            path,
            corlib,
            namespace,
        } => commands::types::run(path, corlib.as_deref(), namespace.as_deref(), &cli.global),
        Command::Disasm {
            path,
            corlib,
            r#type,
            method,
        } => commands::disasm::run(
            path,
            corlib.as_deref(),
            r#type.as_deref(),
            method.as_deref(),
            &cli.global,
        ),
        Command::Demo { out, count, engine } => {
            commands::demo::run(out.as_deref(), *count, engine, &cli.global)
        }
    }
}
