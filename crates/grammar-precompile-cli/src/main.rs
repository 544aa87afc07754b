use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use grammar_precompile_core::{
    init_tracing, FilePrecompiler, GrammarPrecompiler, NodeRuntime, PrecompileConfig,
};

fn cli() -> Command {
    Command::new("grammar-precompile")
        .version(grammar_precompile_core::VERSION)
        .about("Precompile Chevrotain grammars into JavaScript sources")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Source file or directory")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT")
                .help("Output file, or output directory when INPUT is a directory")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration, bare or as { \"options\": { ... } }")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("node")
                .long("node")
                .value_name("PATH")
                .help("Node.js executable (default: first `node` on PATH)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Log per-file diagnostics")
                .action(clap::ArgAction::SetTrue),
        )
}

fn load_config(matches: &ArgMatches) -> Result<PrecompileConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PrecompileConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PrecompileConfig::default(),
    };
    if matches.get_flag("debug") {
        config.debug = true;
    }
    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();

    let matches = cli().get_matches();
    let input = matches
        .get_one::<PathBuf>("input")
        .context("INPUT is required")?;
    let output = matches.get_one::<PathBuf>("output");
    let config = load_config(&matches)?;

    let runtime = match matches.get_one::<PathBuf>("node") {
        Some(node) => NodeRuntime::with_node_path(node, &config),
        None => NodeRuntime::new(&config).context("Install Node.js or pass --node")?,
    };
    let files = FilePrecompiler::new(GrammarPrecompiler::new(config, Box::new(runtime)));

    if input.is_dir() {
        let Some(output) = output else {
            bail!("--output is required when INPUT is a directory");
        };
        let summary = files
            .transform_directory(input, output)
            .with_context(|| format!("Failed to precompile {}", input.display()))?;

        println!(
            "Processed {} files, {} transformed",
            summary.files_processed, summary.files_transformed
        );
        for error in &summary.errors {
            eprintln!("{error}");
        }
        if !summary.success() {
            bail!("{} file(s) failed", summary.errors.len());
        }
        return Ok(());
    }

    match output {
        Some(output) => {
            files
                .transform_file(input, output)
                .with_context(|| format!("Failed to precompile {}", input.display()))?;
        }
        None => {
            let (code, _) = files
                .precompile_file(input)
                .with_context(|| format!("Failed to precompile {}", input.display()))?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(code.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
