mod cli;

use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tfscope::state::{ResolverConfig, StateResolver};
use tfscope::token::{Location, TokenKind};
use tfscope::tree::{Position, PositionContext, TokenTree};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFSCOPE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Tokens(file) => tokens(&cli.output, file),
        cli::Command::Tree(file) => tree(&cli.output, file),
        cli::Command::Context(context_cli) => context(&cli.output, context_cli),
        cli::Command::Outputs(outputs_cli) => outputs(&cli.output, outputs_cli),
        cli::Command::References(file) => references(&cli.output, file),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn load(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))
}

/// Flat lexer output, no nesting
pub fn tokens(output_args: &cli::OutputArgs, cli: cli::FileArgs) -> anyhow::Result<()> {
    let tree = tfscope::lexer::tokenize(&load(&cli.file)?);
    output(output_args, &tree.view(tree.root()))
}

pub fn tree(output_args: &cli::OutputArgs, cli: cli::FileArgs) -> anyhow::Result<()> {
    let tree = tfscope::tree::parse(&load(&cli.file)?);
    output(output_args, &tree.view(tree.root()))
}

#[derive(Serialize)]
struct ContextReport<'a> {
    context: PositionContext,
    kind: TokenKind,
    text: &'a str,
    location: Location,
}

pub fn context(output_args: &cli::OutputArgs, cli: cli::ContextCommand) -> anyhow::Result<()> {
    let tree = tfscope::tree::parse(&load(&cli.file)?);
    let position = Position::new(cli.line, cli.character);

    let id = tree.token_at(position);
    let token = tree.get(id);
    let report = ContextReport {
        context: tfscope::tree::position_context(&tree, position),
        kind: token.kind,
        text: tree.text(id),
        location: token.location,
    };

    output(output_args, &report)
}

pub fn outputs(output_args: &cli::OutputArgs, cli: cli::OutputsCommand) -> anyhow::Result<()> {
    anyhow::ensure!(cli.file.exists(), "{} does not exist", cli.file.display());

    let mut resolver = if cli.state_candidates.is_empty() {
        StateResolver::local()
    } else {
        let config = ResolverConfig {
            state_candidates: cli.state_candidates,
        };
        StateResolver::new(config, Some(std::sync::Arc::new(tfscope::host::LocalFileSystem)))
    };

    let document = cli.file.canonicalize()?;
    anyhow::ensure!(
        resolver.find_state(&document).is_some(),
        "No state found for {}",
        cli.file.display()
    );

    match cli.name {
        None => output(output_args, &resolver.get_all_outputs(&document)),
        Some(name) => {
            let value = resolver
                .get_output(&document, &name)
                .with_context(|| format!("Output {name} not found"))?;
            output(output_args, &value)
        }
    }
}

#[derive(Serialize)]
struct Reference<'a> {
    text: &'a str,
    location: Location,
}

pub fn references(output_args: &cli::OutputArgs, cli: cli::FileArgs) -> anyhow::Result<()> {
    let tree = tfscope::tree::parse(&load(&cli.file)?);
    output(output_args, &collect_references(&tree))
}

fn collect_references(tree: &TokenTree) -> Vec<Reference<'_>> {
    tree.references()
        .into_iter()
        .map(|id| Reference {
            text: tree.text(id),
            location: tree.get(id).location,
        })
        .collect()
}

fn output(output: &cli::OutputArgs, value: &impl Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
