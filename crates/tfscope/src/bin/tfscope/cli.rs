//! tfscope cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfscope ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[clap(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the flat token stream of a document
    Tokens(FileArgs),

    /// Print the nested token tree of a document
    Tree(FileArgs),

    /// Print the syntactic context at a position
    Context(ContextCommand),

    /// Print state outputs for a document
    ///
    /// The state file is looked up beside the document
    Outputs(OutputsCommand),

    /// Print all references (`a.b.c`) in a document
    #[command(alias = "refs")]
    References(FileArgs),
}

#[derive(Parser, Debug)]
pub struct FileArgs {
    /// Document to read
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ContextCommand {
    /// Document to read
    pub file: PathBuf,

    /// Zero-based line
    pub line: usize,

    /// Zero-based character within the line
    pub character: usize,
}

#[derive(Parser, Debug)]
pub struct OutputsCommand {
    /// Document the state belongs to
    pub file: PathBuf,

    /// Print a single output
    pub name: Option<String>,

    /// State file location relative to the document's directory
    ///
    /// Can be specified multiple times, candidates are tried in order.
    /// Defaults to terraform.tfstate and .terraform/terraform.tfstate
    #[clap(long = "state-candidate")]
    pub state_candidates: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t, global(true))]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
