//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Incremental HAL alignment updates: plan node and branch insertions without realigning everything
#[derive(Parser, Debug)]
#[command(name = "halpatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Project directory holding `.halpatch.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add new genomes as children of an existing genome
    Node {
        #[command(flatten)]
        input: UpdateInput,

        /// Genome that receives the new children
        #[arg(long, value_parser = genome_name)]
        genome: String,

        #[command(flatten)]
        options: PlanOptions,
    },

    /// Split a branch with a new ancestor and attach new genomes to it
    Branch {
        #[command(flatten)]
        input: UpdateInput,

        /// Upper end of the branch to split
        #[arg(long, value_parser = genome_name)]
        parent_genome: String,

        /// Lower end of the branch to split
        #[arg(long, value_parser = genome_name)]
        child_genome: String,

        /// Name of the new ancestor (default: <child>-Patch-<parent>)
        #[arg(long, value_parser = genome_name)]
        ancestor_name: Option<String>,

        /// Length from the parent to the new ancestor
        #[arg(long, default_value_t = 1.0, value_parser = positive_length)]
        top_branch_length: f64,

        /// Length from the new ancestor to the child, instead of the remainder
        #[arg(long, value_parser = positive_length)]
        force_bottom_branch_length: Option<f64>,

        #[command(flatten)]
        options: PlanOptions,
    },

    /// Show the alignment tree with branch lengths
    Tree {
        /// HAL alignment
        #[arg(value_hint = ValueHint::FilePath)]
        in_hal: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Positional inputs of both update modes.
#[derive(Args, Debug)]
pub struct UpdateInput {
    /// HAL alignment to update
    #[arg(value_hint = ValueHint::FilePath)]
    pub in_hal: PathBuf,

    /// New genomes, one `name path [branch length]` per line
    #[arg(value_hint = ValueHint::FilePath)]
    pub new_genomes: PathBuf,
}

/// Flags shared by both update modes; unset flags fall back to settings.
#[derive(Args, Debug, Default)]
pub struct PlanOptions {
    /// Options appended to hal tool commands
    #[arg(long, allow_hyphen_values = true)]
    pub hal_options: Option<String>,

    /// Directory for sequences, seq files and intermediate alignments
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Base directory of job stores
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub job_store: Option<PathBuf>,

    /// Options passed to cactus-prepare
    #[arg(long, allow_hyphen_values = true)]
    pub prepare_options: Option<String>,

    /// Append a diff of the regenerated root ancestor sequence
    #[arg(long)]
    pub with_fasta_check: bool,

    /// Do not copy the alignment to <file>.bak
    #[arg(long)]
    pub skip_backup: bool,

    /// Do not run halValidate on the alignment first
    #[arg(long)]
    pub skip_validate: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}

fn genome_name(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("genome name must not be empty".to_string());
    }
    Ok(raw.to_string())
}

fn positive_length(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        Ok(_) => Err(format!("{raw} is not a positive branch length")),
        Err(e) => Err(e.to_string()),
    }
}
