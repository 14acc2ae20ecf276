use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// valcheck - Values checking for proposed land-management works
#[derive(Parser, Debug)]
#[command(name = "valcheck")]
#[command(about = "Screen proposed works against spatial values layers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned actions without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Job configuration file (defaults to ./valcheck.toml when present)
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a values check for a works layer
    Run(RunArgs),

    /// Resolve the dataset matrix and rule tables and report configuration errors
    Validate(ValidateArgs),

    /// List datasets with their buffer classes and applicability for a mode
    Matrix(MatrixArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Works layer (GeoJSON)
    #[arg(long)]
    pub works: Option<PathBuf>,

    /// Operating mode (DAP, JFMP, NBFT or LRLI)
    #[arg(long)]
    pub mode: Option<String>,

    /// Theme to evaluate; repeat or separate with commas
    #[arg(long = "theme", value_delimiter = ',')]
    pub themes: Vec<String>,

    /// Directory receiving the reports
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Only evaluate works in this district
    #[arg(long)]
    pub district: Option<String>,

    /// Dataset matrix file (defaults to the built-in matrix)
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Dataset matrix file (defaults to the configured or built-in matrix)
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct MatrixArgs {
    /// Mode to resolve buffer classes for (defaults to the configured mode)
    #[arg(long)]
    pub mode: Option<String>,

    /// Only list datasets of this theme
    #[arg(long)]
    pub theme: Option<String>,

    /// Dataset matrix file (defaults to the configured or built-in matrix)
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}
