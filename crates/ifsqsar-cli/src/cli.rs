use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "IFSQSAR-RS contributors",
    version,
    about = "IFSQSAR CLI - Apply QSAR/QSPR models for physicochemical and environmental-fate properties to chemicals and chemical mixtures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply models to SMILES given on the command line or read from a delimited file.
    Predict(PredictArgs),
    /// List the registered models, optionally restricted to a group.
    Models(ModelsArgs),
}

/// Arguments for the `predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    // --- Input ---
    /// Comma-separated records, e.g. "CCO,{solute}CCO{solvent}O".
    /// Commas inside mixture markers do not split records.
    #[arg(short, long, value_name = "LIST", conflicts_with = "input")]
    pub smiles: Option<String>,

    /// Path to a delimited input file with one record per line.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Number of header lines at the start of the input file.
    #[arg(long, value_name = "INT", requires = "input")]
    pub header_rows: Option<usize>,

    /// 1-indexed header row searched for the SMILES column label.
    #[arg(long, value_name = "INT", requires = "input")]
    pub target_header_row: Option<usize>,

    /// Label of the column holding SMILES (case-insensitive).
    #[arg(long, value_name = "LABEL", requires = "input")]
    pub smiles_label: Option<String>,

    /// Column separator of the input file (e.g. ',', '\t', 'tab').
    #[arg(long, value_name = "SEP", requires = "input")]
    pub input_separator: Option<String>,

    /// Row separator of the input file.
    #[arg(long, value_name = "SEP", requires = "input")]
    pub input_line_ending: Option<String>,

    // --- Models ---
    /// Comma-separated model names or groups (default, pure, mixture, all).
    #[arg(short, long, value_name = "LIST")]
    pub models: Option<String>,

    /// Comma-separated value kinds to report (insmi, normsmi, sminote, endpoint,
    /// units, qsarpred, UL, error, ULnote, citation).
    #[arg(long, value_name = "LIST")]
    pub values: Option<String>,

    /// Delimited file of user-supplied values that override model predictions.
    #[arg(long, value_name = "PATH")]
    pub user_values: Option<PathBuf>,

    /// TOML file of reference solute and solvent data merged over the built-in tables.
    #[arg(long, value_name = "PATH")]
    pub reference_data: Option<PathBuf>,

    // --- Output ---
    /// Path for the output file. Results are written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output layout: rows, columns or json.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Column separator of the output.
    #[arg(long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Row separator of the output.
    #[arg(long, value_name = "SEP")]
    pub line_ending: Option<String>,

    /// Omit the header row (or header column).
    #[arg(long)]
    pub no_header: bool,

    /// Do not copy the input file's columns into the output.
    #[arg(long)]
    pub drop_input: bool,

    // --- Configuration ---
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S output.format=json
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `models` subcommand.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Restrict the listing to a group (default, pure, mixture, all).
    #[arg(value_name = "GROUP")]
    pub group: Option<String>,

    /// TOML file of reference solute and solvent data merged over the built-in tables.
    #[arg(long, value_name = "PATH")]
    pub reference_data: Option<PathBuf>,
}
