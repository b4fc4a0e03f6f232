use clap::{ArgAction, Args, Parser, ValueEnum};
use eeq::Dtype;
use std::path::PathBuf;

const ABOUT: &str =
    "A command-line tool for calculating EEQ partial atomic charges and energies.";
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser)]
#[command(version, about = ABOUT, help_template = HELP_TEMPLATE)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input file containing molecular structure in XYZ format.
    ///
    /// Use '-' to read from standard input. The XYZ format should contain the number of atoms
    /// on the first line, a comment on the second line, followed by lines with element symbol
    /// (or atomic number) and x, y, z coordinates in angstroms.
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub calculation: CalculationOptions,

    #[command(flatten)]
    pub solver: SolverOptions,
}

/// Options for controlling the output format and destination.
#[derive(Args)]
#[command(next_help_heading = "Output Options")]
pub struct OutputOptions {
    /// Output file path.
    ///
    /// If not specified, results are written to standard output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for the results.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Number of decimal places to display for floating-point values.
    #[arg(short, long, default_value_t = 6)]
    pub precision: usize,
}

/// Options for controlling the calculation parameters.
#[derive(Args)]
#[command(next_help_heading = "Calculation Options")]
pub struct CalculationOptions {
    /// Custom parameters file in TOML format.
    ///
    /// If not specified, the built-in EEQ 2019 parameters are used.
    #[arg(short = 'P', long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Total charge of the molecular system.
    #[arg(short = 'q', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub total_charge: f64,

    /// Floating point precision of the calculation (f16, f32 or f64).
    #[arg(long, default_value = "f64", value_name = "DTYPE")]
    pub dtype: Dtype,
}

/// Options for controlling the solver behavior.
#[derive(Args)]
#[command(next_help_heading = "Solver Options")]
pub struct SolverOptions {
    /// Distance cutoff for the coordination number in Bohr.
    #[arg(long, default_value_t = 25.0)]
    pub cn_cutoff: f64,

    /// Soft upper limit of the coordination number.
    #[arg(long, default_value_t = 8.0)]
    pub cn_max: f64,

    /// Exclude ghost atoms from the coordination numbers.
    #[arg(long)]
    pub no_ghost_cn: bool,
}

impl SolverOptions {
    pub fn to_library(&self) -> eeq::SolverOptions {
        eeq::SolverOptions {
            cn_cutoff: self.cn_cutoff,
            cn_max: self.cn_max,
            ghosts_in_cn: !self.no_ghost_cn,
            ..Default::default()
        }
    }
}

/// Output format for the calculation results.
#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table with atom indices, elements, positions, charges and energies.
    Pretty,
    /// XYZ format with charges appended to each atom line.
    Xyz,
    /// Comma-separated values with columns: index, element, x, y, z, charge, energy.
    Csv,
    /// JSON object containing atoms array and metadata.
    Json,
}
