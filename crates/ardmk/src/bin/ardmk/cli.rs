//! ardmk cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the full build plan
    ///
    /// Prints the plan to stdout unless --output is given
    #[command(alias = "gen")]
    Generate(GenerateCommand),

    /// Resolve a single key for the selected board
    Get(GetCommand),

    /// List keys matching a regular expression
    ///
    /// Platform suffixes (.linux, .windows, .macos) are collapsed first
    Keys(KeysCommand),

    /// Print debug information for development
    Dev,
}

#[derive(Parser, Debug)]
pub struct TargetArgs {
    /// Select a board
    #[clap(short = 'b', long = "board", global(true))]
    pub board: Option<String>,

    /// Select a platform vendor
    #[clap(short = 'v', long = "vendor", global(true))]
    pub vendor: Option<String>,

    /// Select a platform architecture
    #[clap(short = 'a', long = "arch", alias = "architecture", global(true))]
    pub arch: Option<String>,

    /// Package root to search instead of ~/.arduino15/packages
    #[clap(long = "sketchbook", global(true))]
    pub packages: Option<PathBuf>,

    /// Root of the system wide IDE installation
    #[clap(long = "system-root", global(true), default_value = "/usr/share/arduino")]
    pub system_root: PathBuf,

    /// Set a property, overriding every loaded table
    ///
    /// Can be specified multiple times: -D build.f_cpu=8000000L
    #[clap(short = 'D', long = "define", global(true), value_parser = parse_define)]
    pub defines: Vec<(String, String)>,
}

#[derive(Parser, Debug)]
pub struct GenerateCommand {
    /// Root directory of the sketch (default: work directory)
    #[clap(short = 'r', long = "root-dir")]
    pub root_dir: Option<PathBuf>,

    /// Project name (default: name of the root directory)
    #[clap(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Source directory, relative to root or absolute
    #[clap(short = 's', long = "source-dir", default_value = "src")]
    pub source_dir: PathBuf,

    /// Build directory, relative to root or absolute
    #[clap(short = 'B', long = "build-dir", default_value = "build")]
    pub build_dir: PathBuf,

    /// Library to include
    #[clap(short = 'l', long = "lib", alias = "library")]
    pub libraries: Vec<String>,

    /// Where to search for libraries
    #[clap(short = 'L', long = "library-directory")]
    pub library_directories: Vec<PathBuf>,

    /// Talk a lot (verbose upload and compile steps)
    #[clap(short = 'V', long = "verbose")]
    pub verbose: bool,

    /// More arguments for every compile step
    #[clap(short = 'C', long = "compile-flags", default_value = "")]
    pub compile_flags: String,

    #[clap(short = 'P', long = "serial-port", default_value = "/dev/ttyACM0")]
    pub serial_port: String,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct GetCommand {
    /// Key to resolve
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct KeysCommand {
    /// Regular expression
    pub pattern: String,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,

    /// Write the plan to this file (default: stdout)
    #[clap(short = 'o', long = "output")]
    pub file: Option<PathBuf>,
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

fn parse_define(define: &str) -> Result<(String, String), String> {
    define
        .split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{define}`"))
}
