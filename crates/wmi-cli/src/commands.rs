//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use licorn_wmi_client::SortDirection;
use std::path::PathBuf;

/// wmi-watch: follow and drive a Licorn WMI server from the terminal
#[derive(Parser, Debug)]
#[command(name = "wmi-watch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Client configuration file (YAML)
    #[arg(long, global = true, env = "WMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base URL, overrides the configuration file
    #[arg(long, global = true, env = "WMI_BASE_URL")]
    pub base_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the push channel of a page and print list changes
    Watch(WatchArgs),

    /// Show the effective client configuration
    Config(ConfigArgs),

    /// Send one mutation request and print the decoded reply
    Mutate(MutateArgs),
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Collection of the watched page (users, groups, machines...)
    #[arg(default_value = "users")]
    pub collection: String,

    /// Page location used for the push setup (defaults to /<collection>/)
    #[arg(long)]
    pub location: Option<String>,

    /// Columns searched by --search
    #[arg(long, value_delimiter = ',', default_value = "login,gecos")]
    pub search_columns: Vec<String>,

    /// Filter the printed rows
    #[arg(long)]
    pub search: Option<String>,

    /// Column the rows are sorted on (defaults to the first search column)
    #[arg(long)]
    pub sort_column: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "asc", value_parser = parse_direction)]
    pub sort_direction: SortDirection,

    /// Stop after this many call batches
    #[arg(long)]
    pub max_batches: Option<usize>,
}

fn parse_direction(s: &str) -> Result<SortDirection, String> {
    SortDirection::parse(s).ok_or_else(|| format!("expected asc or desc, got '{s}'"))
}

impl WatchArgs {
    /// Page location for the push setup
    #[must_use]
    pub fn location(&self) -> String {
        self.location
            .clone()
            .unwrap_or_else(|| format!("/{}/", self.collection))
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Configuration output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML, loadable with --config
    #[default]
    Yaml,
    /// JSON
    Json,
}

/// Arguments for the mutate command
#[derive(Parser, Debug)]
pub struct MutateArgs {
    /// Request path, e.g. /users/mod/1001/gecos/Bob
    pub path: String,
}

/// Color output argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
