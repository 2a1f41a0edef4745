use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "growlog")]
#[command(about = "Capture farm observations offline and sync them when back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local queue database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for auth/sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue an observation (works offline)
    #[command(alias = "add")]
    Log(LogArgs),
    /// Show pending observations and sync status
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flush pending observations to the remote store
    Sync {
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
    },
    /// Keep running and flush whenever connectivity returns
    Watch {
        /// Seconds between reachability checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },
    /// Agronomy calculators
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Tray, reservoir, or zone the observation is about
    #[arg(long, value_name = "ID")]
    pub target: String,
    /// Solution pH
    #[arg(long)]
    pub ph: Option<f64>,
    /// Electrical conductivity (mS/cm)
    #[arg(long)]
    pub ec: Option<f64>,
    /// Air temperature in Celsius
    #[arg(long = "temp", allow_negative_numbers = true)]
    pub temperature_c: Option<f64>,
    /// Relative humidity in percent
    #[arg(long)]
    pub humidity: Option<f64>,
    /// Extra field as key=value (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
    /// Observation time (RFC 3339); defaults to now
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,
}

#[derive(Subcommand)]
pub enum CalcCommands {
    /// Vapor-pressure deficit in kPa
    Vpd {
        /// Air temperature in Celsius
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,
        /// Relative humidity in percent
        #[arg(long)]
        humidity: f64,
        /// Leaf minus air temperature in Celsius
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        leaf_offset: f64,
    },
    /// Growing degree days for one day
    Gdd {
        /// Daily minimum temperature in Celsius
        #[arg(long, allow_negative_numbers = true)]
        min: f64,
        /// Daily maximum temperature in Celsius
        #[arg(long, allow_negative_numbers = true)]
        max: f64,
        /// Base temperature in Celsius
        #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
        base: f64,
    },
    /// Nutrients locked out at a given pH
    Lockout {
        /// Solution pH
        #[arg(long)]
        ph: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Table observations are upserted into
        #[arg(long, value_name = "TABLE")]
        table: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Logout profile and clear stored session
    Logout,
}
