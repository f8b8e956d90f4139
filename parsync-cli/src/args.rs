use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutorKind {
    /// Send operations to the platform's REST API
    Http,
    /// Dry run against a simulated platform
    Simulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventsMode {
    None,
    /// JSON lines on stdout
    Stdout,
    /// Through the log subscriber on stderr
    Log,
}

#[derive(Debug, Args, Clone)]
pub struct PlatformArgs {
    #[arg(long, value_enum, default_value_t = ExecutorKind::Http)]
    pub executor: ExecutorKind,
    /// Base URL of the platform API (required for --executor http)
    #[arg(long)]
    pub platform_url: Option<String>,
    #[arg(long, default_value = "products")]
    pub collection: String,
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
    /// Simulated retryable failure rate (0.0-1.0)
    #[arg(long, default_value_t = 0.0)]
    pub fail_rate: f64,
    /// Simulated permanent failure rate (0.0-1.0)
    #[arg(long, default_value_t = 0.0)]
    pub fatal_rate: f64,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,
}

#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    #[arg(long)]
    pub retry_base_delay: Option<u64>,
    #[arg(long)]
    pub retry_max_delay: Option<u64>,
    #[arg(long, default_value_t = 32)]
    pub queue_capacity: usize,
    #[arg(long, default_value_t = 4.0)]
    pub cost_high_water: f64,
}
