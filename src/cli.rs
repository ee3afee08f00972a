use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tillbook")]
#[command(
    about = "Statements, reports and invoices from the retail inventory API",
    long_about = None
)]
pub struct Cli {
    /// Override tillbook home directory (a config subdir will be created inside it).
    #[arg(long, env = "TILLBOOK_HOME")]
    pub home: Option<PathBuf>,

    /// API base URL for this run (defaults to the configured one).
    #[arg(long, env = "TILLBOOK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token for this run (defaults to the configured one).
    #[arg(long, env = "TILLBOOK_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// More log output on stderr (-v info, -vv debug). TILLBOOK_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Running-due statement of a debtor, EMI debtor or vendor.
    Statement(StatementArgs),
    /// Stock movements of one product with the remaining quantity.
    ProductReport(ProductReportArgs),
    PurchaseReport(BranchReportArgs),
    SalesReport(BranchReportArgs),
    /// Receipt of one sales transaction.
    Invoice(InvoiceArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PartyKind {
    Debtor,
    Emi,
    Vendor,
}

#[derive(Debug, Args, Clone)]
pub struct FilterFlags {
    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Free-text search passed to the server.
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct OutputFlags {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Render a saved API response (JSON) instead of fetching.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatementArgs {
    #[arg(value_enum)]
    pub party: PartyKind,

    pub id: u64,

    /// Always compute balances locally, even when the server sent them.
    #[arg(long)]
    pub projected: bool,

    /// List the most recent transaction first.
    #[arg(long)]
    pub newest_first: bool,

    #[command(flatten)]
    pub filters: FilterFlags,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct ProductReportArgs {
    pub product_id: u64,

    #[arg(long)]
    pub newest_first: bool,

    #[command(flatten)]
    pub filters: FilterFlags,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct BranchReportArgs {
    /// Branch to report on (defaults to the configured branch).
    #[arg(long)]
    pub branch: Option<u32>,

    #[command(flatten)]
    pub filters: FilterFlags,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct InvoiceArgs {
    /// Sales transaction id (not needed with --input).
    pub sale_id: Option<u64>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    Show,
    SetUrl { url: String },
    SetBranch { branch: u32 },
    ClearBranch,
    SetToken { token: String },
    ClearToken,
    SetCurrency { currency: String },
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}
