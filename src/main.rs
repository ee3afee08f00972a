mod cli;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    BranchReportArgs, Cli, Command, ConfigCmd, FilterFlags, InvoiceArgs, OutputFlags,
    OutputFormat, PartyKind, ProductReportArgs, StatementArgs,
};
use tillbook::api::{ApiClient, ApiError, ReportKind, ReportQuery, StatementKind, Target};
use tillbook::config::{AppConfig, app_paths, load_or_init_config, masked_token, write_config};
use tillbook::export::{self, Sheet};
use tillbook::ledger::{BalanceSource, DueLedger, InventoryMovement};
use tillbook::normalize::{self, NormalizeError};
use tillbook::view::{QueryKey, ReportView, ViewState};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = app_paths(cli.home.clone())?;
    let (mut cfg, cfg_path) = load_or_init_config(&paths)?;
    let conn = Connection {
        api_url: cli.api_url.unwrap_or_else(|| cfg.api_base_url.clone()),
        token: cli.token.or_else(|| cfg.token.clone()),
        timeout: cfg.timeout(),
    };

    match cli.command {
        Command::Statement(args) => handle_statement(args, &conn, &cfg),
        Command::ProductReport(args) => handle_product_report(args, &conn),
        Command::PurchaseReport(args) => {
            handle_branch_report(ReportKind::Purchase, args, &conn, &cfg)
        }
        Command::SalesReport(args) => handle_branch_report(ReportKind::Sales, args, &conn, &cfg),
        Command::Invoice(args) => handle_invoice(args, &conn, &cfg),
        Command::Config(args) => handle_config(args.cmd, &mut cfg, &cfg_path),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("TILLBOOK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("tillbook={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Where and how to reach the API for this run.
struct Connection {
    api_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl Connection {
    fn client(&self) -> Result<ApiClient, ApiError> {
        ApiClient::new(&self.api_url, self.token.clone(), self.timeout)
    }
}

fn report_query(filters: FilterFlags) -> Result<ReportQuery> {
    if let (Some(start), Some(end)) = (filters.start_date, filters.end_date) {
        if start > end {
            return Err(anyhow!(
                "Invalid date range: --start-date {start} is after --end-date {end}"
            ));
        }
    }
    Ok(ReportQuery {
        start_date: filters.start_date,
        end_date: filters.end_date,
        search: filters.search,
    })
}

fn spinner(msg: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(msg);
    pb
}

fn read_body(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Loads one report through a [`ReportView`], either from the API or from a
/// saved response. Nothing partial is returned on failure.
fn load_report<T, A, B>(key: QueryKey, input: Option<&Path>, from_api: A, from_body: B) -> Result<T>
where
    A: FnOnce(&QueryKey) -> Result<T, ApiError>,
    B: FnOnce(&Value) -> Result<T, NormalizeError>,
{
    let target = key.target;
    let mut view = ReportView::new();
    match input {
        Some(path) => {
            view.load(key, |_| {
                read_body(path)
                    .and_then(|body| from_body(&body).map_err(anyhow::Error::from))
                    .map_err(|err| format!("{err:#}"))
            });
        }
        None => {
            let pb = spinner(format!("Fetching {target}..."));
            view.load(key, from_api);
            pb.finish_and_clear();
        }
    }

    match view.into_state() {
        ViewState::Ready(data) => Ok(data),
        ViewState::Failed(msg) => Err(anyhow!("Failed to fetch {target}: {msg}")),
        ViewState::Idle | ViewState::Loading => Err(anyhow!("Failed to fetch {target}")),
    }
}

fn render(
    sheet: &Sheet,
    json: impl FnOnce() -> Result<String, export::ExportError>,
    out: &OutputFlags,
) -> Result<()> {
    let text = match out.format {
        OutputFormat::Table => export::table(sheet),
        OutputFormat::Csv => export::csv(sheet)?,
        OutputFormat::Json => json()?,
    };
    emit(out.output.as_deref(), &text)
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

fn handle_statement(args: StatementArgs, conn: &Connection, cfg: &AppConfig) -> Result<()> {
    let (kind, title) = match args.party {
        PartyKind::Debtor => (StatementKind::Debtor, "Debtor Statement"),
        PartyKind::Emi => (StatementKind::EmiDebtor, "EMI Debtor Statement"),
        PartyKind::Vendor => (StatementKind::Vendor, "Vendor Statement"),
    };
    let id = args.id;
    let key = QueryKey::new(Target::Statement(kind, id), report_query(args.filters)?);

    // Charges raise the due, payments lower it, for all three parties.
    let policy = DueLedger;
    let statement = load_report(
        key,
        args.output.input.as_deref(),
        |k| conn.client()?.statement(kind, id, &k.query),
        |body| normalize::statement(body, &policy),
    )?;

    let source = if args.projected {
        BalanceSource::Projected
    } else {
        statement.ledger.preferred_source()
    };

    let mut sheet = export::statement_sheet(title, &statement, &policy, source, &cfg.currency);
    if args.newest_first {
        sheet.rows.reverse();
    }
    render(
        &sheet,
        || {
            let mut data = export::statement_export(&statement, &policy, source);
            if args.newest_first {
                data.rows.reverse();
            }
            export::json(&data)
        },
        &args.output,
    )
}

fn handle_product_report(args: ProductReportArgs, conn: &Connection) -> Result<()> {
    let product_id = args.product_id;
    let key = QueryKey::new(
        Target::ProductReport(product_id),
        report_query(args.filters)?,
    );
    let ledger = load_report(
        key,
        args.output.input.as_deref(),
        |k| conn.client()?.product_report(product_id, &k.query),
        normalize::product_movements,
    )?;

    let mut sheet = export::movement_sheet(
        &format!("Product Report {product_id}"),
        &ledger,
        &InventoryMovement,
    );
    if args.newest_first {
        sheet.rows.reverse();
    }
    render(
        &sheet,
        || {
            let mut data = export::movement_export(&ledger, &InventoryMovement);
            if args.newest_first {
                data.rows.reverse();
            }
            export::json(&data)
        },
        &args.output,
    )
}

fn handle_branch_report(
    kind: ReportKind,
    args: BranchReportArgs,
    conn: &Connection,
    cfg: &AppConfig,
) -> Result<()> {
    let branch = args.branch.or(cfg.branch);
    let input = args.output.input.as_deref();
    if branch.is_none() && input.is_none() {
        return Err(anyhow!(
            "No branch selected. Pass --branch <id> or run: tillbook config set-branch <id>"
        ));
    }
    let branch = branch.unwrap_or_default();

    let key = QueryKey::new(
        Target::BranchReport(kind, branch),
        report_query(args.filters)?,
    );
    let report = load_report(
        key,
        input,
        |k| conn.client()?.branch_report(kind, branch, &k.query),
        normalize::transaction_report,
    )?;

    let sheet = export::report_sheet(kind, &report, &cfg.currency);
    render(&sheet, || export::json(&export::report_export(&report)), &args.output)
}

fn handle_invoice(args: InvoiceArgs, conn: &Connection, cfg: &AppConfig) -> Result<()> {
    let input = args.output.input.as_deref();
    let sale_id = match (args.sale_id, input) {
        (Some(id), _) => id,
        (None, Some(_)) => 0,
        (None, None) => return Err(anyhow!("Pass a sales transaction id or --input <file>")),
    };

    let key = QueryKey::new(Target::Invoice(sale_id), ReportQuery::default());
    let invoice = load_report(
        key,
        input,
        |_| conn.client()?.invoice(sale_id),
        normalize::invoice,
    )?;

    let sheet = export::invoice_sheet(&invoice, &cfg.currency);
    render(&sheet, || export::json(&export::invoice_export(&invoice)), &args.output)
}

fn handle_config(cmd: ConfigCmd, cfg: &mut AppConfig, cfg_path: &Path) -> Result<()> {
    let changed = match cmd {
        ConfigCmd::Show => false,
        ConfigCmd::SetUrl { url } => {
            // Validate before saving.
            ApiClient::new(&url, None, cfg.timeout())?;
            cfg.api_base_url = url;
            true
        }
        ConfigCmd::SetBranch { branch } => {
            cfg.branch = Some(branch);
            true
        }
        ConfigCmd::ClearBranch => {
            cfg.branch = None;
            true
        }
        ConfigCmd::SetToken { token } => {
            cfg.token = Some(token);
            true
        }
        ConfigCmd::ClearToken => {
            cfg.token = None;
            true
        }
        ConfigCmd::SetCurrency { currency } => {
            cfg.currency = currency;
            true
        }
    };

    if changed {
        write_config(cfg_path, cfg)?;
    }

    println!("api_url\t{}", cfg.api_base_url);
    match cfg.branch {
        Some(b) => println!("branch\t{b}"),
        None => println!("branch\t<not set>"),
    }
    match cfg.token.as_deref() {
        Some(t) => println!("token\t{}", masked_token(t)),
        None => println!("token\t<not set>"),
    }
    println!("currency\t{}", cfg.currency);
    println!("config\t{}", cfg_path.display());
    Ok(())
}
