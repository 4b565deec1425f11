//! `nailvesta` command-line tool: picking-list reconciliation and weekly
//! restock planning.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use nailvesta_ops::export::{self, RESTOCK_FILE, SIZE_RESTOCK_FILE};
use nailvesta_ops::restock::{self, Inventory};
use nailvesta_ops::sales::WeeklySales;
use nailvesta_ops::{
    AccountingMode, AppConfig, PickingListAnalyzer, ProductCatalog, Result,
};
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{filter::LevelFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "nailvesta", version, about = "Picking-list reconciliation and restock planning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// TOML configuration file (defaults to the built-in product table).
    #[arg(global = true, long)]
    config: Option<PathBuf>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Recover SKU quantities from a picking list PDF and export the summary.
    Picking(PickingArgs),
    /// Show the normalized text and recognized lines of a picking list.
    Inspect {
        /// Picking list PDF.
        pdf: PathBuf,
    },
    /// Build the weekly restock plan from two sales exports.
    Restock(RestockArgs),
}

#[derive(Debug, Args)]
struct PickingArgs {
    /// Picking list PDF.
    pdf: PathBuf,
    /// Directory for the CSV exports.
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Name a prefix for this run, e.g. `--name "NPJ011=Rose Quartz"`.
    #[arg(long = "name", value_name = "PREFIX=NAME")]
    names: Vec<String>,
    /// Ask for names of prefixes missing from the catalog.
    #[arg(long)]
    interactive: bool,
    /// Which sum is reconciled against the printed item quantity.
    #[arg(long, value_enum)]
    accounting: Option<Accounting>,
    /// Print the summary without writing CSV files.
    #[arg(long)]
    no_export: bool,
}

#[derive(Debug, Args)]
struct RestockArgs {
    /// This week's sales export (CSV).
    #[arg(long)]
    this_week: PathBuf,
    /// Last week's sales export (CSV).
    #[arg(long)]
    last_week: PathBuf,
    /// Inventory sheet with Name, In_stock and On_the_way columns.
    #[arg(long)]
    inventory: Option<PathBuf>,
    #[arg(long)]
    production_days: Option<u32>,
    #[arg(long)]
    shipping_days: Option<u32>,
    #[arg(long)]
    safety_days: Option<u32>,
    /// Directory for the CSV exports.
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Accounting {
    RawLines,
    Expanded,
}

impl From<Accounting> for AccountingMode {
    fn from(value: Accounting) -> Self {
        match value {
            Accounting::RawLines => AccountingMode::RawLines,
            Accounting::Expanded => AccountingMode::Expanded,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(log_level(cli.verbose));

    if let Err(e) = run(cli) {
        eprintln!("\n❌ Error: {}", e);
        process::exit(1);
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::builtin()?,
    };
    tracing::debug!(products = config.products.len(), "configuration loaded");

    match cli.command {
        Commands::Picking(args) => run_picking(args, config),
        Commands::Inspect { pdf } => run_inspect(pdf, config),
        Commands::Restock(args) => run_restock(args, config),
    }
}

// ── picking ───────────────────────────────────────────────────────────────────

fn run_picking(args: PickingArgs, config: AppConfig) -> Result<()> {
    let mut parser = config.parser.clone();
    if let Some(mode) = args.accounting {
        parser.accounting = mode.into();
    }

    println!("🔍 Analyzing picking list: {}", args.pdf.display());
    println!("{}", "─".repeat(60));

    let analyzer = PickingListAnalyzer::with_config(&args.pdf, parser)?;
    let report = analyzer.analyze()?;

    if !report.skipped_pages.is_empty() {
        println!("⚠️  No rows recognized on page(s): {:?}", report.skipped_pages);
    }
    println!(
        "📄 {} page(s), {} line(s), {} unit(s) after bundle expansion",
        analyzer.pages().len(),
        report.lines.len(),
        report.total_units()
    );
    println!("{}", report.reconciliation);

    let mut catalog = ProductCatalog::from_config(&config);
    for name in &args.names {
        catalog.apply_override(name)?;
    }

    let unknown = catalog.unknown_prefixes(&report.quantities);
    if !unknown.is_empty() {
        if args.interactive {
            prompt_names(&mut catalog, unknown.iter().map(String::as_str))?;
        } else {
            println!(
                "ℹ️  Unnamed prefixes (use --name PREFIX=NAME or --interactive): {}",
                unknown.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }

    let summary = catalog.summary_rows(&report.quantities);
    println!("\n📦 Summary:");
    println!("{}", "─".repeat(60));
    for row in &summary {
        println!(
            "   {:<10} {:<28} x{}",
            row.seller_sku,
            row.product_name.as_deref().unwrap_or("?"),
            row.quantity
        );
    }

    if args.no_export {
        return Ok(());
    }

    let mapping = catalog.mapping_rows(&report.quantities);
    let written = export::save_picking_exports(&args.out, &summary, &mapping)?;
    println!();
    for path in written {
        println!("💾 Saved to: {}", path.display());
    }
    println!("\n✅ Picking list processed successfully!");
    Ok(())
}

fn prompt_names<'a>(
    catalog: &mut ProductCatalog,
    prefixes: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    for prefix in prefixes {
        print!("📝 Product name for {prefix} (blank to skip): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if !line.trim().is_empty() {
            catalog.set_name(prefix, &line);
        }
    }
    Ok(())
}

// ── inspect ───────────────────────────────────────────────────────────────────

fn run_inspect(pdf: PathBuf, config: AppConfig) -> Result<()> {
    let analyzer = PickingListAnalyzer::with_config(&pdf, config.parser)?;

    for page in analyzer.pages() {
        println!(
            "📄 Page {} ({} words, line height {:.1})",
            page.number,
            page.words.len(),
            page.line_height()
        );
        println!("{}", "─".repeat(60));
        println!("{}\n", page.text);
    }

    match analyzer.analyze() {
        Ok(report) => {
            println!("🔎 Recognized lines:");
            for line in &report.lines {
                println!(
                    "   p{:<3} {:<26} x{:<4} [{}]",
                    line.page, line.code, line.quantity, line.strategy
                );
            }
            println!("\n{}", report.reconciliation);
        }
        Err(e) => println!("⚠️  {}", e),
    }
    Ok(())
}

// ── restock ───────────────────────────────────────────────────────────────────

fn run_restock(args: RestockArgs, config: AppConfig) -> Result<()> {
    let mut settings = config.restock.clone();
    if let Some(days) = args.production_days {
        settings.production_days = days;
    }
    if let Some(days) = args.shipping_days {
        settings.shipping_days = days;
    }
    if let Some(days) = args.safety_days {
        settings.safety_days = days;
    }

    let this_week = WeeklySales::from_path(&args.this_week)?;
    let last_week = WeeklySales::from_path(&args.last_week)?;
    let inventory = args.inventory.as_ref().map(Inventory::from_path).transpose()?;

    println!(
        "📊 {} line(s) this week, {} last week, lead time {} day(s)",
        this_week.records.len(),
        last_week.records.len(),
        settings.lead_days()
    );

    println!("\n🏷️  Top variations:");
    for (name, count) in this_week.variation_frequency().iter().take(10) {
        println!("   {:<32} {}", name, count);
    }
    println!("\n📏 Size share:");
    for (size, pct) in this_week.size_share() {
        println!("   {:<6} {:.1}%", size, pct);
    }
    println!("\n💅 Shape share:");
    for (shape, pct) in this_week.shape_share() {
        println!("   {:<10} {:.1}%", shape, pct);
    }

    let plan = restock::plan(&this_week, &last_week, inventory.as_ref(), &settings);

    println!("\n📦 Restock plan:");
    println!("{}", "─".repeat(60));
    for row in &plan.rows {
        println!(
            "   {:<32} sold {:>3}  free {:>3}  {:<10} restock {:>4}",
            row.variation_name,
            row.sold,
            row.zero_price,
            row.growth_label(),
            row.final_restock
        );
    }

    fs::create_dir_all(&args.out)?;
    let restock_path = args.out.join(RESTOCK_FILE);
    export::write_restock(BufWriter::new(File::create(&restock_path)?), &plan.rows)?;
    println!("\n💾 Saved to: {}", restock_path.display());

    if let Some(allocations) = &plan.allocations {
        let size_path = args.out.join(SIZE_RESTOCK_FILE);
        export::write_size_restock(BufWriter::new(File::create(&size_path)?), allocations)?;
        println!("💾 Saved to: {}", size_path.display());
    }

    println!("\n✅ Restock plan completed successfully!");
    Ok(())
}
