mod args;

use cube_core::stats::ChartSeries;
use services::{AppServices, CatalogView, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, ArgsError, Command, DB_URL_ENV, print_usage};

const BAR: char = '#';

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_catalog(view: &CatalogView) {
    for item in &view.items {
        let status = match item.status {
            Some(status) if status.is_completed() => "done",
            Some(_) => "to study",
            None => "-",
        };
        println!(
            "{:>2}  {:<20} {:<15} {status}",
            item.entry.slot(),
            item.entry.title(),
            item.entry.content_id()
        );
    }
    match &view.chart {
        Some(chart) => {
            println!();
            render_chart(chart);
        }
        None => println!("\nStatistics are not available in guest mode."),
    }
}

fn render_chart(chart: &ChartSeries) {
    println!("Stages studied this week:");
    for (label, count) in chart.labels.iter().zip(&chart.counts) {
        let bar: String = std::iter::repeat_n(BAR, *count).collect();
        println!("{label:>6}  {bar} {count}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), std::env::var(DB_URL_ENV).ok()).map_err(
        |e: ArgsError| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;

    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;
    let accounts = services.accounts();
    let progress = services.progress();

    match parsed.command {
        Command::Register { username, password } => {
            let record = accounts.register(&username, &password).await?;
            println!("Registered {} (id {}).", record.username, record.id);
        }
        Command::Login { username, password } => {
            let record = accounts.login(&username, &password).await?;
            let view = progress.catalog(Some(record.id)).await?;
            println!("Signed in as {}.\n", record.username);
            render_catalog(&view);
        }
        Command::Visit { username, slot } => {
            let record = accounts.lookup(&username).await?;
            progress.record_visit(record.id, slot).await?;
            info!(user = %record.id, %slot, "recorded stage visit");
        }
        Command::Complete { username, slot } => {
            let record = accounts.lookup(&username).await?;
            let updated = progress.mark_completed(record.id, slot).await?;
            println!(
                "Slot {slot} completed ({} of {} slots done): {updated}",
                updated.completed_count(),
                updated.len()
            );
        }
        Command::Catalog { username } => {
            let user = match username {
                Some(name) => Some(accounts.lookup(&name).await?.id),
                None => None,
            };
            render_catalog(&progress.catalog(user).await?);
        }
        Command::Chart { username } => {
            let record = accounts.lookup(&username).await?;
            render_chart(&progress.weekly_chart(record.id).await?);
        }
        Command::Help => print_usage(),
    }

    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
