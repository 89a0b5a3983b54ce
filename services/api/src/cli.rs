use crate::infra::{parse_date, parse_timestamp};
use crate::server;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use internship_compliance::config::AppConfig;
use internship_compliance::error::AppError;
use internship_compliance::obligations::{generate_schedule, DateInterval};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(
    name = "Internship Compliance Scheduler",
    about = "Project and reconcile internship report and visit obligations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the obligation schedule for an internship interval as JSON
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ScheduleArgs {
    /// Internship start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start: NaiveDate,
    /// Internship end date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    end: NaiveDate,
    /// Reference time for due counts (YYYY-MM-DDTHH:MM:SS, defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    now: Option<NaiveDateTime>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule(args) => run_schedule(args),
    }
}

fn run_schedule(args: ScheduleArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let now = args.now.unwrap_or_else(|| Local::now().naive_local());

    let interval = DateInterval::new(args.start, args.end)?;
    let schedule = generate_schedule(&interval, &config.obligations)?;

    if let Some(warning) = schedule.warning() {
        eprintln!("warning: {warning}");
    }

    let payload = json!({
        "start_date": args.start,
        "end_date": args.end,
        "projection": schedule.projection(now),
        "periods": schedule.periods(),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
