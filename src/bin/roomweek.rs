use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use roomweek::cli;
use roomweek::client::{BookingClient, FetchOptions};
use roomweek::config::{Config, FriendSet, IgnoreSet, load_rooms};
use roomweek::paths::{AppPaths, ROOT_ENV};
use roomweek::pipeline;
use roomweek::pipeline::PipelineStatus;
use roomweek::session;
use roomweek::timewindow::DISPLAY_TZ;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;

#[derive(Default)]
struct Args {
    json: bool,
    verbose: bool,
    token: Option<String>,
    room: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Option<Args>> {
    let mut args = Args::default();
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" | "help" => return Ok(None),
            "--json" => args.json = true,
            "-v" | "--verbose" => args.verbose = true,
            "--token" => args.token = Some(take_value(argv, &mut i, "--token")?),
            "--room" => args.room = Some(take_value(argv, &mut i, "--room")?),
            "--start" => args.start = Some(take_value(argv, &mut i, "--start")?),
            "--end" => args.end = Some(take_value(argv, &mut i, "--end")?),
            "-r" | "--root" => {
                let root = take_value(argv, &mut i, "--root")?;
                // Must happen before any path lookup; main is still single-threaded here.
                unsafe {
                    env::set_var(ROOT_ENV, root);
                }
            }
            other => bail!("Unknown argument '{}'; see --help", other),
        }
        i += 1;
    }
    Ok(Some(args))
}

fn take_value(argv: &[String], i: &mut usize, flag: &str) -> Result<String> {
    *i += 1;
    argv.get(*i)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
}

fn resolve_token(args: &Args) -> Result<String> {
    if let Some(token) = &args.token {
        return Ok(token.clone());
    }
    if let Ok(token) = env::var("ROOMWEEK_TOKEN") {
        return Ok(token);
    }
    let path = AppPaths::storage_state_file()?;
    session::bearer_from_storage(&path)
        .context("No token: pass --token, set ROOMWEEK_TOKEN, or capture a session first")
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<String> = env::args().collect();
    let binary_name = argv
        .first()
        .map(|s| s.as_str())
        .unwrap_or("roomweek")
        .to_string();

    let Some(args) = parse_args(&argv)? else {
        cli::print_help(&binary_name);
        return Ok(());
    };

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let config = Config::load_or_default(&AppPaths::config_file()?)?;
    let token = resolve_token(&args)?;
    if !session::token_is_fresh(&token) {
        log::warn!("Session token looks expired; the API will likely reject it");
    }

    let client = BookingClient::new(&config.api_base, &token, config.request_timeout())
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let opts = FetchOptions::from_config(&config);

    let (friends, skipped_ids) = FriendSet::load(&AppPaths::friends_file()?)?;
    if skipped_ids > 0 {
        log::warn!("Skipped {} invalid friend identifier(s)", skipped_ids);
    }
    if friends.is_empty() {
        bail!("friends.json has no usable identifiers");
    }

    if args.room.is_some() {
        return run_adhoc(&client, &args, &friends, &opts).await;
    }
    run_week(&client, &args, &friends, &opts).await
}

async fn run_week(
    client: &BookingClient,
    args: &Args,
    friends: &FriendSet,
    opts: &FetchOptions,
) -> Result<()> {
    let (rooms, skipped_rooms) = load_rooms(&AppPaths::rooms_file()?)?;
    if skipped_rooms > 0 {
        log::warn!("Skipped {} invalid room entr(y/ies)", skipped_rooms);
    }
    let (ignore, skipped_codes) = IgnoreSet::load(&AppPaths::ignore_rooms_file()?)?;
    if skipped_codes > 0 {
        log::warn!("Skipped {} invalid ignore-room code(s)", skipped_codes);
    }

    let report = pipeline::run_week(client, &rooms, friends, &ignore, Utc::now(), opts).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.status == PipelineStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &pipeline::WeekReport) {
    const DAYS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

    println!("{}", report.title);
    if report.events.is_empty() {
        println!("  (no friend bookings this week)");
    }
    let mut current_day = u8::MAX;
    for event in &report.events {
        if event.weekday != current_day {
            current_day = event.weekday;
            println!("{} {}:", DAYS[usize::from(current_day) % 5], event.date);
        }
        println!(
            "  {}  {} ({}){}{}",
            event.label,
            event.room_name,
            event.room_code.as_deref().unwrap_or("?"),
            if event.lane > 0 {
                format!("  [lane {}]", event.lane)
            } else {
                String::new()
            },
            if event.ignored { "  ⚠️" } else { "" },
        );
    }

    for warning in &report.warnings {
        println!("⚠️ {}", warning.message());
    }
    for failed in &report.failed_rooms {
        println!(
            "✗ room {} failed ({:?}): {}",
            failed.room_id, failed.kind, failed.message
        );
    }
    println!(
        "Matched {} of {} booking(s); {} malformed dropped; status {:?}.",
        report.matched, report.total_fetched, report.malformed_dropped, report.status
    );
}

async fn run_adhoc(
    client: &BookingClient,
    args: &Args,
    friends: &FriendSet,
    opts: &FetchOptions,
) -> Result<()> {
    let room = args.room.as_deref().unwrap_or_default();
    let (Some(start_raw), Some(end_raw)) = (&args.start, &args.end) else {
        bail!("--room requires both --start and --end (UTC ISO-8601)");
    };
    let start: DateTime<Utc> = start_raw
        .parse()
        .with_context(|| format!("Invalid --start '{}'", start_raw))?;
    let end: DateTime<Utc> = end_raw
        .parse()
        .with_context(|| format!("Invalid --end '{}'", end_raw))?;

    let (matches, total) = pipeline::run_adhoc(client, room, start, end, friends, opts)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    for m in &matches {
        let start_local = m.booking.start.with_timezone(&DISPLAY_TZ);
        let end_local = m.booking.end.with_timezone(&DISPLAY_TZ);
        println!(
            "{} → {} | {} | {} | {}:{} ",
            start_local.format("%a %d %b %Y %H:%M"),
            end_local.format("%a %d %b %Y %H:%M"),
            m.booking.title,
            m.booking.room_name,
            m.matched_field,
            m.matched_id,
        );
    }
    println!("\nMatched {} of {} bookings in that window.", matches.len(), total);
    Ok(())
}
