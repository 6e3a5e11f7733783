use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cycle_core::calendar::{self, MonthRef};
use cycle_core::repository::fetch_history_or_empty;
use cycle_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ctrack")]
#[command(about = "Menstrual cycle tracker and predictor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Whose history to use
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true, value_parser = parse_date_arg)]
    today: Option<NaiveDate>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current phase and predictions (default)
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a month grid with period, fertile and predicted days
    Calendar {
        /// Year to show (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month to show, 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,

        /// Print the cells as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a new period
    Record {
        /// First day of bleeding
        #[arg(long, value_parser = parse_date_arg)]
        start: NaiveDate,

        /// Last day of bleeding (defaults to start + period length)
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,

        /// light, medium, heavy or spotting
        #[arg(long, default_value = "medium")]
        flow: Flow,

        /// Symptom tag (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        /// Validate and show the result without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Extend the end date of a recorded period
    Widen {
        /// Start date of the period to change
        #[arg(long, value_parser = parse_date_arg)]
        start: NaiveDate,

        /// New, later end date
        #[arg(long, value_parser = parse_date_arg)]
        end: NaiveDate,
    },

    /// Show cycle statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details for one date
    Day {
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },

    /// Export recorded cycles to CSV
    Export {
        /// Destination file
        #[arg(long)]
        out: PathBuf,
    },
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Validation(e)) => {
            eprintln!("Error: {} (field: {})", e, e.field());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    cycle_core::logging::init_for_verbosity(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.engine.validate()?;

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let ctx = Context {
        repo: JsonlRepository::new(data_dir.join("cycles")),
        user: cli.user,
        engine: config.engine,
        today,
    };

    match cli.command {
        Some(Commands::Status { json }) => cmd_status(&ctx, json),
        Some(Commands::Calendar { year, month, json }) => cmd_calendar(&ctx, year, month, json),
        Some(Commands::Record {
            start,
            end,
            flow,
            symptoms,
            dry_run,
        }) => {
            let mut draft = CycleDraft::starting(start).with_flow(flow);
            if let Some(end) = end {
                draft = draft.with_end_date(end);
            }
            for symptom in symptoms {
                draft = draft.with_symptom(symptom);
            }
            cmd_record(ctx, draft, dry_run)
        }
        Some(Commands::Widen { start, end }) => cmd_widen(ctx, start, end),
        Some(Commands::Stats { json }) => cmd_stats(&ctx, json),
        Some(Commands::Day { date }) => cmd_day(&ctx, date),
        Some(Commands::Export { out }) => cmd_export(&ctx, out),
        None => {
            // Default to "status" command
            cmd_status(&ctx, false)
        }
    }
}

struct Context {
    repo: JsonlRepository,
    user: String,
    engine: EngineConfig,
    today: NaiveDate,
}

impl Context {
    fn history(&self) -> Result<CycleHistory> {
        fetch_history_or_empty(&self.repo, &self.user, &self.engine)
    }
}

fn cmd_status(ctx: &Context, json: bool) -> Result<()> {
    let history = ctx.history()?;

    let reading = match classify(ctx.today, &history.cycles) {
        Ok(reading) => Some(reading),
        Err(Error::NoHistory) => None,
        Err(e) => return Err(e),
    };

    if json {
        let value = serde_json::json!({
            "today": format_date(ctx.today),
            "phase": reading,
            "predictions": history.predictions,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let Some(reading) = reading else {
        println!("No cycle data recorded yet.");
        println!("Record a period with: ctrack record --start YYYY-MM-DD");
        return Ok(());
    };

    println!();
    println!("  {}  ·  Day {} of cycle", reading.phase.name(), reading.cycle_day);
    println!("  {}", reading.phase.description());
    println!();

    if let Some(predictions) = history.predictions {
        let days = predictions.days_until_next_period(ctx.today);
        let when = match days {
            0 => "today".to_string(),
            d if d > 0 => format!("in {} days", d),
            d => format!("overdue by {} days", -d),
        };
        println!(
            "  Next period expected: {} ({})",
            format_date(predictions.next_period_start),
            when
        );
        println!(
            "  Fertile window:       {} to {}",
            format_date(predictions.fertile_window.start),
            format_date(predictions.fertile_window.end)
        );
        println!();
    }

    Ok(())
}

fn cmd_calendar(ctx: &Context, year: Option<i32>, month: Option<u32>, json: bool) -> Result<()> {
    let current = MonthRef::containing(ctx.today);
    let target = MonthRef::new(year.unwrap_or(current.year), month.unwrap_or(current.month))?;
    let history = ctx.history()?;

    let cells = build_month(target.year, target.month, &history, ctx.today, &ctx.engine)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }

    let title = interval::first_of_month(target.year, target.month)?.format("%B %Y");
    println!();
    println!("  {}", title);
    println!();
    let headers = ctx.engine.week_starts_on.headers();
    println!(
        " {}",
        headers
            .iter()
            .map(|h| format!("{:>5}", h))
            .collect::<String>()
    );
    for week in calendar::weeks(&cells) {
        let row: String = week.iter().map(render_cell).collect();
        println!(" {}", row);
    }
    println!();
    println!("  * period   + fertile   ? predicted period   [ ] today   ( ) other month");
    println!();
    Ok(())
}

fn render_cell(cell: &CalendarCell) -> String {
    let day = cell.date.format("%-d").to_string();
    let marker = if cell.is_period {
        '*'
    } else if cell.is_predicted_period {
        '?'
    } else if cell.is_fertile {
        '+'
    } else {
        ' '
    };
    let body = if cell.is_today {
        format!("[{}]", day)
    } else if !cell.is_current_month {
        format!("({})", day)
    } else {
        day
    };
    format!("{:>4}{}", body, marker)
}

fn cmd_record(mut ctx: Context, draft: CycleDraft, dry_run: bool) -> Result<()> {
    let history = ctx.history()?;

    let (updated, added) = record_entry(&history, &draft, ctx.today, &ctx.engine)?;

    println!(
        "\n  Period {} to {} ({})",
        format_date(added.start_date),
        format_date(added.end_date),
        added.flow.as_str()
    );
    if let Some(predictions) = updated.predictions {
        println!(
            "  Next period expected: {}",
            format_date(predictions.next_period_start)
        );
    }

    if dry_run {
        println!("\n[Dry run - not saving]");
        return Ok(());
    }

    ctx.repo.append(&ctx.user, &added)?;
    println!("\n✓ Period recorded!");
    Ok(())
}

fn cmd_widen(mut ctx: Context, start: NaiveDate, end: NaiveDate) -> Result<()> {
    let history = ctx.history()?;
    let updated = widen_end_date(&history, start, end, &ctx.engine)?;

    let widened = updated
        .cycles
        .iter()
        .filter(|c| c.start_date == start)
        .max_by_key(|c| c.end_date)
        .cloned()
        .ok_or(ValidationError::UnknownCycle(start))?;

    ctx.repo.append(&ctx.user, &widened)?;
    println!(
        "✓ Period starting {} now ends {}",
        format_date(start),
        format_date(widened.end_date)
    );
    Ok(())
}

fn cmd_stats(ctx: &Context, json: bool) -> Result<()> {
    let history = ctx.history()?;
    let stats = cycle_stats(&history.cycles, &ctx.engine);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  Cycles recorded:       {}", stats.total_cycles);
    println!("  Average cycle length:  {:.1} days", stats.average_cycle_length);
    println!("  Average period length: {:.1} days", stats.average_period_length);
    if let (Some(shortest), Some(longest)) = (stats.shortest_cycle, stats.longest_cycle) {
        println!("  Shortest / longest:    {} / {} days", shortest, longest);
    }
    if let Some(start) = stats.last_period_start {
        println!("  Last period started:   {}", format_date(start));
    }
    println!();
    Ok(())
}

fn cmd_day(ctx: &Context, date: NaiveDate) -> Result<()> {
    let history = ctx.history()?;

    println!();
    println!("  {}", date.format("%A, %B %-d, %Y"));

    if let Some(cycle) = find_cycle_for_date(date, &history.cycles) {
        println!("  Period day ({} flow)", cycle.flow.as_str());
        if cycle.symptoms.is_empty() {
            println!("  No symptoms recorded");
        } else {
            println!("  Symptoms:");
            for symptom in &cycle.symptoms {
                println!("    - {}", symptom);
            }
        }
    } else {
        let status = day_status(date, &history, ctx.today);
        if status.is_predicted_period {
            println!("  Predicted period start");
        } else if status.is_fertile {
            println!("  In the predicted fertile window");
        } else {
            println!("  No period recorded");
        }
        if date <= ctx.today {
            println!(
                "  Record it with: ctrack record --start {}",
                format_date(date)
            );
        }
    }
    println!();
    Ok(())
}

fn cmd_export(ctx: &Context, out: PathBuf) -> Result<()> {
    let history = ctx.history()?;
    let count = export_csv(&history.cycles, &out)?;
    println!("✓ Exported {} cycles to {}", count, out.display());
    Ok(())
}
