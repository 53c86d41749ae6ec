//! planner-runner: headless runner for the capacity planner.
//!
//! Usage:
//!   planner-runner --db planner.db --data-dir ./data
//!   planner-runner --db planner.db --today 2026-10-18 --mode combined
//!   planner-runner --db planner.db --import state.json
//!   planner-runner --db planner.db --ipc-mode

use anyhow::{Context, Result};
use capacity_core::{
    command::PlannerCommand,
    config::PlannerConfig,
    engine::PlannerEngine,
    forecast::{Forecast, ForecastMode, Rag},
    model::PlannerState,
};
use chrono::{NaiveDate, Utc};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetForecast {
        #[serde(default)]
        mode: Option<ForecastMode>,
        #[serde(default)]
        today: Option<NaiveDate>,
    },
    GetState,
    Command {
        command: PlannerCommand,
    },
    Drilldown {
        squad_id: String,
        quarter_index: usize,
        #[serde(default)]
        mode: Option<ForecastMode>,
        #[serde(default)]
        today: Option<NaiveDate>,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let today = parse_arg(&args, "--today", Utc::now().date_naive());
    let mode = flag_value(&args, "--mode")
        .map(|raw| ForecastMode::parse(raw).with_context(|| format!("unknown mode '{raw}'")))
        .transpose()?
        .unwrap_or(ForecastMode::Delivery);

    let config = PlannerConfig::load(data_dir)?;
    let mut engine = if db == ":memory:" {
        PlannerEngine::in_memory(config)?
    } else {
        PlannerEngine::open(db, config)?
    };

    if let Some(path) = flag_value(&args, "--import") {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
        let state: PlannerState =
            serde_json::from_str(&raw).with_context(|| format!("Cannot parse {path}"))?;
        engine.replace_state(state)?;
        log::info!("imported {path}");
    }

    if ipc_mode {
        run_ipc_loop(&mut engine, today, mode)?;
    } else {
        println!("Capacity planner — planner-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  today:     {today}");
        println!("  mode:      {mode:?}");
        println!();
        print_summary(&engine.forecast(today, mode));
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut PlannerEngine, today: NaiveDate, mode: ForecastMode) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => serde_json::to_value(engine.state())?,
            IpcRequest::GetForecast { mode: m, today: t } => {
                serde_json::to_value(engine.forecast(t.unwrap_or(today), m.unwrap_or(mode)))?
            }
            IpcRequest::Drilldown { squad_id, quarter_index, mode: m, today: t } => {
                match engine.drilldown(t.unwrap_or(today), m.unwrap_or(mode), &squad_id, quarter_index) {
                    Some(detail) => serde_json::to_value(detail)?,
                    None => serde_json::json!({
                        "error": format!("no cell for squad '{squad_id}' quarter {quarter_index}")
                    }),
                }
            }
            IpcRequest::Command { command } => match engine.submit_command(command) {
                Ok(events) => serde_json::json!({ "events": events }),
                Err(e) => {
                    log::warn!("command rejected: {e}");
                    serde_json::json!({ "error": e.to_string() })
                }
            },
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn rag_tag(rag: Rag) -> &'static str {
    match rag {
        Rag::Green => "G",
        Rag::Amber => "A",
        Rag::Red => "R",
    }
}

fn print_summary(forecast: &Forecast) {
    let header: Vec<String> = forecast
        .quarters
        .iter()
        .map(|q| format!("{:>16}", format!("{} ({})", q.label, q.month_range)))
        .collect();

    println!("=== CAPACITY FORECAST ({:?}) ===", forecast.mode);
    if forecast.tribes.is_empty() {
        println!("  (No squads yet)");
        return;
    }
    for tribe in &forecast.tribes {
        println!();
        println!("{:<24}{}", tribe.name, header.join(""));
        let cells: Vec<String> = tribe
            .cells
            .iter()
            .map(|c| format!("{:>13.1}% {}", c.used_percent, rag_tag(c.rag)))
            .collect();
        println!("{:<24}{}", "  (tribe)", cells.join(""));
        for squad in &tribe.squads {
            let cells: Vec<String> = squad
                .cells
                .iter()
                .map(|c| format!("{:>13.1}% {}", c.used_percent, rag_tag(c.rag)))
                .collect();
            println!("  {:<22}{}", squad.name, cells.join(""));
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
