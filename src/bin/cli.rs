use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataFrame};
use procurement_tracker::{
    Clock, Market, MarketFilter, MarketSortKey, MarketStatus, MarketType, Register, SortDirection,
    Task, TaskFilter, TaskStatistics, TrackerConfig, config, derive_market_status,
    load_register_from_json, load_tasks_from_csv, report, save_register_to_json,
    save_tasks_to_csv,
};
use std::io::{self, Write};

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| match col.get(row_idx) {
                Ok(AnyValue::Null) | Err(_) => String::new(),
                Ok(AnyValue::String(s)) => s.to_string(),
                Ok(av) => av.to_string(),
            })
            .collect::<Vec<_>>();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            let pad = widths[ci].saturating_sub(value.chars().count());
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                        Show this help\n  markets [coordination=X] [status=S] [type=T] [sort=col] [asc|desc]\n                                              Show markets with derived status\n  tasks [market_ref]                          Show tasks with variance (optionally one market)\n  market add <ref> <type> <coordination> <title...>\n                                              Add or replace a market\n  market budget <ref> <line...>               Set budget lines (1 to 6 digits each)\n  task add <market_ref> <start> <end> <title...>\n                                              Add a task with planned dates (YYYY-MM-DD)\n  start    <id> [YYYY-MM-DD]                  Mark task started (default today)\n  complete <id> [YYYY-MM-DD]                  Mark task completed (default today)\n  delete   <id>                               Delete a task\n  status   <market_ref>                       Show derived status of a market\n  variance [YYYY-MM-DD]                       Variance report as of a date\n  stats    [YYYY-MM-DD]                       Task statistics as of a date\n  refresh                                     Recompute and store market statuses\n  save <json|csv> <path>                      Persist register (csv: tasks only)\n  load <json|csv> <path>                      Load register (csv: tasks into current markets)\n  quit|exit                                   Exit"
    );
    let types = MarketType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Market types: {}", types);
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// Optional date argument, falling back to the clock.
fn date_or_today(arg: Option<&str>, clock: &dyn Clock) -> Option<NaiveDate> {
    match arg {
        Some(raw) => parse_date(raw),
        None => Some(clock.today()),
    }
}

fn parse_market_filter<'a>(args: impl Iterator<Item = &'a str>) -> Result<MarketFilter, String> {
    let mut filter = MarketFilter::new();
    let mut sort_by = None;
    let mut direction = SortDirection::Asc;
    for arg in args {
        match arg.split_once('=') {
            Some(("coordination", value)) => filter = filter.coordination(value),
            Some(("status", value)) => filter = filter.status(MarketStatus::parse_lenient(value)),
            Some(("type", value)) => {
                let kind = MarketType::parse_lenient(value)
                    .ok_or_else(|| format!("Unknown market type '{}'.", value))?;
                filter = filter.market_type(kind);
            }
            Some(("sort", value)) => {
                sort_by = Some(
                    MarketSortKey::parse_lenient(value)
                        .ok_or_else(|| format!("Unknown sort column '{}'.", value))?,
                );
            }
            _ => {
                direction = SortDirection::parse_lenient(arg)
                    .ok_or_else(|| format!("Unknown markets argument '{}'.", arg))?;
            }
        }
    }
    if let Some(key) = sort_by {
        filter = filter.sort(key, direction);
    }
    Ok(filter)
}

fn print_markets(register: &Register, filter: &MarketFilter) {
    match report::market_status_frame(register, filter) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Report error: {}", e),
    }
}

fn print_tasks(tasks: &[Task], today: NaiveDate) {
    match report::variance_frame(tasks, today) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Report error: {}", e),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_tracing();
    let config = TrackerConfig::from_env()?;
    let clock = config.clock();

    let mut register = match &config.data_path {
        Some(path) => load_register_from_json(path)?,
        None => Register::new(),
    };

    println!("Procurement Tracker (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "markets" => match parse_market_filter(parts) {
                Ok(filter) => print_markets(&register, &filter),
                Err(message) => println!("{}", message),
            },
            "tasks" => {
                let filter = match parts.next() {
                    Some(market_ref) => TaskFilter::new().market(market_ref),
                    None => TaskFilter::new(),
                };
                let tasks: Vec<Task> = filter
                    .apply(register.tasks())
                    .into_iter()
                    .cloned()
                    .collect();
                print_tasks(&tasks, clock.today());
            }
            "market" => match parts.next() {
                Some("add") => {
                    let market_ref = parts.next();
                    let kind = parts.next();
                    let coordination = parts.next();
                    let title = parts.collect::<Vec<_>>().join(" ");
                    match (market_ref, kind, coordination) {
                        (Some(market_ref), Some(kind), Some(coordination)) if !title.is_empty() => {
                            let Some(market_type) = MarketType::parse_lenient(kind) else {
                                println!("Unknown market type '{}'.", kind);
                                continue;
                            };
                            let market = Market::new(market_ref, title, market_type, coordination)
                                .with_derived_status(register.tasks());
                            match register.upsert_market(market) {
                                Ok(()) => println!("Market {} saved.", market_ref),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: market add <ref> <type> <coordination> <title...>"),
                    }
                }
                Some("budget") => match parts.next() {
                    Some(market_ref) => {
                        let lines = parts.map(str::to_string).collect();
                        match register.set_budget_lines(market_ref, lines) {
                            Ok(market) => println!(
                                "Market {} budget lines: {}",
                                market.market_ref,
                                market.budget_lines.join(", ")
                            ),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    None => println!("Usage: market budget <ref> <line...>"),
                },
                _ => println!(
                    "Usage: market add <ref> <type> <coordination> <title...> | market budget <ref> <line...>"
                ),
            },
            "task" => match parts.next() {
                Some("add") => {
                    let market_ref = parts.next();
                    let start = parts.next().and_then(parse_date);
                    let end = parts.next().and_then(parse_date);
                    let title = parts.collect::<Vec<_>>().join(" ");
                    match (market_ref, start, end) {
                        (Some(market_ref), Some(start), Some(end)) if !title.is_empty() => {
                            let id = register.next_task_id(market_ref);
                            if register.find_task(&id).is_some() {
                                println!("Task {} already exists.", id);
                                continue;
                            }
                            let task = Task::new(id.clone(), market_ref, title).with_plan(start, end);
                            match register.upsert_task(task) {
                                Ok(()) => println!("Task {} added to {}.", id, market_ref),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!(
                            "Usage: task add <market_ref> <YYYY-MM-DD> <YYYY-MM-DD> <title...>"
                        ),
                    }
                }
                _ => println!("Usage: task add <market_ref> <YYYY-MM-DD> <YYYY-MM-DD> <title...>"),
            },
            "start" | "complete" => {
                let Some(id) = parts.next() else {
                    println!("Usage: {} <id> [YYYY-MM-DD]", cmd);
                    continue;
                };
                let Some(date) = date_or_today(parts.next(), clock.as_ref()) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                let result = if cmd == "start" {
                    register.start_task(id, date)
                } else {
                    register.complete_task(id, date)
                };
                match result {
                    Ok(task) => println!("Task {} is now {} ({}).", task.id, task.status, date),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parts.next() {
                Some(id) => {
                    if register.delete_task(id) {
                        println!("Deleted task {}.", id);
                    } else {
                        println!("Task {} not found.", id);
                    }
                }
                None => println!("Usage: delete <id>"),
            },
            "status" => match parts.next() {
                Some(market_ref) => {
                    if register.find_market(market_ref).is_none() {
                        println!("Market {} not found.", market_ref);
                        continue;
                    }
                    let status = derive_market_status(market_ref, register.tasks());
                    let counts = register.market_counts(market_ref);
                    println!(
                        "Market {}: {} ({}), tasks={}, completed={}",
                        market_ref,
                        status,
                        status.label(),
                        counts.total,
                        counts.completed
                    );
                    if let Some(last) = register.last_task_added(market_ref) {
                        println!("Last task: {} {}", last.id, last.title);
                    }
                }
                None => println!("Usage: status <market_ref>"),
            },
            "variance" => match date_or_today(parts.next(), clock.as_ref()) {
                Some(today) => print_tasks(register.tasks(), today),
                None => println!("Invalid date (YYYY-MM-DD)"),
            },
            "stats" => match date_or_today(parts.next(), clock.as_ref()) {
                Some(today) => {
                    let stats = TaskStatistics::from_tasks(register.tasks(), today);
                    println!("Stats ({})", stats.to_cli_summary());
                }
                None => println!("Invalid date (YYYY-MM-DD)"),
            },
            "refresh" => {
                let summary = register.refresh_market_statuses();
                println!("Refreshed ({})", summary.to_cli_summary());
            }
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                match (fmt, path) {
                    (Some("json"), Some(path)) => match save_register_to_json(&register, path) {
                        Ok(_) => println!("Register saved to {}.", path),
                        Err(e) => println!("Error saving register: {}", e),
                    },
                    (Some("csv"), Some(path)) => match save_tasks_to_csv(register.tasks(), path) {
                        Ok(_) => println!("Tasks saved to {}.", path),
                        Err(e) => println!("Error saving tasks: {}", e),
                    },
                    _ => println!("Usage: save <json|csv> <path>"),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                match (fmt, path) {
                    (Some("json"), Some(path)) => match load_register_from_json(path) {
                        Ok(loaded) => {
                            register = loaded;
                            println!("Register loaded from {}.", path);
                            print_markets(&register, &MarketFilter::new());
                        }
                        Err(e) => println!("Error loading register: {}", e),
                    },
                    (Some("csv"), Some(path)) => {
                        let loaded = load_tasks_from_csv(path).map_err(|e| e.to_string()).and_then(
                            |tasks| {
                                Register::from_parts(register.markets().to_vec(), tasks)
                                    .map_err(|e| e.to_string())
                            },
                        );
                        match loaded {
                            Ok(loaded) => {
                                register = loaded;
                                println!("Tasks loaded from {}.", path);
                                print_tasks(register.tasks(), clock.today());
                            }
                            Err(e) => println!("Error loading tasks: {}", e),
                        }
                    }
                    _ => println!("Usage: load <json|csv> <path>"),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
    Ok(())
}
