// Entry point and high-level CLI flow.
//
// Interactive mode:
// - Option [1] loads a saved backend payload and prints diagnostics.
// - Option [2] searches for a company and selects it.
// - Option [3] generates the market reports (plus the selected company's),
//   exports them and previews each table.
// `--batch` runs load + select + generate once and exits.
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use bid_insight::cli::{self, Cli};
use bid_insight::error::AppError;
use bid_insight::reports::{self, ReportOptions, ReportSet};
use bid_insight::session::{Selection, Session};
use bid_insight::settings::{self, Settings};
use bid_insight::{output, util};
use clap::Parser;
use once_cell::sync::Lazy;
use tracing_subscriber::fmt;

// Loaded once, reported on many times within a run.
static SESSION: Lazy<Mutex<Session>> = Lazy::new(|| Mutex::new(Session::new()));

fn with_session<T>(f: impl FnOnce(&mut Session) -> T) -> T {
    let mut guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

fn init_tracing(verbose: u8) {
    let subscriber = fmt()
        .with_env_filter(cli::log_filter(verbose))
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

/// Print `prompt` and read one trimmed line.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to go back to the menu after generating reports.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ")
            .to_uppercase()
            .as_str()
        {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(path: &Path) {
    match with_session(|s| s.load(path)) {
        Ok(report) => {
            println!(
                "Processing dataset... ({} rows read, {} loaded)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.loaded_rows as i64)
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    util::format_int(report.parse_errors as i64)
                );
            }
            if report.undated_rows > 0 {
                println!(
                    "Info: {} rows have no usable date and are grouped under Unknown.",
                    util::format_int(report.undated_rows as i64)
                );
            }
            println!();
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

fn handle_select() {
    let query = read_line("Company name or TIN (blank to clear): ");
    if query.is_empty() {
        with_session(Session::clear_selection);
        println!("Selection cleared.\n");
        return;
    }
    let hits = match with_session(|s| s.search(&query)) {
        Ok(hits) => hits,
        Err(e) => {
            println!("Error: {}\n", e);
            return;
        }
    };
    if hits.is_empty() {
        println!("No companies match \"{}\".\n", query);
        return;
    }
    for (idx, c) in hits.iter().enumerate() {
        println!(
            "[{}] {} ({}) - {} bids, {}% win rate",
            idx + 1,
            c.company,
            c.tin,
            c.total_bids,
            util::format_number(c.win_rate, 1)
        );
    }
    let choice = read_line("Select company number (blank to cancel): ");
    let Some(company) = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| hits.get(i))
    else {
        println!();
        return;
    };
    match with_session(|s| s.select(&company.tin).map(|_| ())) {
        Ok(()) => println!("Selected {}.\n", company.company),
        Err(e) => println!("Error: {}\n", e),
    }
}

fn print_reports(set: &ReportSet, settings: &Settings, selection: &Selection) {
    let n = settings.preview_rows;

    println!("Report 1: Total Project Value by Month\n");
    output::preview_table_rows(&reports::monthly_rows(&set.monthly), n);

    println!("Report 2: Top {} Companies by Project Value\n", settings.top_companies);
    output::preview_table_rows(&reports::company_value_rows(&set.top_companies), n);

    println!(
        "Report 3: Company Win Rates (Top {}, >= {} bids)\n",
        settings.win_rate_limit, settings.min_bids
    );
    output::preview_table_rows(&reports::win_rate_rows(&set.win_rates), n);

    let (Some(company), Selection::CompanySelected { name, .. }) = (&set.company, selection)
    else {
        println!("(Select a company to see head-to-head, adjacent companies and bid strategy.)\n");
        return;
    };

    println!("Report 4: Head-to-Head for {}\n", name);
    output::preview_table_rows(&reports::head_to_head_rows(&company.head_to_head), n);

    println!("Report 5: Adjacent Companies\n");
    output::preview_table_rows(&reports::adjacent_rows(&company.adjacent), n);

    println!("Report 6: Company Comparison ({})\n", company.comparison.metric.title());
    output::preview_table_rows(&reports::comparison_rows(&company.comparison), n);

    let stats = &company.bid_strategy.bid_ratio_stats;
    println!("Report 7: Bid Strategy");
    println!(
        "Average bid ratio: {} (min {}, max {}), percentile: {}\n",
        util::format_number(stats.avg_bid_ratio, 4),
        util::format_number(stats.min_bid_ratio, 4),
        util::format_number(stats.max_bid_ratio, 4),
        stats
            .percentile
            .map(|p| format!("{}%", util::format_number(p, 1)))
            .unwrap_or_else(|| "n/a".to_string())
    );
    output::preview_table_rows(&reports::department_rows(&company.bid_strategy), n);

    println!("Report 8: Projects (newest first)\n");
    output::preview_table_rows(&company.projects, n);

    if let Some(rival) = company.rival_projects.first() {
        println!("Report 9: Shared Projects with {}\n", rival.competitor_name);
        output::preview_table_rows(&reports::competitor_project_rows(&company.rival_projects), n);
    }

    println!(
        "Report 10: Network of {} companies ({} projects won)\n",
        company.network.scope.tins.len(),
        company
            .network
            .monthly
            .totals
            .iter()
            .map(|t| t.count)
            .sum::<usize>()
    );
    output::preview_table_rows(&reports::win_rate_rows(&company.network.win_rates), n);
}

fn handle_generate_reports(settings: &Settings, options: &ReportOptions) -> Result<(), AppError> {
    let (set, selection) = with_session(|s| -> Result<_, AppError> {
        let data = s.data()?;
        let options = ReportOptions {
            company: s.selected_tin().map(str::to_string),
            ..options.clone()
        };
        Ok((
            reports::generate_all(data, settings, &options),
            s.selection().clone(),
        ))
    })?;

    println!("Generating reports...");
    let files = reports::export_all(&settings.output_dir, &set)?;
    println!(
        "Outputs saved to {} ({} files)\n",
        settings.output_dir.display(),
        files.len()
    );
    print_reports(&set, settings, &selection);
    println!(
        "Summary: {} records, {} projects, {} companies, total value {}\n",
        util::format_int(set.summary.total_records as i64),
        util::format_int(set.summary.total_projects as i64),
        util::format_int(set.summary.total_companies as i64),
        util::format_number(set.summary.total_value, 2)
    );
    Ok(())
}

fn run_batch(settings: &Settings, options: &ReportOptions) -> Result<(), AppError> {
    let path = settings
        .input
        .clone()
        .ok_or_else(|| AppError::Read {
            path: PathBuf::from("<none>"),
            source: io::Error::new(io::ErrorKind::NotFound, "no input file configured"),
        })?;
    with_session(|s| s.load(&path))?;
    if let Some(tin) = &options.company {
        with_session(|s| s.select(tin).map(|_| ()))?;
    }
    handle_generate_reports(settings, options)
}

fn run_menu(settings: &Settings, options: &ReportOptions) {
    let default_path = settings.input.clone();
    loop {
        let selected = with_session(|s| match s.selection() {
            Selection::CompanySelected { name, .. } => format!(" (selected: {})", name),
            Selection::NoCompanySelected => String::new(),
        });
        println!("Bid Insight{}", selected);
        println!("[1] Load the file");
        println!("[2] Select company");
        println!("[3] Generate Reports\n");
        match read_line("Enter choice: ").as_str() {
            "1" => {
                let path = match &default_path {
                    Some(p) => p.clone(),
                    None => PathBuf::from(read_line("Path to .json or .csv file: ")),
                };
                handle_load(&path);
            }
            "2" => handle_select(),
            "3" => {
                println!();
                match handle_generate_reports(settings, options) {
                    Err(AppError::NoData) => {
                        println!("Error: no data loaded. Please load a file first (option 1).\n")
                    }
                    Err(e) => eprintln!("Error: {}\n", e),
                    Ok(()) => {}
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = match settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            process::exit(2);
        }
    };
    if cli.input.is_some() {
        settings.input = cli.input.clone();
    }
    let options = ReportOptions {
        company: cli.company.clone(),
        year: cli.year,
        metric: cli.metric.into(),
    };

    if cli.batch {
        if let Err(e) = run_batch(&settings, &options) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }
    run_menu(&settings, &options);
}
