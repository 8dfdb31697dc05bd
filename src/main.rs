// Entry point and high-level CLI flow.
//
// - Option [1] runs the portfolio report over a multi-farm upload.
// - Option [2] runs the deep-dive report over a single-farm upload.
// - After a report, the user can go back to the selection menu or exit.
use agri_esg::insight::{format_value, Standing};
use agri_esg::output;
use agri_esg::util;
use agri_esg::{
    analyze_path, AnalysisResponse, AnalysisResult, EsgConfig, EsgResult, Pillar, ReportType,
    DEFAULT_CONFIG,
};
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Where to read the upload from and where to write results.
struct Settings {
    csv_path: PathBuf,
    config_path: Option<PathBuf>,
    out_dir: PathBuf,
}

impl Settings {
    fn from_env() -> Self {
        Settings {
            csv_path: std::env::var("AGRIESG_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("farm_data.csv")),
            config_path: std::env::var("AGRIESG_CONFIG").ok().map(PathBuf::from),
            out_dir: std::env::var("AGRIESG_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// The shared default table unless an override file is configured.
    fn config(&self) -> EsgResult<Cow<'static, EsgConfig>> {
        match &self.config_path {
            Some(path) => {
                let config = EsgConfig::from_path(path)?;
                tracing::info!(path = %path.display(), "loaded configuration override");
                Ok(Cow::Owned(config))
            }
            None => Ok(Cow::Borrowed(&*DEFAULT_CONFIG)),
        }
    }
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the report selection menu.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Run one report end to end: analyze, print previews, write outputs.
///
/// Aborted runs still write `esg_summary.json` with the reason, so a
/// dashboard reading the file sees why nothing was scored.
fn handle_report(settings: &Settings, report_type: ReportType) {
    let summary_path = settings.out_dir.join("esg_summary.json");
    let result = settings
        .config()
        .and_then(|config| analyze_path(&settings.csv_path, report_type, &config));

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(kind = e.kind(), "{}", e);
            eprintln!("Failed to analyze {}: {}\n", settings.csv_path.display(), e);
            if let Err(e) = output::write_json(&summary_path, &AnalysisResponse::from(e)) {
                eprintln!("Write error: {}", e);
            }
            return;
        }
    };

    print_load_summary(&result);
    match report_type {
        ReportType::MultiFarm => print_portfolio(settings, &result),
        ReportType::SingleFarm => print_deep_dive(settings, &result),
    }

    let response = AnalysisResponse::from(Ok(result));
    if let Err(e) = output::write_json(&summary_path, &response) {
        eprintln!("Write error: {}", e);
    }
    println!("Full results saved to {}\n", summary_path.display());
}

fn print_load_summary(result: &AnalysisResult) {
    println!(
        "Processing dataset... ({} rows read, {} farm-years scored)",
        util::format_int(result.total_rows),
        util::format_int(result.farms.len())
    );
    if !result.row_errors.is_empty() {
        println!(
            "Note: {} rows skipped due to validation errors.",
            util::format_int(result.row_errors.len())
        );
        for e in result.row_errors.iter().take(5) {
            println!("  row {}: {}", e.row, e.reason);
        }
    }
    if !result.warnings.is_empty() {
        println!(
            "Info: {} warnings (metrics marked N/A).",
            util::format_int(result.warnings.len())
        );
    }
    println!();
}

fn print_portfolio(settings: &Settings, result: &AnalysisResult) {
    if let Some(p) = &result.portfolio {
        println!("Portfolio Overview");
        println!(
            "Farms: {}  Area: {} ha  Yield: {} t  Emissions: {} kg CO2e ({} kg CO2e/t)\n",
            util::format_int(p.farm_count),
            util::format_number(p.totals.area_ha, 1),
            util::format_number(p.totals.yield_tonnes, 1),
            util::format_number(p.totals.co2e, 0),
            p.emissions_per_tonne.format(1)
        );
    }

    let scores = output::farm_score_rows(result);
    let file1 = settings.out_dir.join("farm_scores.csv");
    if let Err(e) = output::write_csv(&file1, &scores) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Farm ESG Scores");
    println!("(Ranked by overall ESG score)\n");
    output::preview_table_rows(&scores, 5);
    println!("(Full table exported to {})\n", file1.display());

    let metrics = output::portfolio_metric_rows(result);
    let file2 = settings.out_dir.join("portfolio_metrics.csv");
    if let Err(e) = output::write_csv(&file2, &metrics) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Portfolio Metric Distribution");
    println!("(Unweighted across farms; N/A values excluded)\n");
    output::preview_table_rows(&metrics, 6);
    println!("(Full table exported to {})\n", file2.display());

    println!("Report 3: Key Insights\n");
    output::preview_table_rows(&output::insight_rows(result), 8);
}

fn print_deep_dive(settings: &Settings, result: &AnalysisResult) {
    let scores = output::farm_score_rows(result);
    let file1 = settings.out_dir.join("farm_scores.csv");
    if let Err(e) = output::write_csv(&file1, &scores) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Farm-Year ESG Scores\n");
    output::preview_table_rows(&scores, 5);
    println!("(Full table exported to {})\n", file1.display());

    for farm in &result.farms {
        println!(
            "{} ({}) {}: overall {} [{}]",
            farm.record.farm_name,
            farm.record.farm_id,
            farm.record.year,
            farm.scores.overall.format(1),
            farm.scores
                .rating
                .map(|r| r.label())
                .unwrap_or("N/A")
        );
        let pillars: Vec<String> = [Pillar::Environmental, Pillar::Social, Pillar::Governance]
            .into_iter()
            .map(|p| format!("{} {}", p, farm.scores.pillar(p).format(1)))
            .collect();
        println!("  {}", pillars.join("  "));
        if let Some(regen) = farm.metrics.regenerative_score.value() {
            println!("  Regenerative practices: {}/100", util::format_number(regen, 0));
        }
        for insight in &farm.insights {
            println!("  - {}", insight.message);
        }
        for peer in farm.peers.iter().filter(|p| p.standing != Standing::InLine) {
            let side = match peer.standing {
                Standing::BetterThanPeers => "ahead of peers",
                Standing::MissesTarget => "below peers, target is zero",
                _ => "behind peers",
            };
            println!(
                "  {} {}: {} vs {} {} ({} farms)",
                peer.metric.label(),
                side,
                format_value(peer.metric, peer.farm_value),
                if peer.pooled { "pooled" } else { "mean" },
                format_value(peer.metric, peer.benchmark),
                peer.peer_count
            );
        }
        println!();
    }

    let trends = output::trend_rows(result);
    if !trends.is_empty() {
        let file2 = settings.out_dir.join("farm_trends.csv");
        if let Err(e) = output::write_csv(&file2, &trends) {
            eprintln!("Write error: {}", e);
        }
        println!("Report 2: Multi-Year Progress\n");
        output::preview_table_rows(&trends, 10);
        println!("(Full table exported to {})\n", file2.display());
    }
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agri_esg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();

    loop {
        println!("Select Report:");
        println!("[1] Portfolio Report (multi-farm upload)");
        println!("[2] Farm Deep-Dive (single-farm upload)");
        println!("[3] Exit\n");
        let report_type = match read_choice().as_str() {
            "1" => ReportType::MultiFarm,
            "2" => ReportType::SingleFarm,
            "3" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
                continue;
            }
        };
        println!();
        handle_report(&settings, report_type);
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}
