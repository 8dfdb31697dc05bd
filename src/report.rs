use serde::Serialize;
use std::path::Path;

use crate::aggregate::{aggregate, PortfolioAggregate};
use crate::config::EsgConfig;
use crate::error::{EsgError, EsgResult, RowError, ValidationWarning};
use crate::insight::{compare_to_peers, generate, Insight, PeerComparison};
use crate::loader::Dataset;
use crate::metrics::{derive, DerivedMetrics};
use crate::rollup::rollup;
use crate::scoring::{score, PillarScore};
use crate::trend::{trends, FarmTrend};
use crate::types::{FarmRecord, ReportType};
use crate::validate::{soft_checks, validate};

/// Everything computed for one farm-year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmReport {
    pub record: FarmRecord,
    pub metrics: DerivedMetrics,
    pub scores: PillarScore,
    pub insights: Vec<Insight>,
    /// Deep-dive only: standing against the other farms in the upload.
    pub peers: Vec<PeerComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub report_type: ReportType,
    pub total_rows: usize,
    pub row_errors: Vec<RowError>,
    pub warnings: Vec<ValidationWarning>,
    pub farms: Vec<FarmReport>,
    /// Multi-farm only.
    pub portfolio: Option<PortfolioAggregate>,
    /// Deep-dive only: farms reported in more than one year.
    pub trends: Vec<FarmTrend>,
}

impl AnalysisResult {
    pub fn farm(&self, farm_id: &str) -> Option<&FarmReport> {
        self.farms.iter().find(|f| f.record.farm_id == farm_id)
    }
}

/// Run the whole pipeline over one upload.
///
/// Configuration and schema problems abort before any metric is computed;
/// bad rows are excluded and listed in the result.
pub fn analyze(
    dataset: &Dataset,
    report_type: ReportType,
    config: &EsgConfig,
) -> EsgResult<AnalysisResult> {
    config.validate()?;
    if dataset.is_empty() {
        tracing::warn!(%report_type, "upload has no data rows");
    }
    let validated = validate(dataset, report_type, config)?;
    let mut row_errors = validated.row_errors;

    // Deep-dive warnings describe the merged farm-year, not its fields.
    let (records, warnings) = match report_type {
        ReportType::SingleFarm => {
            let (records, overflowed) = rollup(validated.records);
            row_errors.extend(overflowed);
            row_errors.sort_by_key(|e| e.row);
            let warnings: Vec<_> = records.iter().flat_map(soft_checks).collect();
            (records, warnings)
        }
        ReportType::MultiFarm => (validated.records, validated.warnings),
    };
    for w in &warnings {
        tracing::warn!(row = w.row, farm_id = %w.farm_id, "{}", w.message);
    }

    let metrics: Vec<DerivedMetrics> = records
        .iter()
        .map(|r| derive(r, report_type, config))
        .collect();
    let dataset_aggregate = aggregate(records.iter().zip(metrics.iter()));

    let farms: Vec<FarmReport> = records
        .into_iter()
        .zip(metrics)
        .map(|(record, metrics)| {
            let scores = score(&metrics, config);
            let insights = generate(&scores, config);
            let peers = match report_type {
                ReportType::SingleFarm => compare_to_peers(&metrics, &dataset_aggregate, config),
                ReportType::MultiFarm => Vec::new(),
            };
            tracing::debug!(
                farm_id = %record.farm_id,
                year = record.year,
                overall = ?scores.overall.value(),
                insights = insights.len(),
                "farm scored"
            );
            FarmReport {
                record,
                metrics,
                scores,
                insights,
                peers,
            }
        })
        .collect();

    tracing::info!(
        %report_type,
        farms = farms.len(),
        excluded_rows = row_errors.len(),
        "analysis complete"
    );

    let (portfolio, farm_trends) = match report_type {
        ReportType::MultiFarm => (Some(dataset_aggregate), Vec::new()),
        ReportType::SingleFarm => (None, trends(&farms)),
    };
    Ok(AnalysisResult {
        report_type,
        total_rows: validated.total_rows,
        row_errors,
        warnings,
        farms,
        portfolio,
        trends: farm_trends,
    })
}

/// Load a CSV file and analyze it.
pub fn analyze_path(
    path: impl AsRef<Path>,
    report_type: ReportType,
    config: &EsgConfig,
) -> EsgResult<AnalysisResult> {
    // Configuration errors take precedence over anything in the file.
    config.validate()?;
    let dataset = Dataset::from_path(path)?;
    analyze(&dataset, report_type, config)
}

/// One response shape for the presentation layer: either the full result
/// (possibly with excluded rows) or the reason the run was aborted.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResponse {
    Completed(Box<AnalysisResult>),
    Aborted { kind: String, message: String },
}

impl From<EsgResult<AnalysisResult>> for AnalysisResponse {
    fn from(result: EsgResult<AnalysisResult>) -> Self {
        match result {
            Ok(r) => AnalysisResponse::Completed(Box::new(r)),
            Err(e) => AnalysisResponse::from(e),
        }
    }
}

impl From<EsgError> for AnalysisResponse {
    fn from(e: EsgError) -> Self {
        AnalysisResponse::Aborted {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}
