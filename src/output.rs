use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::EsgResult;
use crate::insight::InsightKind;
use crate::report::AnalysisResult;
use crate::types::{FarmScoreRow, InsightRow, MetricId, PortfolioMetricRow, TrendRow};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> EsgResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> EsgResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// One row per farm-year, best overall score first. Farms without an
/// overall score sink to the bottom in upload order.
pub fn farm_score_rows(result: &AnalysisResult) -> Vec<FarmScoreRow> {
    let mut farms: Vec<_> = result.farms.iter().collect();
    farms.sort_by(|a, b| {
        let (a, b) = (a.scores.overall.value(), b.scores.overall.value());
        match (a, b) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });

    farms
        .into_iter()
        .map(|f| FarmScoreRow {
            farm_id: f.record.farm_id.clone(),
            farm_name: f.record.farm_name.clone(),
            year: f.record.year,
            total_co2e: crate::util::format_number(f.metrics.total_co2e, 1),
            emissions_per_tonne: f.metrics.get(MetricId::EmissionsPerTonne).format(1),
            environmental: f.scores.environmental.format(1),
            social: f.scores.social.format(1),
            governance: f.scores.governance.format(1),
            overall: f.scores.overall.format(1),
            rating: f
                .scores
                .rating
                .map(|r| r.label().to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect()
}

/// Portfolio statistics per metric, skipping metrics no farm reported.
pub fn portfolio_metric_rows(result: &AnalysisResult) -> Vec<PortfolioMetricRow> {
    let Some(portfolio) = &result.portfolio else {
        return Vec::new();
    };
    portfolio
        .metrics
        .iter()
        .filter(|s| s.farm_count > 0)
        .map(|s| {
            let decimals = if s.metric == MetricId::WaterProductivity { 4 } else { 2 };
            PortfolioMetricRow {
                metric: s.metric.label().to_string(),
                unit: s.metric.unit().to_string(),
                farm_count: s.farm_count,
                mean: s.mean.format(decimals),
                median: s.median.format(decimals),
                min: s.min.format(decimals),
                max: s.max.format(decimals),
            }
        })
        .collect()
}

pub fn insight_rows(result: &AnalysisResult) -> Vec<InsightRow> {
    result
        .farms
        .iter()
        .flat_map(|f| {
            f.insights.iter().map(move |i| InsightRow {
                farm_id: f.record.farm_id.clone(),
                kind: match i.kind {
                    InsightKind::Strength => "Strength".to_string(),
                    InsightKind::Risk => "Risk".to_string(),
                },
                message: i.message.clone(),
            })
        })
        .collect()
}

/// One row per farm-year for farms followed across years. The change
/// column compares each year's overall score with the farm's first scored
/// year and is blank for that year itself.
pub fn trend_rows(result: &AnalysisResult) -> Vec<TrendRow> {
    let mut rows = Vec::new();
    for t in &result.trends {
        let baseline = t.years.iter().find_map(|y| y.overall.value());
        let mut seen_baseline = false;
        for y in &t.years {
            let change = match (baseline, y.overall.value()) {
                (Some(b), Some(v)) if seen_baseline => format!("{:+.1}", v - b),
                (Some(_), Some(_)) => {
                    seen_baseline = true;
                    String::new()
                }
                _ => "N/A".to_string(),
            };
            rows.push(TrendRow {
                farm_id: t.farm_id.clone(),
                farm_name: t.farm_name.clone(),
                year: y.year,
                environmental: y.environmental.format(1),
                social: y.social.format(1),
                governance: y.governance.format(1),
                overall: y.overall.format(1),
                change,
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EsgConfig;
    use crate::loader::Dataset;
    use crate::report::analyze;
    use crate::types::ReportType;

    const PORTFOLIO: &str = "\
organisation_name,farm_id,farm_name,country,year,crop,area_ha,yield_tonnes,fertilizer_n_kg,diesel_litres,electricity_kwh,water_m3,workers_total,workers_female,accidents_count
Acme,F1,Green Acres,UK,2023,Wheat,10,50,100,200,500,1000,20,8,1
Acme,F2,Low Farm,UK,2023,Barley,10,10,2500,1500,500,100,10,0,2
Acme,F3,Empty Field,UK,2023,Oats,0,0,0,0,0,0,0,0,0
";

    fn result() -> AnalysisResult {
        let ds = Dataset::from_reader(PORTFOLIO.as_bytes()).expect("csv");
        analyze(&ds, ReportType::MultiFarm, &EsgConfig::default()).expect("analysis")
    }

    #[test]
    fn farm_rows_best_first_unscored_last() {
        let rows = farm_score_rows(&result());
        let ids: Vec<&str> = rows.iter().map(|r| r.farm_id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F2", "F3"]);
        assert_eq!(rows[0].total_co2e, "1,340.0");
        assert_eq!(rows[0].emissions_per_tonne, "26.8");
        assert_eq!(rows[0].governance, "N/A");
        assert_eq!(rows[0].rating, "Excellent");
        assert_eq!(rows[2].overall, "N/A");
        assert_eq!(rows[2].rating, "N/A");
    }

    #[test]
    fn portfolio_rows_skip_unreported_metrics() {
        let rows = portfolio_metric_rows(&result());
        assert!(rows.iter().all(|r| r.farm_count > 0));
        let eph = rows
            .iter()
            .find(|r| r.metric == MetricId::EmissionsPerHa.label())
            .expect("emissions per ha row");
        assert_eq!(eph.farm_count, 2);
        assert!(rows.iter().all(|r| r.metric != MetricId::PhosphateIntensity.label()));
    }

    #[test]
    fn insight_rows_carry_farm_id() {
        let rows = insight_rows(&result());
        assert!(rows.iter().any(|r| r.farm_id == "F1" && r.kind == "Strength"));
        assert!(rows.iter().any(|r| r.farm_id == "F2" && r.kind == "Risk"));
        assert!(rows.iter().all(|r| r.farm_id != "F3"));
    }

    #[test]
    fn trend_rows_measure_change_from_first_year() {
        let csv = "\
farm_id,farm_name,year,crop_type,field_area_ha,yield_tons,fertiliser_kgN,diesel_litres,electricity_kwh,water_volume_m3,workers_total,workers_female,accidents_count
F1,Green Acres,2023,Wheat,10,50,100,200,500,1000,20,8,1
F1,Green Acres,2022,Wheat,10,50,100,200,500,1000,20,2,1
F2,Other Farm,2023,Barley,10,40,200,300,500,500,10,2,1
";
        let ds = Dataset::from_reader(csv.as_bytes()).expect("csv");
        let r = analyze(&ds, ReportType::SingleFarm, &EsgConfig::default()).expect("analysis");
        let rows = trend_rows(&r);
        let years: Vec<(&str, i32)> = rows.iter().map(|t| (t.farm_id.as_str(), t.year)).collect();
        assert_eq!(years, vec![("F1", 2022), ("F1", 2023)]);
        assert_eq!(rows[0].change, "");
        assert!(rows[1].change.starts_with('+'), "{}", rows[1].change);
    }

    #[test]
    fn writes_csv_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let r = result();
        let csv_path = dir.path().join("farm_scores.csv");
        write_csv(&csv_path, &farm_score_rows(&r)).expect("write csv");
        let text = std::fs::read_to_string(&csv_path).expect("read csv");
        let header = text.lines().next().expect("header");
        assert!(header.starts_with("FarmId,FarmName,Year,TotalCO2e"));
        assert_eq!(text.lines().count(), 4);

        let json_path = dir.path().join("esg_summary.json");
        write_json(&json_path, &r).expect("write json");
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read json"))
                .expect("parse json");
        assert_eq!(v["report_type"], "multi-farm");
        assert_eq!(v["farms"].as_array().map(|a| a.len()), Some(3));
    }
}
