//! Year-on-year score progression for the deep-dive report.

use serde::Serialize;
use std::collections::HashMap;

use crate::report::FarmReport;
use crate::types::Measure;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearScore {
    pub year: i32,
    pub environmental: Measure,
    pub social: Measure,
    pub governance: Measure,
    pub overall: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmTrend {
    pub farm_id: String,
    pub farm_name: String,
    /// Oldest year first.
    pub years: Vec<YearScore>,
    /// Latest overall score minus the earliest, over years that have one.
    pub overall_change: Measure,
}

/// One trend per farm reported in two or more years, in first-seen farm
/// order. Expects one report per farm-year, as the rollup produces.
pub fn trends(farms: &[FarmReport]) -> Vec<FarmTrend> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&FarmReport>> = HashMap::new();
    for f in farms {
        groups
            .entry(f.record.farm_id.as_str())
            .or_insert_with(|| {
                order.push(f.record.farm_id.as_str());
                Vec::new()
            })
            .push(f);
    }

    order
        .into_iter()
        .filter_map(|id| groups.remove(id))
        .filter(|reports| reports.len() > 1)
        .map(|mut reports| {
            reports.sort_by_key(|f| f.record.year);
            let years: Vec<YearScore> = reports
                .iter()
                .map(|f| YearScore {
                    year: f.record.year,
                    environmental: f.scores.environmental,
                    social: f.scores.social,
                    governance: f.scores.governance,
                    overall: f.scores.overall,
                })
                .collect();
            let scored: Vec<f64> = years.iter().filter_map(|y| y.overall.value()).collect();
            let overall_change = match scored.as_slice() {
                [first, .., last] => Measure::new(last - first),
                _ => Measure::NotApplicable,
            };
            FarmTrend {
                farm_id: reports[0].record.farm_id.clone(),
                farm_name: reports[0].record.farm_name.clone(),
                years,
                overall_change,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EsgConfig;
    use crate::metrics::derive;
    use crate::metrics::tests::sample_record;
    use crate::scoring::score;
    use crate::types::ReportType;

    fn report(farm: &str, year: i32, female: u32) -> FarmReport {
        let config = EsgConfig::default();
        let mut record = sample_record();
        record.farm_id = farm.to_string();
        record.year = year;
        record.workers_female = female;
        let metrics = derive(&record, ReportType::SingleFarm, &config);
        let scores = score(&metrics, &config);
        FarmReport {
            record,
            metrics,
            scores,
            insights: Vec::new(),
            peers: Vec::new(),
        }
    }

    #[test]
    fn years_sorted_and_change_measured() {
        let farms = vec![
            report("F1", 2024, 10),
            report("F2", 2023, 8),
            report("F1", 2022, 2),
            report("F1", 2023, 6),
        ];
        let out = trends(&farms);
        assert_eq!(out.len(), 1);
        let t = &out[0];
        assert_eq!(t.farm_id, "F1");
        let years: Vec<i32> = t.years.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2022, 2023, 2024]);

        let first = t.years[0].overall.value().expect("scored");
        let last = t.years[2].overall.value().expect("scored");
        assert!(last > first);
        assert_eq!(t.overall_change, Measure::new(last - first));
    }

    #[test]
    fn unscored_years_leave_change_not_applicable() {
        let mut a = report("F1", 2022, 8);
        a.scores.overall = Measure::NotApplicable;
        let b = report("F1", 2023, 8);
        let out = trends(&[a, b]);
        assert_eq!(out[0].overall_change, Measure::NotApplicable);
    }
}
