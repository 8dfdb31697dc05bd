use serde::Serialize;

use crate::metrics::{DerivedMetrics, EmissionBreakdown};
use crate::types::{FarmRecord, Measure, MetricId};
use crate::util::{average, median, quantile};

/// Distribution of one metric across the farms where it is applicable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: MetricId,
    /// Farms contributing to the statistics below (the mean's denominator).
    pub farm_count: usize,
    /// Farms skipped because the metric was not applicable for them.
    pub excluded_count: usize,
    pub sum: f64,
    pub mean: Measure,
    pub median: Measure,
    pub q1: Measure,
    pub q3: Measure,
    pub min: Measure,
    pub max: Measure,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PortfolioTotals {
    pub area_ha: f64,
    pub yield_tonnes: f64,
    pub co2e: f64,
    pub water_m3: f64,
    pub workers: u64,
    pub female_workers: u64,
    pub accidents: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAggregate {
    pub farm_count: usize,
    pub totals: PortfolioTotals,
    pub emissions: EmissionBreakdown,
    /// Pooled ratios: portfolio totals divided by portfolio totals.
    pub emissions_per_tonne: Measure,
    pub water_per_tonne: Measure,
    pub female_share: Measure,
    pub accident_rate: Measure,
    pub metrics: Vec<MetricSummary>,
}

impl PortfolioAggregate {
    pub fn summary(&self, metric: MetricId) -> Option<&MetricSummary> {
        self.metrics.iter().find(|s| s.metric == metric)
    }
}

/// Roll per-farm metrics up to the portfolio.
///
/// Totals use every valid record. Per-metric statistics are unweighted by
/// farm size and only include farms where the metric is applicable.
pub fn aggregate<'a>(
    farms: impl IntoIterator<Item = (&'a FarmRecord, &'a DerivedMetrics)>,
) -> PortfolioAggregate {
    let farms: Vec<(&FarmRecord, &DerivedMetrics)> = farms.into_iter().collect();

    let mut totals = PortfolioTotals::default();
    let mut emissions = EmissionBreakdown::default();
    for (r, m) in &farms {
        totals.area_ha += r.area_ha;
        totals.yield_tonnes += r.yield_tonnes;
        totals.co2e += m.total_co2e;
        totals.water_m3 += m.water_used_m3;
        totals.workers += r.workers_total as u64;
        totals.female_workers += r.workers_female as u64;
        totals.accidents += r.accidents_count as u64;
        emissions.fertilizer += m.emissions.fertilizer;
        emissions.diesel += m.emissions.diesel;
        emissions.electricity += m.emissions.electricity;
    }

    let metrics = MetricId::ALL
        .iter()
        .map(|&metric| {
            let values: Vec<f64> = farms
                .iter()
                .filter_map(|(_, m)| m.get(metric).value())
                .collect();
            summarize(metric, values, farms.len())
        })
        .collect();

    let workers = totals.workers as f64;
    PortfolioAggregate {
        farm_count: farms.len(),
        emissions_per_tonne: Measure::ratio(totals.co2e, totals.yield_tonnes),
        water_per_tonne: Measure::ratio(totals.water_m3, totals.yield_tonnes),
        female_share: Measure::ratio(totals.female_workers as f64, workers),
        accident_rate: Measure::ratio(totals.accidents as f64, workers).map(|r| r * 100.0),
        totals,
        emissions,
        metrics,
    }
}

fn summarize(metric: MetricId, values: Vec<f64>, farm_total: usize) -> MetricSummary {
    let farm_count = values.len();
    let stat = |v: f64| {
        if farm_count == 0 {
            Measure::NotApplicable
        } else {
            Measure::new(v)
        }
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricSummary {
        metric,
        farm_count,
        excluded_count: farm_total - farm_count,
        sum: values.iter().sum(),
        mean: stat(average(&values)),
        median: stat(median(values.clone())),
        q1: stat(quantile(values.clone(), 0.25)),
        q3: stat(quantile(values, 0.75)),
        min: stat(min),
        max: stat(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EsgConfig;
    use crate::metrics::derive;
    use crate::metrics::tests::sample_record;
    use crate::types::ReportType;

    fn farms(records: &[FarmRecord]) -> Vec<DerivedMetrics> {
        let config = EsgConfig::default();
        records
            .iter()
            .map(|r| derive(r, ReportType::MultiFarm, &config))
            .collect()
    }

    #[test]
    fn sums_and_denominators_follow_applicability() {
        let a = sample_record();
        let mut b = sample_record();
        b.farm_id = "F2".to_string();
        b.area_ha = 0.0;
        b.workers_total = 10;
        b.workers_female = 5;
        let mut c = sample_record();
        c.farm_id = "F3".to_string();
        c.area_ha = 20.0;
        let records = vec![a, b, c];
        let metrics = farms(&records);
        let agg = aggregate(records.iter().zip(metrics.iter()));

        assert_eq!(agg.farm_count, 3);
        assert!((agg.totals.co2e - 3.0 * 1340.0).abs() < 1e-6);
        assert_eq!(agg.totals.area_ha, 30.0);
        assert_eq!(agg.totals.workers, 50);

        let eph = agg.summary(MetricId::EmissionsPerHa).expect("summary");
        assert_eq!(eph.farm_count, 2);
        assert_eq!(eph.excluded_count, 1);
        assert!((eph.sum - (134.0 + 67.0)).abs() < 1e-9);
        assert!((eph.mean.value().unwrap() - 100.5).abs() < 1e-9);
        assert!((eph.min.value().unwrap() - 67.0).abs() < 1e-9);
        assert!((eph.max.value().unwrap() - 134.0).abs() < 1e-9);

        let fs = agg.summary(MetricId::FemaleShare).expect("summary");
        assert_eq!(fs.farm_count, 3);
        assert!((fs.median.value().unwrap() - 0.4).abs() < 1e-9);

        // Pooled: 21 female workers of 50.
        assert!((agg.female_share.value().unwrap() - 0.42).abs() < 1e-9);
        assert!((agg.accident_rate.value().unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn metric_without_applicable_farms_reports_zero_count() {
        let records = vec![sample_record()];
        let metrics = farms(&records);
        let agg = aggregate(records.iter().zip(metrics.iter()));
        let ph = agg.summary(MetricId::PhosphateIntensity).expect("summary");
        assert_eq!(ph.farm_count, 0);
        assert_eq!(ph.excluded_count, 1);
        assert_eq!(ph.sum, 0.0);
        assert_eq!(ph.mean, Measure::NotApplicable);
        assert_eq!(ph.min, Measure::NotApplicable);
    }

    #[test]
    fn irrigation_only_farms_count_towards_water() {
        let a = sample_record();
        let mut b = sample_record();
        b.farm_id = "F2".to_string();
        b.water_m3 = 0.0;
        b.irrigation_water_m3 = Some(3000.0);
        let records = vec![a, b];
        let metrics = farms(&records);
        let agg = aggregate(records.iter().zip(metrics.iter()));

        assert_eq!(agg.totals.water_m3, 4000.0);
        assert!((agg.water_per_tonne.value().unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn empty_portfolio() {
        let agg = aggregate(std::iter::empty());
        assert_eq!(agg.farm_count, 0);
        assert_eq!(agg.emissions_per_tonne, Measure::NotApplicable);
        assert_eq!(agg.metrics.len(), MetricId::ALL.len());
    }
}
