use serde::Serialize;

use crate::config::{EsgConfig, RatingBands};
use crate::metrics::DerivedMetrics;
use crate::types::{Direction, Measure, MetricId, Pillar};

/// One indicator's contribution to a pillar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorScore {
    pub metric: MetricId,
    pub pillar: Pillar,
    pub direction: Direction,
    pub raw: Measure,
    pub normalized: Measure,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    NeedsWork,
}

impl Rating {
    pub fn from_score(score: f64, bands: &RatingBands) -> Self {
        if score >= bands.excellent {
            Rating::Excellent
        } else if score >= bands.good {
            Rating::Good
        } else {
            Rating::NeedsWork
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::NeedsWork => "Needs work",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarScore {
    pub environmental: Measure,
    pub social: Measure,
    pub governance: Measure,
    pub overall: Measure,
    pub rating: Option<Rating>,
    pub components: Vec<IndicatorScore>,
}

impl PillarScore {
    pub fn pillar(&self, pillar: Pillar) -> Measure {
        match pillar {
            Pillar::Environmental => self.environmental,
            Pillar::Social => self.social,
            Pillar::Governance => self.governance,
        }
    }
}

/// Score one farm's metrics against the indicator table.
///
/// Not-applicable indicators drop out and the remaining weights of their
/// pillar are renormalized. A pillar left with nothing is not applicable
/// itself, and the overall score renormalizes over the pillars that remain.
pub fn score(metrics: &DerivedMetrics, config: &EsgConfig) -> PillarScore {
    let components: Vec<IndicatorScore> = config
        .indicators
        .iter()
        .map(|spec| {
            let raw = metrics.get(spec.metric);
            IndicatorScore {
                metric: spec.metric,
                pillar: spec.pillar,
                direction: spec.direction,
                raw,
                normalized: raw.map(|v| spec.normalize(v)),
                weight: spec.weight,
            }
        })
        .collect();

    let environmental = pillar_score(&components, Pillar::Environmental);
    let social = pillar_score(&components, Pillar::Social);
    let governance = pillar_score(&components, Pillar::Governance);

    let pillars = [
        (Pillar::Environmental, environmental),
        (Pillar::Social, social),
        (Pillar::Governance, governance),
    ];
    let overall = weighted_mean(
        pillars
            .into_iter()
            .map(|(p, m)| (m, config.pillar_weights.get(p))),
    );
    let rating = overall
        .value()
        .map(|v| Rating::from_score(v, &config.rating_bands));

    PillarScore {
        environmental,
        social,
        governance,
        overall,
        rating,
        components,
    }
}

fn pillar_score(components: &[IndicatorScore], pillar: Pillar) -> Measure {
    weighted_mean(
        components
            .iter()
            .filter(|c| c.pillar == pillar)
            .map(|c| (c.normalized, c.weight)),
    )
}

/// Mean of the applicable values, weights renormalized over them. Not
/// applicable when nothing with positive weight remains.
fn weighted_mean(items: impl Iterator<Item = (Measure, f64)>) -> Measure {
    let (sum, weight) = items
        .filter_map(|(m, w)| m.value().map(|v| (v, w)))
        .fold((0.0, 0.0), |(s, tw), (v, w)| (s + v * w, tw + w));
    Measure::ratio(sum, weight).map(|v| v.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::derive;
    use crate::metrics::tests::sample_record;
    use crate::types::ReportType;

    fn close(m: Measure, expected: f64) {
        let v = m.value().expect("score should be applicable");
        assert!((v - expected).abs() < 1e-6, "expected {expected}, got {v}");
    }

    #[test]
    fn reference_farm_scores() {
        let config = EsgConfig::default();
        let m = derive(&sample_record(), ReportType::MultiFarm, &config);
        let s = score(&m, &config);

        // Every available environmental indicator is at its best bound.
        close(s.environmental, 100.0);
        // Female share 0.40 → 75, accident rate 5.0 → 50, weights 0.3 / 0.4.
        close(s.social, (0.3 * 75.0 + 0.4 * 50.0) / 0.7);
        // No governance data was uploaded.
        assert_eq!(s.governance, Measure::NotApplicable);
        // Pillar weights 0.5 / 0.3 renormalized without governance.
        close(s.overall, (0.5 * 100.0 + 0.3 * (42.5 / 0.7)) / 0.8);
        assert_eq!(s.rating, Some(Rating::Excellent));
        assert_eq!(s.components.len(), config.indicators.len());
    }

    #[test]
    fn scores_stay_in_bounds() {
        let config = EsgConfig::default();
        let mut r = sample_record();
        r.fertilizer_n_kg = 1_000_000.0;
        r.accidents_count = 20;
        r.workers_female = 0;
        r.certification_scheme = Some("none".to_string());
        let s = score(&derive(&r, ReportType::MultiFarm, &config), &config);
        for pillar in [Pillar::Environmental, Pillar::Social, Pillar::Governance] {
            let v = s.pillar(pillar).value().expect("applicable");
            assert!((0.0..=100.0).contains(&v), "{pillar} = {v}");
        }
        close(s.social, 0.0);
        close(s.governance, 0.0);
        assert_eq!(s.rating, Some(Rating::NeedsWork));
    }

    #[test]
    fn pillar_without_indicators_is_not_applicable() {
        let config = EsgConfig::default();
        let mut r = sample_record();
        r.workers_total = 0;
        r.workers_female = 0;
        r.accidents_count = 0;
        let s = score(&derive(&r, ReportType::MultiFarm, &config), &config);
        assert_eq!(s.social, Measure::NotApplicable);
        close(s.overall, 100.0);
    }

    #[test]
    fn everything_not_applicable_has_no_rating() {
        let config = EsgConfig::default();
        let mut r = sample_record();
        r.area_ha = 0.0;
        r.yield_tonnes = 0.0;
        r.water_m3 = 0.0;
        r.workers_total = 0;
        r.workers_female = 0;
        r.accidents_count = 0;
        let s = score(&derive(&r, ReportType::MultiFarm, &config), &config);
        assert_eq!(s.environmental, Measure::NotApplicable);
        assert_eq!(s.overall, Measure::NotApplicable);
        assert_eq!(s.rating, None);
    }

    #[test]
    fn rating_bands() {
        let bands = RatingBands::default();
        assert_eq!(Rating::from_score(70.0, &bands), Rating::Excellent);
        assert_eq!(Rating::from_score(69.9, &bands), Rating::Good);
        assert_eq!(Rating::from_score(50.0, &bands), Rating::Good);
        assert_eq!(Rating::from_score(10.0, &bands), Rating::NeedsWork);
    }
}
