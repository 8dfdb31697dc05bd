use serde::Serialize;
use std::cmp::Ordering;

use crate::aggregate::PortfolioAggregate;
use crate::config::EsgConfig;
use crate::metrics::DerivedMetrics;
use crate::scoring::PillarScore;
use crate::types::{Direction, Measure, MetricId, Pillar};
use crate::util::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Strength,
    Risk,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub metric: MetricId,
    pub pillar: Pillar,
    /// Raw metric value.
    pub value: f64,
    /// Normalized 0-100 score that crossed the threshold.
    pub score: f64,
    pub threshold: f64,
    pub message: String,
}

/// Evaluate the insight rule table against one farm's scores.
///
/// Strengths come first, best score first; risks follow, worst score
/// first. Equal scores keep rule-table order, so the output is stable.
pub fn generate(score: &PillarScore, config: &EsgConfig) -> Vec<Insight> {
    let mut strengths = Vec::new();
    let mut risks = Vec::new();

    for rule in &config.insight_rules {
        let Some(component) = score.components.iter().find(|c| c.metric == rule.metric) else {
            continue;
        };
        let (Some(value), Some(normalized)) = (component.raw.value(), component.normalized.value())
        else {
            continue;
        };
        let (kind, threshold, template) = if normalized >= rule.strength_at {
            (InsightKind::Strength, rule.strength_at, &rule.strength_message)
        } else if normalized <= rule.risk_at {
            (InsightKind::Risk, rule.risk_at, &rule.risk_message)
        } else {
            continue;
        };
        let insight = Insight {
            kind,
            metric: rule.metric,
            pillar: component.pillar,
            value,
            score: normalized,
            threshold,
            message: render(template, rule.metric, value, normalized),
        };
        match kind {
            InsightKind::Strength => strengths.push(insight),
            InsightKind::Risk => risks.push(insight),
        }
    }

    strengths.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    risks.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
    strengths.extend(risks);
    strengths
}

fn render(template: &str, metric: MetricId, value: f64, score: f64) -> String {
    template
        .replace("{value}", &format_value(metric, value))
        .replace("{score}", &format_number(score, 0))
}

/// Human rendering of a raw metric value with its unit.
pub fn format_value(metric: MetricId, value: f64) -> String {
    match metric {
        MetricId::FemaleShare
        | MetricId::PesticideUseRate
        | MetricId::HabitatShare
        | MetricId::SafetyTrainingRate
        | MetricId::ContractRate
        | MetricId::Certification
        | MetricId::SfiCompliance
        | MetricId::SoilTestRate
        | MetricId::IpmRate => format!("{}%", format_number(value * 100.0, 0)),
        MetricId::RegenerativeScore => format!("{}/100", format_number(value, 0)),
        MetricId::WaterProductivity => format!("{} {}", format_number(value, 3), metric.unit()),
        _ => format!("{} {}", format_number(value, 1), metric.unit()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    BetterThanPeers,
    WorseThanPeers,
    InLine,
    /// Accidents recorded, though not above the peer rate. The target is zero.
    MissesTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub metric: MetricId,
    pub farm_value: f64,
    /// Pooled upload ratio where one exists, otherwise the unweighted mean.
    pub benchmark: f64,
    pub pooled: bool,
    pub peer_count: usize,
    pub standing: Standing,
}

/// Upload-wide ratio of totals for the metrics that have one.
fn pooled_benchmark(peers: &PortfolioAggregate, metric: MetricId) -> Option<Measure> {
    match metric {
        MetricId::EmissionsPerTonne => Some(peers.emissions_per_tonne),
        MetricId::WaterPerTonne => Some(peers.water_per_tonne),
        MetricId::FemaleShare => Some(peers.female_share),
        MetricId::AccidentRate => Some(peers.accident_rate),
        _ => None,
    }
}

/// Compare one farm with the rest of the upload.
///
/// Every scored indicator applicable on both sides is compared, plus water
/// per tonne. Carbon and water intensity, female share and accident rate
/// are measured against the pooled ratio of upload totals; the rest against
/// the unweighted mean. Values within `peer_band` of the benchmark are in
/// line, except for female share (judged against `female_share_target`)
/// and accidents (any accident misses the zero target).
pub fn compare_to_peers(
    metrics: &DerivedMetrics,
    peers: &PortfolioAggregate,
    config: &EsgConfig,
) -> Vec<PeerComparison> {
    let mut compared: Vec<(MetricId, Direction)> = config
        .indicators
        .iter()
        .map(|spec| (spec.metric, spec.direction))
        .collect();
    if !compared.iter().any(|(m, _)| *m == MetricId::WaterPerTonne) {
        compared.push((MetricId::WaterPerTonne, Direction::LowerIsBetter));
    }

    compared
        .into_iter()
        .filter_map(|(metric, direction)| {
            let farm_value = metrics.get(metric).value()?;
            let (benchmark, peer_count, pooled) = match pooled_benchmark(peers, metric) {
                Some(ratio) => (ratio.value()?, peers.farm_count, true),
                None => {
                    let summary = peers.summary(metric)?;
                    (summary.mean.value()?, summary.farm_count, false)
                }
            };
            Some(PeerComparison {
                metric,
                farm_value,
                benchmark,
                pooled,
                peer_count,
                standing: standing(metric, direction, farm_value, benchmark, config),
            })
        })
        .collect()
}

fn standing(
    metric: MetricId,
    direction: Direction,
    value: f64,
    benchmark: f64,
    config: &EsgConfig,
) -> Standing {
    let upper = benchmark + benchmark.abs() * config.peer_band;
    let lower = benchmark - benchmark.abs() * config.peer_band;
    match metric {
        MetricId::FemaleShare => {
            let target = &config.female_share_target;
            if value < (benchmark - target.margin).max(target.floor) {
                Standing::WorseThanPeers
            } else if value >= benchmark {
                Standing::BetterThanPeers
            } else {
                Standing::InLine
            }
        }
        MetricId::AccidentRate => {
            if value <= 0.0 {
                Standing::BetterThanPeers
            } else if value > upper {
                Standing::WorseThanPeers
            } else {
                Standing::MissesTarget
            }
        }
        _ if value > upper => match direction {
            Direction::HigherIsBetter => Standing::BetterThanPeers,
            Direction::LowerIsBetter => Standing::WorseThanPeers,
        },
        _ if value < lower => match direction {
            Direction::HigherIsBetter => Standing::WorseThanPeers,
            Direction::LowerIsBetter => Standing::BetterThanPeers,
        },
        _ => Standing::InLine,
    }
}
