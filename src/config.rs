//! The single configuration table shared by both report types.
//!
//! Emission factors, benchmark bounds, weights and insight rules live here
//! and nowhere else. Every stage takes `&EsgConfig` explicitly, so a farm
//! scores identically in the portfolio and in the deep-dive report.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{EsgError, EsgResult};
use crate::types::{Direction, MetricId, Pillar};

/// The built-in configuration, validated on first use by [`crate::analyze`].
pub static DEFAULT_CONFIG: Lazy<EsgConfig> = Lazy::new(EsgConfig::default);

/// kg CO2e per unit of input. Placeholder values from UK agriculture
/// reporting; tune with ESG experts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmissionFactors {
    pub nitrogen_kg_co2e_per_kg: f64,
    pub diesel_kg_co2e_per_litre: f64,
    pub electricity_kg_co2e_per_kwh: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        EmissionFactors {
            nitrogen_kg_co2e_per_kg: 5.5,
            diesel_kg_co2e_per_litre: 2.7,
            electricity_kg_co2e_per_kwh: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PillarWeights {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
}

impl Default for PillarWeights {
    fn default() -> Self {
        PillarWeights {
            environmental: 0.5,
            social: 0.3,
            governance: 0.2,
        }
    }
}

impl PillarWeights {
    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::Environmental => self.environmental,
            Pillar::Social => self.social,
            Pillar::Governance => self.governance,
        }
    }
}

/// One row of the indicator table: which metric feeds which pillar, how it
/// is normalized, and its weight inside the pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorSpec {
    pub metric: MetricId,
    pub pillar: Pillar,
    pub direction: Direction,
    pub lower: f64,
    pub upper: f64,
    pub weight: f64,
}

impl IndicatorSpec {
    fn new(
        metric: MetricId,
        pillar: Pillar,
        direction: Direction,
        lower: f64,
        upper: f64,
        weight: f64,
    ) -> Self {
        IndicatorSpec {
            metric,
            pillar,
            direction,
            lower,
            upper,
            weight,
        }
    }

    /// Map a raw value onto 0..=100 against the benchmark bounds.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.upper - self.lower;
        let fraction = ((value - self.lower) / span).clamp(0.0, 1.0);
        let score = match self.direction {
            Direction::LowerIsBetter => (1.0 - fraction) * 100.0,
            Direction::HigherIsBetter => fraction * 100.0,
        };
        score.clamp(0.0, 100.0)
    }
}

/// Threshold rule for one metric. Messages may use `{value}` (the raw metric
/// with its unit) and `{score}` (the normalized 0-100 value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsightRule {
    pub metric: MetricId,
    pub strength_at: f64,
    pub risk_at: f64,
    pub strength_message: String,
    pub risk_message: String,
}

/// Points per practice for the deep-dive regenerative score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegenerativeConfig {
    pub crop_rotation_points: f64,
    pub cover_crop_points: f64,
    pub organic_manure_points: f64,
    pub reduced_tillage_points: f64,
    pub irrigation_points: f64,
    pub soil_organic_matter_points: f64,
    pub soil_ph_points: f64,
    pub soil_organic_matter_target_pct: f64,
    pub soil_ph_min: f64,
    pub soil_ph_max: f64,
}

impl Default for RegenerativeConfig {
    fn default() -> Self {
        RegenerativeConfig {
            crop_rotation_points: 20.0,
            cover_crop_points: 20.0,
            organic_manure_points: 15.0,
            reduced_tillage_points: 15.0,
            irrigation_points: 10.0,
            soil_organic_matter_points: 10.0,
            soil_ph_points: 10.0,
            soil_organic_matter_target_pct: 3.5,
            soil_ph_min: 6.0,
            soil_ph_max: 7.5,
        }
    }
}

impl RegenerativeConfig {
    pub fn max_points(&self) -> f64 {
        self.crop_rotation_points
            + self.cover_crop_points
            + self.organic_manure_points
            + self.reduced_tillage_points
            + self.irrigation_points
            + self.soil_organic_matter_points
            + self.soil_ph_points
    }
}

/// Overall score bands shown next to the ESG score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatingBands {
    pub excellent: f64,
    pub good: f64,
}

impl Default for RatingBands {
    fn default() -> Self {
        RatingBands {
            excellent: 70.0,
            good: 50.0,
        }
    }
}

/// Female workforce share against peers: behind when below the pooled
/// share minus `margin`, never judged against less than `floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FemaleShareTarget {
    pub margin: f64,
    pub floor: f64,
}

impl Default for FemaleShareTarget {
    fn default() -> Self {
        FemaleShareTarget {
            margin: 0.05,
            floor: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationBounds {
    /// Earliest accepted reporting year; the latest is next calendar year.
    pub min_year: i32,
}

impl Default for ValidationBounds {
    fn default() -> Self {
        ValidationBounds { min_year: 1900 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EsgConfig {
    pub emission_factors: EmissionFactors,
    pub pillar_weights: PillarWeights,
    pub indicators: Vec<IndicatorSpec>,
    pub insight_rules: Vec<InsightRule>,
    pub regenerative: RegenerativeConfig,
    pub rating_bands: RatingBands,
    /// Relative tolerance around the dataset mean for peer comparison.
    pub peer_band: f64,
    pub female_share_target: FemaleShareTarget,
    pub validation: ValidationBounds,
}

impl Default for EsgConfig {
    fn default() -> Self {
        EsgConfig {
            emission_factors: EmissionFactors::default(),
            pillar_weights: PillarWeights::default(),
            indicators: default_indicators(),
            insight_rules: default_insight_rules(),
            regenerative: RegenerativeConfig::default(),
            rating_bands: RatingBands::default(),
            peer_band: 0.10,
            female_share_target: FemaleShareTarget::default(),
            validation: ValidationBounds::default(),
        }
    }
}

impl EsgConfig {
    /// Parse a JSON override. Sections left out keep their defaults.
    pub fn from_json_str(s: &str) -> EsgResult<Self> {
        let config: EsgConfig = serde_json::from_str(s)
            .map_err(|e| EsgError::Configuration(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> EsgResult<Self> {
        let s = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&s)
    }

    /// Reject tables that would make scores meaningless. Runs before any
    /// record is touched.
    pub fn validate(&self) -> EsgResult<()> {
        let ef = &self.emission_factors;
        for (name, v) in [
            ("emission_factors.nitrogen_kg_co2e_per_kg", ef.nitrogen_kg_co2e_per_kg),
            ("emission_factors.diesel_kg_co2e_per_litre", ef.diesel_kg_co2e_per_litre),
            ("emission_factors.electricity_kg_co2e_per_kwh", ef.electricity_kg_co2e_per_kwh),
            ("pillar_weights.environmental", self.pillar_weights.environmental),
            ("pillar_weights.social", self.pillar_weights.social),
            ("pillar_weights.governance", self.pillar_weights.governance),
        ] {
            non_negative(name, v)?;
        }
        let pw = &self.pillar_weights;
        if pw.environmental + pw.social + pw.governance <= 0.0 {
            return Err(config_err("pillar weights must not all be zero"));
        }

        if self.indicators.is_empty() {
            return Err(config_err("indicator table is empty"));
        }
        let mut seen = HashSet::new();
        for ind in &self.indicators {
            if !seen.insert(ind.metric) {
                return Err(config_err(format!("indicator {:?} is listed twice", ind.metric)));
            }
            non_negative(&format!("weight of {:?}", ind.metric), ind.weight)?;
            if !ind.lower.is_finite() || !ind.upper.is_finite() || ind.lower >= ind.upper {
                return Err(config_err(format!(
                    "benchmark for {:?} needs finite lower < upper (got {} and {})",
                    ind.metric, ind.lower, ind.upper
                )));
            }
        }

        let mut ruled = HashSet::new();
        for rule in &self.insight_rules {
            if !ruled.insert(rule.metric) {
                return Err(config_err(format!("insight rule for {:?} is listed twice", rule.metric)));
            }
            if !seen.contains(&rule.metric) {
                return Err(config_err(format!(
                    "insight rule for {:?} has no matching indicator",
                    rule.metric
                )));
            }
            let ordered = 0.0 <= rule.risk_at
                && rule.risk_at < rule.strength_at
                && rule.strength_at <= 100.0;
            if !ordered {
                return Err(config_err(format!(
                    "insight thresholds for {:?} need 0 <= risk_at < strength_at <= 100",
                    rule.metric
                )));
            }
        }

        let regen = &self.regenerative;
        for (name, v) in [
            ("regenerative.crop_rotation_points", regen.crop_rotation_points),
            ("regenerative.cover_crop_points", regen.cover_crop_points),
            ("regenerative.organic_manure_points", regen.organic_manure_points),
            ("regenerative.reduced_tillage_points", regen.reduced_tillage_points),
            ("regenerative.irrigation_points", regen.irrigation_points),
            ("regenerative.soil_organic_matter_points", regen.soil_organic_matter_points),
            ("regenerative.soil_ph_points", regen.soil_ph_points),
        ] {
            non_negative(name, v)?;
        }
        if regen.max_points() <= 0.0 {
            return Err(config_err("regenerative points must not all be zero"));
        }
        if !(regen.soil_organic_matter_target_pct > 0.0) {
            return Err(config_err("regenerative.soil_organic_matter_target_pct must be positive"));
        }
        if !(0.0 <= regen.soil_ph_min && regen.soil_ph_min < regen.soil_ph_max && regen.soil_ph_max <= 14.0) {
            return Err(config_err("soil pH band needs 0 <= soil_ph_min < soil_ph_max <= 14"));
        }

        let bands = &self.rating_bands;
        if !(0.0 <= bands.good && bands.good < bands.excellent && bands.excellent <= 100.0) {
            return Err(config_err("rating bands need 0 <= good < excellent <= 100"));
        }
        if !(0.0..1.0).contains(&self.peer_band) {
            return Err(config_err("peer_band must be in [0, 1)"));
        }
        let female = &self.female_share_target;
        if !((0.0..=1.0).contains(&female.margin) && (0.0..=1.0).contains(&female.floor)) {
            return Err(config_err("female_share_target margin and floor must be in [0, 1]"));
        }
        if !(1000..=9999).contains(&self.validation.min_year) {
            return Err(config_err("validation.min_year must be a 4-digit year"));
        }
        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> EsgError {
    EsgError::Configuration(msg.into())
}

fn non_negative(name: &str, v: f64) -> EsgResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(config_err(format!("{name} must be a finite, non-negative number (got {v})")))
    }
}

fn default_indicators() -> Vec<IndicatorSpec> {
    use Direction::*;
    use MetricId::*;
    use Pillar::*;
    vec![
        IndicatorSpec::new(EmissionsPerTonne, Environmental, LowerIsBetter, 50.0, 500.0, 0.25),
        IndicatorSpec::new(EmissionsPerHa, Environmental, LowerIsBetter, 250.0, 2500.0, 0.20),
        IndicatorSpec::new(NitrogenIntensity, Environmental, LowerIsBetter, 50.0, 250.0, 0.15),
        IndicatorSpec::new(WaterProductivity, Environmental, HigherIsBetter, 0.005, 0.05, 0.15),
        IndicatorSpec::new(DieselIntensity, Environmental, LowerIsBetter, 30.0, 150.0, 0.10),
        IndicatorSpec::new(PesticideIntensity, Environmental, LowerIsBetter, 0.5, 5.0, 0.05),
        IndicatorSpec::new(PesticideUseRate, Environmental, LowerIsBetter, 0.0, 1.0, 0.05),
        IndicatorSpec::new(HedgerowDensity, Environmental, HigherIsBetter, 0.0, 50.0, 0.05),
        IndicatorSpec::new(HabitatShare, Environmental, HigherIsBetter, 0.0, 0.1, 0.05),
        IndicatorSpec::new(TreesPerHa, Environmental, HigherIsBetter, 0.0, 10.0, 0.05),
        IndicatorSpec::new(RegenerativeScore, Environmental, HigherIsBetter, 20.0, 80.0, 0.10),
        IndicatorSpec::new(FemaleShare, Social, HigherIsBetter, 0.1, 0.5, 0.30),
        IndicatorSpec::new(AccidentRate, Social, LowerIsBetter, 0.0, 10.0, 0.40),
        IndicatorSpec::new(TrainingHoursPerWorker, Social, HigherIsBetter, 0.0, 24.0, 0.10),
        IndicatorSpec::new(LabourIntensity, Social, HigherIsBetter, 5.0, 50.0, 0.10),
        IndicatorSpec::new(SafetyTrainingRate, Social, HigherIsBetter, 0.0, 1.0, 0.10),
        IndicatorSpec::new(ContractRate, Social, HigherIsBetter, 0.0, 1.0, 0.10),
        IndicatorSpec::new(Certification, Governance, HigherIsBetter, 0.0, 1.0, 0.40),
        IndicatorSpec::new(SfiCompliance, Governance, HigherIsBetter, 0.0, 1.0, 0.30),
        IndicatorSpec::new(SoilTestRate, Governance, HigherIsBetter, 0.0, 1.0, 0.15),
        IndicatorSpec::new(IpmRate, Governance, HigherIsBetter, 0.0, 1.0, 0.15),
    ]
}

fn rule(metric: MetricId, strength: &str, risk: &str) -> InsightRule {
    InsightRule {
        metric,
        strength_at: 75.0,
        risk_at: 25.0,
        strength_message: strength.to_string(),
        risk_message: risk.to_string(),
    }
}

fn default_insight_rules() -> Vec<InsightRule> {
    use MetricId::*;
    vec![
        rule(
            EmissionsPerTonne,
            "Carbon intensity is low at {value}.",
            "Carbon intensity is high at {value}. Review nitrogen rates, field operations and electricity sources.",
        ),
        rule(
            EmissionsPerHa,
            "Emissions per hectare are low at {value}.",
            "Emissions per hectare are high at {value}.",
        ),
        rule(
            NitrogenIntensity,
            "Nitrogen use is efficient at {value}.",
            "Nitrogen use is heavy at {value}. A nutrient management plan could cut cost and emissions.",
        ),
        rule(
            WaterProductivity,
            "Water productivity is strong at {value}.",
            "Water productivity is low at {value}. Consider more efficient irrigation or scheduling.",
        ),
        rule(
            DieselIntensity,
            "Diesel use is lean at {value}.",
            "Diesel use is high at {value}. Combine field passes where possible.",
        ),
        rule(
            PesticideIntensity,
            "Pesticide use is low at {value}.",
            "Pesticide use is high at {value}. Integrated pest management can reduce applications.",
        ),
        rule(
            PesticideUseRate,
            "Few fields were sprayed ({value}).",
            "Most fields were sprayed ({value}). Integrated pest management can cut applications.",
        ),
        rule(
            HedgerowDensity,
            "Hedgerow cover is good at {value}.",
            "Hedgerow cover is sparse at {value}.",
        ),
        rule(
            HabitatShare,
            "Wildflower and buffer strips cover {value} of the farmed area.",
            "Little land is set aside for wildflowers or buffer strips ({value}).",
        ),
        rule(
            TreesPerHa,
            "Tree planting is strong at {value}.",
            "Few trees were planted ({value}).",
        ),
        rule(
            RegenerativeScore,
            "Regenerative practices are well established ({value}).",
            "Few regenerative practices are in place ({value}). Start with cover crops or rotation.",
        ),
        rule(
            FemaleShare,
            "Female workforce share is strong at {value}.",
            "Female workforce share is low at {value}. Explore ways to attract and retain more women.",
        ),
        rule(
            AccidentRate,
            "Safety record is strong at {value}.",
            "Accident rate is high at {value}. Review safety training and risk controls.",
        ),
        rule(
            TrainingHoursPerWorker,
            "Workers receive good training time ({value}).",
            "Training time is low at {value}.",
        ),
        rule(
            LabourIntensity,
            "The farm supports local employment well ({value}).",
            "Employment per hectare is low at {value}.",
        ),
        rule(
            SafetyTrainingRate,
            "Health & safety training is in place ({value}).",
            "Health & safety training is missing ({value}).",
        ),
        rule(
            ContractRate,
            "Worker contracts are formalised ({value}).",
            "Worker contracts are not formalised ({value}).",
        ),
        rule(
            Certification,
            "The farm holds a certification scheme.",
            "No certification recorded. Schemes such as Red Tractor, LEAF or Soil Association strengthen market access.",
        ),
        rule(
            SfiCompliance,
            "SFI standards are met ({value}).",
            "SFI standards are not met ({value}).",
        ),
        rule(
            SoilTestRate,
            "Soil testing is up to date ({value}).",
            "No recent soil testing ({value}).",
        ),
        rule(
            IpmRate,
            "Integrated pest management is practised ({value}).",
            "Integrated pest management is not practised ({value}).",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EsgConfig::default().validate().expect("defaults must validate");
        DEFAULT_CONFIG.validate().expect("shared defaults must validate");
    }

    #[test]
    fn normalize_lower_is_better() {
        let spec = IndicatorSpec::new(
            MetricId::AccidentRate,
            Pillar::Social,
            Direction::LowerIsBetter,
            0.0,
            10.0,
            1.0,
        );
        assert_eq!(spec.normalize(-1.0), 100.0);
        assert_eq!(spec.normalize(0.0), 100.0);
        assert_eq!(spec.normalize(5.0), 50.0);
        assert_eq!(spec.normalize(10.0), 0.0);
        assert_eq!(spec.normalize(40.0), 0.0);
    }

    #[test]
    fn normalize_higher_is_better() {
        let spec = IndicatorSpec::new(
            MetricId::FemaleShare,
            Pillar::Social,
            Direction::HigherIsBetter,
            0.1,
            0.5,
            1.0,
        );
        assert_eq!(spec.normalize(0.05), 0.0);
        assert!((spec.normalize(0.4) - 75.0).abs() < 1e-9);
        assert_eq!(spec.normalize(0.9), 100.0);
    }

    #[test]
    fn rejects_inverted_benchmark() {
        let mut config = EsgConfig::default();
        config.indicators[0].lower = 600.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("EmissionsPerTonne"), "{err}");
    }

    #[test]
    fn rejects_negative_weight_and_zero_pillars() {
        let mut config = EsgConfig::default();
        config.indicators[2].weight = -0.1;
        assert!(config.validate().is_err());

        let mut config = EsgConfig::default();
        config.pillar_weights = PillarWeights {
            environmental: 0.0,
            social: 0.0,
            governance: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_indicator_and_crossed_thresholds() {
        let mut config = EsgConfig::default();
        let dup = config.indicators[0].clone();
        config.indicators.push(dup);
        assert!(config.validate().is_err());

        let mut config = EsgConfig::default();
        config.insight_rules[0].risk_at = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_rule_without_indicator() {
        let mut config = EsgConfig::default();
        config.indicators.retain(|i| i.metric != MetricId::IpmRate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EsgConfig::from_json_str(
            r#"{"emission_factors": {"electricity_kg_co2e_per_kwh": 0.2}, "peer_band": 0.05}"#,
        )
        .expect("valid override");
        assert_eq!(config.emission_factors.electricity_kg_co2e_per_kwh, 0.2);
        assert_eq!(config.emission_factors.nitrogen_kg_co2e_per_kg, 5.5);
        assert_eq!(config.peer_band, 0.05);
        assert_eq!(config.indicators, default_indicators());
    }

    #[test]
    fn female_share_target_is_bounded() {
        let config = EsgConfig::from_json_str(r#"{"female_share_target": {"floor": 0.25}}"#)
            .expect("valid override");
        assert_eq!(config.female_share_target.floor, 0.25);
        assert_eq!(config.female_share_target.margin, 0.05);

        let err = EsgConfig::from_json_str(r#"{"female_share_target": {"floor": 1.5}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("female_share_target"), "{err}");
    }

    #[test]
    fn every_indicator_has_a_rule() {
        let config = EsgConfig::default();
        for ind in &config.indicators {
            assert!(
                config.insight_rules.iter().any(|r| r.metric == ind.metric),
                "{:?} has no insight rule",
                ind.metric
            );
        }
    }

    #[test]
    fn unknown_keys_are_configuration_errors() {
        let err = EsgConfig::from_json_str(r#"{"emision_factors": {}}"#).unwrap_err();
        assert!(matches!(err, EsgError::Configuration(_)));
    }
}
