use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    /// Portfolio dashboard: one row per farm-year, rolled up across farms.
    MultiFarm,
    /// Deep-dive report: field/month rows rolled up to farm-year.
    SingleFarm,
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::MultiFarm => f.write_str("multi-farm"),
            ReportType::SingleFarm => f.write_str("single-farm"),
        }
    }
}

/// A derived value that may be undefined for a given record.
///
/// `NotApplicable` marks a missing or zero denominator (or an absent optional
/// input). It is never a zero and serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Value(f64),
    #[default]
    NotApplicable,
}

impl Measure {
    /// Wraps a finite number; NaN and infinities become `NotApplicable`.
    pub fn new(v: f64) -> Self {
        if v.is_finite() {
            Measure::Value(v)
        } else {
            Measure::NotApplicable
        }
    }

    /// `numerator / denominator`, not applicable unless the denominator is
    /// strictly positive.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator > 0.0 {
            Measure::new(numerator / denominator)
        } else {
            Measure::NotApplicable
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Measure::Value(v) => Some(v),
            Measure::NotApplicable => None,
        }
    }

    pub fn is_applicable(self) -> bool {
        matches!(self, Measure::Value(_))
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Measure::Value(v) => Measure::new(f(v)),
            Measure::NotApplicable => Measure::NotApplicable,
        }
    }

    /// Fixed-decimal rendering for tables; `N/A` when not applicable.
    pub fn format(self, decimals: usize) -> String {
        match self {
            Measure::Value(v) => format_number(v, decimals),
            Measure::NotApplicable => "N/A".to_string(),
        }
    }
}

impl From<Option<f64>> for Measure {
    fn from(v: Option<f64>) -> Self {
        v.map(Measure::new).unwrap_or(Measure::NotApplicable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Environmental,
    Social,
    Governance,
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pillar::Environmental => f.write_str("Environmental"),
            Pillar::Social => f.write_str("Social"),
            Pillar::Governance => f.write_str("Governance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Every ratio or rate carried by `DerivedMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    EmissionsPerTonne,
    EmissionsPerHa,
    YieldPerHa,
    WaterProductivity,
    WaterPerTonne,
    NitrogenIntensity,
    PhosphateIntensity,
    PotashIntensity,
    DieselIntensity,
    ElectricityIntensity,
    PesticideIntensity,
    PesticideUseRate,
    HedgerowDensity,
    HabitatShare,
    TreesPerHa,
    RegenerativeScore,
    FemaleShare,
    AccidentRate,
    TrainingHoursPerWorker,
    LabourIntensity,
    SafetyTrainingRate,
    ContractRate,
    Certification,
    SfiCompliance,
    SoilTestRate,
    IpmRate,
}

impl MetricId {
    pub const ALL: [MetricId; 26] = [
        MetricId::EmissionsPerTonne,
        MetricId::EmissionsPerHa,
        MetricId::YieldPerHa,
        MetricId::WaterProductivity,
        MetricId::WaterPerTonne,
        MetricId::NitrogenIntensity,
        MetricId::PhosphateIntensity,
        MetricId::PotashIntensity,
        MetricId::DieselIntensity,
        MetricId::ElectricityIntensity,
        MetricId::PesticideIntensity,
        MetricId::PesticideUseRate,
        MetricId::HedgerowDensity,
        MetricId::HabitatShare,
        MetricId::TreesPerHa,
        MetricId::RegenerativeScore,
        MetricId::FemaleShare,
        MetricId::AccidentRate,
        MetricId::TrainingHoursPerWorker,
        MetricId::LabourIntensity,
        MetricId::SafetyTrainingRate,
        MetricId::ContractRate,
        MetricId::Certification,
        MetricId::SfiCompliance,
        MetricId::SoilTestRate,
        MetricId::IpmRate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricId::EmissionsPerTonne => "Emissions per tonne",
            MetricId::EmissionsPerHa => "Emissions per hectare",
            MetricId::YieldPerHa => "Yield per hectare",
            MetricId::WaterProductivity => "Water productivity",
            MetricId::WaterPerTonne => "Water per tonne",
            MetricId::NitrogenIntensity => "Nitrogen use",
            MetricId::PhosphateIntensity => "Phosphate use",
            MetricId::PotashIntensity => "Potash use",
            MetricId::DieselIntensity => "Diesel use",
            MetricId::ElectricityIntensity => "Electricity use",
            MetricId::PesticideIntensity => "Pesticide use",
            MetricId::PesticideUseRate => "Fields sprayed",
            MetricId::HedgerowDensity => "Hedgerow density",
            MetricId::HabitatShare => "Wildflower and buffer strips",
            MetricId::TreesPerHa => "Trees planted",
            MetricId::RegenerativeScore => "Regenerative practices",
            MetricId::FemaleShare => "Female workforce share",
            MetricId::AccidentRate => "Accident rate",
            MetricId::TrainingHoursPerWorker => "Training hours per worker",
            MetricId::LabourIntensity => "Employment intensity",
            MetricId::SafetyTrainingRate => "Health & safety training",
            MetricId::ContractRate => "Formal worker contracts",
            MetricId::Certification => "Certification",
            MetricId::SfiCompliance => "SFI compliance",
            MetricId::SoilTestRate => "Soil testing",
            MetricId::IpmRate => "Integrated pest management",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricId::EmissionsPerTonne => "kg CO2e/t",
            MetricId::EmissionsPerHa => "kg CO2e/ha",
            MetricId::YieldPerHa => "t/ha",
            MetricId::WaterProductivity => "t/m3",
            MetricId::WaterPerTonne => "m3/t",
            MetricId::NitrogenIntensity => "kg N/ha",
            MetricId::PhosphateIntensity => "kg P2O5/ha",
            MetricId::PotashIntensity => "kg K2O/ha",
            MetricId::DieselIntensity => "l/ha",
            MetricId::ElectricityIntensity => "kWh/ha",
            MetricId::PesticideIntensity => "l/ha",
            MetricId::HedgerowDensity => "m/ha",
            MetricId::HabitatShare => "share of area",
            MetricId::TreesPerHa => "trees/ha",
            MetricId::RegenerativeScore => "points",
            MetricId::FemaleShare => "share",
            MetricId::AccidentRate => "per 100 workers",
            MetricId::TrainingHoursPerWorker => "h/worker",
            MetricId::LabourIntensity => "h/ha",
            MetricId::PesticideUseRate
            | MetricId::SafetyTrainingRate
            | MetricId::ContractRate
            | MetricId::Certification
            | MetricId::SfiCompliance
            | MetricId::SoilTestRate
            | MetricId::IpmRate => "rate",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationMethod {
    Drip,
    Sprinkler,
    Surface,
    Rainfed,
    Other,
}

impl IrrigationMethod {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            return None;
        }
        Some(match s.as_str() {
            "drip" | "trickle" | "micro" => IrrigationMethod::Drip,
            "sprinkler" | "pivot" | "centre pivot" | "center pivot" => IrrigationMethod::Sprinkler,
            "surface" | "flood" | "furrow" => IrrigationMethod::Surface,
            "rainfed" | "none" => IrrigationMethod::Rainfed,
            _ => IrrigationMethod::Other,
        })
    }
}

/// One CSV row as read, every column still text.
///
/// Columns the report type does not know about are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRow {
    pub organisation_name: Option<String>,
    pub farm_name: Option<String>,
    pub farmer_name: Option<String>,
    pub farm_id: Option<String>,
    pub field_id: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    pub crop: Option<String>,
    pub crop_type: Option<String>,
    pub area_ha: Option<String>,
    pub yield_tonnes: Option<String>,
    pub fertilizer_n_kg: Option<String>,
    pub diesel_litres: Option<String>,
    pub electricity_kwh: Option<String>,
    pub water_m3: Option<String>,
    pub phosphate_kg: Option<String>,
    pub potash_kg: Option<String>,
    pub pesticide_litres: Option<String>,
    pub irrigation_water_m3: Option<String>,
    pub irrigation_method: Option<String>,
    pub workers_total: Option<String>,
    pub workers_female: Option<String>,
    pub accidents_count: Option<String>,
    pub training_hours: Option<String>,
    pub certification_scheme: Option<String>,
    pub crop_rotation_yes_no: Option<String>,
    pub cover_crop_planted_yes_no: Option<String>,
    pub organic_manure_yes_no: Option<String>,
    pub reduced_tillage_yes_no: Option<String>,
    pub integrated_pest_management_yes_no: Option<String>,
    pub soil_organic_matter_pct: Option<String>,
    pub soil_ph: Option<String>,
    pub hedgerow_length_m: Option<String>,
    pub wildflower_area_ha: Option<String>,
    pub buffer_strip_area_ha: Option<String>,
    pub trees_planted_count: Option<String>,
    pub pesticide_applied_yes_no: Option<String>,
    pub labour_hours: Option<String>,
    pub sfi_soil_standard_yes_no: Option<String>,
    pub sfi_nutrient_management_yes_no: Option<String>,
    pub sfi_hedgerows_yes_no: Option<String>,
    pub worker_contracts_formalised_yes_no: Option<String>,
    pub labour_hs_training_done_yes_no: Option<String>,
    pub soil_test_conducted_yes_no: Option<String>,
}

/// One validated farm in one year.
///
/// Adoption rates are in `[0, 1]`: a single yes/no row gives 0 or 1, a
/// rolled-up farm-year gives the share of its rows answering yes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmRecord {
    pub row: usize,
    pub farm_id: String,
    pub farm_name: String,
    pub farmer_name: Option<String>,
    pub field_id: Option<String>,
    pub country: Option<String>,
    pub year: i32,
    pub crop: String,

    pub area_ha: f64,
    pub yield_tonnes: f64,

    pub fertilizer_n_kg: f64,
    pub diesel_litres: f64,
    pub electricity_kwh: f64,
    pub water_m3: f64,
    pub phosphate_kg: Option<f64>,
    pub potash_kg: Option<f64>,
    pub pesticide_litres: Option<f64>,
    pub irrigation_water_m3: Option<f64>,

    pub workers_total: u32,
    pub workers_female: u32,
    pub accidents_count: u32,
    pub training_hours: Option<f64>,
    pub labour_hours: Option<f64>,

    /// `None` when the column is absent, `Some("")` when present but blank.
    pub certification_scheme: Option<String>,
    pub sfi_soil_rate: Option<f64>,
    pub sfi_nutrient_rate: Option<f64>,
    pub sfi_hedgerow_rate: Option<f64>,
    pub contract_rate: Option<f64>,
    pub safety_training_rate: Option<f64>,
    pub soil_test_rate: Option<f64>,
    pub ipm_rate: Option<f64>,

    pub crop_rotation_rate: Option<f64>,
    pub cover_crop_rate: Option<f64>,
    pub organic_manure_rate: Option<f64>,
    pub reduced_tillage_rate: Option<f64>,
    pub irrigation_method: Option<IrrigationMethod>,
    pub soil_organic_matter_pct: Option<f64>,
    pub soil_ph: Option<f64>,
    pub hedgerow_length_m: Option<f64>,
    pub wildflower_area_ha: Option<f64>,
    pub buffer_strip_area_ha: Option<f64>,
    pub trees_planted_count: Option<u32>,
    pub pesticide_use_rate: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct FarmScoreRow {
    #[serde(rename = "FarmId")]
    #[tabled(rename = "FarmId")]
    pub farm_id: String,
    #[serde(rename = "FarmName")]
    #[tabled(rename = "FarmName")]
    pub farm_name: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "TotalCO2e")]
    #[tabled(rename = "TotalCO2e")]
    pub total_co2e: String,
    #[serde(rename = "EmissionsPerTonne")]
    #[tabled(rename = "EmissionsPerTonne")]
    pub emissions_per_tonne: String,
    #[serde(rename = "Environmental")]
    #[tabled(rename = "Environmental")]
    pub environmental: String,
    #[serde(rename = "Social")]
    #[tabled(rename = "Social")]
    pub social: String,
    #[serde(rename = "Governance")]
    #[tabled(rename = "Governance")]
    pub governance: String,
    #[serde(rename = "ESGScore")]
    #[tabled(rename = "ESGScore")]
    pub overall: String,
    #[serde(rename = "Rating")]
    #[tabled(rename = "Rating")]
    pub rating: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PortfolioMetricRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Unit")]
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Farms")]
    #[tabled(rename = "Farms")]
    pub farm_count: usize,
    #[serde(rename = "Mean")]
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median")]
    pub median: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct InsightRow {
    #[serde(rename = "FarmId")]
    #[tabled(rename = "FarmId")]
    pub farm_id: String,
    #[serde(rename = "Kind")]
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Insight")]
    #[tabled(rename = "Insight")]
    pub message: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "FarmId")]
    #[tabled(rename = "FarmId")]
    pub farm_id: String,
    #[serde(rename = "FarmName")]
    #[tabled(rename = "FarmName")]
    pub farm_name: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Environmental")]
    #[tabled(rename = "Environmental")]
    pub environmental: String,
    #[serde(rename = "Social")]
    #[tabled(rename = "Social")]
    pub social: String,
    #[serde(rename = "Governance")]
    #[tabled(rename = "Governance")]
    pub governance: String,
    #[serde(rename = "ESGScore")]
    #[tabled(rename = "ESGScore")]
    pub overall: String,
    #[serde(rename = "ChangeSinceFirstYear")]
    #[tabled(rename = "ChangeSinceFirstYear")]
    pub change: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_ratio_guards_denominator() {
        assert_eq!(Measure::ratio(10.0, 4.0), Measure::Value(2.5));
        assert_eq!(Measure::ratio(10.0, 0.0), Measure::NotApplicable);
        assert_eq!(Measure::ratio(0.0, 0.0), Measure::NotApplicable);
        assert_eq!(Measure::ratio(0.0, 5.0), Measure::Value(0.0));
    }

    #[test]
    fn measure_never_holds_non_finite_values() {
        assert_eq!(Measure::new(f64::NAN), Measure::NotApplicable);
        assert_eq!(Measure::new(f64::INFINITY), Measure::NotApplicable);
        assert_eq!(Measure::Value(1.0).map(|v| v / 0.0), Measure::NotApplicable);
    }

    #[test]
    fn not_applicable_serializes_as_null() {
        let json = serde_json::to_string(&vec![Measure::Value(0.0), Measure::NotApplicable])
            .expect("serialize");
        assert_eq!(json, "[0.0,null]");
    }

    #[test]
    fn measure_format_marks_not_applicable() {
        assert_eq!(Measure::Value(1234.5).format(1), "1,234.5");
        assert_eq!(Measure::NotApplicable.format(2), "N/A");
    }

    #[test]
    fn irrigation_method_parsing() {
        assert_eq!(IrrigationMethod::parse(" Drip "), Some(IrrigationMethod::Drip));
        assert_eq!(IrrigationMethod::parse("flood"), Some(IrrigationMethod::Surface));
        assert_eq!(IrrigationMethod::parse("none"), Some(IrrigationMethod::Rainfed));
        assert_eq!(IrrigationMethod::parse("bucket"), Some(IrrigationMethod::Other));
        assert_eq!(IrrigationMethod::parse(""), None);
    }
}
