use serde::Serialize;

use crate::config::{EsgConfig, RegenerativeConfig};
use crate::types::{FarmRecord, IrrigationMethod, Measure, MetricId, ReportType};

/// Emissions by source, kg CO2e. Always defined: raw totals do not depend on
/// any denominator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmissionBreakdown {
    pub fertilizer: f64,
    pub diesel: f64,
    pub electricity: f64,
}

impl EmissionBreakdown {
    pub fn total(&self) -> f64 {
        self.fertilizer + self.diesel + self.electricity
    }
}

/// Read-only view over one `FarmRecord`, recomputed on every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub total_co2e: f64,
    pub emissions: EmissionBreakdown,
    /// Water actually counted: `water_m3`, or irrigation water when that is zero.
    pub water_used_m3: f64,
    pub emissions_per_tonne: Measure,
    pub emissions_per_ha: Measure,
    pub yield_per_ha: Measure,
    pub water_productivity: Measure,
    pub water_per_tonne: Measure,
    pub nitrogen_intensity: Measure,
    pub phosphate_intensity: Measure,
    pub potash_intensity: Measure,
    pub diesel_intensity: Measure,
    pub electricity_intensity: Measure,
    pub pesticide_intensity: Measure,
    pub pesticide_use_rate: Measure,
    pub hedgerow_density: Measure,
    pub habitat_share: Measure,
    pub trees_per_ha: Measure,
    pub regenerative_score: Measure,
    pub female_share: Measure,
    pub accident_rate: Measure,
    pub training_hours_per_worker: Measure,
    pub labour_intensity: Measure,
    pub safety_training_rate: Measure,
    pub contract_rate: Measure,
    pub certification: Measure,
    pub sfi_compliance: Measure,
    pub soil_test_rate: Measure,
    pub ipm_rate: Measure,
}

impl DerivedMetrics {
    pub fn get(&self, metric: MetricId) -> Measure {
        match metric {
            MetricId::EmissionsPerTonne => self.emissions_per_tonne,
            MetricId::EmissionsPerHa => self.emissions_per_ha,
            MetricId::YieldPerHa => self.yield_per_ha,
            MetricId::WaterProductivity => self.water_productivity,
            MetricId::WaterPerTonne => self.water_per_tonne,
            MetricId::NitrogenIntensity => self.nitrogen_intensity,
            MetricId::PhosphateIntensity => self.phosphate_intensity,
            MetricId::PotashIntensity => self.potash_intensity,
            MetricId::DieselIntensity => self.diesel_intensity,
            MetricId::ElectricityIntensity => self.electricity_intensity,
            MetricId::PesticideIntensity => self.pesticide_intensity,
            MetricId::PesticideUseRate => self.pesticide_use_rate,
            MetricId::HedgerowDensity => self.hedgerow_density,
            MetricId::HabitatShare => self.habitat_share,
            MetricId::TreesPerHa => self.trees_per_ha,
            MetricId::RegenerativeScore => self.regenerative_score,
            MetricId::FemaleShare => self.female_share,
            MetricId::AccidentRate => self.accident_rate,
            MetricId::TrainingHoursPerWorker => self.training_hours_per_worker,
            MetricId::LabourIntensity => self.labour_intensity,
            MetricId::SafetyTrainingRate => self.safety_training_rate,
            MetricId::ContractRate => self.contract_rate,
            MetricId::Certification => self.certification,
            MetricId::SfiCompliance => self.sfi_compliance,
            MetricId::SoilTestRate => self.soil_test_rate,
            MetricId::IpmRate => self.ipm_rate,
        }
    }
}

/// Compute every derived metric for one record.
///
/// Pure: the same record and configuration always give the same result.
/// Any ratio whose denominator is zero comes back `NotApplicable`.
pub fn derive(record: &FarmRecord, report_type: ReportType, config: &EsgConfig) -> DerivedMetrics {
    let ef = &config.emission_factors;
    let emissions = EmissionBreakdown {
        fertilizer: record.fertilizer_n_kg * ef.nitrogen_kg_co2e_per_kg,
        diesel: record.diesel_litres * ef.diesel_kg_co2e_per_litre,
        electricity: record.electricity_kwh * ef.electricity_kg_co2e_per_kwh,
    };
    let total_co2e = emissions.total();
    let area = record.area_ha;
    let yield_t = record.yield_tonnes;
    let workers = record.workers_total as f64;

    let water = if record.water_m3 > 0.0 {
        record.water_m3
    } else {
        record.irrigation_water_m3.unwrap_or(0.0)
    };

    let per_ha = |quantity: Option<f64>| match quantity {
        Some(q) => Measure::ratio(q, area),
        None => Measure::NotApplicable,
    };

    let regenerative_score = match report_type {
        ReportType::SingleFarm => regenerative_score(record, &config.regenerative),
        ReportType::MultiFarm => Measure::NotApplicable,
    };

    // Wildflower and buffer strips count as habitat when either is reported.
    let habitat_ha = match (record.wildflower_area_ha, record.buffer_strip_area_ha) {
        (None, None) => None,
        (w, b) => Some(w.unwrap_or(0.0) + b.unwrap_or(0.0)),
    };

    DerivedMetrics {
        total_co2e,
        emissions,
        water_used_m3: water,
        emissions_per_tonne: Measure::ratio(total_co2e, yield_t),
        emissions_per_ha: Measure::ratio(total_co2e, area),
        yield_per_ha: Measure::ratio(yield_t, area),
        water_productivity: Measure::ratio(yield_t, water),
        water_per_tonne: Measure::ratio(water, yield_t),
        nitrogen_intensity: Measure::ratio(record.fertilizer_n_kg, area),
        phosphate_intensity: per_ha(record.phosphate_kg),
        potash_intensity: per_ha(record.potash_kg),
        diesel_intensity: Measure::ratio(record.diesel_litres, area),
        electricity_intensity: Measure::ratio(record.electricity_kwh, area),
        pesticide_intensity: per_ha(record.pesticide_litres),
        pesticide_use_rate: record.pesticide_use_rate.into(),
        hedgerow_density: per_ha(record.hedgerow_length_m),
        habitat_share: per_ha(habitat_ha),
        trees_per_ha: per_ha(record.trees_planted_count.map(f64::from)),
        regenerative_score,
        female_share: Measure::ratio(record.workers_female as f64, workers),
        accident_rate: Measure::ratio(record.accidents_count as f64, workers).map(|r| r * 100.0),
        training_hours_per_worker: match record.training_hours {
            Some(h) => Measure::ratio(h, workers),
            None => Measure::NotApplicable,
        },
        labour_intensity: per_ha(record.labour_hours),
        safety_training_rate: record.safety_training_rate.into(),
        contract_rate: record.contract_rate.into(),
        certification: certification(record.certification_scheme.as_deref()),
        sfi_compliance: mean_of_present(&[
            record.sfi_soil_rate,
            record.sfi_nutrient_rate,
            record.sfi_hedgerow_rate,
        ]),
        soil_test_rate: record.soil_test_rate.into(),
        ipm_rate: record.ipm_rate.into(),
    }
}

/// 1 for a named scheme, 0 for a blank or "none" entry, not applicable when
/// the column was never uploaded.
fn certification(scheme: Option<&str>) -> Measure {
    match scheme.map(str::trim) {
        None => Measure::NotApplicable,
        Some(s) if s.is_empty() || s.eq_ignore_ascii_case("none") => Measure::Value(0.0),
        Some(_) => Measure::Value(1.0),
    }
}

fn mean_of_present(values: &[Option<f64>]) -> Measure {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Measure::NotApplicable;
    }
    Measure::new(present.iter().sum::<f64>() / present.len() as f64)
}

/// Points for regenerative practices, scaled to 0..=100 against the maximum
/// attainable. Practices without data earn nothing; a record with no
/// practice data at all is not applicable.
fn regenerative_score(record: &FarmRecord, regen: &RegenerativeConfig) -> Measure {
    let mut points = 0.0;
    let mut any = false;

    for (rate, weight) in [
        (record.crop_rotation_rate, regen.crop_rotation_points),
        (record.cover_crop_rate, regen.cover_crop_points),
        (record.organic_manure_rate, regen.organic_manure_points),
        (record.reduced_tillage_rate, regen.reduced_tillage_points),
    ] {
        if let Some(rate) = rate {
            any = true;
            points += rate.clamp(0.0, 1.0) * weight;
        }
    }

    if let Some(method) = record.irrigation_method {
        any = true;
        let share = match method {
            IrrigationMethod::Drip | IrrigationMethod::Rainfed => 1.0,
            IrrigationMethod::Sprinkler => 0.5,
            IrrigationMethod::Surface | IrrigationMethod::Other => 0.0,
        };
        points += share * regen.irrigation_points;
    }

    if let Some(som) = record.soil_organic_matter_pct {
        any = true;
        let share = (som / regen.soil_organic_matter_target_pct).clamp(0.0, 1.0);
        points += share * regen.soil_organic_matter_points;
    }

    if let Some(ph) = record.soil_ph {
        any = true;
        if (regen.soil_ph_min..=regen.soil_ph_max).contains(&ph) {
            points += regen.soil_ph_points;
        }
    }

    if !any {
        return Measure::NotApplicable;
    }
    Measure::ratio(points * 100.0, regen.max_points())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// The reference farm used across the test suite.
    pub(crate) fn sample_record() -> FarmRecord {
        FarmRecord {
            row: 1,
            farm_id: "F1".to_string(),
            farm_name: "Green Acres".to_string(),
            farmer_name: None,
            field_id: None,
            country: Some("UK".to_string()),
            year: 2023,
            crop: "Wheat".to_string(),
            area_ha: 10.0,
            yield_tonnes: 50.0,
            fertilizer_n_kg: 100.0,
            diesel_litres: 200.0,
            electricity_kwh: 500.0,
            water_m3: 1000.0,
            phosphate_kg: None,
            potash_kg: None,
            pesticide_litres: None,
            irrigation_water_m3: None,
            workers_total: 20,
            workers_female: 8,
            accidents_count: 1,
            training_hours: None,
            labour_hours: None,
            certification_scheme: None,
            sfi_soil_rate: None,
            sfi_nutrient_rate: None,
            sfi_hedgerow_rate: None,
            contract_rate: None,
            safety_training_rate: None,
            soil_test_rate: None,
            ipm_rate: None,
            crop_rotation_rate: None,
            cover_crop_rate: None,
            organic_manure_rate: None,
            reduced_tillage_rate: None,
            irrigation_method: None,
            soil_organic_matter_pct: None,
            soil_ph: None,
            hedgerow_length_m: None,
            wildflower_area_ha: None,
            buffer_strip_area_ha: None,
            trees_planted_count: None,
            pesticide_use_rate: None,
        }
    }

    fn approx(m: Measure, expected: f64) {
        let v = m.value().expect("metric should be applicable");
        assert!((v - expected).abs() < 1e-9, "expected {expected}, got {v}");
    }

    #[test]
    fn reference_farm_metrics() {
        let config = EsgConfig::default();
        let m = derive(&sample_record(), ReportType::MultiFarm, &config);
        assert!((m.total_co2e - 1340.0).abs() < 1e-9);
        approx(m.emissions_per_ha, 134.0);
        approx(m.emissions_per_tonne, 26.8);
        approx(m.female_share, 0.40);
        approx(m.accident_rate, 5.0);
        approx(m.water_productivity, 0.05);
        approx(m.water_per_tonne, 20.0);
        approx(m.nitrogen_intensity, 10.0);
        approx(m.diesel_intensity, 20.0);
        approx(m.electricity_intensity, 50.0);
        approx(m.yield_per_ha, 5.0);
        assert_eq!(m.phosphate_intensity, Measure::NotApplicable);
        assert_eq!(m.certification, Measure::NotApplicable);
        assert_eq!(m.regenerative_score, Measure::NotApplicable);
    }

    #[test]
    fn derivation_is_deterministic() {
        let config = EsgConfig::default();
        let r = sample_record();
        assert_eq!(
            derive(&r, ReportType::SingleFarm, &config),
            derive(&r, ReportType::SingleFarm, &config)
        );
    }

    #[test]
    fn zero_area_makes_per_hectare_metrics_not_applicable() {
        let mut r = sample_record();
        r.area_ha = 0.0;
        r.water_m3 = 0.0;
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        assert_eq!(m.emissions_per_ha, Measure::NotApplicable);
        assert_eq!(m.nitrogen_intensity, Measure::NotApplicable);
        assert_eq!(m.yield_per_ha, Measure::NotApplicable);
        assert_eq!(m.water_productivity, Measure::NotApplicable);
        // Raw totals survive.
        assert!((m.total_co2e - 1340.0).abs() < 1e-9);
        approx(m.emissions_per_tonne, 26.8);
    }

    #[test]
    fn no_workers_means_social_ratios_not_applicable() {
        let mut r = sample_record();
        r.workers_total = 0;
        r.workers_female = 0;
        r.accidents_count = 0;
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        assert_eq!(m.accident_rate, Measure::NotApplicable);
        assert_eq!(m.female_share, Measure::NotApplicable);
    }

    #[test]
    fn irrigation_water_used_when_water_missing() {
        let mut r = sample_record();
        r.water_m3 = 0.0;
        r.irrigation_water_m3 = Some(500.0);
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        approx(m.water_productivity, 0.1);
        assert_eq!(m.water_used_m3, 500.0);
    }

    #[test]
    fn habitat_trees_labour_and_spraying() {
        let mut r = sample_record();
        r.wildflower_area_ha = Some(0.3);
        r.trees_planted_count = Some(40);
        r.labour_hours = Some(250.0);
        r.pesticide_use_rate = Some(0.5);
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        approx(m.habitat_share, 0.03);
        approx(m.trees_per_ha, 4.0);
        approx(m.labour_intensity, 25.0);
        approx(m.pesticide_use_rate, 0.5);

        let bare = derive(&sample_record(), ReportType::MultiFarm, &EsgConfig::default());
        assert_eq!(bare.habitat_share, Measure::NotApplicable);
        assert_eq!(bare.trees_per_ha, Measure::NotApplicable);
        assert_eq!(bare.labour_intensity, Measure::NotApplicable);
        assert_eq!(bare.pesticide_use_rate, Measure::NotApplicable);
    }

    #[test]
    fn zero_yield_keeps_water_productivity_at_zero() {
        let mut r = sample_record();
        r.yield_tonnes = 0.0;
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        approx(m.water_productivity, 0.0);
        assert_eq!(m.emissions_per_tonne, Measure::NotApplicable);
        assert_eq!(m.water_per_tonne, Measure::NotApplicable);
    }

    #[test]
    fn certification_states() {
        assert_eq!(certification(None), Measure::NotApplicable);
        assert_eq!(certification(Some("None")), Measure::Value(0.0));
        assert_eq!(certification(Some(" ")), Measure::Value(0.0));
        assert_eq!(certification(Some("LEAF")), Measure::Value(1.0));
    }

    #[test]
    fn regenerative_score_single_farm_only() {
        let mut r = sample_record();
        r.crop_rotation_rate = Some(1.0);
        r.cover_crop_rate = Some(1.0);
        r.organic_manure_rate = Some(0.0);
        r.irrigation_method = Some(IrrigationMethod::Sprinkler);
        r.soil_organic_matter_pct = Some(1.75);
        r.soil_ph = Some(6.5);
        let config = EsgConfig::default();

        // 20 + 20 + 0 + 5 + 5 + 10 = 60 of 100 points.
        let single = derive(&r, ReportType::SingleFarm, &config);
        approx(single.regenerative_score, 60.0);

        let multi = derive(&r, ReportType::MultiFarm, &config);
        assert_eq!(multi.regenerative_score, Measure::NotApplicable);
    }

    #[test]
    fn regenerative_score_without_practice_data_is_not_applicable() {
        let m = derive(&sample_record(), ReportType::SingleFarm, &EsgConfig::default());
        assert_eq!(m.regenerative_score, Measure::NotApplicable);
    }

    #[test]
    fn sfi_compliance_averages_present_rates() {
        let mut r = sample_record();
        r.sfi_soil_rate = Some(1.0);
        r.sfi_hedgerow_rate = Some(0.0);
        let m = derive(&r, ReportType::MultiFarm, &EsgConfig::default());
        approx(m.sfi_compliance, 0.5);
    }
}
