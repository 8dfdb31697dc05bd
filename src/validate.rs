//! Schema and row validation.
//!
//! A missing required column aborts the upload with a single error. Every
//! other problem is row-scoped: hard failures drop the row and record why,
//! soft failures keep it and record a warning.

use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::EsgConfig;
use crate::error::{EsgError, EsgResult, RowError, ValidationWarning};
use crate::loader::Dataset;
use crate::schema::{self, governance, identity, practice, resource, workforce};
use crate::types::{FarmRecord, IrrigationMethod, RawRow, ReportType};
use crate::util::{non_empty, parse_count, parse_f64_safe, parse_year, parse_yes_no};

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedDataset {
    pub records: Vec<FarmRecord>,
    pub row_errors: Vec<RowError>,
    pub warnings: Vec<ValidationWarning>,
    pub total_rows: usize,
}

/// Validate an uploaded dataset for one report type.
pub fn validate(
    dataset: &Dataset,
    report_type: ReportType,
    config: &EsgConfig,
) -> EsgResult<ValidatedDataset> {
    check_columns(dataset, report_type)?;

    let years = config.validation.min_year..=chrono::Local::now().year() + 1;
    let certification_uploaded = dataset.has_column(governance::CERTIFICATION_SCHEME);

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, row) in dataset.rows.iter().enumerate() {
        let row_no = i + 1;
        if row.len() != dataset.headers.len() {
            let reason = format!(
                "malformed row: expected {} fields, found {}",
                dataset.headers.len(),
                row.len()
            );
            tracing::warn!(row = row_no, %reason, "row excluded");
            row_errors.push(RowError { row: row_no, reason });
            continue;
        }
        let raw: RawRow = match row.deserialize(Some(&dataset.headers)) {
            Ok(r) => r,
            Err(e) => {
                let reason = format!("unreadable row: {e}");
                tracing::warn!(row = row_no, %reason, "row excluded");
                row_errors.push(RowError { row: row_no, reason });
                continue;
            }
        };

        match to_record(&raw, row_no, report_type, certification_uploaded, &years) {
            Ok(record) => {
                warnings.extend(soft_checks(&record));
                records.push(record);
            }
            Err(reason) => {
                tracing::warn!(row = row_no, %reason, "row excluded");
                row_errors.push(RowError { row: row_no, reason });
            }
        }
    }

    tracing::info!(
        %report_type,
        total = dataset.rows.len(),
        valid = records.len(),
        excluded = row_errors.len(),
        warnings = warnings.len(),
        "dataset validated"
    );

    Ok(ValidatedDataset {
        records,
        row_errors,
        warnings,
        total_rows: dataset.rows.len(),
    })
}

/// Abort with one error naming every missing required column, or every
/// canonical column that more than one uploaded header maps onto.
pub fn check_columns(dataset: &Dataset, report_type: ReportType) -> EsgResult<()> {
    let clashes = duplicate_columns(dataset);
    if !clashes.is_empty() {
        tracing::error!(%report_type, clashes = %clashes.join("; "), "upload rejected");
        return Err(EsgError::DuplicateColumns { clashes });
    }

    let missing: Vec<String> = schema::required_columns(report_type)
        .into_iter()
        .filter(|c| !dataset.has_column(c))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        for ignored in dataset.headers.iter().filter(|h| !schema::is_known(h)) {
            tracing::debug!(column = %ignored, "ignoring unrecognised column");
        }
        return Ok(());
    }
    tracing::error!(%report_type, missing = %missing.join(", "), "upload rejected");
    Err(EsgError::Schema {
        report_type,
        missing,
    })
}

/// `area_ha (area_ha, field_area_ha)` for each canonical name claimed by
/// more than one header, in first-appearance order.
fn duplicate_columns(dataset: &Dataset) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut sources: HashMap<&str, Vec<&str>> = HashMap::new();
    for (canonical, source) in dataset.headers.iter().zip(dataset.source_headers.iter()) {
        sources
            .entry(canonical)
            .or_insert_with(|| {
                order.push(canonical);
                Vec::new()
            })
            .push(source.trim());
    }
    order
        .into_iter()
        .filter_map(|name| {
            let from = sources.get(name)?;
            (from.len() > 1).then(|| format!("{name} ({})", from.join(", ")))
        })
        .collect()
}

/// Collects every problem in a row so the user sees them all at once.
#[derive(Default)]
struct RowCheck {
    problems: Vec<String>,
}

impl RowCheck {
    fn text(&mut self, col: &str, v: Option<&str>) -> String {
        match non_empty(v) {
            Some(s) => s,
            None => {
                self.problems.push(format!("missing value for {col}"));
                String::new()
            }
        }
    }

    fn number(&mut self, col: &str, v: Option<&str>) -> Option<f64> {
        let raw = v.map(str::trim).filter(|s| !s.is_empty())?;
        match parse_f64_safe(Some(raw)) {
            Some(n) if !n.is_finite() => {
                self.problems.push(format!("{col} is not a finite number: '{raw}'"));
                None
            }
            Some(n) if n < 0.0 => {
                self.problems.push(format!("{col} must not be negative: {n}"));
                None
            }
            Some(n) => Some(n),
            None => {
                self.problems.push(format!("{col} is not a number: '{raw}'"));
                None
            }
        }
    }

    fn quantity(&mut self, col: &str, v: Option<&str>) -> f64 {
        if non_empty(v).is_none() {
            self.problems.push(format!("missing value for {col}"));
            return 0.0;
        }
        self.number(col, v).unwrap_or(0.0)
    }

    fn optional_in_range(&mut self, col: &str, v: Option<&str>, max: f64) -> Option<f64> {
        let n = self.number(col, v)?;
        if n > max {
            self.problems.push(format!("{col} must be between 0 and {max}: {n}"));
            return None;
        }
        Some(n)
    }

    fn count(&mut self, col: &str, v: Option<&str>) -> u32 {
        let Some(raw) = non_empty(v) else {
            self.problems.push(format!("missing value for {col}"));
            return 0;
        };
        match parse_count(Some(&raw)) {
            Some(n) => n,
            None => {
                self.problems
                    .push(format!("{col} must be a whole, non-negative number: '{raw}'"));
                0
            }
        }
    }

    fn optional_count(&mut self, col: &str, v: Option<&str>) -> Option<u32> {
        let raw = non_empty(v)?;
        let n = parse_count(Some(&raw));
        if n.is_none() {
            self.problems
                .push(format!("{col} must be a whole, non-negative number: '{raw}'"));
        }
        n
    }

    fn yes_no(&mut self, col: &str, v: Option<&str>) -> Option<f64> {
        match parse_yes_no(v) {
            Ok(rate) => rate,
            Err(bad) => {
                self.problems.push(format!("{col} must be yes or no: '{bad}'"));
                None
            }
        }
    }
}

fn to_record(
    raw: &RawRow,
    row: usize,
    report_type: ReportType,
    certification_uploaded: bool,
    years: &std::ops::RangeInclusive<i32>,
) -> Result<FarmRecord, String> {
    let mut check = RowCheck::default();

    let farm_id = check.text(identity::FARM_ID, raw.farm_id.as_deref());
    let name_col = schema::name_column(report_type);
    let farm_name = match report_type {
        // Portfolio uploads may name farms; otherwise the organisation stands in.
        ReportType::MultiFarm => {
            let organisation = check.text(name_col, raw.organisation_name.as_deref());
            non_empty(raw.farm_name.as_deref()).unwrap_or(organisation)
        }
        ReportType::SingleFarm => check.text(name_col, raw.farm_name.as_deref()),
    };
    let crop_col = schema::crop_column(report_type);
    let crop = match report_type {
        ReportType::MultiFarm => check.text(crop_col, raw.crop.as_deref()),
        ReportType::SingleFarm => check.text(crop_col, raw.crop_type.as_deref()),
    };
    let country = match report_type {
        ReportType::MultiFarm => Some(check.text(identity::COUNTRY, raw.country.as_deref())),
        ReportType::SingleFarm => non_empty(raw.country.as_deref()),
    };

    let year = match non_empty(raw.year.as_deref()) {
        None => {
            check.problems.push(format!("missing value for {}", identity::YEAR));
            0
        }
        Some(s) => match parse_year(Some(&s)) {
            Some(y) if years.contains(&y) => y,
            Some(y) => {
                check.problems.push(format!(
                    "year {y} is outside {}..={}",
                    years.start(),
                    years.end()
                ));
                0
            }
            None => {
                check.problems.push(format!("year is not a 4-digit number: '{s}'"));
                0
            }
        },
    };

    let area_ha = check.quantity(resource::AREA_HA, raw.area_ha.as_deref());
    let yield_tonnes = check.quantity(resource::YIELD_TONNES, raw.yield_tonnes.as_deref());
    let fertilizer_n_kg = check.quantity(resource::FERTILIZER_N_KG, raw.fertilizer_n_kg.as_deref());
    let diesel_litres = check.quantity(resource::DIESEL_LITRES, raw.diesel_litres.as_deref());
    let electricity_kwh = check.quantity(resource::ELECTRICITY_KWH, raw.electricity_kwh.as_deref());
    let water_m3 = check.quantity(resource::WATER_M3, raw.water_m3.as_deref());

    let workers_total = check.count(workforce::WORKERS_TOTAL, raw.workers_total.as_deref());
    let workers_female = check.count(workforce::WORKERS_FEMALE, raw.workers_female.as_deref());
    let accidents_count = check.count(workforce::ACCIDENTS_COUNT, raw.accidents_count.as_deref());
    if workers_female > workers_total {
        check.problems.push(format!(
            "workers_female ({workers_female}) exceeds workers_total ({workers_total})"
        ));
    }

    let record = FarmRecord {
        row,
        farm_id,
        farm_name,
        farmer_name: non_empty(raw.farmer_name.as_deref()),
        field_id: non_empty(raw.field_id.as_deref()),
        country,
        year,
        crop,
        area_ha,
        yield_tonnes,
        fertilizer_n_kg,
        diesel_litres,
        electricity_kwh,
        water_m3,
        phosphate_kg: check.number(resource::PHOSPHATE_KG, raw.phosphate_kg.as_deref()),
        potash_kg: check.number(resource::POTASH_KG, raw.potash_kg.as_deref()),
        pesticide_litres: check.number(resource::PESTICIDE_LITRES, raw.pesticide_litres.as_deref()),
        irrigation_water_m3: check
            .number(resource::IRRIGATION_WATER_M3, raw.irrigation_water_m3.as_deref()),
        workers_total,
        workers_female,
        accidents_count,
        training_hours: check.number(workforce::TRAINING_HOURS, raw.training_hours.as_deref()),
        labour_hours: check.number(workforce::LABOUR_HOURS, raw.labour_hours.as_deref()),
        certification_scheme: if certification_uploaded {
            Some(non_empty(raw.certification_scheme.as_deref()).unwrap_or_default())
        } else {
            None
        },
        sfi_soil_rate: check.yes_no(governance::SFI_SOIL, raw.sfi_soil_standard_yes_no.as_deref()),
        sfi_nutrient_rate: check
            .yes_no(governance::SFI_NUTRIENT, raw.sfi_nutrient_management_yes_no.as_deref()),
        sfi_hedgerow_rate: check.yes_no(governance::SFI_HEDGEROWS, raw.sfi_hedgerows_yes_no.as_deref()),
        contract_rate: check.yes_no(
            governance::WORKER_CONTRACTS,
            raw.worker_contracts_formalised_yes_no.as_deref(),
        ),
        safety_training_rate: check.yes_no(
            governance::SAFETY_TRAINING,
            raw.labour_hs_training_done_yes_no.as_deref(),
        ),
        soil_test_rate: check.yes_no(governance::SOIL_TEST, raw.soil_test_conducted_yes_no.as_deref()),
        ipm_rate: check.yes_no(practice::IPM, raw.integrated_pest_management_yes_no.as_deref()),
        crop_rotation_rate: check.yes_no(practice::CROP_ROTATION, raw.crop_rotation_yes_no.as_deref()),
        cover_crop_rate: check.yes_no(practice::COVER_CROP, raw.cover_crop_planted_yes_no.as_deref()),
        organic_manure_rate: check.yes_no(practice::ORGANIC_MANURE, raw.organic_manure_yes_no.as_deref()),
        reduced_tillage_rate: check
            .yes_no(practice::REDUCED_TILLAGE, raw.reduced_tillage_yes_no.as_deref()),
        irrigation_method: raw.irrigation_method.as_deref().and_then(IrrigationMethod::parse),
        soil_organic_matter_pct: check.optional_in_range(
            practice::SOIL_ORGANIC_MATTER_PCT,
            raw.soil_organic_matter_pct.as_deref(),
            100.0,
        ),
        soil_ph: check.optional_in_range(practice::SOIL_PH, raw.soil_ph.as_deref(), 14.0),
        hedgerow_length_m: check.number(practice::HEDGEROW_LENGTH_M, raw.hedgerow_length_m.as_deref()),
        wildflower_area_ha: check
            .number(practice::WILDFLOWER_AREA_HA, raw.wildflower_area_ha.as_deref()),
        buffer_strip_area_ha: check
            .number(practice::BUFFER_STRIP_AREA_HA, raw.buffer_strip_area_ha.as_deref()),
        trees_planted_count: check
            .optional_count(practice::TREES_PLANTED_COUNT, raw.trees_planted_count.as_deref()),
        pesticide_use_rate: check
            .yes_no(resource::PESTICIDE_APPLIED, raw.pesticide_applied_yes_no.as_deref()),
    };

    if check.problems.is_empty() {
        Ok(record)
    } else {
        Err(check.problems.join("; "))
    }
}

/// Zero denominators keep the row for totals but make ratios not applicable.
pub(crate) fn soft_checks(record: &FarmRecord) -> Vec<ValidationWarning> {
    let mut out = Vec::new();
    let mut warn = |message: &str| {
        out.push(ValidationWarning {
            row: record.row,
            farm_id: record.farm_id.clone(),
            message: message.to_string(),
        })
    };
    if record.area_ha == 0.0 {
        warn("area_ha is 0; per-hectare metrics are not applicable");
    }
    if record.yield_tonnes == 0.0 {
        warn("yield_tonnes is 0; per-tonne metrics are not applicable");
    }
    if record.water_m3 == 0.0 && record.irrigation_water_m3.unwrap_or(0.0) == 0.0 {
        warn("no water volume recorded; water productivity is not applicable");
    }
    if record.workers_total == 0 {
        warn("workers_total is 0; workforce ratios are not applicable");
    }
    out
}
