//! Column names for both upload formats.
//! Single source of truth for the loader and the validator.

use crate::types::ReportType;

// ── Identity columns ────────────────────────────────────────────────────────
pub mod identity {
    pub const ORGANISATION_NAME: &str = "organisation_name";
    pub const FARM_NAME: &str = "farm_name";
    pub const FARMER_NAME: &str = "farmer_name";
    pub const FARM_ID: &str = "farm_id";
    pub const FIELD_ID: &str = "field_id";
    pub const COUNTRY: &str = "country";
    pub const YEAR: &str = "year";
    pub const CROP: &str = "crop";
    pub const CROP_TYPE: &str = "crop_type";
}

// ── Scale and resource-use columns ──────────────────────────────────────────
pub mod resource {
    pub const AREA_HA: &str = "area_ha";
    pub const YIELD_TONNES: &str = "yield_tonnes";
    pub const FERTILIZER_N_KG: &str = "fertilizer_n_kg";
    pub const DIESEL_LITRES: &str = "diesel_litres";
    pub const ELECTRICITY_KWH: &str = "electricity_kwh";
    pub const WATER_M3: &str = "water_m3";
    pub const PHOSPHATE_KG: &str = "phosphate_kg";
    pub const POTASH_KG: &str = "potash_kg";
    pub const PESTICIDE_LITRES: &str = "pesticide_litres";
    pub const IRRIGATION_WATER_M3: &str = "irrigation_water_m3";
    pub const IRRIGATION_METHOD: &str = "irrigation_method";
    pub const PESTICIDE_APPLIED: &str = "pesticide_applied_yes_no";
}

// ── Workforce columns ───────────────────────────────────────────────────────
pub mod workforce {
    pub const WORKERS_TOTAL: &str = "workers_total";
    pub const WORKERS_FEMALE: &str = "workers_female";
    pub const ACCIDENTS_COUNT: &str = "accidents_count";
    pub const TRAINING_HOURS: &str = "training_hours";
    pub const LABOUR_HOURS: &str = "labour_hours";
}

// ── Governance columns ──────────────────────────────────────────────────────
pub mod governance {
    pub const CERTIFICATION_SCHEME: &str = "certification_scheme";
    pub const SFI_SOIL: &str = "sfi_soil_standard_yes_no";
    pub const SFI_NUTRIENT: &str = "sfi_nutrient_management_yes_no";
    pub const SFI_HEDGEROWS: &str = "sfi_hedgerows_yes_no";
    pub const WORKER_CONTRACTS: &str = "worker_contracts_formalised_yes_no";
    pub const SAFETY_TRAINING: &str = "labour_hs_training_done_yes_no";
    pub const SOIL_TEST: &str = "soil_test_conducted_yes_no";
}

// ── Soil and practice columns ───────────────────────────────────────────────
pub mod practice {
    pub const CROP_ROTATION: &str = "crop_rotation_yes_no";
    pub const COVER_CROP: &str = "cover_crop_planted_yes_no";
    pub const ORGANIC_MANURE: &str = "organic_manure_yes_no";
    pub const REDUCED_TILLAGE: &str = "reduced_tillage_yes_no";
    pub const IPM: &str = "integrated_pest_management_yes_no";
    pub const SOIL_ORGANIC_MATTER_PCT: &str = "soil_organic_matter_pct";
    pub const SOIL_PH: &str = "soil_ph";
    pub const HEDGEROW_LENGTH_M: &str = "hedgerow_length_m";
    pub const WILDFLOWER_AREA_HA: &str = "wildflower_area_ha";
    pub const BUFFER_STRIP_AREA_HA: &str = "buffer_strip_area_ha";
    pub const TREES_PLANTED_COUNT: &str = "trees_planted_count";
}

use governance::*;
use identity::*;
use practice::*;
use resource::*;
use workforce::*;

/// Quantities and counts required by both report types.
const SHARED_REQUIRED: [&str; 9] = [
    AREA_HA,
    YIELD_TONNES,
    FERTILIZER_N_KG,
    DIESEL_LITRES,
    ELECTRICITY_KWH,
    WATER_M3,
    WORKERS_TOTAL,
    WORKERS_FEMALE,
    ACCIDENTS_COUNT,
];

const MULTI_FARM_IDENTITY: [&str; 5] = [ORGANISATION_NAME, FARM_ID, COUNTRY, YEAR, CROP];
const SINGLE_FARM_IDENTITY: [&str; 4] = [FARM_ID, FARM_NAME, YEAR, CROP_TYPE];

pub const OPTIONAL: [&str; 30] = [
    FARM_NAME,
    FARMER_NAME,
    COUNTRY,
    FIELD_ID,
    CERTIFICATION_SCHEME,
    PHOSPHATE_KG,
    POTASH_KG,
    PESTICIDE_LITRES,
    IRRIGATION_WATER_M3,
    IRRIGATION_METHOD,
    TRAINING_HOURS,
    LABOUR_HOURS,
    PESTICIDE_APPLIED,
    CROP_ROTATION,
    COVER_CROP,
    ORGANIC_MANURE,
    REDUCED_TILLAGE,
    IPM,
    SOIL_ORGANIC_MATTER_PCT,
    SOIL_PH,
    HEDGEROW_LENGTH_M,
    WILDFLOWER_AREA_HA,
    BUFFER_STRIP_AREA_HA,
    TREES_PLANTED_COUNT,
    SFI_SOIL,
    SFI_NUTRIENT,
    SFI_HEDGEROWS,
    WORKER_CONTRACTS,
    SAFETY_TRAINING,
    SOIL_TEST,
];

/// Required columns in the order they are reported when missing.
pub fn required_columns(report_type: ReportType) -> Vec<&'static str> {
    let identity: &[&str] = match report_type {
        ReportType::MultiFarm => &MULTI_FARM_IDENTITY,
        ReportType::SingleFarm => &SINGLE_FARM_IDENTITY,
    };
    identity.iter().chain(SHARED_REQUIRED.iter()).copied().collect()
}

/// Whether a canonical header is one the validator reads.
pub fn is_known(column: &str) -> bool {
    MULTI_FARM_IDENTITY
        .iter()
        .chain(SINGLE_FARM_IDENTITY.iter())
        .chain(SHARED_REQUIRED.iter())
        .chain(OPTIONAL.iter())
        .any(|c| *c == column)
}

/// Column that carries the farm's display name for this report type.
pub fn name_column(report_type: ReportType) -> &'static str {
    match report_type {
        ReportType::MultiFarm => ORGANISATION_NAME,
        ReportType::SingleFarm => FARM_NAME,
    }
}

/// Column that carries the crop for this report type.
pub fn crop_column(report_type: ReportType) -> &'static str {
    match report_type {
        ReportType::MultiFarm => CROP,
        ReportType::SingleFarm => CROP_TYPE,
    }
}

/// Field-level column names from the deep-dive template, mapped onto the
/// canonical farm-level names.
const ALIASES: [(&str, &str); 7] = [
    ("field_area_ha", AREA_HA),
    ("fertiliser_kgn", FERTILIZER_N_KG),
    ("fertiliser_kg_n", FERTILIZER_N_KG),
    ("yield_tons", YIELD_TONNES),
    ("water_volume_m3", WATER_M3),
    ("fertiliser_kgp2o5", PHOSPHATE_KG),
    ("fertiliser_kgk2o", POTASH_KG),
];

/// Canonical name for an uploaded header: trimmed, lower-cased, aliases
/// resolved. Unknown headers pass through so they can be ignored later.
pub fn canonical_header(raw: &str) -> String {
    let name = raw.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(name)
}
