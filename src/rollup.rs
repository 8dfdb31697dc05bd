//! Field/month rows → one record per farm-year for the deep-dive report.

use std::collections::HashMap;

use crate::error::RowError;
use crate::types::FarmRecord;
use crate::util::average;

/// Merge records sharing `(farm_id, year)`, keeping first-appearance order.
///
/// Quantities and counts are summed. Adoption rates and soil readings are
/// averaged over the rows that report them. Text takes the first non-empty
/// value. The merged record keeps the row number of its first row.
///
/// A farm-year whose summed counts do not fit a `u32` is excluded and
/// reported against its first row.
pub fn rollup(records: Vec<FarmRecord>) -> (Vec<FarmRecord>, Vec<RowError>) {
    let mut order: Vec<(String, i32)> = Vec::new();
    let mut groups: HashMap<(String, i32), Vec<FarmRecord>> = HashMap::new();
    for r in records {
        let key = (r.farm_id.clone(), r.year);
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(r);
    }

    let mut merged = Vec::with_capacity(order.len());
    let mut errors = Vec::new();
    for rows in order.into_iter().filter_map(|key| groups.remove(&key)) {
        match merge(rows) {
            Ok(record) => merged.push(record),
            Err(e) => {
                tracing::warn!(row = e.row, reason = %e.reason, "farm-year excluded");
                errors.push(e);
            }
        }
    }
    (merged, errors)
}

fn sum_counts<'a>(
    rows: impl IntoIterator<Item = &'a FarmRecord>,
    column: &str,
    first: &FarmRecord,
    f: fn(&FarmRecord) -> Option<u32>,
) -> Result<Option<u32>, RowError> {
    let mut total: Option<u32> = None;
    for r in rows {
        if let Some(n) = f(r) {
            total = Some(total.unwrap_or(0).checked_add(n).ok_or_else(|| RowError {
                row: first.row,
                reason: format!(
                    "{column} summed over the fields of {} {} is too large",
                    first.farm_id, first.year
                ),
            })?);
        }
    }
    Ok(total)
}

fn merge(mut rows: Vec<FarmRecord>) -> Result<FarmRecord, RowError> {
    if rows.len() == 1 {
        return Ok(rows.remove(0));
    }
    let first = rows[0].clone();
    let count = |column: &str, f: fn(&FarmRecord) -> Option<u32>| {
        sum_counts(&rows, column, &first, f).map(Option::unwrap_or_default)
    };
    let workers_total = count("workers_total", |r| Some(r.workers_total))?;
    let workers_female = count("workers_female", |r| Some(r.workers_female))?;
    let accidents_count = count("accidents_count", |r| Some(r.accidents_count))?;
    let trees_planted_count = sum_counts(&rows, "trees_planted_count", &first, |r| {
        r.trees_planted_count
    })?;

    let sum = |f: fn(&FarmRecord) -> f64| rows.iter().map(f).sum::<f64>();
    let sum_opt = |f: fn(&FarmRecord) -> Option<f64>| {
        let present: Vec<f64> = rows.iter().filter_map(f).collect();
        (!present.is_empty()).then(|| present.iter().sum::<f64>())
    };
    let mean_opt = |f: fn(&FarmRecord) -> Option<f64>| {
        let present: Vec<f64> = rows.iter().filter_map(f).collect();
        (!present.is_empty()).then(|| average(&present))
    };
    let text = |f: fn(&FarmRecord) -> Option<&String>| {
        rows.iter().filter_map(f).find(|s| !s.is_empty()).cloned()
    };

    // A blank scheme on one field must not hide a named scheme on another.
    let certification_scheme = if first.certification_scheme.is_some() {
        Some(text(|r| r.certification_scheme.as_ref()).unwrap_or_default())
    } else {
        None
    };

    Ok(FarmRecord {
        row: first.row,
        farmer_name: text(|r| r.farmer_name.as_ref()),
        // A merged record spans several fields.
        field_id: None,
        country: text(|r| r.country.as_ref()),
        area_ha: sum(|r| r.area_ha),
        yield_tonnes: sum(|r| r.yield_tonnes),
        fertilizer_n_kg: sum(|r| r.fertilizer_n_kg),
        diesel_litres: sum(|r| r.diesel_litres),
        electricity_kwh: sum(|r| r.electricity_kwh),
        water_m3: sum(|r| r.water_m3),
        phosphate_kg: sum_opt(|r| r.phosphate_kg),
        potash_kg: sum_opt(|r| r.potash_kg),
        pesticide_litres: sum_opt(|r| r.pesticide_litres),
        irrigation_water_m3: sum_opt(|r| r.irrigation_water_m3),
        workers_total,
        workers_female,
        accidents_count,
        training_hours: sum_opt(|r| r.training_hours),
        labour_hours: sum_opt(|r| r.labour_hours),
        certification_scheme,
        sfi_soil_rate: mean_opt(|r| r.sfi_soil_rate),
        sfi_nutrient_rate: mean_opt(|r| r.sfi_nutrient_rate),
        sfi_hedgerow_rate: mean_opt(|r| r.sfi_hedgerow_rate),
        contract_rate: mean_opt(|r| r.contract_rate),
        safety_training_rate: mean_opt(|r| r.safety_training_rate),
        soil_test_rate: mean_opt(|r| r.soil_test_rate),
        ipm_rate: mean_opt(|r| r.ipm_rate),
        crop_rotation_rate: mean_opt(|r| r.crop_rotation_rate),
        cover_crop_rate: mean_opt(|r| r.cover_crop_rate),
        organic_manure_rate: mean_opt(|r| r.organic_manure_rate),
        reduced_tillage_rate: mean_opt(|r| r.reduced_tillage_rate),
        irrigation_method: rows.iter().find_map(|r| r.irrigation_method),
        soil_organic_matter_pct: mean_opt(|r| r.soil_organic_matter_pct),
        soil_ph: mean_opt(|r| r.soil_ph),
        hedgerow_length_m: sum_opt(|r| r.hedgerow_length_m),
        wildflower_area_ha: sum_opt(|r| r.wildflower_area_ha),
        buffer_strip_area_ha: sum_opt(|r| r.buffer_strip_area_ha),
        trees_planted_count,
        pesticide_use_rate: mean_opt(|r| r.pesticide_use_rate),
        ..first
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::sample_record;

    fn field(farm: &str, year: i32, row: usize, area: f64) -> FarmRecord {
        FarmRecord {
            row,
            farm_id: farm.to_string(),
            year,
            area_ha: area,
            field_id: Some(format!("field-{row}")),
            ..sample_record()
        }
    }

    #[test]
    fn single_rows_pass_through() {
        let r = field("F1", 2023, 1, 10.0);
        assert_eq!(rollup(vec![r.clone()]), (vec![r], Vec::new()));
    }

    #[test]
    fn fields_merge_per_farm_year_in_first_seen_order() {
        let mut a = field("F2", 2023, 1, 4.0);
        a.cover_crop_rate = Some(1.0);
        a.soil_ph = Some(6.0);
        a.certification_scheme = Some(String::new());
        let mut b = field("F1", 2023, 2, 10.0);
        b.certification_scheme = Some(String::new());
        let mut c = field("F2", 2023, 3, 6.0);
        c.cover_crop_rate = Some(0.0);
        c.soil_ph = Some(7.0);
        c.certification_scheme = Some("LEAF".to_string());
        let d = field("F2", 2024, 4, 5.0);

        let (out, errors) = rollup(vec![a, b, c, d]);
        assert!(errors.is_empty());
        let keys: Vec<(&str, i32)> = out.iter().map(|r| (r.farm_id.as_str(), r.year)).collect();
        assert_eq!(keys, vec![("F2", 2023), ("F1", 2023), ("F2", 2024)]);

        let merged = &out[0];
        assert_eq!(merged.row, 1);
        assert_eq!(merged.area_ha, 10.0);
        assert_eq!(merged.yield_tonnes, 100.0);
        assert_eq!(merged.workers_total, 40);
        assert_eq!(merged.cover_crop_rate, Some(0.5));
        assert_eq!(merged.soil_ph, Some(6.5));
        assert_eq!(merged.field_id, None);
        assert_eq!(merged.phosphate_kg, None);
        assert_eq!(merged.certification_scheme.as_deref(), Some("LEAF"));
    }

    #[test]
    fn biodiversity_and_labour_fields_merge() {
        let mut a = field("F1", 2023, 1, 4.0);
        a.wildflower_area_ha = Some(0.2);
        a.trees_planted_count = Some(30);
        a.labour_hours = Some(100.0);
        a.pesticide_use_rate = Some(1.0);
        let mut b = field("F1", 2023, 2, 6.0);
        b.buffer_strip_area_ha = Some(0.1);
        b.trees_planted_count = Some(10);
        b.pesticide_use_rate = Some(0.0);

        let (out, _) = rollup(vec![a, b]);
        let merged = &out[0];
        assert_eq!(merged.wildflower_area_ha, Some(0.2));
        assert_eq!(merged.buffer_strip_area_ha, Some(0.1));
        assert_eq!(merged.trees_planted_count, Some(40));
        assert_eq!(merged.labour_hours, Some(100.0));
        assert_eq!(merged.pesticide_use_rate, Some(0.5));
    }

    #[test]
    fn overflowing_worker_counts_exclude_the_farm_year() {
        let mut a = field("F1", 2023, 1, 4.0);
        a.workers_total = u32::MAX;
        let b = field("F1", 2023, 2, 6.0);
        let c = field("F2", 2023, 3, 5.0);

        let (out, errors) = rollup(vec![a, b, c]);
        let ids: Vec<&str> = out.iter().map(|r| r.farm_id.as_str()).collect();
        assert_eq!(ids, vec!["F2"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 1);
        assert!(errors[0].reason.starts_with("workers_total summed over the fields of F1 2023"));
    }
}
