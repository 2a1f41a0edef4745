//! Agronomy helpers for observations.
//!
//! Closed-form formulas and a static table; nothing here touches the queue.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AgronomyError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("minimum temperature {t_min} is above maximum {t_max}")]
    InvertedRange { t_min: f64, t_max: f64 },
}

/// Saturation vapor pressure in kPa (Tetens)
pub fn saturation_vapor_pressure(temp_c: f64) -> f64 {
    0.6108 * ((17.27 * temp_c) / (temp_c + 237.3)).exp()
}

/// Leaf vapor-pressure deficit in kPa.
///
/// `leaf_offset_c` is leaf temperature minus air temperature; pass `0.0` for
/// air VPD.
pub fn vapor_pressure_deficit(
    air_temp_c: f64,
    relative_humidity_pct: f64,
    leaf_offset_c: f64,
) -> Result<f64, AgronomyError> {
    check_range("air temperature", air_temp_c, -50.0, 60.0)?;
    check_range("relative humidity", relative_humidity_pct, 0.0, 100.0)?;

    let leaf_svp = saturation_vapor_pressure(air_temp_c + leaf_offset_c);
    let actual = saturation_vapor_pressure(air_temp_c) * relative_humidity_pct / 100.0;
    Ok((leaf_svp - actual).max(0.0))
}

/// Growing degree days for one day, averaging method
pub fn growing_degree_days(t_min: f64, t_max: f64, base_c: f64) -> Result<f64, AgronomyError> {
    if t_min > t_max {
        return Err(AgronomyError::InvertedRange { t_min, t_max });
    }
    Ok(((t_min + t_max) / 2.0 - base_c).max(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
    Calcium,
    Magnesium,
    Sulfur,
    Iron,
    Manganese,
    Boron,
    Zinc,
    Copper,
    Molybdenum,
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nitrogen => "nitrogen",
            Self::Phosphorus => "phosphorus",
            Self::Potassium => "potassium",
            Self::Calcium => "calcium",
            Self::Magnesium => "magnesium",
            Self::Sulfur => "sulfur",
            Self::Iron => "iron",
            Self::Manganese => "manganese",
            Self::Boron => "boron",
            Self::Zinc => "zinc",
            Self::Copper => "copper",
            Self::Molybdenum => "molybdenum",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutCause {
    TooAcidic,
    TooAlkaline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lockout {
    pub nutrient: Nutrient,
    pub cause: LockoutCause,
}

/// pH window in which each nutrient stays available in solution culture
const AVAILABILITY: [(Nutrient, f64, f64); 12] = [
    (Nutrient::Nitrogen, 5.5, 7.5),
    (Nutrient::Phosphorus, 5.5, 6.5),
    (Nutrient::Potassium, 5.0, 7.5),
    (Nutrient::Calcium, 5.5, 7.5),
    (Nutrient::Magnesium, 5.5, 7.5),
    (Nutrient::Sulfur, 5.0, 7.5),
    (Nutrient::Iron, 4.5, 6.5),
    (Nutrient::Manganese, 4.5, 6.5),
    (Nutrient::Boron, 5.0, 6.5),
    (Nutrient::Zinc, 4.5, 6.5),
    (Nutrient::Copper, 4.5, 6.5),
    (Nutrient::Molybdenum, 6.0, 8.0),
];

/// Nutrients locked out at `ph`
pub fn nutrient_lockout(ph: f64) -> Result<Vec<Lockout>, AgronomyError> {
    check_range("pH", ph, 0.0, 14.0)?;

    Ok(AVAILABILITY
        .iter()
        .filter_map(|&(nutrient, min, max)| {
            let cause = if ph < min {
                LockoutCause::TooAcidic
            } else if ph > max {
                LockoutCause::TooAlkaline
            } else {
                return None;
            };
            Some(Lockout { nutrient, cause })
        })
        .collect())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), AgronomyError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AgronomyError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn vpd_matches_reference_values() {
        // 25 C at 60% RH is about 1.27 kPa of air VPD
        let vpd = vapor_pressure_deficit(25.0, 60.0, 0.0).unwrap();
        assert!(close(vpd, 1.27), "got {vpd}");

        let saturated = vapor_pressure_deficit(20.0, 100.0, 0.0).unwrap();
        assert!(close(saturated, 0.0));
    }

    #[test]
    fn cooler_leaf_lowers_vpd() {
        let air = vapor_pressure_deficit(26.0, 55.0, 0.0).unwrap();
        let leaf = vapor_pressure_deficit(26.0, 55.0, -2.0).unwrap();
        assert!(leaf < air);
    }

    #[test]
    fn vpd_rejects_impossible_humidity() {
        assert!(matches!(
            vapor_pressure_deficit(25.0, 120.0, 0.0),
            Err(AgronomyError::OutOfRange {
                field: "relative humidity",
                ..
            })
        ));
    }

    #[test]
    fn gdd_floors_at_zero() {
        assert!(close(growing_degree_days(10.0, 24.0, 10.0).unwrap(), 7.0));
        assert!(close(growing_degree_days(2.0, 8.0, 10.0).unwrap(), 0.0));
        assert!(growing_degree_days(20.0, 10.0, 10.0).is_err());
    }

    #[test]
    fn balanced_ph_has_no_lockout() {
        assert!(nutrient_lockout(6.0).unwrap().is_empty());
    }

    #[test]
    fn high_ph_locks_out_micronutrients() {
        let lockouts = nutrient_lockout(7.2).unwrap();
        let nutrients: Vec<_> = lockouts.iter().map(|lockout| lockout.nutrient).collect();
        assert!(nutrients.contains(&Nutrient::Iron));
        assert!(nutrients.contains(&Nutrient::Phosphorus));
        assert!(!nutrients.contains(&Nutrient::Calcium));
        assert!(lockouts
            .iter()
            .all(|lockout| lockout.cause == LockoutCause::TooAlkaline));
    }

    #[test]
    fn low_ph_locks_out_calcium_and_molybdenum() {
        let lockouts = nutrient_lockout(5.2).unwrap();
        assert!(lockouts.contains(&Lockout {
            nutrient: Nutrient::Calcium,
            cause: LockoutCause::TooAcidic,
        }));
        assert!(lockouts.contains(&Lockout {
            nutrient: Nutrient::Molybdenum,
            cause: LockoutCause::TooAcidic,
        }));
        assert!(nutrient_lockout(15.0).is_err());
    }
}
