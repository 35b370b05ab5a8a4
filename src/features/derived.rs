//! Fixed-order feature vector fed to the classifier
//!
//! Column order and formulas reproduce the feature engineering the classifier
//! was trained with. Any drift here changes predictions without an error.

use serde::{Deserialize, Serialize};

use super::RawRecord;

/// Added to powered denominators so an explicit 0 cannot divide by zero
pub const DENOMINATOR_EPSILON: f64 = 1e-6;

/// Measurements copied straight from the input record
pub const RAW_COLUMNS: [&str; 10] = [
    "orb_period",
    "planet_radius",
    "planet_mass",
    "pl_eqt",
    "st_teff",
    "st_rad",
    "st_mass",
    "sy_dist",
    "transit_depth",
    "transit_duration",
];

/// Canonical classifier input order
pub const FEATURE_COLUMNS: [&str; FeatureVector::DIM] = [
    "orb_period",
    "planet_radius",
    "planet_mass",
    "pl_eqt",
    "st_teff",
    "st_rad",
    "st_mass",
    "sy_dist",
    "transit_depth",
    "transit_duration",
    "planet_density",
    "star_density",
    "flux_received",
];

/// Complete feature vector for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Orbital period (days)
    pub orb_period: f64,
    /// Planet radius (Earth radii)
    pub planet_radius: f64,
    /// Planet mass (Earth masses)
    pub planet_mass: f64,
    /// Equilibrium temperature (K)
    pub pl_eqt: f64,
    /// Stellar effective temperature (K)
    pub st_teff: f64,
    /// Stellar radius (solar radii)
    pub st_rad: f64,
    /// Stellar mass (solar masses)
    pub st_mass: f64,
    /// Distance to the system (parsecs)
    pub sy_dist: f64,
    pub transit_depth: f64,
    pub transit_duration: f64,
    /// planet_mass / (planet_radius^3 + eps)
    pub planet_density: f64,
    /// st_mass / (st_rad^3 + eps)
    pub star_density: f64,
    /// st_teff * (st_rad / sqrt(sy_dist + eps))^2
    pub flux_received: f64,
}

impl FeatureVector {
    /// Dimension of feature vector
    pub const DIM: usize = 13;

    /// Values in canonical column order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.orb_period,
            self.planet_radius,
            self.planet_mass,
            self.pl_eqt,
            self.st_teff,
            self.st_rad,
            self.st_mass,
            self.sy_dist,
            self.transit_depth,
            self.transit_duration,
            self.planet_density,
            self.star_density,
            self.flux_received,
        ]
    }

    /// Single-precision copy for the inference backend
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.to_vec().into_iter().map(|v| v as f32).collect()
    }

    /// Create from a flat vector in canonical order
    pub fn from_vec(v: &[f64]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(FeatureVector {
            orb_period: v[0],
            planet_radius: v[1],
            planet_mass: v[2],
            pl_eqt: v[3],
            st_teff: v[4],
            st_rad: v[5],
            st_mass: v[6],
            sy_dist: v[7],
            transit_depth: v[8],
            transit_duration: v[9],
            planet_density: v[10],
            star_density: v[11],
            flux_received: v[12],
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|i| self.to_vec()[i])
    }

    /// `(column, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_COLUMNS.into_iter().zip(self.to_vec())
    }
}

/// Build the classifier input from a raw record
///
/// Never fails. Formula inputs default to 0, except the radius and distance
/// denominators which default to 1. Passthrough columns that are absent are
/// zero-filled. Keys outside [`RAW_COLUMNS`] are ignored.
pub fn derive(raw: &RawRecord) -> FeatureVector {
    let planet_radius = raw.get_or("planet_radius", 1.0);
    let st_rad = raw.get_or("st_rad", 1.0);
    let sy_dist = raw.get_or("sy_dist", 1.0);

    let planet_density =
        raw.get_or("planet_mass", 0.0) / (planet_radius.powi(3) + DENOMINATOR_EPSILON);
    let star_density = raw.get_or("st_mass", 0.0) / (st_rad.powi(3) + DENOMINATOR_EPSILON);
    let flux_received =
        raw.get_or("st_teff", 0.0) * (st_rad / (sy_dist + DENOMINATOR_EPSILON).sqrt()).powi(2);

    let ignored = raw.keys().filter(|k| !RAW_COLUMNS.contains(k)).count();
    if ignored > 0 {
        log::debug!("Dropping {} unrecognised input keys", ignored);
    }

    FeatureVector {
        orb_period: raw.get_or("orb_period", 0.0),
        planet_radius: raw.get_or("planet_radius", 0.0),
        planet_mass: raw.get_or("planet_mass", 0.0),
        pl_eqt: raw.get_or("pl_eqt", 0.0),
        st_teff: raw.get_or("st_teff", 0.0),
        st_rad: raw.get_or("st_rad", 0.0),
        st_mass: raw.get_or("st_mass", 0.0),
        sy_dist: raw.get_or("sy_dist", 0.0),
        transit_depth: raw.get_or("transit_depth", 0.0),
        transit_duration: raw.get_or("transit_duration", 0.0),
        planet_density,
        star_density,
        flux_received,
    }
}
