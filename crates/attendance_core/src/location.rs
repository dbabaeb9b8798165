//! crates/attendance_core/src/location.rs
//!
//! Office/remote detection from the coordinates a browser reports at check-in.

use crate::domain::WorkMode;
use crate::ports::{PortError, PortResult};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> PortResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PortError::Invalid(format!(
                "Coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// The office and how far from it a check-in still counts as "in the office".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfficeLocation {
    pub center: Coordinates,
    pub radius_meters: f64,
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Without a configured office or without coordinates a check-in is remote.
pub fn detect_mode(office: Option<&OfficeLocation>, position: Option<Coordinates>) -> WorkMode {
    match (office, position) {
        (Some(office), Some(position))
            if haversine_meters(office.center, position) <= office.radius_meters =>
        {
            WorkMode::Office
        }
        _ => WorkMode::Remote,
    }
}
