//! Parking spot domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::support::errors::{DomainError, DomainResult};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Spot category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SpotType {
    Standard,
    Handicap,
    Electric,
}

impl SpotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Handicap => "handicap",
            Self::Electric => "electric",
        }
    }
}

impl FromStr for SpotType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "handicap" => Ok(Self::Handicap),
            "electric" => Ok(Self::Electric),
            other => Err(DomainError::InvalidInput(format!(
                "Unknown spot type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SpotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> DomainResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::InvalidInput(format!(
                "Coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle (haversine) distance in kilometres
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Physical parking location
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingSpot {
    pub id: i32,
    pub location: GeoPoint,
    pub address: String,
    pub price_per_hour: f64,
    pub spot_type: SpotType,
    /// Convenience flag kept in sync by the lifecycle jobs; occupancy
    /// shown to clients is always derived from reservations.
    pub is_occupied: bool,
    pub created_at: DateTime<Utc>,
}

/// Provisioning input
#[derive(Debug, Clone)]
pub struct NewParkingSpot {
    pub location: GeoPoint,
    pub address: String,
    pub price_per_hour: f64,
    pub spot_type: SpotType,
}

impl NewParkingSpot {
    pub fn validate(&self) -> DomainResult<()> {
        if self.address.trim().is_empty() {
            return Err(DomainError::InvalidInput("Address is required".into()));
        }
        if !self.price_per_hour.is_finite() || self.price_per_hour < 0.0 {
            return Err(DomainError::InvalidInput(
                "Price per hour must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_known_points() {
        // Bucharest (Piata Unirii) to Cluj-Napoca, roughly 324 km
        let bucharest = GeoPoint::new(44.4268, 26.1025).unwrap();
        let cluj = GeoPoint::new(46.7712, 23.6236).unwrap();
        let d = bucharest.distance_km(&cluj);
        assert!((d - 324.0).abs() < 5.0, "got {d}");
        assert!(bucharest.distance_km(&bucharest).abs() < 1e-9);
    }

    #[test]
    fn coordinates_validated() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn spot_type_parse() {
        assert_eq!("electric".parse::<SpotType>().unwrap(), SpotType::Electric);
        assert!("valet".parse::<SpotType>().is_err());
    }

    #[test]
    fn negative_price_rejected() {
        let spot = NewParkingSpot {
            location: GeoPoint::new(0.0, 0.0).unwrap(),
            address: "Str. Lunga 1".into(),
            price_per_hour: -1.0,
            spot_type: SpotType::Standard,
        };
        assert!(spot.validate().is_err());
    }
}
