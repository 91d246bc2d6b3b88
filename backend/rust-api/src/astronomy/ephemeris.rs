//! Ecliptic longitudes for the Sun, Moon and naked-eye planets.

use serde::{Deserialize, Serialize};

use super::julian::{julian_centuries, J2000};
use super::{normalize_angle, to_rad};

/// Geometric ecliptic longitude of the Sun in degrees (Meeus, ch. 25,
/// equation of centre to the third harmonic).
pub fn sun_longitude(jd: f64) -> f64 {
    let t = julian_centuries(jd);
    let mean_longitude = normalize_angle(280.46646 + 36000.76983 * t + 0.0003032 * t * t);
    let mean_anomaly = to_rad(normalize_angle(
        357.52911 + 35999.05029 * t - 0.0001537 * t * t,
    ));
    let centre = (1.914602 - 0.004817 * t - 0.000014 * t * t) * mean_anomaly.sin()
        + (0.019993 - 0.000101 * t) * (2.0 * mean_anomaly).sin()
        + 0.000289 * (3.0 * mean_anomaly).sin();
    normalize_angle(mean_longitude + centre)
}

/// Ecliptic longitude of the Moon in degrees using the six largest
/// periodic terms (evection, variation, annual equation...).
pub fn moon_longitude(jd: f64) -> f64 {
    let t = julian_centuries(jd);
    let mean_longitude = normalize_angle(218.3165 + 481267.8813 * t);
    let elongation = normalize_angle(297.8502 + 445267.1115 * t);
    let sun_anomaly = normalize_angle(357.5291 + 35999.0503 * t);
    let moon_anomaly = normalize_angle(134.9634 + 477198.8676 * t);
    let latitude_argument = normalize_angle(93.272 + 483202.0175 * t);

    let longitude = mean_longitude + 6.289 * to_rad(moon_anomaly).sin()
        + 1.274 * to_rad(2.0 * elongation - moon_anomaly).sin()
        + 0.658 * to_rad(2.0 * elongation).sin()
        + 0.214 * to_rad(2.0 * moon_anomaly).sin()
        - 0.186 * to_rad(sun_anomaly).sin()
        - 0.114 * to_rad(2.0 * latitude_argument).sin();

    normalize_angle(longitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Planet {
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
}

impl Planet {
    pub const ALL: [Planet; 5] = [
        Planet::Mercury,
        Planet::Venus,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Planet::Mercury => "☿",
            Planet::Venus => "♀",
            Planet::Mars => "♂",
            Planet::Jupiter => "♃",
            Planet::Saturn => "♄",
        }
    }

    /// Sidereal orbital period in days.
    pub fn orbital_period_days(self) -> f64 {
        match self {
            Planet::Mercury => 87.969,
            Planet::Venus => 224.701,
            Planet::Mars => 686.98,
            Planet::Jupiter => 4332.59,
            Planet::Saturn => 10759.22,
        }
    }

    /// Longitude at J2000.0 used as the phase of the mean-motion model.
    fn epoch_longitude(self) -> f64 {
        match self {
            Planet::Mercury => 174.796,
            Planet::Venus => 50.416,
            Planet::Mars => 19.373,
            Planet::Jupiter => 20.02,
            Planet::Saturn => 317.02,
        }
    }
}

/// Mean-motion longitude of a planet in degrees.
///
/// Uniform circular motion from the J2000 phase; no eccentricity or
/// geocentric correction, so expect tens of degrees of error for the
/// inner planets. Good enough to place a planet in a sign for teaching.
pub fn planet_longitude(planet: Planet, jd: f64) -> f64 {
    let days = jd - J2000;
    normalize_angle(planet.epoch_longitude() + (360.0 / planet.orbital_period_days()) * days)
}

/// Lahiri ayanamsa (precession offset between tropical and sidereal
/// zodiacs) for a calendar year, in degrees.
pub fn lahiri_ayanamsa(year: f64) -> f64 {
    23.856 + (year - 2000.0) * 0.01397
}

/// Converts a tropical longitude to the sidereal (Lahiri) frame.
pub fn to_sidereal(tropical_longitude: f64, year: f64) -> f64 {
    normalize_angle(tropical_longitude - lahiri_ayanamsa(year))
}
