//! Sunrise, sunset and twilight times for a calendar date and site.
//!
//! Uses the sunrise equation with a Julian-cycle anchor, good to a
//! couple of minutes at mid latitudes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::julian::{offset_from, J2000};
use super::{normalize_angle, to_deg, to_julian_day, to_rad};

/// Apparent altitude of the Sun's upper limb at rise/set, with refraction.
pub const SUNRISE_ALTITUDE: f64 = -0.833;
pub const CIVIL_TWILIGHT_ALTITUDE: f64 = -6.0;
pub const NAUTICAL_TWILIGHT_ALTITUDE: f64 = -12.0;
pub const ASTRONOMICAL_TWILIGHT_ALTITUDE: f64 = -18.0;

const OBLIQUITY: f64 = 23.44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaylightCondition {
    Normal,
    /// The Sun stays above the horizon for the whole day.
    MidnightSun,
    /// The Sun never rises.
    PolarNight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SunTimes {
    pub date: NaiveDate,
    pub condition: DaylightCondition,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub civil_dawn: Option<DateTime<Utc>>,
    pub civil_dusk: Option<DateTime<Utc>>,
    pub nautical_dawn: Option<DateTime<Utc>>,
    pub nautical_dusk: Option<DateTime<Utc>>,
    pub astronomical_dawn: Option<DateTime<Utc>>,
    pub astronomical_dusk: Option<DateTime<Utc>>,
    pub solar_noon: DateTime<Utc>,
    /// Hours between sunrise and sunset; 24 under midnight sun, 0 under polar night.
    pub day_length: f64,
    /// Solar declination at transit, degrees.
    pub declination: f64,
}

/// How the Sun's daily path relates to a given altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    /// Half-arc between crossing and transit, degrees of hour angle.
    At(f64),
    AlwaysAbove,
    AlwaysBelow,
}

struct SolarDay {
    transit: f64,
    declination: f64,
    latitude: f64,
}

impl SolarDay {
    fn new(date: NaiveDate, longitude: f64, latitude: f64) -> (Self, DateTime<Utc>, f64) {
        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let midnight_jd = to_julian_day(midnight);

        let cycle = (midnight_jd - J2000 + 0.0008).ceil();
        let mean_noon = cycle - longitude / 360.0;
        let anomaly = to_rad(normalize_angle(357.5291 + 0.98560028 * mean_noon));
        let centre = 1.9148 * anomaly.sin() + 0.02 * (2.0 * anomaly).sin()
            + 0.0003 * (3.0 * anomaly).sin();
        let ecliptic = to_rad(normalize_angle(
            to_deg(anomaly) + centre + 180.0 + 102.9372,
        ));

        let declination = to_deg((ecliptic.sin() * to_rad(OBLIQUITY).sin()).asin());
        let transit =
            J2000 + mean_noon + 0.0053 * anomaly.sin() - 0.0069 * (2.0 * ecliptic).sin();

        (
            Self {
                transit,
                declination,
                latitude,
            },
            midnight,
            midnight_jd,
        )
    }

    fn crossing(&self, altitude: f64) -> Crossing {
        let lat = to_rad(self.latitude);
        let dec = to_rad(self.declination);
        let cos_h = (to_rad(altitude).sin() - lat.sin() * dec.sin()) / (lat.cos() * dec.cos());

        if cos_h.is_nan() {
            // Degenerate geometry at the poles: decide from the transit altitude
            let transit_altitude = 90.0 - (self.latitude - self.declination).abs();
            return if transit_altitude > altitude {
                Crossing::AlwaysAbove
            } else {
                Crossing::AlwaysBelow
            };
        }
        if cos_h > 1.0 {
            Crossing::AlwaysBelow
        } else if cos_h < -1.0 {
            Crossing::AlwaysAbove
        } else {
            Crossing::At(to_deg(cos_h.acos()))
        }
    }
}

/// Sun events for `date` (a UTC calendar day) at the given site.
///
/// Events that do not happen on that day, such as sunrise during polar
/// night or astronomical dusk during white nights, are `None`.
pub fn sun_times(date: NaiveDate, latitude: f64, longitude: f64) -> SunTimes {
    let (day, midnight, midnight_jd) = SolarDay::new(date, longitude, latitude);
    let at = |jd: f64| offset_from(midnight, midnight_jd, jd);
    let pair = |altitude: f64| match day.crossing(altitude) {
        Crossing::At(half_arc) => (
            Some(at(day.transit - half_arc / 360.0)),
            Some(at(day.transit + half_arc / 360.0)),
        ),
        Crossing::AlwaysAbove | Crossing::AlwaysBelow => (None, None),
    };

    let (condition, day_length) = match day.crossing(SUNRISE_ALTITUDE) {
        Crossing::At(half_arc) => (DaylightCondition::Normal, 2.0 * half_arc / 15.0),
        Crossing::AlwaysAbove => (DaylightCondition::MidnightSun, 24.0),
        Crossing::AlwaysBelow => (DaylightCondition::PolarNight, 0.0),
    };

    let (sunrise, sunset) = pair(SUNRISE_ALTITUDE);
    let (civil_dawn, civil_dusk) = pair(CIVIL_TWILIGHT_ALTITUDE);
    let (nautical_dawn, nautical_dusk) = pair(NAUTICAL_TWILIGHT_ALTITUDE);
    let (astronomical_dawn, astronomical_dusk) = pair(ASTRONOMICAL_TWILIGHT_ALTITUDE);

    SunTimes {
        date,
        condition,
        sunrise,
        sunset,
        civil_dawn,
        civil_dusk,
        nautical_dawn,
        nautical_dusk,
        astronomical_dawn,
        astronomical_dusk,
        solar_noon: at(day.transit),
        day_length,
        declination: day.declination,
    }
}
