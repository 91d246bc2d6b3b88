use serde::Serialize;

use super::{to_deg, to_rad};

const DAYS_PER_YEAR: f64 = 365.25;

/// Altitude above the horizon in degrees for a body at `declination`,
/// seen from `latitude` at the given local hour angle.
pub fn altitude(declination: f64, latitude: f64, hour_angle: f64) -> f64 {
    let dec = to_rad(declination);
    let lat = to_rad(latitude);
    let ha = to_rad(hour_angle);
    let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos();
    to_deg(sin_alt.clamp(-1.0, 1.0).asin())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightTravelTime {
    pub years: u64,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub description: String,
}

/// Breaks a distance in light-years into the time light needs to cover it,
/// with a description in the most readable unit.
pub fn light_travel_time(light_years: f64) -> LightTravelTime {
    let light_years = light_years.max(0.0);

    let years = light_years.floor();
    let remaining_days = (light_years - years) * DAYS_PER_YEAR;
    let days = remaining_days.floor();
    let remaining_hours = (remaining_days - days) * 24.0;
    let hours = remaining_hours.floor();
    let remaining_minutes = (remaining_hours - hours) * 60.0;
    let minutes = remaining_minutes.floor();
    let seconds = ((remaining_minutes - minutes) * 60.0).floor();

    let description = if light_years < 0.0001 {
        format!("{:.1} light-minutes", light_years * DAYS_PER_YEAR * 24.0 * 60.0)
    } else if light_years < 0.01 {
        format!("{:.1} light-hours", light_years * DAYS_PER_YEAR * 24.0)
    } else if light_years < 1.0 {
        format!("{:.0} light-days", light_years * DAYS_PER_YEAR)
    } else if light_years < 1_000.0 {
        format!("{:.1} light-years", light_years)
    } else if light_years < 1_000_000.0 {
        format!("{:.1} thousand light-years", light_years / 1_000.0)
    } else {
        format!("{:.1} million light-years", light_years / 1_000_000.0)
    };

    LightTravelTime {
        years: years as u64,
        days: days as u32,
        hours: hours as u32,
        minutes: minutes as u32,
        seconds: seconds as u32,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zenith_and_horizon() {
        assert!((altitude(30.0, 30.0, 0.0) - 90.0).abs() < 1e-9);
        assert!(altitude(0.0, 0.0, 90.0).abs() < 1e-9);
        assert!((altitude(0.0, 45.0, 180.0) + 45.0).abs() < 1e-9);
    }

    #[test]
    fn altitude_is_symmetric_in_hour_angle() {
        let east = altitude(12.0, 48.0, -40.0);
        let west = altitude(12.0, 48.0, 40.0);
        assert!((east - west).abs() < 1e-9);
    }

    #[test]
    fn sunlight_takes_about_eight_minutes() {
        // 1 AU in light-years
        let travel = light_travel_time(1.581e-5);
        assert_eq!(travel.years, 0);
        assert_eq!(travel.hours, 0);
        assert_eq!(travel.minutes, 8);
        assert_eq!(travel.description, "8.3 light-minutes");
    }

    #[test]
    fn descriptions_switch_units() {
        assert_eq!(light_travel_time(0.001).description, "8.8 light-hours");
        assert_eq!(light_travel_time(0.5).description, "183 light-days");
        assert_eq!(light_travel_time(4.24).description, "4.2 light-years");
        assert_eq!(light_travel_time(26_000.0).description, "26.0 thousand light-years");
        assert_eq!(light_travel_time(2_537_000.0).description, "2.5 million light-years");
    }

    #[test]
    fn proxima_breakdown() {
        let travel = light_travel_time(4.25);
        assert_eq!(travel.years, 4);
        assert_eq!(travel.days, 91);
        assert_eq!(travel.hours, 7);
    }

    #[test]
    fn negative_distance_is_clamped() {
        let travel = light_travel_time(-3.0);
        assert_eq!(travel.years, 0);
        assert_eq!(travel.seconds, 0);
        assert_eq!(travel.description, "0.0 light-minutes");
    }
}
