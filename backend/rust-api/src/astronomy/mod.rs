//! Low-precision astronomy formulas.
//!
//! Everything here is a closed-form evaluation: no I/O, no shared state.
//! Accuracy is in the "planetarium app" range (arc-minutes for the Sun,
//! about a degree for the Moon and planets), which is what the lesson
//! content and sky pages display.

pub mod ephemeris;
pub mod exoplanet;
pub mod julian;
pub mod locations;
pub mod moon;
pub mod sky;
pub mod sun_times;
pub mod zodiac;

pub use ephemeris::{moon_longitude, planet_longitude, sun_longitude, Planet};
pub use julian::{from_julian_day, to_julian_day};
pub use moon::{moon_phase, LunarPhase, MoonPhase};
pub use sun_times::{sun_times, DaylightCondition, SunTimes};
pub use zodiac::{constellation, ZodiacPosition, ZodiacSign};

/// Wraps an angle in degrees into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub(crate) fn to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

pub(crate) fn to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Smallest absolute difference between two longitudes, in degrees.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = normalize_angle(a - b);
    diff.min(360.0 - diff)
}
