use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{moon_longitude, normalize_angle, sun_longitude, to_julian_day, to_rad};

/// Mean synodic month in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LunarPhase {
    #[serde(rename = "New Moon")]
    NewMoon,
    #[serde(rename = "Waxing Crescent")]
    WaxingCrescent,
    #[serde(rename = "First Quarter")]
    FirstQuarter,
    #[serde(rename = "Waxing Gibbous")]
    WaxingGibbous,
    #[serde(rename = "Full Moon")]
    FullMoon,
    #[serde(rename = "Waning Gibbous")]
    WaningGibbous,
    #[serde(rename = "Last Quarter")]
    LastQuarter,
    #[serde(rename = "Waning Crescent")]
    WaningCrescent,
}

impl LunarPhase {
    /// Eight bins of 1/8 cycle centred on the principal phases, so a new
    /// moon covers both the start and the end of the cycle.
    pub fn from_fraction(phase: f64) -> Self {
        match phase {
            p if p < 0.0625 => LunarPhase::NewMoon,
            p if p < 0.1875 => LunarPhase::WaxingCrescent,
            p if p < 0.3125 => LunarPhase::FirstQuarter,
            p if p < 0.4375 => LunarPhase::WaxingGibbous,
            p if p < 0.5625 => LunarPhase::FullMoon,
            p if p < 0.6875 => LunarPhase::WaningGibbous,
            p if p < 0.8125 => LunarPhase::LastQuarter,
            p if p < 0.9375 => LunarPhase::WaningCrescent,
            _ => LunarPhase::NewMoon,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LunarPhase::NewMoon => "New Moon",
            LunarPhase::WaxingCrescent => "Waxing Crescent",
            LunarPhase::FirstQuarter => "First Quarter",
            LunarPhase::WaxingGibbous => "Waxing Gibbous",
            LunarPhase::FullMoon => "Full Moon",
            LunarPhase::WaningGibbous => "Waning Gibbous",
            LunarPhase::LastQuarter => "Last Quarter",
            LunarPhase::WaningCrescent => "Waning Crescent",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            LunarPhase::NewMoon => "🌑",
            LunarPhase::WaxingCrescent => "🌒",
            LunarPhase::FirstQuarter => "🌓",
            LunarPhase::WaxingGibbous => "🌔",
            LunarPhase::FullMoon => "🌕",
            LunarPhase::WaningGibbous => "🌖",
            LunarPhase::LastQuarter => "🌗",
            LunarPhase::WaningCrescent => "🌘",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonPhase {
    /// Position in the synodic cycle, 0 (new) to 1.
    pub phase: f64,
    /// Illuminated fraction of the disc, 0 to 1.
    pub illumination: f64,
    pub phase_name: LunarPhase,
    pub emoji: &'static str,
    /// Days since the last new moon.
    pub age_days: f64,
}

impl MoonPhase {
    /// Builds the phase from the Moon–Sun elongation in degrees.
    pub fn from_elongation(elongation: f64) -> Self {
        let elongation = normalize_angle(elongation);
        let phase = elongation / 360.0;
        let name = LunarPhase::from_fraction(phase);
        Self {
            phase,
            illumination: (1.0 - to_rad(elongation).cos()) / 2.0,
            phase_name: name,
            emoji: name.emoji(),
            age_days: phase * SYNODIC_MONTH_DAYS,
        }
    }
}

pub fn moon_phase(at: DateTime<Utc>) -> MoonPhase {
    let jd = to_julian_day(at);
    MoonPhase::from_elongation(moon_longitude(jd) - sun_longitude(jd))
}
