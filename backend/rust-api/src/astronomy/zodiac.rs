use serde::Serialize;

use super::normalize_angle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modality {
    Cardinal,
    Fixed,
    Mutable,
}

impl ZodiacSign {
    /// Signs in ecliptic order starting at 0° (vernal point).
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    pub const ARC_DEGREES: f64 = 30.0;

    /// Sign whose 30° arc contains `longitude`. Arcs are half-open:
    /// exactly 30° belongs to Taurus, exactly 360° wraps to Aries.
    pub fn from_longitude(longitude: f64) -> Self {
        let index = (normalize_angle(longitude) / Self::ARC_DEGREES).floor() as usize;
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Start of the sign's arc in degrees.
    pub fn start_longitude(self) -> f64 {
        self.index() as f64 * Self::ARC_DEGREES
    }

    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "♈",
            ZodiacSign::Taurus => "♉",
            ZodiacSign::Gemini => "♊",
            ZodiacSign::Cancer => "♋",
            ZodiacSign::Leo => "♌",
            ZodiacSign::Virgo => "♍",
            ZodiacSign::Libra => "♎",
            ZodiacSign::Scorpio => "♏",
            ZodiacSign::Sagittarius => "♐",
            ZodiacSign::Capricorn => "♑",
            ZodiacSign::Aquarius => "♒",
            ZodiacSign::Pisces => "♓",
        }
    }

    /// Fire, Earth, Air, Water repeat every four signs.
    pub fn element(self) -> Element {
        match self.index() % 4 {
            0 => Element::Fire,
            1 => Element::Earth,
            2 => Element::Air,
            _ => Element::Water,
        }
    }

    pub fn modality(self) -> Modality {
        match self.index() % 3 {
            0 => Modality::Cardinal,
            1 => Modality::Fixed,
            _ => Modality::Mutable,
        }
    }

    pub fn ruler(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Mars",
            ZodiacSign::Taurus => "Venus",
            ZodiacSign::Gemini => "Mercury",
            ZodiacSign::Cancer => "Moon",
            ZodiacSign::Leo => "Sun",
            ZodiacSign::Virgo => "Mercury",
            ZodiacSign::Libra => "Venus",
            ZodiacSign::Scorpio => "Mars/Pluto",
            ZodiacSign::Sagittarius => "Jupiter",
            ZodiacSign::Capricorn => "Saturn",
            ZodiacSign::Aquarius => "Saturn/Uranus",
            ZodiacSign::Pisces => "Jupiter/Neptune",
        }
    }

    /// Name of the corresponding sidereal sign (rashi) in Vedic astrology.
    pub fn rashi(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Mesha",
            ZodiacSign::Taurus => "Vrishabha",
            ZodiacSign::Gemini => "Mithuna",
            ZodiacSign::Cancer => "Karka",
            ZodiacSign::Leo => "Simha",
            ZodiacSign::Virgo => "Kanya",
            ZodiacSign::Libra => "Tula",
            ZodiacSign::Scorpio => "Vrischika",
            ZodiacSign::Sagittarius => "Dhanu",
            ZodiacSign::Capricorn => "Makara",
            ZodiacSign::Aquarius => "Kumbha",
            ZodiacSign::Pisces => "Meena",
        }
    }

    /// Conventional tropical sun-sign date range.
    pub fn date_range(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Mar 21 - Apr 19",
            ZodiacSign::Taurus => "Apr 20 - May 20",
            ZodiacSign::Gemini => "May 21 - Jun 20",
            ZodiacSign::Cancer => "Jun 21 - Jul 22",
            ZodiacSign::Leo => "Jul 23 - Aug 22",
            ZodiacSign::Virgo => "Aug 23 - Sep 22",
            ZodiacSign::Libra => "Sep 23 - Oct 22",
            ZodiacSign::Scorpio => "Oct 23 - Nov 21",
            ZodiacSign::Sagittarius => "Nov 22 - Dec 21",
            ZodiacSign::Capricorn => "Dec 22 - Jan 19",
            ZodiacSign::Aquarius => "Jan 20 - Feb 18",
            ZodiacSign::Pisces => "Feb 19 - Mar 20",
        }
    }
}

/// A longitude resolved to a sign and the degree within that sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZodiacPosition {
    pub sign: ZodiacSign,
    pub symbol: &'static str,
    pub element: Element,
    pub degree: f64,
}

impl ZodiacPosition {
    pub fn from_longitude(longitude: f64) -> Self {
        let normalized = normalize_angle(longitude);
        let sign = ZodiacSign::from_longitude(normalized);
        Self {
            sign,
            symbol: sign.symbol(),
            element: sign.element(),
            degree: normalized - sign.start_longitude(),
        }
    }
}

/// Approximate ecliptic start longitudes of the zodiacal constellations.
/// Unlike signs these are unequal, following the actual star patterns.
const CONSTELLATION_STARTS: [(&str, f64); 12] = [
    ("Pisces", 0.0),
    ("Aries", 25.0),
    ("Taurus", 50.0),
    ("Gemini", 90.0),
    ("Cancer", 120.0),
    ("Leo", 140.0),
    ("Virgo", 175.0),
    ("Libra", 215.0),
    ("Scorpius", 240.0),
    ("Sagittarius", 265.0),
    ("Capricornus", 300.0),
    ("Aquarius", 330.0),
];

/// Zodiacal constellation the given ecliptic longitude falls in.
pub fn constellation(longitude: f64) -> &'static str {
    let lon = normalize_angle(longitude);
    CONSTELLATION_STARTS
        .iter()
        .rev()
        .find(|(_, start)| lon >= *start)
        .map(|(name, _)| *name)
        .unwrap_or("Pisces")
}
