//! Procedurally generated exoplanets for the "planet builder" lessons.
//!
//! Generation is a pure function of the seed, so a seed shared in a URL
//! always shows the same world.

use serde::Serialize;

/// Park–Miller minimal standard generator.
struct Lehmer {
    state: i64,
}

impl Lehmer {
    const MULTIPLIER: i64 = 16_807;
    const MODULUS: i64 = 2_147_483_647;

    fn new(seed: u32) -> Self {
        Self {
            state: i64::from(seed),
        }
    }

    fn next_f64(&mut self) -> f64 {
        self.state = (self.state * Self::MULTIPLIER) % Self::MODULUS;
        (self.state - 1) as f64 / (Self::MODULUS - 1) as f64
    }
}

struct StarClass {
    letter: &'static str,
    probability: f64,
    temperature: (f64, f64),
}

/// Main-sequence classes weighted by how common they are.
const STAR_CLASSES: [StarClass; 5] = [
    StarClass { letter: "M", probability: 0.76, temperature: (2400.0, 3700.0) },
    StarClass { letter: "K", probability: 0.12, temperature: (3700.0, 5200.0) },
    StarClass { letter: "G", probability: 0.08, temperature: (5200.0, 6000.0) },
    StarClass { letter: "F", probability: 0.03, temperature: (6000.0, 7500.0) },
    StarClass { letter: "A", probability: 0.01, temperature: (7500.0, 10000.0) },
];

const CATALOG_PREFIXES: [&str; 8] = [
    "Kepler", "TOI", "K2", "TRAPPIST", "HD", "GJ", "WASP", "HAT-P",
];

const SUN_TEMPERATURE: f64 = 5778.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanetClass {
    #[serde(rename = "Sub-Earth")]
    SubEarth,
    #[serde(rename = "Earth-like")]
    EarthLike,
    #[serde(rename = "Super-Earth")]
    SuperEarth,
    #[serde(rename = "Mini-Neptune")]
    MiniNeptune,
    #[serde(rename = "Neptune-like")]
    NeptuneLike,
    #[serde(rename = "Gas Giant")]
    GasGiant,
}

impl PlanetClass {
    /// Classification by radius in Earth radii.
    pub fn from_radius(radius: f64) -> Self {
        match radius {
            r if r < 1.0 => PlanetClass::SubEarth,
            r if r < 1.6 => PlanetClass::EarthLike,
            r if r < 2.5 => PlanetClass::SuperEarth,
            r if r < 6.0 => PlanetClass::MiniNeptune,
            r if r < 15.0 => PlanetClass::NeptuneLike,
            _ => PlanetClass::GasGiant,
        }
    }

    fn is_rocky(self) -> bool {
        matches!(self, PlanetClass::EarthLike | PlanetClass::SuperEarth)
    }

    fn is_gaseous(self) -> bool {
        matches!(
            self,
            PlanetClass::MiniNeptune | PlanetClass::NeptuneLike | PlanetClass::GasGiant
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exoplanet {
    pub seed: u32,
    pub name: String,
    pub star_type: &'static str,
    /// Kelvin
    pub star_temp: i64,
    /// Days, one decimal
    pub orbital_period: f64,
    /// Earth radii, two decimals
    pub radius: f64,
    /// Earth masses, two decimals
    pub mass: f64,
    /// Kelvin
    pub equilibrium_temp: i64,
    /// Light-years
    pub distance: i64,
    #[serde(rename = "type")]
    pub class: PlanetClass,
    pub habitable: bool,
    pub atmosphere: Vec<&'static str>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Generates the exoplanet for `seed`.
///
/// The draw order is part of the contract: changing it changes every
/// planet a user has already bookmarked.
pub fn generate(seed: u32) -> Exoplanet {
    let mut rng = Lehmer::new(seed);

    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    let star = STAR_CLASSES
        .iter()
        .find(|class| {
            cumulative += class.probability;
            roll < cumulative
        })
        .unwrap_or(&STAR_CLASSES[0]);

    let (min_temp, max_temp) = star.temperature;
    let star_temp = min_temp + rng.next_f64() * (max_temp - min_temp);
    let orbital_period = (rng.next_f64() * 8.0 + 0.5).exp();
    let radius = if rng.next_f64() < 0.6 {
        0.5 + rng.next_f64() * 3.0
    } else {
        3.0 + rng.next_f64() * 20.0
    };
    let mass = if radius < 2.0 {
        radius.powf(3.5) * (0.5 + rng.next_f64())
    } else {
        radius.powi(2) * (0.5 + rng.next_f64() * 2.0)
    };
    let distance = (rng.next_f64() * 6.0 + 3.0).exp();

    let luminosity = (star_temp / SUN_TEMPERATURE).powi(4);
    let semi_major_axis = (orbital_period / 365.25).powf(2.0 / 3.0) * luminosity.powf(0.25);
    let equilibrium_temp =
        star_temp * luminosity.powf(0.25) / (semi_major_axis * 2.0).sqrt() * 0.25;

    let habitable = equilibrium_temp > 200.0 && equilibrium_temp < 320.0 && radius < 2.5;
    let class = PlanetClass::from_radius(radius);

    let mut atmosphere = Vec::new();
    if class.is_rocky() {
        if rng.next_f64() > 0.3 {
            atmosphere.push("N2");
        }
        if rng.next_f64() > 0.4 {
            atmosphere.push("CO2");
        }
        if rng.next_f64() > 0.5 {
            atmosphere.push("H2O");
        }
        // Only habitable worlds consume the oxygen roll
        if habitable && rng.next_f64() > 0.7 {
            atmosphere.push("O2");
        }
    } else if class.is_gaseous() {
        atmosphere.extend(["H2", "He"]);
        if rng.next_f64() > 0.5 {
            atmosphere.push("CH4");
        }
        if rng.next_f64() > 0.7 {
            atmosphere.push("NH3");
        }
    }

    let prefix = CATALOG_PREFIXES[(rng.next_f64() * CATALOG_PREFIXES.len() as f64).floor() as usize
        % CATALOG_PREFIXES.len()];
    let number = (rng.next_f64() * 9000.0).floor() as i64 + 100;
    let letter = char::from(b'b' + ((rng.next_f64() * 5.0).floor() as u8).min(4));

    Exoplanet {
        seed,
        name: format!("{}-{}{}", prefix, number, letter),
        star_type: star.letter,
        star_temp: star_temp.round() as i64,
        orbital_period: round_to(orbital_period, 1),
        radius: round_to(radius, 2),
        mass: round_to(mass, 2),
        equilibrium_temp: equilibrium_temp.round() as i64,
        distance: distance.round() as i64,
        class,
        habitable,
        atmosphere,
    }
}
