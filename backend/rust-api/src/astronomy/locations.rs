use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    City,
    Observatory,
}

/// A named place the sky pages can be computed for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Site {
    pub slug: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub kind: SiteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
}

const fn city(
    slug: &'static str,
    name: &'static str,
    country: &'static str,
    lat: f64,
    lon: f64,
    population: u64,
) -> Site {
    Site {
        slug,
        name,
        country,
        lat,
        lon,
        kind: SiteKind::City,
        population: Some(population),
    }
}

const fn observatory(
    slug: &'static str,
    name: &'static str,
    country: &'static str,
    lat: f64,
    lon: f64,
) -> Site {
    Site {
        slug,
        name,
        country,
        lat,
        lon,
        kind: SiteKind::Observatory,
        population: None,
    }
}

pub const SITES: [Site; 20] = [
    city("mumbai", "Mumbai", "India", 19.076, 72.8777, 20_000_000),
    city("delhi", "Delhi", "India", 28.6139, 77.209, 16_000_000),
    city("bangalore", "Bangalore", "India", 12.9716, 77.5946, 8_400_000),
    city("london", "London", "UK", 51.5074, -0.1278, 8_900_000),
    city("newyork", "New York", "USA", 40.7128, -74.006, 8_300_000),
    city("tokyo", "Tokyo", "Japan", 35.6762, 139.6503, 13_960_000),
    city("sydney", "Sydney", "Australia", -33.8688, 151.2093, 5_312_000),
    city("capetown", "Cape Town", "South Africa", -33.9249, 18.4241, 4_618_000),
    city("paris", "Paris", "France", 48.8566, 2.3522, 2_161_000),
    city("dubai", "Dubai", "UAE", 25.2048, 55.2708, 3_331_000),
    observatory("hanle", "Hanle Observatory", "India", 32.78, 78.96),
    observatory("mauna_kea", "Mauna Kea Observatory", "USA", 19.8207, -155.4681),
    observatory("paranal", "Paranal Observatory", "Chile", -24.6275, -70.4044),
    observatory("arecibo", "Arecibo", "Puerto Rico", 18.3464, -66.7528),
    observatory("sutherland", "Sutherland Observatory", "South Africa", -32.3792, 20.8108),
    city("beijing", "Beijing", "China", 39.9042, 116.4074, 21_540_000),
    city("moscow", "Moscow", "Russia", 55.7558, 37.6173, 12_500_000),
    city("saopaulo", "São Paulo", "Brazil", -23.5505, -46.6333, 12_300_000),
    city("cairo", "Cairo", "Egypt", 30.0444, 31.2357, 10_230_000),
    city("nairobi", "Nairobi", "Kenya", -1.2921, 36.8219, 4_397_000),
];

pub fn find_site(slug: &str) -> Option<&'static Site> {
    SITES.iter().find(|site| site.slug.eq_ignore_ascii_case(slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugs_are_unique() {
        let slugs: HashSet<_> = SITES.iter().map(|site| site.slug).collect();
        assert_eq!(slugs.len(), SITES.len());
    }

    #[test]
    fn coordinates_are_in_range() {
        for site in &SITES {
            assert!((-90.0..=90.0).contains(&site.lat), "{}", site.slug);
            assert!((-180.0..=180.0).contains(&site.lon), "{}", site.slug);
        }
    }

    #[test]
    fn observatories_have_no_population() {
        for site in SITES.iter().filter(|s| s.kind == SiteKind::Observatory) {
            assert!(site.population.is_none());
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_site("London").map(|s| s.name), Some("London"));
        assert_eq!(find_site("mauna_kea").map(|s| s.country), Some("USA"));
        assert!(find_site("atlantis").is_none());
    }
}
