use axum::{extract::Path, response::IntoResponse, Json};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    astronomy::{
        self,
        ephemeris::{lahiri_ayanamsa, to_sidereal},
        exoplanet,
        locations::{find_site, Site, SITES},
        sky::light_travel_time,
        Planet, ZodiacPosition,
    },
    error::ApiError,
    extractors::AppQuery,
};

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_instant(at: Option<&str>) -> Result<DateTime<Utc>, ApiError> {
    let Some(raw) = at.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Utc::now());
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ApiError::bad_request(format!("Invalid 'at' value: {}", raw)))
}

#[derive(Debug, Deserialize)]
pub struct AtQuery {
    pub at: Option<String>,
}

/// GET /api/sky/moon
pub async fn moon(AppQuery(query): AppQuery<AtQuery>) -> Result<impl IntoResponse, ApiError> {
    let at = parse_instant(query.at.as_deref())?;
    Ok(Json(astronomy::moon_phase(at)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SunQuery {
    #[validate(range(min = -90.0, max = 90.0, message = "lat must be between -90 and 90"))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "lon must be between -180 and 180"))]
    pub lon: Option<f64>,
    pub at: Option<String>,
    pub site: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SunResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<&'static Site>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub times: astronomy::SunTimes,
}

/// GET /api/sky/sun?lat=&lon=&at= or ?site=
pub async fn sun(AppQuery(query): AppQuery<SunQuery>) -> Result<impl IntoResponse, ApiError> {
    query.validate()?;
    // NaN slips through the range check
    if [query.lat, query.lon].into_iter().flatten().any(|v| !v.is_finite()) {
        return Err(ApiError::bad_request("lat and lon must be finite numbers"));
    }
    let date = parse_instant(query.at.as_deref())?.date_naive();

    let (site, latitude, longitude) = match query.site.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => {
            let site = find_site(slug)
                .ok_or_else(|| ApiError::not_found(format!("Unknown site: {}", slug)))?;
            (Some(site), site.lat, site.lon)
        }
        None => match (query.lat, query.lon) {
            (Some(lat), Some(lon)) => (None, lat, lon),
            _ => return Err(ApiError::bad_request("Provide lat and lon, or site")),
        },
    };

    Ok(Json(SunResponse {
        site,
        latitude,
        longitude,
        times: astronomy::sun_times(date, latitude, longitude),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PositionsQuery {
    pub at: Option<String>,
    #[serde(default)]
    pub sidereal: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPosition {
    pub name: &'static str,
    pub symbol: &'static str,
    pub longitude: f64,
    pub zodiac: ZodiacPosition,
    pub constellation: &'static str,
}

impl BodyPosition {
    fn new(name: &'static str, symbol: &'static str, longitude: f64) -> Self {
        Self {
            name,
            symbol,
            longitude,
            zodiac: ZodiacPosition::from_longitude(longitude),
            constellation: astronomy::constellation(longitude),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub at: DateTime<Utc>,
    pub julian_day: f64,
    pub sidereal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ayanamsa: Option<f64>,
    pub bodies: Vec<BodyPosition>,
}

/// GET /api/sky/positions
pub async fn positions(
    AppQuery(query): AppQuery<PositionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let at = parse_instant(query.at.as_deref())?;
    let jd = astronomy::to_julian_day(at);
    let year = 2000.0 + (jd - astronomy::julian::J2000) / 365.25;

    // Constellations are fixed on the sky, so they use the tropical longitude
    let body = |name, symbol, tropical: f64| {
        let mut position = BodyPosition::new(name, symbol, tropical);
        if query.sidereal {
            let sidereal = to_sidereal(tropical, year);
            position.longitude = sidereal;
            position.zodiac = ZodiacPosition::from_longitude(sidereal);
        }
        position
    };

    let mut bodies = vec![
        body("Sun", "☉", astronomy::sun_longitude(jd)),
        body("Moon", "☽", astronomy::moon_longitude(jd)),
    ];
    bodies.extend(
        Planet::ALL
            .iter()
            .map(|p| body(p.name(), p.symbol(), astronomy::planet_longitude(*p, jd))),
    );

    Ok(Json(PositionsResponse {
        at,
        julian_day: jd,
        sidereal: query.sidereal,
        ayanamsa: query.sidereal.then(|| lahiri_ayanamsa(year)),
        bodies,
    }))
}

/// GET /api/sky/sites
pub async fn sites() -> impl IntoResponse {
    Json(&SITES[..])
}

/// GET /api/sky/exoplanets/{seed}
pub async fn exoplanet(Path(seed): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let seed: u32 = seed
        .parse()
        .map_err(|_| ApiError::bad_request("seed must be a non-negative integer"))?;
    Ok(Json(exoplanet::generate(seed)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LightTravelQuery {
    #[validate(range(min = 0.0, message = "lightYears must be zero or positive"))]
    pub light_years: Option<f64>,
}

/// GET /api/sky/light-travel?lightYears=
pub async fn light_travel(
    AppQuery(query): AppQuery<LightTravelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    query.validate()?;
    let light_years = query
        .light_years
        .filter(|ly| ly.is_finite())
        .ok_or_else(|| ApiError::bad_request("Missing or invalid lightYears"))?;
    Ok(Json(light_travel_time(light_years)))
}
