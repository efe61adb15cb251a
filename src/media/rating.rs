//! Age classification of a title, preferring the French certification.

use serde::{Deserialize, Serialize};

/// Country whose certification wins when present.
pub const PREFERRED_COUNTRY: &str = "FR";

/// Shown when no country carries a certification.
pub const NOT_RATED: &str = "NR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeRating {
    pub certification: String,
    /// French audience label, when the certification is a known one.
    pub label: Option<&'static str>,
}

impl AgeRating {
    pub fn new(certification: impl Into<String>) -> Self {
        let certification = certification.into();
        let label = audience_label(&certification);
        Self {
            certification,
            label,
        }
    }

    pub fn not_rated() -> Self {
        Self::new(NOT_RATED)
    }
}

pub fn audience_label(certification: &str) -> Option<&'static str> {
    match certification.trim().to_uppercase().as_str() {
        "U" | "G" | "TV-G" | "NR" | "10" | "ALL" => Some("Tous publics"),
        "12" | "PG" | "PG-12" | "TV-PG" => Some("-12"),
        "14" | "16" | "TV-14" | "R" => Some("-16"),
        "18" | "NC-17" | "TV-MA" | "X" => Some("-18"),
        _ => None,
    }
}

/// `/movie/{id}/release_dates`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReleaseDates {
    #[serde(default)]
    results: Vec<CountryReleases>,
}

#[derive(Debug, Deserialize)]
struct CountryReleases {
    iso_3166_1: String,
    #[serde(default)]
    release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDate {
    #[serde(default)]
    certification: String,
}

/// `/tv/{id}/content_ratings`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContentRatings {
    #[serde(default)]
    results: Vec<CountryRating>,
}

#[derive(Debug, Deserialize)]
struct CountryRating {
    iso_3166_1: String,
    #[serde(default)]
    rating: String,
}

impl ReleaseDates {
    /// Only the first release of each country is considered.
    pub(crate) fn rating(&self) -> AgeRating {
        pick(self.results.iter().map(|country| {
            let certification = country
                .release_dates
                .first()
                .map(|release| release.certification.as_str())
                .unwrap_or_default();
            (country.iso_3166_1.as_str(), certification)
        }))
    }
}

impl ContentRatings {
    pub(crate) fn rating(&self) -> AgeRating {
        pick(
            self.results
                .iter()
                .map(|country| (country.iso_3166_1.as_str(), country.rating.as_str())),
        )
    }
}

fn pick<'a>(countries: impl Iterator<Item = (&'a str, &'a str)>) -> AgeRating {
    let mut first = None;
    for (country, certification) in countries {
        let certification = certification.trim();
        if certification.is_empty() {
            continue;
        }
        if country == PREFERRED_COUNTRY {
            return AgeRating::new(certification);
        }
        first.get_or_insert(certification);
    }
    first.map_or_else(AgeRating::not_rated, AgeRating::new)
}
