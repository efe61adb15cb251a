//! Media lookup service types.

pub mod rating;
pub mod tmdb;
pub mod wikipedia;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rating::AgeRating;
pub use tmdb::TmdbClient;
pub use wikipedia::{Synopsis, WikipediaClient};

/// Result category exposed by the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Tv,
    Person,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Tv => "tv",
            Category::Person => "person",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Category::Movie),
            "tv" => Ok(Category::Tv),
            "person" => Ok(Category::Person),
            other => Err(LookupError::UnknownCategory(other.to_string())),
        }
    }
}

/// Listings only exist for movies and series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Movie,
    Tv,
}

impl ListingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingKind::Movie => "movie",
            ListingKind::Tv => "tv",
        }
    }

    pub(crate) fn year_param(self) -> &'static str {
        match self {
            ListingKind::Movie => "primary_release_year",
            ListingKind::Tv => "first_air_date_year",
        }
    }
}

/// One candidate shown in the search dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub id: u64,
    pub name: String,
    pub category: Category,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            total_pages: 0,
            results: Vec::new(),
        }
    }

    /// Whether a "load more" request for the next page makes sense.
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Filters of the movie and series listing pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DiscoverFilter {
    pub genre: Option<u64>,
    pub year: Option<u16>,
    pub page: Option<u32>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to media service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("media service answered with status {0}")]
    Status(u16),
    #[error("could not decode media service response: {0}")]
    Decode(String),
    #[error("media not found")]
    NotFound,
    #[error("unknown media category '{0}'")]
    UnknownCategory(String),
}

/// Free-text lookup used by the suggestion dropdown.
///
/// Results arrive ranked by the service; callers only truncate.
#[async_trait]
pub trait MediaLookup: Send + Sync {
    async fn suggest(
        &self,
        query: &str,
        category: Option<Category>,
        language: &str,
    ) -> Result<Vec<SuggestionItem>, LookupError>;
}
