//! Encyclopedia summaries shown under detail pages.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{Category, LookupError};

/// Page summaries from the encyclopedia REST API.
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSummary {
    pub extract: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// Text block rendered under a title or an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synopsis {
    pub heading: &'static str,
    pub text: String,
    pub url: Option<String>,
}

impl Synopsis {
    /// The service's own description wins over the encyclopedia extract;
    /// the link is kept whenever the encyclopedia lookup succeeded.
    pub fn resolve(
        category: Category,
        fallback: Option<&str>,
        wiki: Option<WikiSummary>,
    ) -> Option<Self> {
        let heading = match category {
            Category::Person => "Biographie",
            Category::Movie | Category::Tv => "Synopsis",
        };
        let fallback = fallback.map(str::trim).filter(|text| !text.is_empty());

        match (fallback, wiki) {
            (None, None) => None,
            (Some(text), wiki) => Some(Self {
                heading,
                text: text.to_string(),
                url: wiki.and_then(|wiki| wiki.url),
            }),
            (None, Some(wiki)) => Some(Self {
                heading,
                text: wiki.extract,
                url: wiki.url,
            }),
        }
    }
}

impl WikipediaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn summary_url(&self, title: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| LookupError::Decode(format!("encyclopedia base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Decode(format!("{} cannot hold a path", self.base_url)))?
            .extend(["page", "summary", title]);
        Ok(url)
    }

    /// Summary of the page named `title`, or `None` when there is no such page.
    #[tracing::instrument(name = "wikipedia_summary", skip(self))]
    pub async fn summary(&self, title: &str) -> Result<Option<WikiSummary>, LookupError> {
        let response = self.http.get(self.summary_url(title)?).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(LookupError::Status(status.as_u16())),
            _ => {}
        }

        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|err| LookupError::Decode(err.to_string()))?;

        Ok(Some(WikiSummary {
            extract: body.extract,
            url: body
                .content_urls
                .and_then(|urls| urls.desktop)
                .map(|desktop| desktop.page),
        }))
    }

    /// Adds a `synopsis` entry to a detail document. The page is looked up
    /// by the document's title, and a failed lookup leaves only the
    /// document's own description.
    pub async fn with_synopsis(&self, category: Category, mut document: Value) -> Value {
        let title = ["title", "name"]
            .iter()
            .find_map(|key| document.get(*key).and_then(Value::as_str))
            .map(str::to_string);
        let fallback = ["overview", "biography"]
            .iter()
            .find_map(|key| document.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        let wiki = match title {
            Some(title) => self.summary(&title).await.unwrap_or_else(|err| {
                tracing::warn!(%category, error = %err, "Encyclopedia lookup failed");
                None
            }),
            None => None,
        };

        let synopsis = Synopsis::resolve(category, fallback.as_deref(), wiki);
        if let Some(object) = document.as_object_mut() {
            object.insert(
                "synopsis".to_string(),
                serde_json::to_value(synopsis).unwrap_or(Value::Null),
            );
        }
        document
    }
}
