use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::rating::{AgeRating, ContentRatings, ReleaseDates};
use super::{
    Category, DiscoverFilter, Genre, ListingKind, LookupError, MediaLookup, Page, SuggestionItem,
};

/// Cast entries kept per credit list on an artist page.
pub const CAST_LIMIT: usize = 15;

/// HTTP client for the media database REST API.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

impl TmdbClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
        language: Option<&str>,
    ) -> Result<Value, LookupError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params);
        if let Some(language) = language {
            request = request.query(&[("language", language)]);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => response
                .json::<Value>()
                .await
                .map_err(|err| LookupError::Decode(err.to_string())),
            StatusCode::NOT_FOUND => Err(LookupError::NotFound),
            status => {
                tracing::debug!(path, status = status.as_u16(), "Media service rejected request");
                Err(LookupError::Status(status.as_u16()))
            }
        }
    }

    /// Full search results page, as shown on the results grid.
    #[tracing::instrument(name = "tmdb_search", skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        category: Option<Category>,
        language: &str,
        page: Option<u32>,
    ) -> Result<Page<Value>, LookupError> {
        let path = match category {
            Some(category) => format!("search/{category}"),
            None => "search/multi".to_string(),
        };

        let mut params = vec![("query", query.to_string())];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }

        let body = self.get_json(&path, &params, Some(language)).await?;
        decode(body)
    }

    /// Movie or series listing filtered by genre and year.
    #[tracing::instrument(name = "tmdb_discover", skip(self))]
    pub async fn discover(
        &self,
        kind: ListingKind,
        filter: DiscoverFilter,
    ) -> Result<Page<Value>, LookupError> {
        let mut params = vec![
            ("include_adult", "false".to_string()),
            ("page", filter.page.unwrap_or(1).to_string()),
        ];
        if let Some(year) = filter.year {
            params.push((kind.year_param(), year.to_string()));
        }
        if let Some(genre) = filter.genre {
            params.push(("with_genres", genre.to_string()));
        }

        let body = self
            .get_json(
                &format!("discover/{}", kind.as_str()),
                &params,
                Some(&self.language),
            )
            .await?;
        decode(body)
    }

    pub async fn genres(&self, kind: ListingKind) -> Result<Vec<Genre>, LookupError> {
        let body = self
            .get_json(
                &format!("genre/{}/list", kind.as_str()),
                &[],
                Some(&self.language),
            )
            .await?;
        decode::<GenreList>(body).map(|list| list.genres)
    }

    #[tracing::instrument(name = "tmdb_movie_details", skip(self))]
    pub async fn movie_details(&self, id: u64) -> Result<Value, LookupError> {
        self.title_details("movie", id).await
    }

    #[tracing::instrument(name = "tmdb_serie_details", skip(self))]
    pub async fn serie_details(&self, id: u64) -> Result<Value, LookupError> {
        self.title_details("tv", id).await
    }

    /// Details, videos, credits and recommendations of one title, merged
    /// into a single document with an extra `trailer` entry.
    async fn title_details(&self, kind: &str, id: u64) -> Result<Value, LookupError> {
        let base = format!("{kind}/{id}");
        let language = Some(self.language.as_str());

        let videos_path = format!("{base}/videos");
        let credits_path = format!("{base}/credits");
        let recommendations_path = format!("{base}/recommendations");

        let (details, videos, credits, recommendations) = tokio::try_join!(
            self.get_json(&base, &[], language),
            // Videos are requested without a language so original trailers are included.
            self.get_json(&videos_path, &[], None),
            self.get_json(&credits_path, &[], language),
            self.get_json(&recommendations_path, &[], language),
        )?;

        let trailer = find_trailer(&videos);
        let mut merged = details;
        let object = merged
            .as_object_mut()
            .ok_or_else(|| LookupError::Decode(format!("{base} is not an object")))?;
        object.insert("videos".to_string(), videos);
        object.insert("credits".to_string(), credits);
        object.insert("recommendations".to_string(), recommendations);
        object.insert("trailer".to_string(), trailer);

        Ok(merged)
    }

    /// Age classification of a movie or series. Certifications are not
    /// localized, so no language is sent.
    #[tracing::instrument(name = "tmdb_age_rating", skip(self))]
    pub async fn age_rating(&self, kind: ListingKind, id: u64) -> Result<AgeRating, LookupError> {
        match kind {
            ListingKind::Movie => {
                let body = self.get_json(&format!("movie/{id}/release_dates"), &[], None).await?;
                decode::<ReleaseDates>(body).map(|dates| dates.rating())
            }
            ListingKind::Tv => {
                let body = self.get_json(&format!("tv/{id}/content_ratings"), &[], None).await?;
                decode::<ContentRatings>(body).map(|ratings| ratings.rating())
            }
        }
    }

    /// Person details with their movie and series credits.
    #[tracing::instrument(name = "tmdb_artist_details", skip(self))]
    pub async fn artist_details(&self, id: u64) -> Result<Value, LookupError> {
        let base = format!("person/{id}");
        let language = Some(self.language.as_str());

        let person_params = [("append_to_response", "external_ids".to_string())];
        let movie_credits_path = format!("{base}/movie_credits");
        let tv_credits_path = format!("{base}/tv_credits");

        let (person, movie_credits, tv_credits) = tokio::try_join!(
            self.get_json(&base, &person_params, language),
            self.get_json(&movie_credits_path, &[], language),
            self.get_json(&tv_credits_path, &[], language),
        )?;

        let mut merged = person;
        let object = merged
            .as_object_mut()
            .ok_or_else(|| LookupError::Decode(format!("{base} is not an object")))?;
        object.insert("movies".to_string(), truncated_cast(movie_credits));
        object.insert("tv_shows".to_string(), truncated_cast(tv_credits));

        Ok(merged)
    }
}

#[async_trait]
impl MediaLookup for TmdbClient {
    async fn suggest(
        &self,
        query: &str,
        category: Option<Category>,
        language: &str,
    ) -> Result<Vec<SuggestionItem>, LookupError> {
        let page = self.search(query, category, language, None).await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|entry| to_suggestion(entry, category))
            .collect())
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, LookupError> {
    serde_json::from_value(body).map_err(|err| LookupError::Decode(err.to_string()))
}

fn to_suggestion(entry: Value, fallback: Option<Category>) -> Option<SuggestionItem> {
    let raw: RawResult = serde_json::from_value(entry).ok()?;
    let category = match raw.media_type.as_deref() {
        Some(media_type) => media_type.parse().ok()?,
        None => fallback?,
    };
    Some(SuggestionItem {
        id: raw.id,
        name: raw.title.or(raw.name).unwrap_or_default(),
        category,
    })
}

fn find_trailer(videos: &Value) -> Value {
    videos
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| {
            results.iter().find(|video| {
                video.get("type").and_then(Value::as_str) == Some("Trailer")
                    && video.get("site").and_then(Value::as_str) == Some("YouTube")
            })
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn truncated_cast(credits: Value) -> Value {
    match credits {
        Value::Object(mut map) => match map.remove("cast") {
            Some(Value::Array(mut cast)) => {
                cast.truncate(CAST_LIMIT);
                Value::Array(cast)
            }
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TmdbClient {
        TmdbClient::new(server.uri(), "test-key", "fr-FR", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_suggest_maps_multi_results_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .and(query_param("query", "incep"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("language", "fr-FR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 1,
                "results": [
                    {"id": 27205, "title": "Inception", "media_type": "movie"},
                    {"id": 10, "name": "Inception Show", "media_type": "tv"},
                    {"id": 99, "name": "Some Collection", "media_type": "collection"},
                    {"id": 3, "name": "Leo", "media_type": "person"}
                ]
            })))
            .mount(&server)
            .await;

        let items = client(&server).suggest("incep", None, "fr-FR").await.unwrap();
        assert_eq!(
            items,
            vec![
                SuggestionItem {
                    id: 27205,
                    name: "Inception".to_string(),
                    category: Category::Movie
                },
                SuggestionItem {
                    id: 10,
                    name: "Inception Show".to_string(),
                    category: Category::Tv
                },
                SuggestionItem {
                    id: 3,
                    name: "Leo".to_string(),
                    category: Category::Person
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_typed_search_falls_back_to_requested_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 1,
                "results": [{"id": 1399, "name": "Game of Thrones"}]
            })))
            .mount(&server)
            .await;

        let items = client(&server)
            .suggest("game", Some(Category::Tv), "fr-FR")
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, Category::Tv);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).suggest("x", None, "fr-FR").await.unwrap_err();
        assert!(matches!(err, LookupError::Status(503)));
    }

    #[tokio::test]
    async fn test_discover_forwards_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("include_adult", "false"))
            .and(query_param("page", "2"))
            .and(query_param("primary_release_year", "1999"))
            .and(query_param("with_genres", "28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2,
                "total_pages": 7,
                "results": [{"id": 603, "title": "Matrix"}]
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .discover(
                ListingKind::Movie,
                DiscoverFilter {
                    genre: Some(28),
                    year: Some(1999),
                    page: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.page, 2);
        assert!(page.has_more());
        assert_eq!(page.results[0]["id"], 603);
    }

    #[tokio::test]
    async fn test_series_discover_uses_air_date_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/tv"))
            .and(query_param("first_air_date_year", "2011"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 1,
                "results": []
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .discover(
                ListingKind::Tv,
                DiscoverFilter {
                    year: Some(2011),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_genres() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "genres": [{"id": 28, "name": "Action"}]
            })))
            .mount(&server)
            .await;

        let genres = client(&server).genres(ListingKind::Movie).await.unwrap();
        assert_eq!(
            genres,
            vec![Genre {
                id: 28,
                name: "Action".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_movie_details_are_merged_with_trailer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 27205, "title": "Inception"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"key": "teaser", "type": "Teaser", "site": "YouTube"},
                    {"key": "vimeo", "type": "Trailer", "site": "Vimeo"},
                    {"key": "yt", "type": "Trailer", "site": "YouTube"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cast": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/recommendations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let movie = client(&server).movie_details(27205).await.unwrap();
        assert_eq!(movie["title"], "Inception");
        assert_eq!(movie["trailer"]["key"], "yt");
        assert!(movie["credits"]["cast"].is_array());
        assert!(movie["recommendations"]["results"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let server = MockServer::start().await;
        let err = client(&server).serie_details(1).await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_artist_credits_are_truncated() {
        let server = MockServer::start().await;
        let cast: Vec<Value> = (0..40).map(|id| json!({"id": id})).collect();

        Mock::given(method("GET"))
            .and(path("/person/6193"))
            .and(query_param("append_to_response", "external_ids"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 6193, "name": "Leonardo DiCaprio"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/person/6193/movie_credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cast": cast})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/person/6193/tv_credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cast": []})))
            .mount(&server)
            .await;

        let artist = client(&server).artist_details(6193).await.unwrap();
        assert_eq!(artist["name"], "Leonardo DiCaprio");
        assert_eq!(artist["movies"].as_array().unwrap().len(), CAST_LIMIT);
        assert_eq!(artist["movies"][0]["id"], 0);
        assert_eq!(artist["tv_shows"], json!([]));
    }

    #[tokio::test]
    async fn test_movie_age_rating_prefers_french_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/release_dates"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 27205,
                "results": [
                    {"iso_3166_1": "US", "release_dates": [{"certification": "PG-13"}]},
                    {"iso_3166_1": "FR", "release_dates": [{"certification": "U"}]}
                ]
            })))
            .mount(&server)
            .await;

        let rating = client(&server)
            .age_rating(ListingKind::Movie, 27205)
            .await
            .unwrap();
        assert_eq!(rating.certification, "U");
        assert_eq!(rating.label, Some("Tous publics"));
    }

    #[tokio::test]
    async fn test_series_age_rating_falls_back_to_first_rated_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/content_ratings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"iso_3166_1": "BR", "rating": ""},
                    {"iso_3166_1": "US", "rating": "TV-MA"},
                    {"iso_3166_1": "DE", "rating": "16"}
                ]
            })))
            .mount(&server)
            .await;

        let rating = client(&server).age_rating(ListingKind::Tv, 1399).await.unwrap();
        assert_eq!(rating.certification, "TV-MA");
        assert_eq!(rating.label, Some("-18"));
    }

    #[tokio::test]
    async fn test_age_rating_without_certifications_is_nr() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/7/release_dates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let rating = client(&server).age_rating(ListingKind::Movie, 7).await.unwrap();
        assert_eq!(rating, AgeRating::not_rated());
    }
}
