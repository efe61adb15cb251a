use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    routing::get,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::media::{AgeRating, Category, DiscoverFilter, Genre, ListingKind, LookupError, Page};
use crate::routes::Catalog;

pub fn router() -> Router {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/series", get(list_series))
        .route("/genres/:kind", get(list_genres))
        .route("/movie/:id", get(movie))
        .route("/serie/:id", get(serie))
        .route("/artist/:id", get(artist))
        .route("/rating/:kind/:id", get(age_rating))
}

pub async fn list_movies(
    Extension(catalog): Extension<Catalog>,
    Query(filter): Query<DiscoverFilter>,
) -> Result<Json<Page<Value>>, AppError> {
    Ok(Json(catalog.tmdb.discover(ListingKind::Movie, filter).await?))
}

pub async fn list_series(
    Extension(catalog): Extension<Catalog>,
    Query(filter): Query<DiscoverFilter>,
) -> Result<Json<Page<Value>>, AppError> {
    Ok(Json(catalog.tmdb.discover(ListingKind::Tv, filter).await?))
}

pub async fn list_genres(
    Extension(catalog): Extension<Catalog>,
    Path(kind): Path<ListingKind>,
) -> Result<Json<Vec<Genre>>, AppError> {
    Ok(Json(catalog.tmdb.genres(kind).await?))
}

pub async fn movie(
    Extension(catalog): Extension<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = detail_id(&id)?;
    let details = found(catalog.tmdb.movie_details(id).await, "movie", id)?;
    Ok(Json(catalog.wiki.with_synopsis(Category::Movie, details).await))
}

pub async fn serie(
    Extension(catalog): Extension<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = detail_id(&id)?;
    let details = found(catalog.tmdb.serie_details(id).await, "serie", id)?;
    Ok(Json(catalog.wiki.with_synopsis(Category::Tv, details).await))
}

pub async fn artist(
    Extension(catalog): Extension<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = detail_id(&id)?;
    let details = found(catalog.tmdb.artist_details(id).await, "artist", id)?;
    Ok(Json(catalog.wiki.with_synopsis(Category::Person, details).await))
}

/// Badge on detail pages; a failed lookup shows as not rated.
pub async fn age_rating(
    Extension(catalog): Extension<Catalog>,
    Path((kind, id)): Path<(ListingKind, String)>,
) -> Result<Json<AgeRating>, AppError> {
    let id = detail_id(&id)?;
    let rating = catalog.tmdb.age_rating(kind, id).await.unwrap_or_else(|err| {
        if !matches!(err, LookupError::NotFound) {
            tracing::warn!(kind = kind.as_str(), id, error = %err, "Age rating lookup failed");
        }
        AgeRating::not_rated()
    });
    Ok(Json(rating))
}

fn detail_id(raw: &str) -> Result<u64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Detail pages render "not found" for any failed load.
fn found(result: Result<Value, LookupError>, page: &str, id: u64) -> Result<Value, AppError> {
    result.map_err(|err| {
        if !matches!(err, LookupError::NotFound) {
            tracing::warn!(page, id, error = %err, "Detail page load failed");
        }
        AppError::NotFound
    })
}
