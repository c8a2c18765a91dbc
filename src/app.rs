use crate::catalog::{CatalogApi, CatalogClient};
use crate::config::Config;
use crate::error::Error;
use crate::favorites::FavoritesManager;
use crate::models::{filter_by_title, MovieDetail, MovieSummary};
use crate::navigation::{self, FavoritesSource, FAVORITES_PARAM};
use crate::resolver::DetailResolver;
use crate::store::{FavoriteStore, FileStore};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 16 * 1024; // no endpoint takes a body

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub favorites: Arc<FavoritesManager>,
    pub resolver: DetailResolver,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogApi>, favorites: Arc<FavoritesManager>) -> Self {
        let resolver = DetailResolver::new(catalog.clone());
        Self {
            catalog,
            favorites,
            resolver,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.resolver = self.resolver.with_timeout(timeout);
        self
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(CatalogClient::from_config(&config)?);
    let store = FileStore::new(&config.data_dir);
    info!("Favorites stored under {}", store.dir().display());
    let store: Arc<dyn FavoriteStore> = Arc::new(store);
    let favorites = Arc::new(FavoritesManager::load(store).await?);
    info!("Catalog locale: {}", config.language);

    let state = AppState::new(catalog, favorites)
        .with_fetch_timeout(config.request_timeout.saturating_add(Duration::from_secs(1)));
    let app = build_router(state);

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movies/popular", get(popular))
        .route("/movies/:id", get(movie_detail))
        .route("/favorites", get(favorites_view))
        .route("/favorites/ids", get(favorite_ids))
        .route(
            "/favorites/:id",
            get(favorite_status).put(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Library errors rendered as `{ "status": "error", "message": ... }`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidPage(_) => StatusCode::BAD_REQUEST,
            Error::CatalogUnavailable(_) | Error::ResolutionAborted { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (
            status,
            Json(json!({"status": "error", "message": self.0.to_string()})),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct PopularQuery {
    page: Option<u32>,
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListedMovie {
    #[serde(flatten)]
    movie: MovieSummary,
    poster_url: Option<String>,
    favorite: bool,
}

#[derive(Debug, Serialize)]
struct PopularPage {
    page: u32,
    results: Vec<ListedMovie>,
    #[serde(rename = "favoriteMovieIds")]
    favorite_movie_ids: String,
}

async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> ApiResult<PopularPage> {
    let page = query.page.unwrap_or(1);
    let movies = state.catalog.fetch_popular(page).await?;
    let favorite_ids = state.favorites.all().await?;
    let results = filter_by_title(&movies, query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(|movie| ListedMovie {
            poster_url: movie.poster_url(),
            favorite: favorite_ids.contains(&movie.id),
            movie: movie.clone(),
        })
        .collect();
    Ok(Json(PopularPage {
        page,
        results,
        favorite_movie_ids: navigation::encode_ids(&favorite_ids),
    }))
}

#[derive(Debug, Serialize)]
struct DetailView {
    #[serde(flatten)]
    detail: MovieDetail,
    poster_url: Option<String>,
    rating: String,
    overview_label: String,
    genre_names: String,
    favorite: bool,
}

impl DetailView {
    fn new(detail: MovieDetail, favorite: bool) -> Self {
        Self {
            poster_url: detail.poster_url(),
            rating: detail.rating_label(),
            overview_label: detail.overview_label().to_string(),
            genre_names: detail.genre_names(),
            favorite,
            detail,
        }
    }
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<DetailView> {
    let detail = state.catalog.fetch_detail(id).await?;
    let favorite = state.favorites.is_favorite(id).await?;
    Ok(Json(DetailView::new(detail, favorite)))
}

#[derive(Debug, Deserialize)]
struct FavoritesQuery {
    #[serde(rename = "favoriteMovieIds")]
    favorite_movie_ids: Option<String>,
}

#[derive(Debug, Serialize)]
struct FavoritesView {
    source: FavoritesSource,
    requested: usize,
    results: Vec<DetailView>,
}

async fn favorites_view(
    State(state): State<AppState>,
    Query(query): Query<FavoritesQuery>,
) -> ApiResult<FavoritesView> {
    let stored = state.favorites.all().await?;
    let (ids, source) = navigation::choose_source(stored.clone(), query.favorite_movie_ids.as_deref());
    let details = state.resolver.resolve_all(&ids).await?;
    let results = details
        .into_iter()
        .map(|detail| {
            let favorite = stored.contains(&detail.id);
            DetailView::new(detail, favorite)
        })
        .collect();
    Ok(Json(FavoritesView {
        source,
        requested: ids.len(),
        results,
    }))
}

async fn favorite_ids(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let ids = state.favorites.all().await?;
    Ok(Json(json!({
        "ids": ids,
        FAVORITES_PARAM: navigation::encode_ids(&ids),
    })))
}

#[derive(Debug, Serialize)]
struct Membership {
    id: i32,
    favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<bool>,
}

async fn favorite_status(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Membership> {
    let favorite = state.favorites.is_favorite(id).await?;
    Ok(Json(Membership {
        id,
        favorite,
        changed: None,
    }))
}

async fn toggle_favorite(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Membership> {
    let favorite = state.favorites.toggle(id).await?;
    info!(id, favorite, "Favorite toggled");
    Ok(Json(Membership {
        id,
        favorite,
        changed: Some(true),
    }))
}

async fn add_favorite(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Membership> {
    let changed = state.favorites.add(id).await?;
    Ok(Json(Membership {
        id,
        favorite: true,
        changed: Some(changed),
    }))
}

async fn remove_favorite(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Membership> {
    let changed = state.favorites.remove(id).await?;
    Ok(Json(Membership {
        id,
        favorite: false,
        changed: Some(changed),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
