//! HTTP routes.

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use zipweather_core::WatchlistService;

use crate::views::{Flow, View};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: WatchlistService,
}

/// Missing fields deserialize as empty strings so they fail validation
/// with the usual error page instead of a bare 422.
#[derive(Debug, Deserialize)]
pub struct ZipForm {
    #[serde(default)]
    pub zip: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct WatchlistZipForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub zip: String,
}

async fn home() -> View {
    View::Home
}

async fn search_form() -> View {
    View::Search
}

/// POST /searchresults
async fn search_results(
    State(state): State<AppState>,
    form: Result<Form<ZipForm>, FormRejection>,
) -> View {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return View::rejected(Flow::Search, &rejection),
    };
    match state.service.search(&form.zip).await {
        Ok(record) => View::SearchResults(record),
        Err(err) => View::error(Flow::Search, &err),
    }
}

async fn add_form() -> View {
    View::Add
}

/// POST /addconfirmation
async fn add_confirmation(
    State(state): State<AppState>,
    form: Result<Form<WatchlistZipForm>, FormRejection>,
) -> View {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return View::rejected(Flow::Add, &rejection),
    };
    match state.service.add(&form.username, &form.zip).await {
        Ok(confirmation) => View::AddConfirmation(confirmation),
        Err(err) => View::error(Flow::Add, &err),
    }
}

async fn choose_watchlist() -> View {
    View::ChooseWatchlist
}

/// POST /viewwatchlist
async fn view_watchlist(
    State(state): State<AppState>,
    form: Result<Form<UsernameForm>, FormRejection>,
) -> View {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return View::rejected(Flow::ViewWatchlist, &rejection),
    };
    match state.service.watchlist(&form.username).await {
        Ok(table) => View::Watchlist(table),
        Err(err) => View::error(Flow::ViewWatchlist, &err),
    }
}

async fn delete_form() -> View {
    View::Delete
}

/// POST /deleteconfirmation
async fn delete_confirmation(
    State(state): State<AppState>,
    form: Result<Form<WatchlistZipForm>, FormRejection>,
) -> View {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return View::rejected(Flow::Delete, &rejection),
    };
    match state.service.delete(&form.username, &form.zip).await {
        Ok(confirmation) => View::DeleteConfirmation(confirmation),
        Err(err) => View::error(Flow::Delete, &err),
    }
}

/// GET /health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Create the HTTP router
pub fn create_router(service: WatchlistService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/", get(home))
        .route("/search", get(search_form))
        .route("/searchresults", post(search_results))
        .route("/add", get(add_form))
        .route("/addconfirmation", post(add_confirmation))
        .route("/choosewatchlist", get(choose_watchlist))
        .route("/viewwatchlist", post(view_watchlist))
        .route("/delete", get(delete_form))
        .route("/deleteconfirmation", post(delete_confirmation))
        .route("/health", get(health_check))
        .layer(
            TraceLayer::new_for_http()
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
