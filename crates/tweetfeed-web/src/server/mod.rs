mod port;

pub use port::find_available_port;

use crate::config::{Config, HttpConfig, PortMode};
use crate::prelude::*;
use askama::Template;
use axum::extract::rejection::FormRejection;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use twitter_feed::{Credentials, FeedTweet, Session};

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to render the {template} template")]
    Render {
        template: &'static str,
        source: askama::Error,
    },

    #[error("no available port in range {start}..{end}")]
    PortUnavailable { start: u16, end: u16 },

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("the HTTP server terminated unexpectedly")]
    Serve { source: std::io::Error },
}

struct AppState {
    twitter: twitter_feed::Config,
}

pub(crate) async fn serve(config: Config) -> Result<(), ServeError> {
    let listener = bind(&config.http).await?;

    let addr = listener
        .local_addr()
        .map_err(|source| ServeError::Serve { source })?;

    info!("Starting server at http://{addr}");
    info!("Press Ctrl+C to stop the server");

    let app = router(Arc::new(AppState {
        twitter: config.twitter,
    }));

    axum::serve(listener, app)
        .await
        .map_err(|source| ServeError::Serve { source })
}

async fn bind(config: &HttpConfig) -> Result<TcpListener, ServeError> {
    match config.port_mode {
        PortMode::Fixed => {
            let addr = SocketAddr::new(config.host, config.port);

            TcpListener::bind(addr)
                .await
                .map_err(|source| ServeError::Bind { addr, source })
        }
        PortMode::Scan => {
            // The returned listener is the one we serve from: probing and
            // binding in separate steps would leave a window for another
            // process to take the port.
            port::bind_available_port(config.host, config.port_scan_start, config.port_scan_end)
                .await
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/fetch-tweets", post(fetch_tweets))
        .with_state(state)
        .layer(middleware::from_fn(cors_middleware))
}

/// Stamps permissive CORS headers on every response, errors included, so
/// the fetch endpoint is callable from any origin.
async fn cors_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );

    response
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate;

async fn index_page() -> Response {
    debug!("serving the index page");

    match IndexTemplate.render() {
        Ok(html) => Html(html).into_response(),
        Err(source) => {
            let err = ServeError::Render {
                template: "index.html",
                source,
            };

            error!(err = %err.display_chain(), "failed to serve the index page");

            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[derive(Deserialize)]
struct FetchTweetsForm {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Serialize)]
struct TweetsResponse {
    tweets: Vec<FeedTweet>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn fetch_tweets(
    State(state): State<Arc<AppState>>,
    form: Result<Form<FetchTweetsForm>, FormRejection>,
) -> Response {
    info!("Received request to fetch tweets");

    let username = form
        .ok()
        .and_then(|Form(form)| form.username)
        .map(|username| username.trim().to_owned())
        .filter(|username| !username.is_empty());

    let Some(username) = username else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Username is required".to_owned(),
            }),
        )
            .into_response();
    };

    match fetch_feed(&state, &username).await {
        Ok(tweets) => Json(TweetsResponse { tweets }).into_response(),
        Err(err) => {
            error!(%username, err = %err.display_chain(), "failed to fetch tweets");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Fetches with a fresh session: credentials are re-read and re-verified on
/// every request, nothing is shared or pooled across requests.
async fn fetch_feed(state: &AppState, username: &str) -> twitter_feed::Result<Vec<FeedTweet>> {
    let credentials = Credentials::from_env()?;
    let session = Session::connect(&state.twitter, credentials).await?;

    session
        .fetch_user_feed(username, twitter_feed::DEFAULT_MAX_RESULTS)
        .await
}
