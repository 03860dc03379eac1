//! HTTP surface
//!
//! | Method | Path                        | Success body               |
//! |--------|-----------------------------|----------------------------|
//! | GET    | `/`                         | health payload             |
//! | GET    | `/api/configurations/:id`   | bare matrix                |
//! | PUT    | `/api/configurations/:id`   | `{"message":"success"}`    |

pub mod handlers;
pub mod rejection;

use confgrid_core::ConfigurationRepository;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::{self, HeaderMap, HeaderValue};
use warp::http::Method;
use warp::{Filter, Reply};

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Routes advertised in the fallback 404 body
pub const AVAILABLE_ROUTES: [&str; 3] = [
    "GET /",
    "GET /api/configurations/:id",
    "PUT /api/configurations/:id",
];

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    repository: Arc<ConfigurationRepository>,
}

impl AppState {
    /// Wrap a repository
    #[must_use]
    pub fn new(repository: ConfigurationRepository) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// The configuration repository
    #[must_use]
    pub fn repository(&self) -> &ConfigurationRepository {
        &self.repository
    }
}

/// Full filter tree: routes, CORS, rejection mapping, security headers and
/// request tracing
///
/// `frontend_origin` must already be validated (`scheme://authority`).
pub fn routes(
    state: AppState,
    frontend_origin: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path::end().and(warp::get()).and_then(handlers::health);

    let configurations = warp::path("api").and(warp::path("configurations"));

    let get_configuration = configurations
        .clone()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_configuration);

    let update_configuration = configurations
        .clone()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(handlers::update_configuration);

    let missing_id = configurations
        .and(warp::path::end())
        .and_then(handlers::missing_id);

    health
        .or(get_configuration)
        .or(update_configuration)
        .or(missing_id)
        .with(cors(frontend_origin))
        .recover(rejection::handle_rejection)
        .with(warp::reply::with::headers(security_headers()))
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn cors(frontend_origin: &str) -> warp::cors::Cors {
    warp::cors()
        .allow_origin(frontend_origin)
        .allow_methods([Method::GET, Method::PUT])
        .allow_header(header::CONTENT_TYPE)
        .allow_credentials(true)
        .build()
}

/// Headers added to every response
#[must_use]
pub fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers
}
