//! HTTP server
//!
//! hyper http1 with TokioIo, one task per connection. Routing is a single
//! match over method and path segments.

use hyper::body::{Body, Incoming};
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes::{
    self, cors_preflight, error_response, not_found_response, BoxBody, BoxError,
};
use crate::services::Services;
use crate::types::{ReporterError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub services: Services,
    /// `None` when running on in-memory stores
    pub mongo: Option<MongoClient>,
    pub cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(args: Args, services: Services, mongo: Option<MongoClient>) -> Result<Self> {
        let cors_origin = HeaderValue::from_str(&args.cors_origin).map_err(|e| {
            ReporterError::Config(format!("Invalid CORS_ORIGIN '{}': {}", args.cors_origin, e))
        })?;
        Ok(Self {
            args,
            services,
            mongo,
            cors_origin,
        })
    }

    pub fn jwt(&self) -> &JwtValidator {
        self.services.users.jwt()
    }

    pub fn storage(&self) -> &'static str {
        if self.mongo.is_some() {
            "mongodb"
        } else {
            "memory"
        }
    }

    pub fn mode(&self) -> &'static str {
        if self.args.dev_mode {
            "development"
        } else {
            "production"
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "iReporter listening on {} ({} mode, {} storage)",
        state.args.listen,
        state.mode(),
        state.storage()
    );

    if state.mongo.is_none() {
        warn!("Running on in-memory stores - data is lost on restart");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(route(&state, req).await)
}

/// Dispatch one request. Handler errors become JSON error responses.
pub async fn route<B>(state: &AppState, req: Request<B>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = &state.cors_origin;

    if method == Method::OPTIONS {
        return cors_preflight(origin);
    }

    let segments: Vec<&str> = path
        .trim_end_matches('/')
        .split('/')
        .skip(1)
        .collect();

    let result = match (method, segments.as_slice()) {
        (Method::GET, []) => Ok(routes::service_info(state).await),
        (Method::GET, ["health"]) | (Method::GET, ["api", "health"]) => {
            Ok(routes::health_check(state).await)
        }
        (Method::GET, ["version"]) => Ok(routes::version_info(state)),

        (Method::POST, ["api", "users", "register"]) => routes::register(state, req).await,
        (Method::POST, ["api", "users", "login"]) => routes::login(state, req).await,
        (Method::GET, ["api", "users", "me"]) => routes::me(state, req.headers()).await,

        (Method::GET, ["api", "incidents"]) => {
            routes::list_incidents(state, req.headers()).await
        }
        (Method::POST, ["api", "incidents"]) => routes::create_incident(state, req).await,
        (Method::POST, ["api", "incidents", "anonymous"]) => {
            routes::create_anonymous_incident(state, req).await
        }
        (Method::GET, ["api", "incidents", "stats"]) => {
            routes::incident_stats(state, req.headers()).await
        }
        (Method::GET, ["api", "incidents", id]) => {
            routes::get_incident(state, req.headers(), id).await
        }
        (Method::PUT, ["api", "incidents", id]) => {
            routes::update_incident(state, req, id).await
        }
        (Method::DELETE, ["api", "incidents", id]) => {
            routes::delete_incident(state, req.headers(), id).await
        }
        (Method::PATCH, ["api", "incidents", id, "status"]) => {
            routes::change_incident_status(state, req, id).await
        }

        (Method::GET, ["api", "notifications"]) => routes::inbox(state, req.headers()).await,
        (Method::PUT, ["api", "notifications", "read-all"]) => {
            routes::mark_all_read(state, req.headers()).await
        }
        (Method::PUT, ["api", "notifications", id, "read"]) => {
            routes::mark_read(state, req.headers(), id).await
        }

        (Method::GET, ["api", "admin", "users"]) => {
            routes::list_users(state, req.headers()).await
        }
        (Method::PATCH, ["api", "admin", "users", id, "role"]) => {
            routes::set_user_role(state, req, id).await
        }

        _ => Ok(not_found_response(origin, &path)),
    };

    result.unwrap_or_else(|err| error_response(origin, &err))
}
