use anyhow::Context;
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, StatusCode, Uri, header, uri::PathAndQuery},
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::config::Config;
use crate::database;
use crate::utils::jwt::JwtService;

/// Forwards everything outside `/api` to the web frontend.
#[derive(Clone)]
struct FrontendProxy {
    origin: Uri,
    client: Client<HttpConnector, Body>,
}

impl FrontendProxy {
    fn new(frontend_url: &str) -> anyhow::Result<Self> {
        let origin: Uri = frontend_url
            .parse()
            .with_context(|| format!("FRONTEND_URL is not a valid URL: {}", frontend_url))?;
        if origin.scheme().is_none() || origin.authority().is_none() {
            anyhow::bail!("FRONTEND_URL needs a scheme and host: {}", frontend_url);
        }

        Ok(Self {
            origin,
            client: Client::builder(TokioExecutor::new()).build_http(),
        })
    }
}

/// `uri`'s path and query on the frontend origin.
fn frontend_uri(origin: &Uri, uri: &Uri) -> Option<Uri> {
    let path_and_query = uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Uri::builder()
        .scheme(origin.scheme()?.clone())
        .authority(origin.authority()?.clone())
        .path_and_query(path_and_query)
        .build()
        .ok()
}

async fn proxy_to_frontend(Extension(proxy): Extension<FrontendProxy>, mut req: Request) -> Response {
    let Some(target) = frontend_uri(&proxy.origin, req.uri()) else {
        tracing::error!(uri = %req.uri(), "Could not map request onto the frontend");
        return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
    };

    if let Some(authority) = target.authority()
        && let Ok(host) = HeaderValue::from_str(authority.as_str())
    {
        req.headers_mut().insert(header::HOST, host);
    }
    *req.uri_mut() = target;

    match proxy.client.request(req).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::warn!(origin = %proxy.origin, "Frontend proxy error: {}", e);
            (StatusCode::BAD_GATEWAY, "Frontend not available").into_response()
        }
    }
}

/// The full HTTP surface for an already initialised state. Tests drive this
/// directly with an in-memory database.
pub fn build_router(state: Arc<AppState>, config: &Config) -> anyhow::Result<Router> {
    let proxy = FrontendProxy::new(&config.frontend_url)?;

    Ok(Router::new()
        .nest("/api", crate::api::routes(state))
        .fallback(proxy_to_frontend)
        .layer(Extension(proxy))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http()))
}

pub async fn register_routes(config: &Config) -> anyhow::Result<Router> {
    let db = database::create_pool(&config.database_url).await?;
    tracing::info!("Database connected and migrations applied");

    let jwt_service = Arc::new(JwtService::new(&config.secret_key, config.token_ttl_days));
    let state = Arc::new(AppState::new(db, jwt_service));

    build_router(state, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_path_and_query_on_the_frontend_origin() {
        let origin: Uri = "http://127.0.0.1:3001".parse().unwrap();
        let uri: Uri = "/market/anvil?rarity=rare".parse().unwrap();

        let target = frontend_uri(&origin, &uri).unwrap();
        assert_eq!(target.to_string(), "http://127.0.0.1:3001/market/anvil?rarity=rare");
    }

    #[tokio::test]
    async fn rejects_frontend_urls_without_host() {
        assert!(FrontendProxy::new("/relative").is_err());
        assert!(FrontendProxy::new("http://localhost:3001").is_ok());
    }
}
