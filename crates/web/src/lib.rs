pub use crate::common::RouteResult;

use axum::Router;
use dispatch::{database::Database, dispatcher::Dispatcher};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

pub struct WebState<D: Database> {
    pub dispatcher: Dispatcher<D>,
}

impl<D: Database> WebState<D> {
    pub fn new(dispatcher: Dispatcher<D>) -> Self {
        Self { dispatcher }
    }
}

impl<D: Database> Clone for WebState<D> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

pub fn router<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<D: Database>(
    state: WebState<D>,
    listen_addr: &str,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}
