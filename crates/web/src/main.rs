use std::{env, sync::Arc};

use database::{DatabaseConnectionInfo, PgDatabase};
use dispatch::{
    config::DispatchConfig,
    dispatcher::Dispatcher,
    routing::{NoRouting, RoutingService},
};
use map_service::{MapServiceClient, MapServiceCredentials};
use web::{start_web_server, WebState};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
    env_logger::init();

    // configuration
    let config = DispatchConfig::from_env().expect("invalid dispatch configuration.");
    config.log();

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .expect("expected database connection info in env.");
    let database = PgDatabase::connect(database_connection_info)
        .await
        .expect("could not connect to database.");

    // routing
    let routing: Arc<dyn RoutingService> = if config.with_estimate {
        let credentials = MapServiceCredentials::from_env()
            .expect("expected MAPS_API_KEY in env, estimates are enabled.");
        let client = MapServiceClient::new(credentials, config.routing_timeout)
            .expect("could not build the map service client.");
        Arc::new(client)
    } else {
        Arc::new(NoRouting)
    };

    // web server
    let listen_addr =
        env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned());
    let dispatcher = Dispatcher::new(database, routing, config);
    if let Err(why) = start_web_server(WebState::new(dispatcher), &listen_addr).await {
        log::error!("web server stopped: {why}");
    }
}
