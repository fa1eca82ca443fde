//! iReporter - incident reporting backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use ireporter::{config::Args, db::MongoClient, logging, server, store::Stores, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(&args.log_level, args.json_logs());

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  iReporter - incident reporting API");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_COMMIT_SHORT"));
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongo.mongodb_uri, args.mongo.mongodb_db);
    info!("======================================");

    let jwt = args.jwt_validator()?;
    if args.jwt_secret.is_none() {
        warn!("No JWT_SECRET set - using the insecure development secret");
    }

    // MongoDB is required outside dev mode
    let mongo = match MongoClient::new(&args.mongo.mongodb_uri, &args.mongo.mongodb_db).await {
        Ok(client) => Some(client),
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory stores): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let stores = match &mongo {
        Some(client) => Stores::mongo(client).await?,
        None => Stores::memory(),
    };
    let services = Services::new(stores, jwt);
    let state = Arc::new(server::AppState::new(args, services, mongo)?);

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
