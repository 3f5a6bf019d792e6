// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use mimalloc::MiMalloc;

use querygate::engine::connectors::demo_registry;
use querygate::policy::PolicyStore;
use querygate::{config, http, observability, Gateway};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match config::GatewayConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    observability::init_tracing(config.log_dir.as_deref());

    let policy = match &config.policy_path {
        Some(path) => match PolicyStore::from_file(path) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                eprintln!("STARTUP_ERROR failed to load policy: {}", err);
                std::process::exit(1);
            }
        },
        None => Arc::new(PolicyStore::default()),
    };

    // Dropping the watcher stops hot reload, so hold it for the process lifetime.
    let _watcher = if config.policy_watch {
        match policy.watch() {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::warn!(error = %err, "Policy hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let registry = match demo_registry() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(Gateway::new(registry, policy, &config));
    let app = http::router(gateway);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("STARTUP_ERROR failed to bind {}: {}", config.bind_addr, err);
            std::process::exit(1);
        }
    };

    tracing::info!(bind_addr = %config.bind_addr, "querygate listening");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("STARTUP_ERROR server failed: {}", err);
        std::process::exit(1);
    }
}
