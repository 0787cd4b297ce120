//! Process entry point (§4.I, §4.J, §6): reads configuration, bootstraps the
//! virtual display, launches the native browser via the Session Registry,
//! serves the HTTP/control surface, and runs until a shutdown signal.

mod config;
mod display;
mod http;
mod supervisor;

use std::sync::Arc;

use browserd_core::{Registry, RegistryConfig};
use browserd_protocol::message::Viewport;
use browserd_transport::Hub;
use config::Config;
use display::VirtualDisplay;

#[tokio::main]
async fn main() {
    let config = Arc::new(Config::from_env());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!(target: "browserd_server::main", port = config.port, host = %config.host, "starting browserd");

    let display = match VirtualDisplay::bootstrap_if_needed(config.headless, None).await {
        Ok(display) => display,
        Err(err) => {
            tracing::error!(target: "browserd_server::main", %err, "virtual display bootstrap failed");
            std::process::exit(1);
        }
    };

    let hub = Hub::new();
    let registry_config = RegistryConfig {
        max_sessions: config.max_sessions,
        idle_timeout: config.session_idle_timeout,
        max_lifetime: config.session_max_lifetime,
        gc_interval: config.session_gc_interval,
        default_viewport: Viewport { w: config.viewport_width, h: config.viewport_height, dpr: 1.0 },
        command_timeout: config.command_timeout,
        delay_mode: None,
        headless: config.headless,
        public_base_url: config.base_url(),
    };
    let registry = Registry::new(registry_config);

    if let Err(err) = registry.initialize(hub.clone()).await {
        tracing::error!(target: "browserd_server::main", %err, "native browser launch failed");
        std::process::exit(1);
    }

    let state = http::AppState { registry: registry.clone(), hub: hub.clone(), config: config.clone() };
    let router = http::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(target: "browserd_server::main", %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(target: "browserd_server::main", %addr, "listening");

    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(target: "browserd_server::main", %err, "server task exited with error");
        }
    });

    let exit_code = supervisor::run_until_shutdown(registry, hub, server, display).await;
    std::process::exit(exit_code);
}
