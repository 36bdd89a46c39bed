//! REST API Server for the Operations Dashboard
//!
//! Usage:
//!   ./target/release/dashboard_server [options]
//!
//! Options:
//!   --port PORT            Port to listen on (default: 8080)
//!   --dataset PATH         JSON dataset instead of the demo data
//!   --tick-secs N          Live update interval (default: 120)
//!   --reload-secs N        Full reload interval (default: 300)
//!
//! REST endpoints are listed in the startup banner.

use anyhow::Result;
use clap::Parser;
use lastmile_ops::api::{create_router, DashboardService};
use lastmile_ops::config::{DashboardArgs, DashboardConfig};
use lastmile_ops::dashboard::DashboardSession;
use lastmile_ops::models::Role;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dashboard_server", about = "Operations dashboard REST API")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    #[command(flatten)]
    dashboard: DashboardArgs,
}

fn print_banner(port: u16, config: &DashboardConfig, source: &str) {
    println!("============================================================");
    println!("         LAST-MILE OPERATIONS DASHBOARD API");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Data:     {}", source);
    println!("  Ticks:    every {}s", config.tick_every.as_secs());
    println!("  Reload:   every {}s", config.reload_every.as_secs());
    println!();
    println!("REST Endpoints:");
    println!("  GET    /api/v1/health                  Health check");
    println!("  GET    /api/v1/dashboard               KPI groups for role and scope");
    println!("  GET    /api/v1/operational             Operational counters");
    println!("  PUT    /api/v1/scope                   Change region/branch scope");
    println!("  PUT    /api/v1/role                    Change viewer role");
    println!("  PUT    /api/v1/search                  Debounced KPI search");
    println!("  GET    /api/v1/search/recent           Recent searches");
    println!("  DELETE /api/v1/search/recent           Clear recent searches");
    println!("  POST   /api/v1/refresh                 Apply one live update");
    println!("  POST   /api/v1/reload                  Fetch fresh data");
    println!("  GET    /api/v1/drilldown               Current drill-down");
    println!("  POST   /api/v1/drilldown/open/:kpi     Open a drill-down");
    println!("  POST   /api/v1/drilldown/region/:id    Drill into a region");
    println!("  POST   /api/v1/drilldown/back          Step back one level");
    println!("  PUT    /api/v1/drilldown/tab           Top or worst performers");
    println!("  DELETE /api/v1/drilldown               Close the drill-down");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    let config = DashboardConfig::from(&args.dashboard);
    let session = DashboardSession::from_config(config.clone(), Role::Cxo);
    print_banner(args.port, &config, &session.source().describe());

    let service = Arc::new(DashboardService::new(session));
    if let Err(e) = service.start().await {
        tracing::warn!("Initial load failed, serving without data until the next reload: {}", e);
    }

    let app = create_router(service.clone());
    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    service.stop();
    Ok(())
}
