//! GPU-driven frustum culling demo
//!
//! Main entry point that delegates to the app module.

mod app;

fn main() -> cullrender::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting cullrender...");
    if let Err(err) = app::run() {
        tracing::error!("Fatal: {}", err);
        return Err(err);
    }
    Ok(())
}
