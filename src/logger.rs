use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LEVEL: &str = "info";

pub fn init_logging() {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => {
            info!("\"RUST_LOG\" variable not set, defaulting to {DEFAULT_LEVEL}");
            EnvFilter::new(DEFAULT_LEVEL)
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
