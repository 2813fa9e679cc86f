use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "courier_transport=info,courier_schema_registry=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// Returns false when a global subscriber was already set, which leaves the
/// existing one in place.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
