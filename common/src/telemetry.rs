use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Builds the `tracing` subscriber shared by the deployer binary and its tests.
///
/// Layers, from the registry outwards:
/// - an `EnvFilter` read from `RUST_LOG`, or `fallback_env_filter` when unset
/// - a `JsonStorageLayer` keeping span fields so children inherit their parent context
/// - a `BunyanFormattingLayer` writing one bunyan JSON line per event to `sink`
///
/// # Arguments
/// - `name`: name reported in every log line
/// - `fallback_env_filter`: directive used if `RUST_LOG` is not set, ex: `info`
/// - `sink`: where the lines are written, ex: `std::io::stdout` or `std::io::sink` in tests
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The sink must be a `MakeWriter` for any lifetime of the writer it hands out
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the process-wide default and forwards `log` records to it.
///
/// Must be called once per process: a second call panics.
pub fn init_tracing_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");

    set_global_default(subscriber).expect("Failed to set subscriber");
}
