use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

struct ErrorCounterLayer;

impl<S> Layer<S> for ErrorCounterLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            metrics::counter!("tracing_error_events").increment(1);
        }
    }
}

/// Build a `tracing` dispatcher configured for:
/// - JSON logs to stdout
/// - EnvFilter that respects `RUST_LOG` (takes precedence) and falls back to `default_level`
/// - `tracing_error_events` counter for ERROR events
///
/// The dispatcher is returned rather than installed so tests can scope it with
/// `tracing::dispatcher::with_default`.
pub fn build_dispatch(default_level: &str) -> tracing::Dispatch {
    build_dispatch_with_writer(default_level, std::io::stdout)
}

/// Same as [`build_dispatch`], writing JSON lines to `writer` instead of stdout.
pub fn build_dispatch_with_writer<W>(default_level: &str, writer: W) -> tracing::Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_writer(writer)
        .json();

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(ErrorCounterLayer);

    tracing::Dispatch::new(subscriber)
}

/// Root span carrying the `service` field. Events emitted while it is entered
/// include it in their JSON `span` / `spans` objects.
pub fn service_span(service_name: &str) -> tracing::Span {
    tracing::info_span!("service", service = service_name)
}
