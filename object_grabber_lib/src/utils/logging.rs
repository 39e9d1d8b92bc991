//! Tracing initialization shared by the grabber binaries.

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// Respects `RUST_LOG` (defaults to "info") and prints compact lines without
/// target, file or line metadata. The subscriber is global so transport tasks
/// running on tokio worker threads log through it as well.
///
/// # Example
/// ```no_run
/// use object_grabber_lib::init_tracing;
///
/// fn main() {
///     init_tracing().expect("tracing already initialized");
///     // client code here
/// }
/// ```
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
}
