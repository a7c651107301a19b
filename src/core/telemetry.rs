use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Installs the global tracing subscriber. `RUST_LOG` wins over the
/// configured level; span-close events carry per-request timings.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(telemetry.log_level.as_str()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let result = if telemetry.json { builder.json().try_init() } else { builder.try_init() };

    result.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
