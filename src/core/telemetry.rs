use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Dependencies that are chatty at `info`.
const QUIET_TARGETS: &[&str] =
    &["sqlx=warn", "hyper=warn", "aws_config=warn", "aws_smithy_runtime=warn"];

fn default_directives(level: &str) -> String {
    std::iter::once(level).chain(QUIET_TARGETS.iter().copied()).collect::<Vec<_>>().join(",")
}

/// `RUST_LOG` wins over `QUIZDESK_LOG_LEVEL` when set.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&telemetry.log_level)));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if telemetry.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
