use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let builder = fmt()
        .with_env_filter(env_filter(&settings.telemetry().log_level))
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.telemetry().json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))?;

    tracing::debug!(
        environment = settings.runtime().environment.as_str(),
        json = settings.telemetry().json,
        "tracing initialized"
    );
    Ok(())
}

/// `RUST_LOG` wins over the configured level when it parses.
fn env_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

#[cfg(test)]
mod tests {
    use super::env_filter;
    use crate::test_support;

    #[tokio::test]
    async fn configured_level_is_used_without_rust_log() {
        let _guard = test_support::env_lock().await;
        std::env::remove_var("RUST_LOG");

        let filter = env_filter("warn");
        assert_eq!(filter.to_string(), "warn");
    }
}
