// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Opens the store, optionally installs the Prometheus recorder (serving
//! scrapes on `metrics.listen_addr` when set), and runs the [`Sweeper`]
//! until a shutdown signal arrives. Handoff decisions are
//! made by whatever process embeds [`HandoffService`](switchboard_handoff::HandoffService);
//! `serve` keeps presence and abandonment moving for all of them.

use switchboard_config::model::SwitchboardConfig;
#[cfg(feature = "prometheus")]
use switchboard_core::PluginAdapter;
use switchboard_core::SwitchboardError;
use switchboard_handoff::Sweeper;
use tracing::info;

use crate::app::App;
use crate::shutdown;

/// Runs the `switchboard serve` command.
pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    info!("starting switchboard serve");

    #[cfg(feature = "prometheus")]
    let prometheus = if config.metrics.prometheus_enabled {
        Some(match config.metrics.listen_addr {
            Some(addr) => switchboard_prometheus::PrometheusAdapter::with_http_listener(addr)?,
            None => switchboard_prometheus::PrometheusAdapter::new()?,
        })
    } else {
        None
    };

    let app = App::open(&config).await?;
    let cancel = shutdown::install_signal_handler();

    Sweeper::from_config(app.service.clone(), &config)
        .run(cancel)
        .await;

    #[cfg(feature = "prometheus")]
    {
        if let Some(prometheus) = prometheus {
            info!(metrics = %prometheus.render(), "final metrics snapshot");
            if let Err(e) = prometheus.shutdown().await {
                tracing::warn!(error = %e, "prometheus shutdown failed");
            }
        }
    }

    app.close().await;
    info!("switchboard stopped");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so one-shot commands keep stdout for their output.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
