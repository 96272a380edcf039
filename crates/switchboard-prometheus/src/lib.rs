// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Switchboard handoff service.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The other crates
//! record through the helpers in [`recording`]; this crate only decides where
//! the numbers end up.

pub mod recording;

use std::net::SocketAddr;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;

use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::types::{AdapterType, HealthStatus};
use switchboard_core::SwitchboardError;

pub use recording::{
    record_abandoned, record_agent_demotion, record_handoff_outcome, record_notification_failure,
    record_transition, set_queue_depth,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format. With
/// [`with_http_listener`](Self::with_http_listener) the exporter also serves
/// the same text over HTTP until [`shutdown`](PluginAdapter::shutdown).
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
    listener: Option<JoinHandle<()>>,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process. Returns an error if a recorder is already installed.
    pub fn new() -> Result<Self, SwitchboardError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            SwitchboardError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self {
            handle,
            listener: None,
        })
    }

    /// Install the recorder and serve scrapes on `addr`.
    ///
    /// Must be called inside a tokio runtime; the exporter runs as a task.
    pub fn with_http_listener(addr: SocketAddr) -> Result<Self, SwitchboardError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(addr)
            .build()
            .map_err(|e| {
                SwitchboardError::Internal(format!("failed to build Prometheus exporter: {e}"))
            })?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            SwitchboardError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        let listener = tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "prometheus listener stopped");
            }
        });
        tracing::info!(%addr, "prometheus metrics endpoint listening");

        Ok(Self {
            handle,
            listener: Some(listener),
        })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(listener) = &self.listener {
            listener.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only one global recorder can exist per process, so the adapter is
    // installed once and every assertion runs against it.
    #[tokio::test]
    async fn adapter_installs_and_renders() {
        let adapter = PrometheusAdapter::new().unwrap();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);

        record_abandoned(2);
        assert!(adapter.render().contains("switchboard_conversations_abandoned_total"));

        assert!(PrometheusAdapter::new().is_err(), "second install must fail");
    }
}
