// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out port.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelKey, Notification};

/// Delivers state-change events to connected clients.
///
/// Delivery is best-effort and independent per channel. The core decides
/// *what* to publish; the transport decides how it reaches subscribers.
#[async_trait]
pub trait NotificationAdapter: PluginAdapter {
    /// Publishes one event on one channel.
    async fn publish(
        &self,
        channel: &ChannelKey,
        notification: &Notification,
    ) -> Result<(), SwitchboardError>;
}
