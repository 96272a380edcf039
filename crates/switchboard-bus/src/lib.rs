// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out for the Switchboard handoff service.
//!
//! [`BroadcastNotifier`] is an in-process [`NotificationAdapter`] backed by
//! one tokio broadcast channel per [`ChannelKey`]. [`Dispatcher`] wraps any
//! adapter and publishes from one background worker in dispatch order, so
//! that state transitions never wait on, or fail because of, delivery.
//!
//! [`NotificationAdapter`]: switchboard_core::NotificationAdapter
//! [`ChannelKey`]: switchboard_core::ChannelKey

pub mod broadcast;
pub mod dispatcher;

pub use broadcast::BroadcastNotifier;
pub use dispatcher::Dispatcher;
