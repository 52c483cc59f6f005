// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod notification;
pub mod roster;
pub mod tracking;

pub use notification::{NotificationEvent, NotificationService};
pub use roster::RosterService;
pub use tracking::{Initialized, TrackingService};
