// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort notification dispatch.
//!
//! Notifications are fire-and-forget: delivery runs on a spawned task and a
//! failure is logged, never returned. Tracking state is committed before any
//! notification is dispatched.

use crate::models::LocationPoint;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Events delivered to the notification service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    TripStarted {
        trip_id: String,
        organizer_id: String,
        participant_ids: Vec<String>,
    },
    SosRaised {
        trip_id: String,
        organizer_id: String,
        user_id: String,
        user_name: String,
        location: Option<LocationPoint>,
        timestamp: DateTime<Utc>,
    },
    TripCompleted {
        trip_id: String,
        organizer_id: String,
    },
}

impl NotificationEvent {
    fn trip_id(&self) -> &str {
        match self {
            NotificationEvent::TripStarted { trip_id, .. }
            | NotificationEvent::SosRaised { trip_id, .. }
            | NotificationEvent::TripCompleted { trip_id, .. } => trip_id,
        }
    }
}

#[derive(Clone)]
enum Sink {
    Webhook { http: reqwest::Client, url: String },
    /// No endpoint configured: events are only logged
    Log,
    /// Events are kept in memory for inspection
    Recording(Arc<Mutex<Vec<NotificationEvent>>>),
}

/// Notification dispatcher.
#[derive(Clone)]
pub struct NotificationService {
    sink: Sink,
}

impl NotificationService {
    /// Build a dispatcher. Without a URL, events are only logged.
    pub fn new(url: Option<&str>) -> Self {
        let sink = match url {
            Some(url) => {
                match reqwest::Client::builder()
                    .timeout(NOTIFICATION_TIMEOUT)
                    .build()
                {
                    Ok(http) => Sink::Webhook {
                        http,
                        url: url.to_string(),
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build notification client, falling back to logging");
                        Sink::Log
                    }
                }
            }
            None => Sink::Log,
        };
        Self { sink }
    }

    /// Dispatcher that records events in memory.
    pub fn new_recording() -> Self {
        Self {
            sink: Sink::Recording(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Events captured by a recording dispatcher (empty for other sinks).
    pub fn recorded(&self) -> Vec<NotificationEvent> {
        match &self.sink {
            Sink::Recording(events) => events
                .lock()
                .map(|events| events.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Send an event without waiting for delivery.
    pub fn dispatch(&self, event: NotificationEvent) {
        match &self.sink {
            Sink::Log => {
                tracing::info!(trip_id = event.trip_id(), event = ?event, "Notification (not delivered, no endpoint)");
            }
            Sink::Recording(events) => {
                if let Ok(mut events) = events.lock() {
                    events.push(event);
                }
            }
            Sink::Webhook { http, url } => {
                let http = http.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    let trip_id = event.trip_id().to_string();
                    let result = http
                        .post(&url)
                        .json(&event)
                        .send()
                        .await
                        .and_then(|r| r.error_for_status());

                    match result {
                        Ok(_) => tracing::debug!(trip_id = %trip_id, "Notification delivered"),
                        Err(e) => tracing::warn!(
                            trip_id = %trip_id,
                            error = %e,
                            "Notification delivery failed"
                        ),
                    }
                });
            }
        }
    }
}
