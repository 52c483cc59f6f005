// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking document store.
//!
//! Each trip's tracking aggregate is a single document. Writes never
//! overwrite blindly: every mutation is applied to a freshly read copy and
//! committed with a compare-and-swap on the document `version`, retried on
//! conflict. Writes to one trip are additionally serialized within this
//! process so a participant's updates land in arrival order.

use crate::db::collections;
use crate::error::AppError;
use crate::models::TripTracking;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Attempts per mutation before surfacing a conflict to the caller.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Per-trip write locks shared by all clones of a [`TrackingDb`].
type WriteLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<DashMap<String, TripTracking>>),
}

/// Outcome of an insert-if-absent.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(TripTracking),
    /// A document already existed; it is returned unchanged.
    Existing(TripTracking),
}

/// Tracking aggregate store.
#[derive(Clone)]
pub struct TrackingDb {
    backend: Backend,
    write_locks: WriteLocks,
}

impl TrackingDb {
    /// Create a new Firestore-backed store.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self::with_backend(Backend::Firestore(client)))
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self::with_backend(Backend::Firestore(client)))
    }

    /// Create an in-process store. Used by tests and `TRACKING_STORE=memory`.
    pub fn new_in_memory() -> Self {
        Self::with_backend(Backend::Memory(Arc::new(DashMap::new())))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            write_locks: Arc::new(DashMap::new()),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Get the tracking aggregate for a trip.
    pub async fn get_tracking(&self, trip_id: &str) -> Result<Option<TripTracking>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::TRIP_TRACKING)
                .obj()
                .one(trip_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(docs) => Ok(docs.get(trip_id).map(|d| d.clone())),
        }
    }

    /// Trips owned by an organizer that are `active` or `emergency`.
    pub async fn list_live_for_organizer(
        &self,
        organizer_id: &str,
    ) -> Result<Vec<TripTracking>, AppError> {
        let mut trips: Vec<TripTracking> = match &self.backend {
            Backend::Firestore(client) => {
                let organizer_id = organizer_id.to_string();
                let docs: Vec<TripTracking> = client
                    .fluent()
                    .select()
                    .from(collections::TRIP_TRACKING)
                    .filter(move |q| q.for_all([q.field("organizerId").eq(organizer_id.clone())]))
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                // Status is filtered here rather than with an `in` query so
                // no composite index is needed.
                docs.into_iter().filter(|t| t.status.is_live()).collect()
            }
            Backend::Memory(docs) => docs
                .iter()
                .filter(|t| t.organizer_id == organizer_id && t.status.is_live())
                .map(|t| t.clone())
                .collect(),
        };

        trips.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(trips)
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Insert a new aggregate unless one already exists for the trip.
    pub async fn create_tracking(&self, tracking: &TripTracking) -> Result<CreateOutcome, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let inserted: Result<(), firestore::errors::FirestoreError> = client
                    .fluent()
                    .insert()
                    .into(collections::TRIP_TRACKING)
                    .document_id(&tracking.trip_id)
                    .object(tracking)
                    .execute()
                    .await;

                match inserted {
                    Ok(()) => Ok(CreateOutcome::Created(tracking.clone())),
                    Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                        let existing = self.get_tracking(&tracking.trip_id).await?.ok_or_else(|| {
                            AppError::Conflict(format!(
                                "Tracking for trip {} is being created concurrently",
                                tracking.trip_id
                            ))
                        })?;
                        Ok(CreateOutcome::Existing(existing))
                    }
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(docs) => {
                let entry = docs.entry(tracking.trip_id.clone());
                match entry {
                    dashmap::mapref::entry::Entry::Occupied(existing) => {
                        Ok(CreateOutcome::Existing(existing.get().clone()))
                    }
                    dashmap::mapref::entry::Entry::Vacant(slot) => {
                        slot.insert(tracking.clone());
                        Ok(CreateOutcome::Created(tracking.clone()))
                    }
                }
            }
        }
    }

    /// Apply `mutate` to the current aggregate and commit it atomically.
    ///
    /// If `mutate` fails nothing is written. On a version conflict the
    /// mutation is re-applied to the fresh document, up to
    /// [`MAX_WRITE_ATTEMPTS`] times. Returns the committed aggregate and the
    /// mutation's output.
    pub async fn update_tracking<T, F>(
        &self,
        trip_id: &str,
        mut mutate: F,
    ) -> Result<(TripTracking, T), AppError>
    where
        F: FnMut(&mut TripTracking) -> Result<T, AppError>,
    {
        let lock = self
            .write_locks
            .entry(trip_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.update_with_retries(trip_id, &mut mutate).await
        };

        drop(lock);
        self.write_locks
            .remove_if(trip_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn update_with_retries<T, F>(
        &self,
        trip_id: &str,
        mutate: &mut F,
    ) -> Result<(TripTracking, T), AppError>
    where
        F: FnMut(&mut TripTracking) -> Result<T, AppError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .get_tracking(trip_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Trip tracking {} not found", trip_id)))?;

            let mut next = current.clone();
            let output = mutate(&mut next)?;
            next.version = current.version + 1;
            next.updated_at = chrono::Utc::now();

            if self.compare_and_swap(current.version, &next).await? {
                return Ok((next, output));
            }

            tracing::debug!(
                trip_id,
                attempt,
                expected_version = current.version,
                "Tracking write conflict, retrying with fresh document"
            );
        }

        tracing::warn!(
            trip_id,
            attempts = MAX_WRITE_ATTEMPTS,
            "Tracking write abandoned after repeated conflicts"
        );
        Err(AppError::Conflict(format!(
            "Trip tracking {} was modified concurrently; please retry",
            trip_id
        )))
    }

    /// Replace the stored aggregate with `next` only if the stored version
    /// is still `expected_version`. Returns `false` on a version mismatch.
    pub async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: &TripTracking,
    ) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                Self::firestore_compare_and_swap(client, expected_version, next).await
            }
            Backend::Memory(docs) => match docs.get_mut(&next.trip_id) {
                Some(mut stored) if stored.version == expected_version => {
                    *stored = next.clone();
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(AppError::NotFound(format!(
                    "Trip tracking {} not found",
                    next.trip_id
                ))),
            },
        }
    }

    /// Firestore compare-and-swap inside a transaction.
    ///
    /// The version is re-read through the transaction so Firestore registers
    /// the document for conflict detection; a concurrent commit aborts ours.
    async fn firestore_compare_and_swap(
        client: &firestore::FirestoreDb,
        expected_version: u64,
        next: &TripTracking,
    ) -> Result<bool, AppError> {
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        let stored: Option<TripTracking> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::TRIP_TRACKING)
            .obj()
            .one(&next.trip_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read tracking in transaction: {}", e))
            })?;

        let stored = match stored {
            Some(stored) => stored,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "Trip tracking {} not found",
                    next.trip_id
                )));
            }
        };

        if stored.version != expected_version {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        client
            .fluent()
            .update()
            .in_col(collections::TRIP_TRACKING)
            .document_id(&next.trip_id)
            .object(next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add tracking to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(firestore::errors::FirestoreError::DataConflictError(e)) => {
                tracing::debug!(trip_id = %next.trip_id, error = %e, "Transaction aborted by conflict");
                Ok(false)
            }
            Err(firestore::errors::FirestoreError::DatabaseError(e)) if e.retry_possible => {
                tracing::debug!(trip_id = %next.trip_id, error = %e, "Transaction aborted, retry possible");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }
}
