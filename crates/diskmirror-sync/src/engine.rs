//! One-way reconciliation engine
//!
//! The [`Reconciler`] keeps a remote folder identical to a local directory by
//! polling both sides and dispatching the minimal set of remote mutations.
//!
//! ## Cycle Flow
//!
//! 1. **Listing**: read the local and the remote file names. If either side
//!    cannot be listed the cycle ends without touching the remote folder.
//! 2. **Transfers**: upload local-only files (create mode) and delete
//!    remote-only files in one bounded, interleaved batch.
//! 3. **Overwrites**: read modification times on both sides and re-upload
//!    every file whose local copy is strictly newer. Skipped for the cycle
//!    when either side's times cannot be read.
//! 4. **Sleeping**: wait for the poll interval, then start over.
//!
//! Before the first cycle the remote folder is created (or found). Only an
//! authentication failure at that point stops the reconciler; every later
//! failure is logged and retried on the next cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use diskmirror_core::config::ReconcilerSettings;
use diskmirror_core::domain::plan::OperationSet;
use diskmirror_core::ports::local_inventory::ILocalInventory;
use diskmirror_core::ports::remote_store::{FolderStatus, IRemoteStore};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::{execute_batch, BatchReport};
use crate::SyncError;

// ============================================================================
// ReconcilerState
// ============================================================================

/// Observable phase of the reconciler
///
/// Uploads and deletes run as one interleaved batch, so they share the
/// [`ReconcilerState::ExecutingTransfers`] phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// Constructed, not yet started
    Idle,
    /// Creating or locating the remote folder (startup only)
    EnsuringFolder,
    /// Reading both file listings
    ListingBoth,
    /// Computing the operation sets
    ComputingDiff,
    /// Running the upload/delete batch
    ExecutingTransfers,
    /// Reading modification times and running the overwrite batch
    ExecutingOverwrite,
    /// Waiting for the next cycle
    Sleeping,
    /// Loop exited
    Stopped,
}

// ============================================================================
// CycleReport
// ============================================================================

/// How far a cycle got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every phase ran
    Completed,
    /// Overwrite phase skipped because modification times were unavailable
    OverwritesSkipped,
    /// Local directory could not be listed; nothing was dispatched
    LocalListingFailed,
    /// Remote folder could not be listed; nothing was dispatched
    RemoteListingFailed,
}

/// Summary of one reconciliation cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Sequence number of the cycle, starting at 1
    pub cycle: u64,
    /// How far the cycle got
    pub outcome: CycleOutcome,
    /// Files seen locally
    pub local_files: usize,
    /// Files seen remotely before any mutation
    pub remote_files: usize,
    /// Combined results of every batch in the cycle
    pub operations: BatchReport,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            outcome: CycleOutcome::Completed,
            local_files: 0,
            remote_files: 0,
            operations: BatchReport::default(),
            duration_ms: 0,
        }
    }

    /// Whether no remote call was attempted besides the listings
    #[must_use]
    pub fn dispatched_nothing(&self) -> bool {
        self.operations.succeeded() == 0 && self.operations.failed() == 0
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Polling loop mirroring a local directory into a remote folder
pub struct Reconciler {
    remote: Arc<dyn IRemoteStore>,
    inventory: Arc<dyn ILocalInventory>,
    settings: ReconcilerSettings,
    state: watch::Sender<ReconcilerState>,
    cycles: AtomicU64,
}

impl Reconciler {
    /// Creates a new Reconciler
    ///
    /// # Errors
    /// [`SyncError::InvalidSettings`] if the worker limit or the poll
    /// interval is zero
    pub fn new(
        remote: Arc<dyn IRemoteStore>,
        inventory: Arc<dyn ILocalInventory>,
        settings: ReconcilerSettings,
    ) -> Result<Self, SyncError> {
        if settings.max_concurrent == 0 {
            return Err(SyncError::InvalidSettings(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if settings.poll_interval.is_zero() {
            return Err(SyncError::InvalidSettings(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        let (state, _) = watch::channel(ReconcilerState::Idle);
        Ok(Self {
            remote,
            inventory,
            settings,
            state,
            cycles: AtomicU64::new(0),
        })
    }

    /// Settings the reconciler was built with
    #[must_use]
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Current phase
    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        *self.state.borrow()
    }

    /// Receiver that observes every phase change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReconcilerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ReconcilerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Reconciler state changed");
        }
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Creates or locates the remote folder, retrying until it succeeds
    ///
    /// Non-authentication failures are retried after the configured fixed
    /// backoff. Returns `Ok(None)` if `shutdown` fires while waiting.
    ///
    /// # Errors
    /// [`SyncError::Unauthorized`] if the remote store rejects the credentials
    pub async fn ensure_folder(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Option<FolderStatus>, SyncError> {
        self.set_state(ReconcilerState::EnsuringFolder);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.remote.ensure_folder().await {
                Ok(status) => {
                    match status {
                        FolderStatus::Created => info!("Remote folder created"),
                        FolderStatus::AlreadyExists => info!("Remote folder already exists"),
                    }
                    return Ok(Some(status));
                }
                Err(err) if err.is_unauthorized() => {
                    error!(error = %err, "Remote store rejected credentials");
                    return Err(SyncError::Unauthorized(err));
                }
                Err(err) => {
                    warn!(
                        attempt,
                        error = %err,
                        retry_in_secs = self.settings.folder_retry_delay.as_secs(),
                        "Failed to prepare remote folder, retrying"
                    );
                }
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Shutdown requested while preparing remote folder");
                    return Ok(None);
                }
                () = tokio::time::sleep(self.settings.folder_retry_delay) => {}
            }
        }
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    /// Runs one reconciliation cycle
    ///
    /// Never fails: every error is logged, and the affected phase is skipped
    /// until the next cycle.
    #[tracing::instrument(skip(self), fields(cycle = tracing::field::Empty))]
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::Span::current().record("cycle", cycle);
        let mut report = CycleReport::new(cycle);

        report.outcome = self.reconcile(&mut report).await;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            outcome = ?report.outcome,
            local = report.local_files,
            remote = report.remote_files,
            uploaded = report.operations.uploaded,
            overwritten = report.operations.overwritten,
            deleted = report.operations.deleted,
            accepted = report.operations.accepted,
            failed = report.operations.failed(),
            duration_ms = report.duration_ms,
            "Reconciliation cycle completed"
        );

        report
    }

    async fn reconcile(&self, report: &mut CycleReport) -> CycleOutcome {
        // Step 1: Listings
        self.set_state(ReconcilerState::ListingBoth);

        let local = match self.inventory.list_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(error = %err, "Failed to list local directory, skipping cycle");
                return CycleOutcome::LocalListingFailed;
            }
        };
        report.local_files = local.len();

        let remote = match self.remote.list_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(error = %err, "Failed to list remote folder, skipping cycle");
                return CycleOutcome::RemoteListingFailed;
            }
        };
        report.remote_files = remote.len();

        // Step 2: Diff
        self.set_state(ReconcilerState::ComputingDiff);
        let mut plan = OperationSet::from_listings(&local, &remote);

        if local.is_empty() && !remote.is_empty() {
            warn!(
                files = remote.len(),
                "Local directory is empty, deleting every file in the remote folder"
            );
        }
        debug!(
            to_upload = plan.to_upload().len(),
            to_delete = plan.to_delete().len(),
            "Transfer plan computed"
        );

        // Step 3: Uploads and deletes
        self.set_state(ReconcilerState::ExecutingTransfers);
        let transfers = execute_batch(
            Arc::clone(&self.remote),
            plan.transfer_operations(),
            self.settings.max_concurrent,
        )
        .await;
        report.operations.merge(transfers);

        // Step 4: Overwrites
        self.set_state(ReconcilerState::ExecutingOverwrite);

        let local_times = match self.inventory.modification_times(&local).await {
            Ok(times) => times,
            Err(err) => {
                warn!(error = %err, "Failed to read local modification times, skipping overwrites");
                return CycleOutcome::OverwritesSkipped;
            }
        };
        let remote_times = match self.remote.modification_times().await {
            Ok(times) => times,
            Err(err) => {
                warn!(error = %err, "Failed to read remote modification times, skipping overwrites");
                return CycleOutcome::OverwritesSkipped;
            }
        };

        plan.plan_overwrites(&local_times, &remote_times);
        debug!(to_overwrite = plan.to_overwrite().len(), "Overwrite plan computed");

        let overwrites = execute_batch(
            Arc::clone(&self.remote),
            plan.overwrite_operations(),
            self.settings.max_concurrent,
        )
        .await;
        report.operations.merge(overwrites);

        CycleOutcome::Completed
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Prepares the remote folder and runs a single cycle
    ///
    /// Returns `Ok(None)` if `shutdown` fired before the folder was ready.
    ///
    /// # Errors
    /// [`SyncError::Unauthorized`] if the remote store rejects the credentials
    pub async fn run_once(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Option<CycleReport>, SyncError> {
        let result = match self.ensure_folder(shutdown).await? {
            Some(_) => Some(self.run_cycle().await),
            None => None,
        };
        self.set_state(ReconcilerState::Stopped);
        Ok(result)
    }

    /// Runs the reconciliation loop until `shutdown` is cancelled
    ///
    /// A cycle that has started always runs to completion; cancellation is
    /// observed while sleeping and during the startup backoff.
    ///
    /// # Errors
    /// [`SyncError::Unauthorized`] if the remote store rejects the credentials
    /// while preparing the folder
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            max_concurrent = self.settings.max_concurrent,
            "Reconciler starting"
        );

        let ready = self.ensure_folder(&shutdown).await;
        if !matches!(ready, Ok(Some(_))) {
            self.set_state(ReconcilerState::Stopped);
            return ready.map(|_| ());
        }

        loop {
            self.run_cycle().await;

            self.set_state(ReconcilerState::Sleeping);
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        self.set_state(ReconcilerState::Stopped);
        info!(
            cycles = self.cycles.load(Ordering::Relaxed),
            "Reconciler stopped"
        );
        Ok(())
    }
}
