//! Bounded concurrent execution of remote operations
//!
//! A batch dispatches every operation onto its own task, never running more
//! than `max_concurrent` of them at once. The batch only returns after every
//! dispatched operation has finished, and one operation failing has no
//! effect on the others.

use std::collections::HashMap;
use std::sync::Arc;

use diskmirror_core::domain::newtypes::FileName;
use diskmirror_core::domain::plan::Operation;
use diskmirror_core::ports::remote_store::{IRemoteStore, RemoteError, UploadMode, UploadOutcome};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

/// What a single successful operation did on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Upload or overwrite finished with the given outcome
    Transferred(UploadOutcome),
    /// Remote file removed
    Deleted,
}

/// Aggregated results of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files created remotely
    pub uploaded: u32,
    /// Remote files replaced by a newer local version
    pub overwritten: u32,
    /// Remote files removed
    pub deleted: u32,
    /// Transfers the server accepted but has not yet placed in the folder
    pub accepted: u32,
    /// Operations that failed, with their cause
    pub failures: Vec<(Operation, RemoteError)>,
    /// Files whose worker task panicked before reporting a result
    pub panicked: Vec<FileName>,
}

impl BatchReport {
    /// Number of operations that returned successfully
    #[must_use]
    pub fn succeeded(&self) -> u32 {
        self.uploaded + self.overwritten + self.deleted
    }

    /// Number of failed operations
    #[must_use]
    pub fn failed(&self) -> u32 {
        (self.failures.len() + self.panicked.len()) as u32
    }

    /// Folds another batch's counters into this one
    pub fn merge(&mut self, other: BatchReport) {
        self.uploaded += other.uploaded;
        self.overwritten += other.overwritten;
        self.deleted += other.deleted;
        self.accepted += other.accepted;
        self.failures.extend(other.failures);
        self.panicked.extend(other.panicked);
    }

    fn record(&mut self, operation: Operation, result: Result<Completion, RemoteError>) {
        match result {
            Ok(completion) => {
                if completion == Completion::Transferred(UploadOutcome::Accepted) {
                    self.accepted += 1;
                }
                match operation {
                    Operation::Upload(_) => self.uploaded += 1,
                    Operation::Overwrite(_) => self.overwritten += 1,
                    Operation::Delete(_) => self.deleted += 1,
                }
            }
            Err(err) => self.failures.push((operation, err)),
        }
    }
}

/// Runs a single operation against the remote store and logs its result
async fn perform(
    remote: &dyn IRemoteStore,
    operation: &Operation,
) -> Result<Completion, RemoteError> {
    let name = operation.file_name();
    let result = match operation {
        Operation::Upload(_) => remote
            .upload(name, UploadMode::Create)
            .await
            .map(Completion::Transferred),
        Operation::Overwrite(_) => remote
            .upload(name, UploadMode::Overwrite)
            .await
            .map(Completion::Transferred),
        Operation::Delete(_) => remote.delete(name).await.map(|()| Completion::Deleted),
    };

    match &result {
        Ok(Completion::Transferred(UploadOutcome::Stored)) => {
            info!(file = %name, op = operation.kind(), "File transferred");
        }
        Ok(Completion::Transferred(UploadOutcome::Accepted)) => {
            info!(
                file = %name,
                op = operation.kind(),
                "File accepted by server, placement pending"
            );
        }
        Ok(Completion::Deleted) => {
            info!(file = %name, op = operation.kind(), "File deleted");
        }
        Err(err) => {
            warn!(file = %name, op = operation.kind(), error = %err, "Operation failed");
        }
    }

    result
}

/// Executes `operations` with at most `max_concurrent` in flight
///
/// Waits for every dispatched operation before returning. A task that
/// panics is recorded in [`BatchReport::panicked`]
/// under the file it was working on.
pub async fn execute_batch(
    remote: Arc<dyn IRemoteStore>,
    operations: Vec<Operation>,
    max_concurrent: usize,
) -> BatchReport {
    let mut report = BatchReport::default();
    if operations.is_empty() {
        return report;
    }

    debug!(
        operations = operations.len(),
        max_concurrent, "Dispatching batch"
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut join_set: JoinSet<(Operation, Result<Completion, RemoteError>)> = JoinSet::new();
    let mut in_flight: HashMap<task::Id, FileName> = HashMap::new();

    for operation in operations {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => {
                error!(file = %operation.file_name(), error = %err, "Worker pool closed");
                report.failures.push((
                    operation,
                    RemoteError::Server(format!("worker pool closed: {err}")),
                ));
                continue;
            }
        };

        let name = operation.file_name().clone();
        let remote = Arc::clone(&remote);
        let handle = join_set.spawn(async move {
            let _permit = permit;
            let result = perform(remote.as_ref(), &operation).await;
            (operation, result)
        });
        in_flight.insert(handle.id(), name);
    }

    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((id, (operation, result))) => {
                in_flight.remove(&id);
                report.record(operation, result);
            }
            Err(join_err) => match in_flight.remove(&join_err.id()) {
                Some(name) => {
                    error!(file = %name, error = %join_err, "Worker task failed");
                    report.panicked.push(name);
                }
                None => error!(error = %join_err, "Worker task failed"),
            },
        }
    }

    report
}
