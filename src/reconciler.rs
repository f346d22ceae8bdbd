//! Reconciliation engine.
//!
//! On startup every configured provider is brought up to date with the
//! labelled containers already on the host (`bootstrap`). Afterwards the
//! runtime's event feed drives incremental create/remove operations
//! (`handle_event`). Everything runs on one task: an event's mutations are
//! all attempted, provider by provider, before the next event is read.
//!
//! Bootstrap only adds records. Records left behind by containers removed
//! while the daemon was down are not cleaned up.

use log::{debug, info, warn};

use crate::error::{ProviderError, RuntimeError};
use crate::labels;
use crate::provider::DnsProvider;
use crate::runtime::ContainerRuntime;
use crate::types::{ActionKind, LifecycleEvent, Operation, Outcome, ResolvedTarget};

/// Failures that stop the reconciler.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Error fetching existing DNS entries from {endpoint}: {source}")]
    Fetch {
        endpoint: String,
        #[source]
        source: ProviderError,
    },

    #[error("Error fetching existing containers: {0}")]
    ListContainers(#[source] RuntimeError),

    #[error("Error watching events: {0}")]
    Events(#[source] RuntimeError),
}

/// Per-endpoint summary of a bootstrap pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub endpoint: String,
    pub existing: usize,
    pub containers: usize,
    pub labelled: usize,
    pub present: usize,
    pub created: usize,
    pub failed: usize,
}

pub struct Reconciler<R, P> {
    runtime: R,
    providers: Vec<P>,
    target: ResolvedTarget,
}

impl<R, P> Reconciler<R, P>
where
    R: ContainerRuntime,
    P: DnsProvider,
{
    pub fn new(runtime: R, providers: Vec<P>, target: ResolvedTarget) -> Self {
        Self {
            runtime,
            providers,
            target,
        }
    }

    /// Bootstrap, then follow the event feed until it fails.
    pub async fn run(&self) -> Result<(), ReconcileError> {
        self.bootstrap().await?;

        let mut events = self.runtime.subscribe();
        info!("Listening for Docker events...");
        loop {
            let event = events.next().await.map_err(ReconcileError::Events)?;
            self.handle_event(&event).await;
        }
    }

    /// Create every record a labelled container wants but a provider lacks.
    pub async fn bootstrap(&self) -> Result<Vec<BootstrapReport>, ReconcileError> {
        let mode = self.target.mode();
        let target = self.target.value();
        let mut reports = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let endpoint = provider.endpoint().to_string();
            let existing =
                provider
                    .fetch_existing(mode)
                    .await
                    .map_err(|source| ReconcileError::Fetch {
                        endpoint: endpoint.clone(),
                        source,
                    })?;
            let containers = self
                .runtime
                .list_containers()
                .await
                .map_err(ReconcileError::ListContainers)?;

            let mut report = BootstrapReport {
                endpoint,
                existing: existing.0.len(),
                containers: containers.len(),
                ..Default::default()
            };

            for container in &containers {
                let Some(record) = labels::desired_record(&container.labels) else {
                    continue;
                };
                report.labelled += 1;
                if existing.contains(&record.name, &target) {
                    debug!(
                        "Record {} for container {} already present on {}",
                        record.name, container.name, report.endpoint
                    );
                    report.present += 1;
                    continue;
                }
                let outcome = self
                    .apply(provider, Operation::Create, &container.name, &record.name)
                    .await;
                if outcome.success {
                    report.created += 1;
                } else {
                    report.failed += 1;
                }
            }

            info!(
                "Bootstrap of {} done: {} existing records, {} containers, {} labelled, {} present, {} created, {} failed",
                report.endpoint,
                report.existing,
                report.containers,
                report.labelled,
                report.present,
                report.created,
                report.failed
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Apply one lifecycle event to every provider, in configuration order.
    /// Returns one outcome per provider, or nothing if the event is not ours.
    pub async fn handle_event(&self, event: &LifecycleEvent) -> Vec<Outcome> {
        let Some((action, record)) = labels::relevant_event(event) else {
            debug!(
                "Ignoring {:?} event for unlabelled container {}",
                event.action, event.container_name
            );
            return Vec::new();
        };
        let op = match action {
            ActionKind::Created => Operation::Create,
            ActionKind::Removed => Operation::Delete,
        };

        let mut outcomes = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            outcomes.push(
                self.apply(provider, op, &event.container_name, &record.name)
                    .await,
            );
        }
        outcomes
    }

    async fn apply(&self, provider: &P, op: Operation, container: &str, domain: &str) -> Outcome {
        let outcome = provider
            .mutate(op, self.target.mode(), domain, &self.target.value())
            .await;
        if outcome.success {
            info!(
                "API for {} {} request successful for container {} - {}",
                provider.endpoint(),
                op,
                container,
                domain
            );
        } else {
            warn!(
                "API for {} {} request failed for container {} - {}: {}",
                provider.endpoint(),
                op,
                container,
                domain,
                outcome.message
            );
        }
        outcome
    }
}
