//! Reconciliation watcher
//!
//! [`Reconciler`] holds the state machine and the per-kind change stamps.
//! [`Watcher`] owns one reconciler inside a single task and drives it from a
//! fixed interval and from force-reload requests, so ticks and manual
//! triggers are serialized by construction.
//!
//! ```text
//! Uninitialized -> Baselining -> Steady <-> Regenerating
//! ```

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::compiler;
use crate::generators::{ArtifactGenerator, ArtifactKind};
use crate::model::EntityKind;
use crate::publisher::Publisher;
use crate::reload::Reloader;
use crate::snapshot::ArtifactSnapshot;
use crate::store::{KindStamp, PolicyStore, StoreError};
use crate::validator::ValidationFailure;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("watcher is not running")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Baselining,
    Steady,
    Regenerating,
}

/// Result of one reconciliation, as returned to force-reload callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    pub clients_regenerated: bool,
    pub users_regenerated: bool,
    pub policies_regenerated: bool,
    pub reloaded: bool,
    pub validation_failed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ValidationFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

type Stamps = HashMap<EntityKind, KindStamp>;

pub struct Reconciler {
    store: Arc<dyn PolicyStore>,
    generator: ArtifactGenerator,
    publisher: Publisher,
    reloader: Arc<dyn Reloader>,
    audit: Arc<AuditLogger>,
    phase: Phase,
    stamps: Stamps,
    /// Set when a published change has not yet reached the daemon
    pending_reload: bool,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        generator: ArtifactGenerator,
        publisher: Publisher,
        reloader: Arc<dyn Reloader>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Reconciler {
            store,
            generator,
            publisher,
            reloader,
            audit,
            phase: Phase::Uninitialized,
            stamps: HashMap::new(),
            pending_reload: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stamp(&self, kind: EntityKind) -> Option<KindStamp> {
        self.stamps.get(&kind).copied()
    }

    async fn current_stamps(&self) -> Result<Stamps, StoreError> {
        let mut stamps = HashMap::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            stamps.insert(kind, self.store.stamp(kind).await?);
        }
        Ok(stamps)
    }

    fn artifact_paths(&self) -> Vec<PathBuf> {
        ArtifactKind::ALL
            .iter()
            .map(|&kind| self.generator.layout().path(kind).to_path_buf())
            .collect()
    }

    /// One timer tick
    pub async fn tick(&mut self) -> Result<ReloadReport, ReconcileError> {
        let current = self.current_stamps().await?;

        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Baselining;
            if self.publisher.all_present(&self.artifact_paths()).await {
                info!("artifacts present on disk; adopting store state as baseline");
                self.stamps = current;
                self.phase = Phase::Steady;
                return Ok(ReloadReport::default());
            }
            info!("artifacts missing; running initial full generation");
            let report = self
                .regenerate(&EntityKind::ALL, ArtifactKind::ALL.into_iter().collect(), current)
                .await;
            return Ok(report);
        }

        let stale: Vec<EntityKind> = EntityKind::ALL
            .into_iter()
            .filter(|kind| {
                self.stamps
                    .get(kind)
                    .is_none_or(|recorded| recorded.is_stale(&current[kind]))
            })
            .collect();

        if stale.is_empty() {
            let mut report = ReloadReport::default();
            if self.pending_reload {
                self.signal_reload(&mut report).await;
            }
            return Ok(report);
        }

        let artifacts: BTreeSet<ArtifactKind> = stale
            .iter()
            .flat_map(|&kind| ArtifactKind::affected_by(kind).iter().copied())
            .collect();
        debug!(stale = ?stale, artifacts = ?artifacts, "store changed");
        Ok(self.regenerate(&stale, artifacts, current).await)
    }

    /// Regenerate every artifact regardless of recorded stamps
    pub async fn force(&mut self) -> Result<ReloadReport, ReconcileError> {
        let current = self.current_stamps().await?;
        info!("forced reconciliation");
        Ok(self
            .regenerate(&EntityKind::ALL, ArtifactKind::ALL.into_iter().collect(), current)
            .await)
    }

    async fn regenerate(
        &mut self,
        kinds: &[EntityKind],
        artifacts: BTreeSet<ArtifactKind>,
        current: Stamps,
    ) -> ReloadReport {
        self.phase = Phase::Regenerating;
        let report = self.run_regeneration(kinds, artifacts, current).await;
        self.phase = Phase::Steady;
        report
    }

    async fn run_regeneration(
        &mut self,
        kinds: &[EntityKind],
        artifacts: BTreeSet<ArtifactKind>,
        current: Stamps,
    ) -> ReloadReport {
        let mut report = ReloadReport::default();

        let snapshot = match ArtifactSnapshot::load(self.store.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "cannot load store snapshot");
                report.errors.push(e.to_string());
                return report;
            }
        };

        let compiled = match compiler::compile(&snapshot.policies, &snapshot.profiles) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                if artifacts.contains(&ArtifactKind::Policies)
                    || artifacts.contains(&ArtifactKind::Site)
                {
                    error!(policies = ?e.policies(), "{}", e);
                    self.audit
                        .log(
                            AuditEntry::new(AuditEventType::CompileFailed)
                                .with_details(e.to_string()),
                        )
                        .await;
                    report.errors.push(e.to_string());
                }
                None
            }
        };

        let mut candidates = Vec::with_capacity(artifacts.len());
        let mut failed: BTreeSet<ArtifactKind> = BTreeSet::new();
        for &kind in &artifacts {
            match self.generator.generate(kind, &snapshot, compiled.as_ref()) {
                Ok(artifact) => candidates.push(artifact),
                Err(e) => {
                    warn!(artifact = %kind, reason = %e.reason, "keeping previous artifact");
                    self.audit
                        .log(
                            AuditEntry::new(AuditEventType::GenerationFailed)
                                .with_artifacts([kind])
                                .with_details(e.reason.clone()),
                        )
                        .await;
                    report.errors.push(e.to_string());
                    failed.insert(kind);
                }
            }
        }

        let published = if candidates.is_empty() {
            None
        } else {
            match self.publisher.publish(candidates).await {
                Ok(result) => Some(result),
                Err(e) => {
                    error!(error = %e, "publish failed; live configuration kept");
                    report.validation_failed = true;
                    report.errors.push(e.to_string());
                    return report;
                }
            }
        };

        if let Some(result) = &published {
            if result.validation_failed {
                report.validation_failed = true;
                report.failures = result.failures.clone();
                self.audit
                    .log(
                        AuditEntry::new(AuditEventType::ValidationFailed)
                            .with_artifacts(&artifacts)
                            .with_details(
                                result
                                    .failures
                                    .iter()
                                    .map(ToString::to_string)
                                    .collect::<Vec<_>>()
                                    .join("; "),
                            ),
                    )
                    .await;
                // All stamps stay put so the next tick retries
                return report;
            }

            report.clients_regenerated = result.written.contains(&ArtifactKind::Clients);
            report.users_regenerated = result.written.contains(&ArtifactKind::Users);
            report.policies_regenerated = result.written.contains(&ArtifactKind::Policies)
                || result.written.contains(&ArtifactKind::Site);
            if result.changed() {
                self.pending_reload = true;
                self.audit
                    .log(
                        AuditEntry::new(AuditEventType::ConfigPublished)
                            .with_artifacts(&result.written)
                            .with_details(format!(
                                "activated {:?}, deactivated {:?}",
                                result.activated, result.deactivated
                            )),
                    )
                    .await;
            }
        }

        for &kind in kinds {
            let blocked = ArtifactKind::affected_by(kind)
                .iter()
                .any(|artifact| failed.contains(artifact));
            if blocked {
                continue;
            }
            if let Some(stamp) = current.get(&kind) {
                self.stamps.insert(kind, *stamp);
            }
        }

        if self.pending_reload {
            self.signal_reload(&mut report).await;
        }
        report
    }

    async fn signal_reload(&mut self, report: &mut ReloadReport) {
        match self.reloader.reload().await {
            Ok(()) => {
                self.pending_reload = false;
                report.reloaded = true;
                self.audit
                    .log(AuditEntry::new(AuditEventType::ReloadSignalled))
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "daemon reload failed; retrying next tick");
                self.audit
                    .log(AuditEntry::new(AuditEventType::ReloadFailed).with_details(e.to_string()))
                    .await;
                report.errors.push(e.to_string());
            }
        }
    }
}

enum Command {
    ForceReload(oneshot::Sender<Result<ReloadReport, ReconcileError>>),
}

/// Cloneable handle to a running watcher
#[derive(Clone)]
pub struct WatcherHandle {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl WatcherHandle {
    /// Run a forced reconciliation and wait for its report
    pub async fn force_reload(&self) -> Result<ReloadReport, ReconcileError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::ForceReload(reply))
            .await
            .map_err(|_| ReconcileError::Stopped)?;
        response.await.map_err(|_| ReconcileError::Stopped)?
    }

    /// Stop after any in-flight reconciliation completes
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

pub struct Watcher {
    reconciler: Reconciler,
    interval: Duration,
}

impl Watcher {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Watcher {
            reconciler,
            interval,
        }
    }

    pub fn spawn(self) -> (WatcherHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = WatcherHandle {
            commands: commands_tx,
            shutdown: Arc::new(shutdown_tx),
        };
        let task = tokio::spawn(self.run(commands_rx, shutdown_rx));
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "watcher started");
        self.reconciler
            .audit
            .log(AuditEntry::new(AuditEventType::WatcherStarted))
            .await;

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::ForceReload(reply)) => {
                        let report = self.reconciler.force().await;
                        let _ = reply.send(report);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    match self.reconciler.tick().await {
                        Ok(report) if !report.errors.is_empty() || report.validation_failed => {
                            warn!(
                                errors = report.errors.len(),
                                validation_failed = report.validation_failed,
                                "reconciliation incomplete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "reconciliation tick failed"),
                    }
                }
            }
        }

        info!("watcher stopped");
        self.reconciler
            .audit
            .log(AuditEntry::new(AuditEventType::WatcherStopped))
            .await;
    }
}
