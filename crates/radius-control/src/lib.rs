//! RADIUS policy and configuration control plane
//!
//! Reads clients, authorization profiles and policies from a store, compiles
//! them into the daemon's configuration files, publishes those files only
//! after the complete candidate set validates, and keeps them in step with
//! the store. Also sends RFC 5176 Disconnect and CoA requests to NADs.
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_control::{
//!     ArtifactGenerator, ArtifactLayout, AuditLogger, NoopReloader, PlaintextSecrets, Publisher,
//!     Reconciler, SiteOptions, SqlModuleOptions, StructuralValidator, MemoryStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = ArtifactGenerator::new(
//!         ArtifactLayout::default(),
//!         SiteOptions::default(),
//!         SqlModuleOptions::default(),
//!         Arc::new(PlaintextSecrets),
//!     );
//!     let publisher = Publisher::new(
//!         "/etc/freeradius/3.0",
//!         "/var/lib/radius-control",
//!         Arc::new(StructuralValidator),
//!     );
//!     let mut reconciler = Reconciler::new(
//!         Arc::new(MemoryStore::new()),
//!         generator,
//!         publisher,
//!         Arc::new(NoopReloader),
//!         Arc::new(AuditLogger::disabled()),
//!     );
//!
//!     let report = reconciler.force().await?;
//!     println!("validation failed: {}", report.validation_failed);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod coa;
pub mod compiler;
pub mod config;
pub mod dictionary;
pub mod generators;
pub mod model;
pub mod process;
pub mod publisher;
pub mod reload;
pub mod render;
pub mod secrets;
pub mod snapshot;
pub mod store;
pub mod validator;
pub mod watcher;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use coa::{CallerError, CoaClient, CoaConfig, CoaError, DynAuthResult, NadRef, ProtocolError};
pub use compiler::{CompileError, CompileIssue, CompiledPolicySet, CompiledRule, compile};
pub use config::{Config, ConfigError};
pub use generators::{
    Artifact, ArtifactGenerator, ArtifactKind, ArtifactLayout, GenerationError, SiteOptions,
    SqlModuleOptions,
};
pub use model::{
    AuthorizationProfile, EapKind, EapMethod, EntityId, EntityKind, IdentityUser, MacBypassConfig,
    PolicyAction, PolicyCondition, PolicyOutcome, PolicyType, PskConfig, RadiusClient,
    UnlangPolicy,
};
pub use publisher::{PublishError, PublishResult, Publisher};
pub use reload::{CommandReloader, NoopReloader, ReloadError, Reloader};
pub use secrets::{PlaintextSecrets, SecretDecryptor, SecretError};
pub use snapshot::ArtifactSnapshot;
pub use store::{JsonFileStore, MemoryStore, PolicyStore, StoreError};
pub use validator::{
    ChainValidator, CommandValidator, ConfigValidator, StructuralValidator, ValidationFailure,
};
pub use watcher::{Phase, ReconcileError, Reconciler, ReloadReport, Watcher, WatcherHandle};
