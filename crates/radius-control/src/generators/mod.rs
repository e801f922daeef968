//! Artifact generators
//!
//! Each generator is a pure transform from an [`ArtifactSnapshot`] (and the
//! compiled policy set where needed) to the text of one daemon file. A
//! generator either returns complete content or a [`GenerationError`]; it
//! never emits a partial file.

pub mod clients;
pub mod dictionary;
pub mod modules;
pub mod policies;
pub mod site;
pub mod users;

pub use modules::SqlModuleOptions;
pub use site::SiteOptions;

use crate::compiler::CompiledPolicySet;
use crate::model::EntityKind;
use crate::secrets::SecretDecryptor;
use crate::snapshot::ArtifactSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Files the control plane owns inside the daemon configuration directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Clients,
    Users,
    Policies,
    Modules,
    Site,
    Dictionary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Dictionary,
        ArtifactKind::Clients,
        ArtifactKind::Users,
        ArtifactKind::Policies,
        ArtifactKind::Modules,
        ArtifactKind::Site,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Clients => "clients",
            ArtifactKind::Users => "users",
            ArtifactKind::Policies => "policies",
            ArtifactKind::Modules => "modules",
            ArtifactKind::Site => "site",
            ArtifactKind::Dictionary => "dictionary",
        }
    }

    /// Artifacts whose content depends on entities of `kind`
    pub fn affected_by(kind: EntityKind) -> &'static [ArtifactKind] {
        match kind {
            EntityKind::Client => &[ArtifactKind::Clients],
            EntityKind::Profile => &[ArtifactKind::Users, ArtifactKind::Policies],
            EntityKind::Policy => &[ArtifactKind::Policies, ArtifactKind::Site],
            EntityKind::MacBypass | EntityKind::Psk => &[ArtifactKind::Users, ArtifactKind::Site],
            EntityKind::User => &[ArtifactKind::Users],
            EntityKind::EapMethod => &[ArtifactKind::Site],
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot generate {artifact} artifact: {reason}")]
pub struct GenerationError {
    pub artifact: ArtifactKind,
    pub reason: String,
}

impl GenerationError {
    pub fn new(artifact: ArtifactKind, reason: impl Into<String>) -> Self {
        GenerationError {
            artifact,
            reason: reason.into(),
        }
    }
}

/// Symlink-style activation of an inert artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Link path relative to the configuration directory
    pub link: PathBuf,
    pub enabled: bool,
}

/// Generated content for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Path relative to the configuration directory
    pub path: PathBuf,
    pub content: String,
    pub activation: Option<Activation>,
}

impl Artifact {
    /// Link target for the activation, relative to the link's directory
    pub fn link_target(&self) -> Option<PathBuf> {
        let activation = self.activation.as_ref()?;
        let depth = activation
            .link
            .parent()
            .map(|parent| parent.components().count())
            .unwrap_or(0);
        let mut target = PathBuf::new();
        for _ in 0..depth {
            target.push("..");
        }
        target.push(&self.path);
        Some(target)
    }
}

/// Where each artifact lives, relative to the configuration directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    #[serde(default = "default_clients_file")]
    pub clients_file: PathBuf,
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,
    #[serde(default = "default_sql_module_file")]
    pub sql_module_file: PathBuf,
    #[serde(default = "default_sql_module_link")]
    pub sql_module_link: PathBuf,
    #[serde(default = "default_site_file")]
    pub site_file: PathBuf,
    #[serde(default = "default_site_link")]
    pub site_link: PathBuf,
    #[serde(default = "default_dictionary_file")]
    pub dictionary_file: PathBuf,
}

fn default_clients_file() -> PathBuf {
    PathBuf::from("clients.conf")
}

fn default_users_file() -> PathBuf {
    PathBuf::from("mods-config/files/authorize")
}

fn default_policy_file() -> PathBuf {
    PathBuf::from("policy.d/radius_control")
}

fn default_sql_module_file() -> PathBuf {
    PathBuf::from("mods-available/sql")
}

fn default_sql_module_link() -> PathBuf {
    PathBuf::from("mods-enabled/sql")
}

fn default_site_file() -> PathBuf {
    PathBuf::from("sites-available/radius-control")
}

fn default_site_link() -> PathBuf {
    PathBuf::from("sites-enabled/radius-control")
}

fn default_dictionary_file() -> PathBuf {
    PathBuf::from("dictionary")
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        ArtifactLayout {
            clients_file: default_clients_file(),
            users_file: default_users_file(),
            policy_file: default_policy_file(),
            sql_module_file: default_sql_module_file(),
            sql_module_link: default_sql_module_link(),
            site_file: default_site_file(),
            site_link: default_site_link(),
            dictionary_file: default_dictionary_file(),
        }
    }
}

fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

impl ArtifactLayout {
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Clients => &self.clients_file,
            ArtifactKind::Users => &self.users_file,
            ArtifactKind::Policies => &self.policy_file,
            ArtifactKind::Modules => &self.sql_module_file,
            ArtifactKind::Site => &self.site_file,
            ArtifactKind::Dictionary => &self.dictionary_file,
        }
    }

    /// Every path must stay inside the configuration directory
    pub fn validate(&self) -> Result<(), String> {
        let paths = [
            &self.clients_file,
            &self.users_file,
            &self.policy_file,
            &self.sql_module_file,
            &self.sql_module_link,
            &self.site_file,
            &self.site_link,
            &self.dictionary_file,
        ];
        match paths.iter().find(|path| !is_contained(path)) {
            Some(path) => Err(format!(
                "artifact path {} must be relative and stay inside the configuration directory",
                path.display()
            )),
            None => Ok(()),
        }
    }
}

/// Renders artifacts with the configured layout and options
#[derive(Clone)]
pub struct ArtifactGenerator {
    layout: ArtifactLayout,
    site: SiteOptions,
    sql: SqlModuleOptions,
    secrets: Arc<dyn SecretDecryptor>,
}

impl ArtifactGenerator {
    pub fn new(
        layout: ArtifactLayout,
        site: SiteOptions,
        sql: SqlModuleOptions,
        secrets: Arc<dyn SecretDecryptor>,
    ) -> Self {
        ArtifactGenerator {
            layout,
            site,
            sql,
            secrets,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Generate one artifact
    ///
    /// `compiled` is `None` when policy compilation failed; the artifacts that
    /// reference compiled blocks are then reported as not generated.
    pub fn generate(
        &self,
        kind: ArtifactKind,
        snapshot: &ArtifactSnapshot,
        compiled: Option<&CompiledPolicySet>,
    ) -> Result<Artifact, GenerationError> {
        let needs_policies = || {
            compiled.ok_or_else(|| GenerationError::new(kind, "policy compilation failed"))
        };
        let (content, activation) = match kind {
            ArtifactKind::Clients => (clients::render(&snapshot.clients)?, None),
            ArtifactKind::Users => (users::render(snapshot, self.secrets.as_ref())?, None),
            ArtifactKind::Policies => (policies::render(needs_policies()?), None),
            ArtifactKind::Modules => (
                modules::render_sql(&self.sql, self.secrets.as_ref())?,
                Some(Activation {
                    link: self.layout.sql_module_link.clone(),
                    enabled: self.sql.enabled,
                }),
            ),
            ArtifactKind::Site => (
                site::render(&self.site, self.sql.enabled, snapshot, needs_policies()?)?,
                Some(Activation {
                    link: self.layout.site_link.clone(),
                    enabled: true,
                }),
            ),
            ArtifactKind::Dictionary => (dictionary::render(), None),
        };
        Ok(Artifact {
            kind,
            path: self.layout.path(kind).to_path_buf(),
            content,
            activation,
        })
    }
}

/// Single-line text safe to place after `#`
pub(crate) fn comment_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_target_is_relative() {
        let artifact = Artifact {
            kind: ArtifactKind::Site,
            path: PathBuf::from("sites-available/radius-control"),
            content: String::new(),
            activation: Some(Activation {
                link: PathBuf::from("sites-enabled/radius-control"),
                enabled: true,
            }),
        };
        assert_eq!(
            artifact.link_target(),
            Some(PathBuf::from("../sites-available/radius-control"))
        );
    }

    #[test]
    fn test_layout_validation() {
        let mut layout = ArtifactLayout::default();
        assert!(layout.validate().is_ok());
        layout.users_file = PathBuf::from("../etc/passwd");
        assert!(layout.validate().is_err());
        layout.users_file = PathBuf::from("/etc/raddb/users");
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_affected_artifacts() {
        assert_eq!(ArtifactKind::affected_by(EntityKind::Client), &[ArtifactKind::Clients]);
        assert!(ArtifactKind::affected_by(EntityKind::Policy).contains(&ArtifactKind::Site));
        assert!(ArtifactKind::affected_by(EntityKind::Profile).contains(&ArtifactKind::Policies));
    }

    #[test]
    fn test_comment_text_flattens_newlines() {
        assert_eq!(comment_text("line one\nline\ttwo "), "line one line two");
    }
}
