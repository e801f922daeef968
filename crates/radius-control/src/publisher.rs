//! Validate-before-activate publishing of generated artifacts
//!
//! A publish either replaces every changed artifact or none of them:
//!
//! 1. diff candidates (and their activation links) against the live directory;
//! 2. stage a copy of the live directory with the candidates applied;
//! 3. run the validator on the staged copy;
//! 4. write all changed files to temporaries beside their targets, then
//!    rename them into place and update activation links.
//!
//! Unchanged content is never rewritten.

use crate::generators::{Artifact, ArtifactKind};
use crate::validator::{ConfigValidator, ValidationFailure};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Mode of newly created artifacts; existing files keep theirs
const NEW_FILE_MODE: u32 = 0o640;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("publish task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PublishError {
    fn io<'a>(
        action: &'static str,
        path: &'a Path,
    ) -> impl FnOnce(io::Error) -> PublishError + 'a {
        move |source| PublishError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of one publish attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub written: Vec<ArtifactKind>,
    pub unchanged: Vec<ArtifactKind>,
    pub activated: Vec<PathBuf>,
    pub deactivated: Vec<PathBuf>,
    pub validation_failed: bool,
    pub failures: Vec<ValidationFailure>,
}

impl PublishResult {
    /// Whether the live directory was modified
    pub fn changed(&self) -> bool {
        !self.written.is_empty() || !self.activated.is_empty() || !self.deactivated.is_empty()
    }
}

#[derive(Debug, Default)]
struct Plan {
    writes: Vec<usize>,
    unchanged: Vec<ArtifactKind>,
    /// (link, target) pairs to create or repoint
    links: Vec<(PathBuf, PathBuf)>,
    unlinks: Vec<PathBuf>,
}

impl Plan {
    fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.links.is_empty() && self.unlinks.is_empty()
    }
}

fn read_existing(path: &Path) -> Result<Option<String>, PublishError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PublishError::io("reading", path)(e)),
    }
}

fn current_link(path: &Path) -> Result<Option<PathBuf>, PublishError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::read_link(path).map(Some).map_err(PublishError::io("reading link", path))
        }
        // A regular file in place of the link counts as "present, wrong target"
        Ok(_) => Ok(Some(PathBuf::new())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PublishError::io("inspecting", path)(e)),
    }
}

fn diff(root: &Path, candidates: &[Artifact]) -> Result<Plan, PublishError> {
    let mut plan = Plan::default();
    for (index, artifact) in candidates.iter().enumerate() {
        let existing = read_existing(&root.join(&artifact.path))?;
        if existing.as_deref() == Some(artifact.content.as_str()) {
            plan.unchanged.push(artifact.kind);
        } else {
            plan.writes.push(index);
        }

        let (Some(activation), Some(target)) = (&artifact.activation, artifact.link_target()) else {
            continue;
        };
        let current = current_link(&root.join(&activation.link))?;
        match (activation.enabled, current) {
            (true, Some(existing)) if existing == target => {}
            (true, _) => plan.links.push((activation.link.clone(), target)),
            (false, Some(_)) => plan.unlinks.push(activation.link.clone()),
            (false, None) => {}
        }
    }
    Ok(plan)
}

/// Recursive copy that recreates symlinks instead of following them
fn copy_tree(src: &Path, dst: &Path, skip: &Path) -> Result<(), PublishError> {
    fs::create_dir_all(dst).map_err(PublishError::io("creating", dst))?;
    for entry in fs::read_dir(src).map_err(PublishError::io("listing", src))? {
        let entry = entry.map_err(PublishError::io("listing", src))?;
        let from = entry.path();
        if from == skip {
            continue;
        }
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(PublishError::io("inspecting", &from))?;
        if file_type.is_symlink() {
            let target = fs::read_link(&from).map_err(PublishError::io("reading link", &from))?;
            symlink(&target, &to).map_err(PublishError::io("linking", &to))?;
        } else if file_type.is_dir() {
            copy_tree(&from, &to, skip)?;
        } else {
            fs::copy(&from, &to).map_err(PublishError::io("copying", &from))?;
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path, PublishError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(PublishError::io("creating", parent))?;
    Ok(parent)
}

fn replace_link(path: &Path, target: &Path) -> Result<(), PublishError> {
    let parent = ensure_parent(path)?;
    let mut temp = parent.to_path_buf();
    temp.push(format!(
        ".{}.rc-link",
        path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default()
    ));
    let _ = fs::remove_file(&temp);
    symlink(target, &temp).map_err(PublishError::io("linking", &temp))?;
    fs::rename(&temp, path).map_err(PublishError::io("activating", path))
}

fn remove_link(path: &Path) -> Result<(), PublishError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PublishError::io("deactivating", path)(e)),
    }
}

/// Apply every candidate and link of the plan under `root` (staging)
fn apply_all(root: &Path, candidates: &[Artifact], plan: &Plan) -> Result<(), PublishError> {
    for artifact in candidates {
        let path = root.join(&artifact.path);
        ensure_parent(&path)?;
        fs::write(&path, &artifact.content).map_err(PublishError::io("writing", &path))?;
    }
    for (link, target) in &plan.links {
        replace_link(&root.join(link), target)?;
    }
    for link in &plan.unlinks {
        remove_link(&root.join(link))?;
    }
    Ok(())
}

/// Write changed files to temporaries, then rename them all into place
fn commit(root: &Path, candidates: &[Artifact], plan: &Plan) -> Result<(), PublishError> {
    let mut prepared: Vec<(NamedTempFile, PathBuf)> = Vec::with_capacity(plan.writes.len());
    for &index in &plan.writes {
        let artifact = &candidates[index];
        let path = root.join(&artifact.path);
        let parent = ensure_parent(&path)?;
        let mut temp = NamedTempFile::new_in(parent)
            .map_err(PublishError::io("creating temporary in", parent))?;
        temp.write_all(artifact.content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(PublishError::io("writing", temp.path()))?;
        let permissions = fs::metadata(&path)
            .map(|meta| meta.permissions())
            .unwrap_or_else(|_| fs::Permissions::from_mode(NEW_FILE_MODE));
        fs::set_permissions(temp.path(), permissions)
            .map_err(PublishError::io("setting permissions on", temp.path()))?;
        prepared.push((temp, path));
    }
    for (temp, path) in prepared {
        temp.persist(&path)
            .map_err(|e| PublishError::io("replacing", &path)(e.error))?;
    }
    for (link, target) in &plan.links {
        replace_link(&root.join(link), target)?;
    }
    for link in &plan.unlinks {
        remove_link(&root.join(link))?;
    }
    Ok(())
}

/// Publishes artifacts into the daemon configuration directory
#[derive(Clone)]
pub struct Publisher {
    raddb_dir: PathBuf,
    state_dir: PathBuf,
    validator: Arc<dyn ConfigValidator>,
}

impl Publisher {
    pub fn new(
        raddb_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        validator: Arc<dyn ConfigValidator>,
    ) -> Self {
        Publisher {
            raddb_dir: raddb_dir.into(),
            state_dir: state_dir.into(),
            validator,
        }
    }

    pub fn raddb_dir(&self) -> &Path {
        &self.raddb_dir
    }

    /// Whether every artifact file of `paths` exists in the live directory
    pub async fn all_present(&self, paths: &[PathBuf]) -> bool {
        for path in paths {
            if !tokio::fs::try_exists(self.raddb_dir.join(path))
                .await
                .unwrap_or(false)
            {
                return false;
            }
        }
        true
    }

    pub async fn publish(&self, candidates: Vec<Artifact>) -> Result<PublishResult, PublishError> {
        let root = self.raddb_dir.clone();
        let candidates = Arc::new(candidates);

        let plan = {
            let root = root.clone();
            let candidates = Arc::clone(&candidates);
            tokio::task::spawn_blocking(move || diff(&root, &candidates)).await??
        };
        if plan.is_empty() {
            debug!(artifacts = candidates.len(), "candidates match live configuration");
            return Ok(PublishResult {
                unchanged: plan.unchanged,
                ..Default::default()
            });
        }
        let plan = Arc::new(plan);

        let stage = {
            let root = root.clone();
            let state_dir = self.state_dir.clone();
            let candidates = Arc::clone(&candidates);
            let plan = Arc::clone(&plan);
            tokio::task::spawn_blocking(move || -> Result<tempfile::TempDir, PublishError> {
                fs::create_dir_all(&state_dir).map_err(PublishError::io("creating", &state_dir))?;
                let stage = tempfile::Builder::new()
                    .prefix("stage-")
                    .tempdir_in(&state_dir)
                    .map_err(PublishError::io("staging in", &state_dir))?;
                copy_tree(&root, stage.path(), &state_dir)?;
                apply_all(stage.path(), &candidates, &plan)?;
                Ok(stage)
            })
            .await??
        };
        debug!(stage = %stage.path().display(), "staged candidate configuration");

        let failures = match self.validator.validate(stage.path(), &candidates).await {
            Ok(failures) => failures,
            Err(e) => vec![ValidationFailure::general(format!(
                "validator '{}' could not run: {}",
                self.validator.name(),
                e
            ))],
        };
        drop(stage);
        if !failures.is_empty() {
            warn!(
                failures = failures.len(),
                first = %failures[0],
                "candidate configuration rejected; live configuration untouched"
            );
            return Ok(PublishResult {
                validation_failed: true,
                failures,
                ..Default::default()
            });
        }

        {
            let root = root.clone();
            let candidates = Arc::clone(&candidates);
            let plan = Arc::clone(&plan);
            tokio::task::spawn_blocking(move || commit(&root, &candidates, &plan)).await??;
        }

        let result = PublishResult {
            written: plan.writes.iter().map(|&index| candidates[index].kind).collect(),
            unchanged: plan.unchanged.clone(),
            activated: plan.links.iter().map(|(link, _)| link.clone()).collect(),
            deactivated: plan.unlinks.clone(),
            validation_failed: false,
            failures: Vec::new(),
        };
        info!(
            written = ?result.written,
            activated = ?result.activated,
            deactivated = ?result.deactivated,
            "published configuration"
        );
        Ok(result)
    }
}
