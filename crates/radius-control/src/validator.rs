//! Candidate configuration validation
//!
//! Validators run against a staged copy of the configuration directory with
//! the candidate artifacts already applied. An empty failure list means the
//! candidates may be published.

use crate::generators::{Artifact, ArtifactKind};
use crate::process::{self, CommandError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// One problem reported by a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Path relative to the configuration directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl ValidationFailure {
    pub fn general(message: impl Into<String>) -> Self {
        ValidationFailure {
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        ValidationFailure {
            file: Some(file.into()),
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}[{}]: {}", file.display(), line, self.message),
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// The validator itself could not run
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
pub trait ConfigValidator: Send + Sync {
    fn name(&self) -> &str;

    async fn validate(
        &self,
        staged: &Path,
        candidates: &[Artifact],
    ) -> Result<Vec<ValidationFailure>, ValidatorError>;
}

/// Lexical checks on candidate content that need no daemon binary
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn check(artifact: &Artifact) -> Vec<ValidationFailure> {
        let mut failures = check_lexical(&artifact.path, &artifact.content);
        if artifact.kind == ArtifactKind::Users {
            failures.extend(check_separators(&artifact.path, &artifact.content));
        }
        failures
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    Quoted,
    /// `/.../` operand of `=~` or `!~`
    Pattern,
}

/// Braces balance outside strings, patterns and comments; strings and
/// patterns close on their line
fn check_lexical(path: &Path, content: &str) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let mut state = Lexeme::Code;
        let mut escaped = false;
        // Last two non-blank code characters, to spot a regex operator
        let mut previous = [' ', ' '];
        for c in line.chars() {
            if state != Lexeme::Code {
                let closer = if state == Lexeme::Quoted { '"' } else { '/' };
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    _ if c == closer => state = Lexeme::Code,
                    _ => {}
                }
                continue;
            }
            match c {
                '#' => break,
                '"' => state = Lexeme::Quoted,
                '/' if previous[1] == '~' && matches!(previous[0], '=' | '!') => {
                    state = Lexeme::Pattern
                }
                '{' => open.push(number),
                '}' => {
                    if open.pop().is_none() {
                        failures.push(ValidationFailure::at(path, number, "unmatched '}'"));
                    }
                }
                _ => {}
            }
            if !c.is_whitespace() {
                previous = [previous[1], c];
            }
        }
        match state {
            Lexeme::Code => {}
            Lexeme::Quoted => {
                failures.push(ValidationFailure::at(path, number, "unterminated string"))
            }
            Lexeme::Pattern => {
                failures.push(ValidationFailure::at(
                    path,
                    number,
                    "unterminated regular expression",
                ))
            }
        }
    }
    for number in open {
        failures.push(ValidationFailure::at(path, number, "unclosed '{'"));
    }
    failures
}

fn flush_replies(
    path: &Path,
    replies: &mut Vec<(usize, &str)>,
    failures: &mut Vec<ValidationFailure>,
) {
    let last = replies.len().saturating_sub(1);
    for (position, (number, text)) in replies.iter().enumerate() {
        let trailing = text.trim_end().ends_with(',');
        if position < last && !trailing {
            failures.push(ValidationFailure::at(path, *number, "reply item must end with ','"));
        } else if position == last && trailing {
            failures.push(ValidationFailure::at(path, *number, "last reply item ends with ','"));
        }
    }
    replies.clear();
}

/// Identity entries: every reply line but the last ends with `,`
fn check_separators(path: &Path, content: &str) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let mut replies: Vec<(usize, &str)> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            flush_replies(path, &mut replies, &mut failures);
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            replies.push((index + 1, line));
        } else {
            flush_replies(path, &mut replies, &mut failures);
            if trimmed.ends_with(',') {
                failures.push(ValidationFailure::at(path, index + 1, "check items end with ','"));
            }
        }
    }
    flush_replies(path, &mut replies, &mut failures);
    failures
}

#[async_trait]
impl ConfigValidator for StructuralValidator {
    fn name(&self) -> &str {
        "structural"
    }

    async fn validate(
        &self,
        _staged: &Path,
        candidates: &[Artifact],
    ) -> Result<Vec<ValidationFailure>, ValidatorError> {
        Ok(candidates.iter().flat_map(StructuralValidator::check).collect())
    }
}

static DAEMON_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<path>/[^\[\s]+)\[(?P<line>\d+)\]:?\s*(?P<message>.*)$").expect("valid regex")
});

/// Placeholder replaced with the staged directory in command arguments
pub const RADDB_PLACEHOLDER: &str = "{raddb}";

/// Runs the daemon's own configuration check against the staged directory
#[derive(Debug, Clone)]
pub struct CommandValidator {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandValidator {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        CommandValidator { command, timeout }
    }

    pub fn default_command() -> Vec<String> {
        ["radiusd", "-XC", "-d", RADDB_PLACEHOLDER]
            .iter()
            .map(|part| part.to_string())
            .collect()
    }

    fn argv(&self, staged: &Path) -> Vec<String> {
        let staged = staged.to_string_lossy();
        self.command
            .iter()
            .map(|part| part.replace(RADDB_PLACEHOLDER, &staged))
            .collect()
    }
}

/// Map daemon diagnostics to failures with paths relative to `staged`
pub fn parse_daemon_output(staged: &Path, output: &str) -> Vec<ValidationFailure> {
    output
        .lines()
        .filter_map(|line| DAEMON_ERROR.captures(line.trim()))
        .map(|captures| {
            let path = Path::new(&captures["path"]);
            let file = path.strip_prefix(staged).unwrap_or(path).to_path_buf();
            ValidationFailure {
                file: Some(file),
                line: captures["line"].parse().ok(),
                message: captures["message"].trim().to_string(),
            }
        })
        .collect()
}

#[async_trait]
impl ConfigValidator for CommandValidator {
    fn name(&self) -> &str {
        "command"
    }

    async fn validate(
        &self,
        staged: &Path,
        _candidates: &[Artifact],
    ) -> Result<Vec<ValidationFailure>, ValidatorError> {
        let output = process::run(&self.argv(staged), self.timeout).await?;
        if output.status.success() {
            debug!("configuration check passed");
            return Ok(Vec::new());
        }

        let combined = output.combined();
        let mut failures = parse_daemon_output(staged, &combined);
        if failures.is_empty() {
            let tail = combined
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no output")
                .trim()
                .to_string();
            failures.push(ValidationFailure::general(format!(
                "configuration check exited with {}: {}",
                output.status, tail
            )));
        }
        warn!(failures = failures.len(), "configuration check rejected candidates");
        Ok(failures)
    }
}

/// Runs validators in order and stops at the first that reports failures
#[derive(Clone, Default)]
pub struct ChainValidator {
    validators: Vec<Arc<dyn ConfigValidator>>,
}

impl ChainValidator {
    pub fn new() -> Self {
        ChainValidator::default()
    }

    pub fn with(mut self, validator: Arc<dyn ConfigValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[async_trait]
impl ConfigValidator for ChainValidator {
    fn name(&self) -> &str {
        "chain"
    }

    async fn validate(
        &self,
        staged: &Path,
        candidates: &[Artifact],
    ) -> Result<Vec<ValidationFailure>, ValidatorError> {
        for validator in &self.validators {
            let failures = validator.validate(staged, candidates).await?;
            if !failures.is_empty() {
                debug!(
                    validator = validator.name(),
                    failures = failures.len(),
                    "validation failed"
                );
                return Ok(failures);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(kind: ArtifactKind, path: &str, content: &str) -> Artifact {
        Artifact {
            kind,
            path: PathBuf::from(path),
            content: content.to_string(),
            activation: None,
        }
    }

    fn check(kind: ArtifactKind, path: &str, content: &str) -> Vec<ValidationFailure> {
        StructuralValidator::check(&artifact(kind, path, content))
    }

    #[test]
    fn test_balanced_blocks_pass() {
        let text = "# {\nrc_a {\n\tif (&User-Name == \"{x\") {\n\t\tok\n\t}\n\tupdate reply {\n\t\t&Reply-Message := \"%{User-Name}\"\n\t}\n}\n";
        let failures = check(ArtifactKind::Policies, "policy.d/x", text);
        assert!(failures.is_empty(), "{:?}", failures);
    }

    #[test]
    fn test_unbalanced_braces() {
        let failures = check(ArtifactKind::Policies, "policy.d/x", "rc_a {\n\tok\n");
        assert_eq!(failures, vec![ValidationFailure::at("policy.d/x", 1, "unclosed '{'")]);

        let failures = check(ArtifactKind::Site, "sites-available/x", "ok\n}\n");
        assert_eq!(failures[0].line, Some(2));
    }

    #[test]
    fn test_unterminated_string() {
        let failures = check(
            ArtifactKind::Clients,
            "clients.conf",
            "client a {\n\tsecret = \"abc\n}\n",
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "unterminated string");
    }

    #[test]
    fn test_regex_operand_is_not_code() {
        let text = "rc_a {\n\tif (&User-Name =~ /^guest#\\d+\"}$/i) {\n\t\treject\n\t}\n}\n";
        let failures = check(ArtifactKind::Policies, "policy.d/x", text);
        assert!(failures.is_empty(), "{:?}", failures);

        // `#` outside strings and patterns still starts a comment
        let text = "rc_a {\n\tif (&User-Name == \"a\") {  # /{\n\t\tok\n\t}\n}\n";
        let failures = check(ArtifactKind::Policies, "policy.d/x", text);
        assert!(failures.is_empty(), "{:?}", failures);

        let failures = check(
            ArtifactKind::Policies,
            "policy.d/x",
            "rc_a {\n\tif (&User-Name !~ /abc\\/) {\n}\n",
        );
        assert_eq!(failures[0].message, "unterminated regular expression");
    }

    #[test]
    fn test_compiled_regex_with_comment_and_quote_characters_validates() {
        use crate::generators::policies;
        use crate::model::{PolicyAction, PolicyCondition, PolicyOutcome, UnlangPolicy};
        use std::collections::BTreeMap;

        let outcome = PolicyOutcome::new(PolicyAction::Reject);
        let policy = UnlangPolicy::new(1, "numbered guests", 10, outcome)
            .with_condition(PolicyCondition::new("User-Name", "=~", r#"^guest#\d+"x"/$"#));
        let compiled = crate::compile(&[policy], &BTreeMap::new()).unwrap();
        let content = policies::render(&compiled);
        assert!(content.contains(r#"=~ /^guest#\d+"x"\/$/"#));

        let failures = check(ArtifactKind::Policies, "policy.d/radius_control", &content);
        assert!(failures.is_empty(), "{:?}", failures);
    }

    #[test]
    fn test_users_separator_discipline() {
        let good = "# a\nalice\tCleartext-Password := \"x\"\n\tReply-Message := \"a\",\n\tSession-Timeout := 10\n\nbob\tCleartext-Password := \"y\"\n";
        assert!(check(ArtifactKind::Users, "authorize", good).is_empty());

        let missing = "alice\tCleartext-Password := \"x\"\n\tReply-Message := \"a\"\n\tSession-Timeout := 10\n";
        let failures = check(ArtifactKind::Users, "authorize", missing);
        assert_eq!(
            failures,
            vec![ValidationFailure::at("authorize", 2, "reply item must end with ','")]
        );

        let trailing = "alice\tCleartext-Password := \"x\"\n\tSession-Timeout := 10,\n";
        let failures = check(ArtifactKind::Users, "authorize", trailing);
        assert_eq!(failures[0].line, Some(2));
    }

    #[test]
    fn test_parse_daemon_output() {
        let staged = Path::new("/var/lib/radius-control/stage-1");
        let output = "Reading configuration\n\
            /var/lib/radius-control/stage-1/policy.d/radius_control[12]: Unknown attribute 'Foo'\n\
            Errors reading or parsing /etc/raddb/radiusd.conf\n";
        let failures = parse_daemon_output(staged, output);
        assert_eq!(
            failures,
            vec![ValidationFailure::at(
                "policy.d/radius_control",
                12,
                "Unknown attribute 'Foo'"
            )]
        );
        assert_eq!(failures[0].to_string(), "policy.d/radius_control[12]: Unknown attribute 'Foo'");
    }

    #[tokio::test]
    async fn test_command_validator_reports_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo \"$0/clients.conf[3]: bad secret\" >&2; exit 1".to_string(),
            RADDB_PLACEHOLDER.to_string(),
        ];
        let validator = CommandValidator::new(command, Duration::from_secs(5));
        let failures = validator.validate(dir.path(), &[]).await.unwrap();
        assert_eq!(failures, vec![ValidationFailure::at("clients.conf", 3, "bad secret")]);
    }

    #[tokio::test]
    async fn test_command_validator_passes() {
        let dir = tempfile::TempDir::new().unwrap();
        let validator = CommandValidator::new(vec!["true".to_string()], Duration::from_secs(5));
        assert!(validator.validate(dir.path(), &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let chain = ChainValidator::new()
            .with(Arc::new(StructuralValidator))
            .with(Arc::new(CommandValidator::new(
                vec!["/nonexistent/radiusd".to_string()],
                Duration::from_secs(1),
            )));
        let broken = [artifact(ArtifactKind::Policies, "policy.d/x", "rc_a {\n")];
        let failures = chain.validate(dir.path(), &broken).await.unwrap();
        assert_eq!(failures.len(), 1);

        let fine = [artifact(ArtifactKind::Policies, "policy.d/x", "rc_a {\n}\n")];
        assert!(chain.validate(dir.path(), &fine).await.is_err());
    }
}
