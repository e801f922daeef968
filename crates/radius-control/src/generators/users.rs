//! Identity table (`mods-config/files/authorize`)
//!
//! One entry per MAC-bypass address, PSK and local user. MAC-shaped
//! identities accept on match; opaque usernames carry a password check.
//! `Tmp-String-0` records which selector produced the match.

use super::{ArtifactKind, GenerationError, comment_text};
use crate::model::EntityId;
use crate::render::{self, GENERATED_HEADER, ReplyItem, UdnSource, Value, quote};
use crate::secrets::SecretDecryptor;
use crate::snapshot::ArtifactSnapshot;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::LazyLock;
use tracing::warn;

/// Six octets, optionally separated by `-`, `:` or `.` (Cisco dotted form included)
pub const MAC_PATTERN: &str = "^([0-9a-f]{2})[-:.]?([0-9a-f]{2})[-:.]?([0-9a-f]{2})[-:.]?([0-9a-f]{2})[-:.]?([0-9a-f]{2})[-:.]?([0-9a-f]{2})$";

static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", MAC_PATTERN)).expect("valid regex")
});
static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@+-]+$").expect("valid regex"));

/// Lowercase colon-separated form, or `None` if `value` is not MAC-shaped
pub fn normalize_mac(value: &str) -> Option<String> {
    let captures = MAC.captures(value.trim())?;
    let octets: Vec<String> = (1..=6)
        .filter_map(|group| captures.get(group))
        .map(|octet| octet.as_str().to_ascii_lowercase())
        .collect();
    Some(octets.join(":"))
}

fn entry_key(identity: &str) -> String {
    if BARE_KEY.is_match(identity) {
        identity.to_string()
    } else {
        quote(identity)
    }
}

struct Entry {
    comment: String,
    key: String,
    check: Vec<ReplyItem>,
    reply: Vec<ReplyItem>,
}

impl Entry {
    fn write(&self, out: &mut String) {
        let check: Vec<String> = self.check.iter().map(|item| item.render(false)).collect();
        let _ = writeln!(out, "\n# {}", self.comment);
        let _ = writeln!(out, "{}\t{}", self.key, check.join(", "));
        for line in render::users_reply_lines(&self.reply) {
            let _ = writeln!(out, "{}", line);
        }
    }
}

/// Reply items of the referenced profile; a reference that does not resolve
/// to an active profile fails the artifact
fn profile_items(
    snapshot: &ArtifactSnapshot,
    profile_id: Option<EntityId>,
    owner: &str,
    udn: UdnSource,
) -> Result<Vec<ReplyItem>, GenerationError> {
    let Some(id) = profile_id else {
        return Ok(Vec::new());
    };
    snapshot
        .profile(Some(id))
        .map(|profile| render::profile_reply(profile, udn))
        .ok_or_else(|| {
            GenerationError::new(
                ArtifactKind::Users,
                format!("{}: profile {} does not exist or is disabled", owner, id),
            )
        })
}

/// Records `key` for `owner`; false (with a warning) if another entry has it
fn claim(seen: &mut HashMap<String, String>, key: &str, owner: &str) -> bool {
    match seen.get(key) {
        Some(first) => {
            warn!(identity = %key, kept = %first, skipped = %owner, "duplicate identity skipped");
            false
        }
        None => {
            seen.insert(key.to_string(), owner.to_string());
            true
        }
    }
}

fn accept() -> ReplyItem {
    ReplyItem::set("Auth-Type", Value::Bare("Accept".to_string()))
}

fn selector(tag: String) -> ReplyItem {
    ReplyItem::set("Tmp-String-0", Value::Text(tag))
}

pub fn render(
    snapshot: &ArtifactSnapshot,
    secrets: &dyn SecretDecryptor,
) -> Result<String, GenerationError> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();

    for config in &snapshot.mac_bypass {
        let owner = format!("mac bypass '{}'", config.name);
        let reply = profile_items(snapshot, config.profile_id, &owner, UdnSource::None)?;
        for mac in &config.mac_addresses {
            let key = normalize_mac(mac).ok_or_else(|| {
                GenerationError::new(
                    ArtifactKind::Users,
                    format!("{}: '{}' is not a MAC address", owner, mac),
                )
            })?;
            if !claim(&mut seen, &key, &owner) {
                continue;
            }
            entries.push(Entry {
                comment: format!("mac bypass: {}", comment_text(&config.name)),
                key,
                check: vec![accept(), selector(format!("mac_bypass:{}", config.id))],
                reply: reply.clone(),
            });
        }
    }

    for psk in &snapshot.psk {
        let owner = format!("psk '{}'", psk.name);
        let passphrase = secrets
            .decrypt(&owner, &psk.passphrase)
            .map_err(|e| GenerationError::new(ArtifactKind::Users, e.to_string()))?;

        let (key, mut check) = match normalize_mac(&psk.identity) {
            Some(mac) => (mac, vec![accept()]),
            None => (
                psk.identity.trim().to_string(),
                vec![ReplyItem::set("Cleartext-Password", Value::Text(passphrase.clone()))],
            ),
        };
        if key.is_empty() {
            return Err(GenerationError::new(
                ArtifactKind::Users,
                format!("{}: empty identity", owner),
            ));
        }
        if !claim(&mut seen, &key, &owner) {
            continue;
        }
        check.push(selector(format!("psk:{}", psk.id)));
        if let Some(udn) = psk.udn_id {
            check.push(ReplyItem::set("User-Defined-Network", Value::Integer(u64::from(udn))));
        }

        let udn = psk.udn_id.map(UdnSource::Literal).unwrap_or(UdnSource::None);
        let mut reply = vec![ReplyItem::set("Tunnel-Password", Value::Text(passphrase))];
        reply.extend(profile_items(snapshot, psk.profile_id, &owner, udn)?);

        entries.push(Entry {
            comment: format!("psk: {}", comment_text(&psk.name)),
            key: entry_key(&key),
            check,
            reply,
        });
    }

    for user in &snapshot.users {
        let username = user.username.trim();
        if username.is_empty() {
            return Err(GenerationError::new(
                ArtifactKind::Users,
                format!("user {}: empty username", user.id),
            ));
        }
        let owner = format!("user '{}'", username);
        if !claim(&mut seen, username, &owner) {
            continue;
        }
        entries.push(Entry {
            comment: format!("user: {}", comment_text(username)),
            key: entry_key(username),
            check: vec![ReplyItem::set(
                "Cleartext-Password",
                Value::Text(user.password.clone()),
            )],
            reply: profile_items(snapshot, user.profile_id, &owner, UdnSource::None)?,
        });
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    for entry in &entries {
        entry.write(&mut out);
    }
    Ok(out)
}
