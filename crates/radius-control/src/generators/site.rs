//! Virtual server (`sites-available/radius-control`)
//!
//! Wires the identity table, the selectors and the compiled policy
//! dispatchers into the daemon's processing sections.

use super::policies::{ACCOUNTING_DISPATCHER, AUTHORIZE_DISPATCHER, POST_AUTH_DISPATCHER};
use super::users::MAC_PATTERN;
use super::{ArtifactKind, GenerationError};
use crate::compiler::CompiledPolicySet;
use crate::model::EntityId;
use crate::render::{GENERATED_HEADER, sanitize_identifier};
use crate::snapshot::ArtifactSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::net::IpAddr;

/// Listen options of the generated virtual server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOptions {
    #[serde(default = "default_name")]
    pub name: String,
    /// `*` or an IPv4/IPv6 address
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,
}

fn default_name() -> String {
    "radius-control".to_string()
}

fn default_listen_address() -> String {
    "*".to_string()
}

fn default_auth_port() -> u16 {
    1812
}

fn default_acct_port() -> u16 {
    1813
}

impl Default for SiteOptions {
    fn default() -> Self {
        SiteOptions {
            name: default_name(),
            listen_address: default_listen_address(),
            auth_port: default_auth_port(),
            acct_port: default_acct_port(),
        }
    }
}

impl SiteOptions {
    fn listen_line(&self) -> Result<String, GenerationError> {
        if self.listen_address == "*" {
            return Ok("ipaddr = *".to_string());
        }
        match self.listen_address.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok(format!("ipaddr = {}", addr)),
            Ok(IpAddr::V6(addr)) => Ok(format!("ipv6addr = {}", addr)),
            Err(_) => Err(GenerationError::new(
                ArtifactKind::Site,
                format!("invalid listen address '{}'", self.listen_address),
            )),
        }
    }
}

/// A condition and the policy block it selects
struct Selector {
    condition: String,
    block: String,
}

fn block_for(
    compiled: &CompiledPolicySet,
    policy_id: EntityId,
    owner: &str,
) -> Result<String, GenerationError> {
    compiled
        .rule_for(policy_id)
        .map(|rule| rule.block_name.clone())
        .ok_or_else(|| {
            GenerationError::new(
                ArtifactKind::Site,
                format!("{} references policy {} which is not active", owner, policy_id),
            )
        })
}

fn tag_condition(tag: String) -> String {
    format!("&control:Tmp-String-0 == \"{}\"", tag)
}

fn write_chain(out: &mut String, selectors: &[Selector], depth: usize) {
    let indent = "\t".repeat(depth);
    for (index, selector) in selectors.iter().enumerate() {
        let keyword = if index == 0 { "if" } else { "elsif" };
        let _ = writeln!(out, "{}{} ({}) {{", indent, keyword, selector.condition);
        let _ = writeln!(out, "{}\t{}", indent, selector.block);
        let _ = writeln!(out, "{}}}", indent);
    }
}

fn mac_regex() -> String {
    format!("/{}/i", MAC_PATTERN)
}

struct Selectors {
    authorize: Vec<Selector>,
    success: Vec<Selector>,
    failure: Vec<Selector>,
}

fn collect_selectors(
    snapshot: &ArtifactSnapshot,
    compiled: &CompiledPolicySet,
) -> Result<Selectors, GenerationError> {
    let mut selectors = Selectors {
        authorize: Vec::new(),
        success: Vec::new(),
        failure: Vec::new(),
    };

    let mut unregistered: Option<Selector> = None;
    for config in &snapshot.mac_bypass {
        let owner = format!("mac bypass '{}'", config.name);
        if let Some(policy_id) = config.registered_policy_id {
            selectors.authorize.push(Selector {
                condition: tag_condition(format!("mac_bypass:{}", config.id)),
                block: block_for(compiled, policy_id, &owner)?,
            });
        }
        if let Some(policy_id) = config.unregistered_policy_id {
            let block = block_for(compiled, policy_id, &owner)?;
            // First list with an unregistered policy wins
            unregistered.get_or_insert(Selector {
                condition: format!("!&control:Tmp-String-0 && &User-Name =~ {}", mac_regex()),
                block,
            });
        }
    }
    selectors.authorize.extend(unregistered);

    for psk in &snapshot.psk {
        let owner = format!("psk '{}'", psk.name);
        let condition = tag_condition(format!("psk:{}", psk.id));
        if let Some(policy_id) = psk.success_policy_id {
            selectors.success.push(Selector {
                condition: condition.clone(),
                block: block_for(compiled, policy_id, &owner)?,
            });
        }
        if let Some(policy_id) = psk.failure_policy_id {
            selectors.failure.push(Selector {
                condition,
                block: block_for(compiled, policy_id, &owner)?,
            });
        }
    }

    for method in &snapshot.eap_methods {
        let owner = format!("eap method {}", method.method.dictionary_name());
        let condition = format!("&EAP-Type == {}", method.method.dictionary_name());
        if let Some(policy_id) = method.success_policy_id {
            selectors.success.push(Selector {
                condition: condition.clone(),
                block: block_for(compiled, policy_id, &owner)?,
            });
        }
        if let Some(policy_id) = method.failure_policy_id {
            selectors.failure.push(Selector {
                condition,
                block: block_for(compiled, policy_id, &owner)?,
            });
        }
    }

    Ok(selectors)
}

pub fn render(
    options: &SiteOptions,
    sql_enabled: bool,
    snapshot: &ArtifactSnapshot,
    compiled: &CompiledPolicySet,
) -> Result<String, GenerationError> {
    let listen = options.listen_line()?;
    let selectors = collect_selectors(snapshot, compiled)?;
    let name = sanitize_identifier(&options.name, &['-', '.']);

    let mut out = String::new();
    let _ = writeln!(out, "{}\n", GENERATED_HEADER);
    let _ = writeln!(out, "server {} {{", name);
    for (kind, port) in [("auth", options.auth_port), ("acct", options.acct_port)] {
        let _ = writeln!(
            out,
            "\tlisten {{\n\t\ttype = {}\n\t\t{}\n\t\tport = {}\n\t}}\n",
            kind, listen, port
        );
    }

    out.push_str("\tauthorize {\n\t\tfilter_username\n\t\tpreprocess\n");
    let _ = writeln!(out, "\t\tif (&User-Name =~ {}) {{", mac_regex());
    out.push_str("\t\t\tupdate request {\n");
    out.push_str("\t\t\t\t&User-Name := \"%{tolower:%{1}:%{2}:%{3}:%{4}:%{5}:%{6}}\"\n");
    out.push_str("\t\t\t}\n\t\t}\n");
    out.push_str("\t\tchap\n\t\tmschap\n\t\teap {\n\t\t\tok = return\n\t\t}\n\t\tfiles\n");
    if sql_enabled {
        out.push_str("\t\t-sql\n");
    }
    write_chain(&mut out, &selectors.authorize, 2);
    let _ = writeln!(out, "\t\tpap\n\t\t{}\n\t}}\n", AUTHORIZE_DISPATCHER);

    out.push_str("\tauthenticate {\n");
    out.push_str("\t\tAuth-Type PAP {\n\t\t\tpap\n\t\t}\n");
    out.push_str("\t\tAuth-Type CHAP {\n\t\t\tchap\n\t\t}\n");
    out.push_str("\t\tAuth-Type MS-CHAP {\n\t\t\tmschap\n\t\t}\n");
    out.push_str("\t\teap\n\t}\n\n");

    out.push_str("\tpost-auth {\n");
    write_chain(&mut out, &selectors.success, 2);
    let _ = writeln!(out, "\t\t{}", POST_AUTH_DISPATCHER);
    if sql_enabled {
        out.push_str("\t\t-sql\n");
    }
    out.push_str("\t\tPost-Auth-Type REJECT {\n");
    write_chain(&mut out, &selectors.failure, 3);
    if sql_enabled {
        out.push_str("\t\t\t-sql\n");
    }
    out.push_str("\t\t\tattr_filter.access_reject\n\t\t\teap\n\t\t}\n\t}\n\n");

    out.push_str("\taccounting {\n\t\tdetail\n");
    let _ = writeln!(out, "\t\t{}", ACCOUNTING_DISPATCHER);
    if sql_enabled {
        out.push_str("\t\t-sql\n");
    }
    out.push_str("\t}\n}\n");
    Ok(out)
}
