//! Policy compiler
//!
//! Turns the priority-ordered policy set into named unlang blocks, one per
//! active policy, followed by a synthetic default-deny block. Compilation is
//! all-or-nothing: every problem in every policy is collected into a single
//! [`CompileError`] and no partial rule set is ever returned.

use crate::dictionary::{self, ValueType};
use crate::model::{
    AuthorizationProfile, ConditionLogic, EntityId, PolicyAction, PolicyCondition, PolicyOutcome,
    PolicyType, UnlangPolicy,
};
use crate::render::{self, ReplyItem, UdnSource, Value, quote};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;
use std::net::IpAddr;
use std::sync::LazyLock;
use thiserror::Error;

/// Block name of the terminal rule
pub const DEFAULT_DENY_BLOCK: &str = "rc_default_deny";

static BARE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));
static MODULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("valid regex"));

/// One problem found in one policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileIssue {
    pub policy: String,
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for CompileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy '{}' {}: {}", self.policy, self.field, self.reason)
    }
}

fn list_issues(issues: &[CompileIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("policy compilation failed: {}", list_issues(.issues))]
pub struct CompileError {
    pub issues: Vec<CompileIssue>,
}

impl CompileError {
    /// Names of the offending policies, deduplicated, in compile order
    pub fn policies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for issue in &self.issues {
            if !names.contains(&issue.policy.as_str()) {
                names.push(&issue.policy);
            }
        }
        names
    }
}

/// A policy rendered as a named unlang block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    /// `None` for the default-deny rule
    pub policy_id: Option<EntityId>,
    pub policy_name: String,
    pub block_name: String,
    pub priority: i32,
    pub policy_type: PolicyType,
    /// Complete block text including the name line and closing brace
    pub text: String,
}

impl CompiledRule {
    pub fn is_default_deny(&self) -> bool {
        self.policy_id.is_none()
    }
}

/// Ordered compiler output; the last rule is always the default-deny rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicySet {
    pub rules: Vec<CompiledRule>,
}

impl CompiledPolicySet {
    pub fn rule_for(&self, policy_id: EntityId) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .find(|rule| rule.policy_id == Some(policy_id))
    }

    /// Rules of one section in evaluation order, excluding default-deny
    pub fn section(&self, policy_type: PolicyType) -> impl Iterator<Item = &CompiledRule> {
        self.rules
            .iter()
            .filter(move |rule| !rule.is_default_deny() && rule.policy_type == policy_type)
    }

    pub fn default_deny(&self) -> Option<&CompiledRule> {
        self.rules.last().filter(|rule| rule.is_default_deny())
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|rule| rule.policy_name.as_str())
            .collect()
    }
}

/// Compile active policies in `(priority, store order)` order
pub fn compile(
    policies: &[UnlangPolicy],
    profiles: &BTreeMap<EntityId, AuthorizationProfile>,
) -> Result<CompiledPolicySet, CompileError> {
    let mut active: Vec<&UnlangPolicy> = policies.iter().filter(|p| p.enabled).collect();
    active.sort_by_key(|policy| policy.priority);

    let block_names = assign_block_names(&active);
    let mut rules = Vec::with_capacity(active.len() + 1);
    let mut issues = Vec::new();

    for (policy, block_name) in active.iter().copied().zip(block_names) {
        let mut compiler = PolicyCompiler {
            policy,
            profiles,
            issues: Vec::new(),
        };
        let text = compiler.render_block(&block_name);
        if compiler.issues.is_empty() {
            rules.push(CompiledRule {
                policy_id: Some(policy.id),
                policy_name: policy.name.clone(),
                block_name,
                priority: policy.priority,
                policy_type: policy.policy_type,
                text,
            });
        } else {
            issues.extend(compiler.issues);
        }
    }

    if !issues.is_empty() {
        return Err(CompileError { issues });
    }

    rules.push(default_deny_rule());
    Ok(CompiledPolicySet { rules })
}

fn default_deny_rule() -> CompiledRule {
    CompiledRule {
        policy_id: None,
        policy_name: "default-deny".to_string(),
        block_name: DEFAULT_DENY_BLOCK.to_string(),
        priority: i32::MAX,
        policy_type: PolicyType::Authorize,
        text: format!(
            "{} {{\n\tupdate reply {{\n\t\t&Reply-Message := \"Access denied by default policy\"\n\t}}\n\treject\n}}\n",
            DEFAULT_DENY_BLOCK
        ),
    }
}

/// `rc_<sanitized name>`, suffixed with the id when two names collide
///
/// Suffixed names are checked against every other block name and extended
/// until unique.
fn assign_block_names(policies: &[&UnlangPolicy]) -> Vec<String> {
    let bases: Vec<String> = policies
        .iter()
        .map(|policy| {
            format!(
                "rc_{}",
                render::sanitize_identifier(&policy.name.to_ascii_lowercase(), &[])
            )
        })
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }
    let is_unique = |base: &str| counts[base] == 1 && base != DEFAULT_DENY_BLOCK;

    let mut taken: HashSet<String> = bases
        .iter()
        .filter(|base| is_unique(base))
        .cloned()
        .collect();
    taken.insert(DEFAULT_DENY_BLOCK.to_string());

    bases
        .iter()
        .zip(policies)
        .map(|(base, policy)| {
            if is_unique(base) {
                return base.clone();
            }
            let mut name = format!("{}_{}", base, policy.id);
            let mut attempt = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}_{}", base, policy.id, attempt);
                attempt += 1;
            }
            name
        })
        .collect()
}

struct PolicyCompiler<'a> {
    policy: &'a UnlangPolicy,
    profiles: &'a BTreeMap<EntityId, AuthorizationProfile>,
    issues: Vec<CompileIssue>,
}

impl PolicyCompiler<'_> {
    fn issue(&mut self, field: &'static str, reason: impl Into<String>) {
        self.issues.push(CompileIssue {
            policy: self.policy.name.clone(),
            field,
            reason: reason.into(),
        });
    }

    fn render_block(&mut self, block_name: &str) -> String {
        let policy = self.policy;
        let mut out = String::new();
        let _ = writeln!(out, "{} {{", block_name);

        if let Some(custom) = &policy.custom_unlang {
            out.push_str(custom);
            if !custom.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("}\n");
            return out;
        }

        let condition = self.render_condition();
        match condition {
            Some(condition) => {
                let _ = writeln!(out, "\tif {} {{", condition);
                self.render_outcome(&mut out, &policy.then, 2, "then");
                out.push_str("\t}\n");
                if let Some(otherwise) = &policy.otherwise {
                    out.push_str("\telse {\n");
                    self.render_outcome(&mut out, otherwise, 2, "else");
                    out.push_str("\t}\n");
                }
            }
            None => {
                if policy.otherwise.is_some() {
                    self.issue("else", "else branch requires a condition");
                }
                self.render_outcome(&mut out, &policy.then, 1, "then");
            }
        }

        out.push_str("}\n");
        out
    }

    /// Parenthesised match expression, or `None` for an unconditional policy
    fn render_condition(&mut self) -> Option<String> {
        let policy = self.policy;
        let mut parts: Vec<String> = Vec::new();
        if let Some(condition) = &policy.condition {
            parts.extend(self.render_term(condition, "condition"));
        } else if !policy.extra_conditions.is_empty() {
            self.issue("extra_conditions", "additional conditions require a primary condition");
        }
        for condition in &policy.extra_conditions {
            parts.extend(self.render_term(condition, "extra_conditions"));
        }

        match parts.len() {
            0 => policy.condition.as_ref().map(|_| "(false)".to_string()),
            1 => Some(format!("({})", parts[0])),
            _ => {
                let joiner = match policy.logic {
                    ConditionLogic::And => " && ",
                    ConditionLogic::Or => " || ",
                };
                let terms: Vec<String> = parts.iter().map(|p| format!("({})", p)).collect();
                Some(format!("({})", terms.join(joiner)))
            }
        }
    }

    fn render_term(&mut self, condition: &PolicyCondition, field: &'static str) -> Option<String> {
        let operator = condition.operator.trim();

        let (lhs, value_type) = match &condition.backend_query {
            Some(query) => {
                if query.contains('\n') || query.trim().is_empty() {
                    self.issue(field, "backend query must be a single non-empty line");
                    return None;
                }
                let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
                (format!("\"%{{sql:{}}}\"", escaped), ValueType::String)
            }
            None => match dictionary::resolve(&condition.attribute) {
                Some(attr) => (attr.render(), attr.value_type),
                None => {
                    self.issue(field, format!("unknown attribute '{}'", condition.attribute));
                    return None;
                }
            },
        };

        match operator {
            "exists" | "not_exists" => {
                if condition.backend_query.is_some() {
                    self.issue(field, format!("operator '{}' needs an attribute", operator));
                    return None;
                }
                let negate = if operator == "not_exists" { "!" } else { "" };
                Some(format!("{}{}", negate, lhs))
            }
            "=~" | "!~" => match Regex::new(&condition.value) {
                Ok(_) => Some(format!("{} {} /{}/", lhs, operator, escape_regex(&condition.value))),
                Err(e) => {
                    self.issue(field, format!("invalid regular expression: {}", e));
                    None
                }
            },
            "==" | "!=" => {
                let value = self.render_value(&condition.value, value_type, field)?;
                Some(format!("{} {} {}", lhs, operator, value))
            }
            "<" | ">" | "<=" | ">=" => {
                if value_type != ValueType::Integer {
                    self.issue(
                        field,
                        format!("operator '{}' needs an integer attribute", operator),
                    );
                    return None;
                }
                let value = self.render_value(&condition.value, value_type, field)?;
                Some(format!("{} {} {}", lhs, operator, value))
            }
            other => {
                self.issue(field, format!("unknown operator '{}'", other));
                None
            }
        }
    }

    fn render_value(
        &mut self,
        raw: &str,
        value_type: ValueType,
        field: &'static str,
    ) -> Option<String> {
        let raw_trimmed = raw.trim();
        match value_type {
            ValueType::String => Some(quote(raw)),
            ValueType::Integer => match raw_trimmed.parse::<u64>() {
                Ok(number) => Some(Value::Integer(number).render()),
                Err(_) => {
                    self.issue(field, format!("'{}' is not an integer", raw));
                    None
                }
            },
            ValueType::IpAddr => match raw_trimmed.parse::<IpAddr>() {
                Ok(ip) => Some(ip.to_string()),
                Err(_) => {
                    self.issue(field, format!("'{}' is not an IP address", raw));
                    None
                }
            },
            ValueType::Enumerated => {
                if BARE_WORD.is_match(raw_trimmed) {
                    Some(raw_trimmed.to_string())
                } else {
                    self.issue(field, format!("'{}' is not a dictionary value name", raw));
                    None
                }
            }
        }
    }

    fn render_outcome(
        &mut self,
        out: &mut String,
        outcome: &PolicyOutcome,
        depth: usize,
        field: &'static str,
    ) {
        let indent = "\t".repeat(depth);
        let profiles = self.profiles;

        let profile_items = match outcome.profile_id {
            Some(id) => match profiles.get(&id).filter(|p| p.enabled) {
                Some(profile) => render::profile_reply(profile, UdnSource::Control),
                None => {
                    self.issue(field, format!("profile {} does not exist or is disabled", id));
                    Vec::new()
                }
            },
            None => {
                if outcome.action == PolicyAction::ApplyProfile {
                    self.issue(field, "apply_profile without a profile reference");
                }
                Vec::new()
            }
        };

        let mut reply = profile_items;
        if let Some(message) = &outcome.reply_message {
            reply.push(ReplyItem::set("Reply-Message", Value::Text(message.clone())));
        }

        match outcome.action {
            PolicyAction::Accept => {
                render::update_block(
                    out,
                    "control",
                    &[ReplyItem::set("Auth-Type", Value::Bare("Accept".to_string()))],
                    depth,
                );
                if !reply.is_empty() {
                    render::update_block(out, "reply", &reply, depth);
                }
                let _ = writeln!(out, "{}ok\n{}return", indent, indent);
            }
            PolicyAction::ApplyProfile => {
                if !reply.is_empty() {
                    render::update_block(out, "reply", &reply, depth);
                }
                let _ = writeln!(out, "{}ok\n{}return", indent, indent);
            }
            PolicyAction::Reject => {
                if !reply.is_empty() {
                    render::update_block(out, "reply", &reply, depth);
                }
                let _ = writeln!(out, "{}reject", indent);
            }
            PolicyAction::Continue => {
                if !reply.is_empty() {
                    render::update_block(out, "reply", &reply, depth);
                }
                let _ = writeln!(out, "{}noop", indent);
            }
            PolicyAction::CallModule => {
                if !reply.is_empty() {
                    render::update_block(out, "reply", &reply, depth);
                }
                match outcome.module.as_deref().map(str::trim) {
                    Some(module) if MODULE_NAME.is_match(module) => {
                        let _ = writeln!(out, "{}{}", indent, module);
                    }
                    Some(module) => self.issue(field, format!("invalid module name '{}'", module)),
                    None => self.issue(field, "call_module without a module name"),
                }
            }
        }
    }
}

/// Escape `/` so the pattern survives inside `/.../`
fn escape_regex(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    let mut backslash = false;
    for c in pattern.chars() {
        if c == '/' && !backslash {
            escaped.push('\\');
        }
        backslash = c == '\\' && !backslash;
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> BTreeMap<EntityId, AuthorizationProfile> {
        let mut vlan100 = AuthorizationProfile::new(1, "VLAN100");
        vlan100.vlan_id = Some(100);
        vlan100.session_timeout = Some(3600);
        vlan100.splash_url = Some("https://portal.example/".to_string());
        let mut disabled = AuthorizationProfile::new(2, "old");
        disabled.enabled = false;
        BTreeMap::from([(1, vlan100), (2, disabled)])
    }

    fn apply(id: EntityId, name: &str, priority: i32) -> UnlangPolicy {
        UnlangPolicy::new(id, name, priority, PolicyOutcome::apply_profile(1))
            .with_condition(PolicyCondition::new("User-Name", "==", "alice"))
    }

    fn reject(id: EntityId, name: &str, priority: i32) -> UnlangPolicy {
        UnlangPolicy::new(id, name, priority, PolicyOutcome::new(PolicyAction::Reject))
            .with_condition(PolicyCondition::new("NAS-Port", ">=", "100"))
    }

    #[test]
    fn test_priority_order_and_default_deny_last() {
        let policies = vec![reject(2, "P2", 100), apply(1, "P1", 10)];
        let compiled = compile(&policies, &profiles()).unwrap();
        assert_eq!(compiled.names(), vec!["P1", "P2", "default-deny"]);
        assert!(compiled.default_deny().is_some());

        let mut moved = policies.clone();
        moved[1].priority = 200;
        let compiled = compile(&moved, &profiles()).unwrap();
        assert_eq!(compiled.names(), vec!["P2", "P1", "default-deny"]);
    }

    #[test]
    fn test_equal_priority_keeps_store_order() {
        let policies = vec![
            reject(9, "first", 5),
            apply(3, "second", 5),
            reject(1, "third", 5),
        ];
        let compiled = compile(&policies, &profiles()).unwrap();
        assert_eq!(compiled.names(), vec!["first", "second", "third", "default-deny"]);
    }

    #[test]
    fn test_inactive_policies_are_skipped() {
        let mut disabled = apply(1, "P1", 10);
        disabled.enabled = false;
        let compiled = compile(&[disabled], &profiles()).unwrap();
        assert_eq!(compiled.names(), vec!["default-deny"]);
    }

    #[test]
    fn test_apply_profile_block() {
        let compiled = compile(&[apply(1, "Staff VLAN", 10)], &profiles()).unwrap();
        let rule = &compiled.rules[0];
        assert_eq!(rule.block_name, "rc_staff_vlan");
        assert_eq!(
            rule.text,
            "rc_staff_vlan {\n\
             \tif (&User-Name == \"alice\") {\n\
             \t\tupdate reply {\n\
             \t\t\t&Tunnel-Type := VLAN\n\
             \t\t\t&Tunnel-Medium-Type := IEEE-802\n\
             \t\t\t&Tunnel-Private-Group-Id := 100\n\
             \t\t\t&Session-Timeout := 3600\n\
             \t\t\t&WISPr-Redirection-URL := \"https://portal.example/\"\n\
             \t\t}\n\
             \t\tok\n\
             \t\treturn\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn test_multiple_conditions_and_else() {
        let mut policy = reject(4, "guests", 20);
        policy.condition = Some(PolicyCondition::new("Called-Station-Id", "=~", "guest/wifi$"));
        policy.extra_conditions = vec![
            PolicyCondition::new("NAS-Port-Type", "==", "Wireless-802.11"),
            PolicyCondition::new("control:Tmp-String-0", "exists", ""),
        ];
        policy.logic = ConditionLogic::Or;
        policy.then.reply_message = Some("Guests are not allowed".to_string());
        policy.otherwise = Some(PolicyOutcome::new(PolicyAction::Continue));

        let compiled = compile(&[policy], &profiles()).unwrap();
        let text = &compiled.rules[0].text;
        assert!(text.contains(
            "\tif ((&Called-Station-Id =~ /guest\\/wifi$/) || (&NAS-Port-Type == Wireless-802.11) || (&control:Tmp-String-0)) {\n"
        ));
        assert!(
            text.contains("\t\t\t&Reply-Message := \"Guests are not allowed\"\n\t\t}\n\t\treject\n")
        );
        assert!(text.contains("\telse {\n\t\tnoop\n\t}\n"));
    }

    #[test]
    fn test_integer_values_are_bare() {
        let compiled = compile(&[reject(2, "ports", 1)], &profiles()).unwrap();
        assert!(compiled.rules[0].text.contains("if (&NAS-Port >= 100) {"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut unknown_attr = apply(1, "bad-attr", 1);
        unknown_attr.condition = Some(PolicyCondition::new("No-Such-Attribute", "==", "x"));
        let mut bad_op = apply(2, "bad-op", 2);
        bad_op.condition = Some(PolicyCondition::new("User-Name", "contains", "x"));
        let dangling = UnlangPolicy::new(3, "dangling", 3, PolicyOutcome::apply_profile(99));
        let disabled_profile = UnlangPolicy::new(4, "stale", 4, PolicyOutcome::apply_profile(2));
        let fine = apply(5, "fine", 5);

        let err = compile(
            &[unknown_attr, bad_op, dangling, disabled_profile, fine],
            &profiles(),
        )
        .unwrap_err();
        assert_eq!(err.policies(), vec!["bad-attr", "bad-op", "dangling", "stale"]);
        assert!(err.to_string().contains("unknown attribute 'No-Such-Attribute'"));
        assert!(err.to_string().contains("unknown operator 'contains'"));
        assert!(err.to_string().contains("profile 99 does not exist"));
    }

    #[test]
    fn test_value_type_errors() {
        let mut not_int = reject(1, "not-int", 1);
        not_int.condition = Some(PolicyCondition::new("NAS-Port", "==", "ten"));
        let mut ordered_string = reject(2, "ordered-string", 2);
        ordered_string.condition = Some(PolicyCondition::new("User-Name", "<", "m"));
        let mut bad_regex = reject(3, "bad-regex", 3);
        bad_regex.condition = Some(PolicyCondition::new("User-Name", "=~", "(unclosed"));
        let mut bad_ip = reject(4, "bad-ip", 4);
        bad_ip.condition = Some(PolicyCondition::new("NAS-IP-Address", "==", "10.0.0"));

        let err = compile(&[not_int, ordered_string, bad_regex, bad_ip], &profiles()).unwrap_err();
        assert_eq!(err.issues.len(), 4);
    }

    #[test]
    fn test_custom_unlang_is_verbatim() {
        let mut policy = UnlangPolicy::new(7, "raw", 1, PolicyOutcome::new(PolicyAction::Continue));
        policy.custom_unlang = Some("\tif (&User-Name =~ /^admin/) {\n\t\treject\n\t}".to_string());
        let compiled = compile(&[policy], &profiles()).unwrap();
        assert_eq!(
            compiled.rules[0].text,
            "rc_raw {\n\tif (&User-Name =~ /^admin/) {\n\t\treject\n\t}\n}\n"
        );
    }

    #[test]
    fn test_block_name_collisions() {
        let policies = vec![
            reject(1, "Guest-Access", 1),
            reject(2, "guest access", 2),
            reject(3, "default deny", 3),
        ];
        let compiled = compile(&policies, &profiles()).unwrap();
        let names: Vec<&str> = compiled.rules.iter().map(|r| r.block_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["rc_guest_access_1", "rc_guest_access_2", "rc_default_deny_3", DEFAULT_DENY_BLOCK]
        );
    }

    #[test]
    fn test_suffixed_name_does_not_shadow_existing_block() {
        let policies = vec![
            reject(1, "Guest-Access", 1),
            reject(2, "guest access", 2),
            reject(5, "guest_access_1", 3),
        ];
        let compiled = compile(&policies, &profiles()).unwrap();
        let names: Vec<&str> = compiled.rules.iter().map(|r| r.block_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "rc_guest_access_1_2",
                "rc_guest_access_2",
                "rc_guest_access_1",
                DEFAULT_DENY_BLOCK
            ]
        );
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_call_module_and_accept() {
        let mut ldap =
            UnlangPolicy::new(1, "ldap", 1, PolicyOutcome::new(PolicyAction::CallModule));
        ldap.then.module = Some("ldap".to_string());
        let accept = UnlangPolicy::new(2, "allow", 2, PolicyOutcome::new(PolicyAction::Accept));

        let compiled = compile(&[ldap, accept], &profiles()).unwrap();
        assert_eq!(compiled.rules[0].text, "rc_ldap {\n\tldap\n}\n");
        assert_eq!(
            compiled.rules[1].text,
            "rc_allow {\n\tupdate control {\n\t\t&Auth-Type := Accept\n\t}\n\tok\n\treturn\n}\n"
        );

        let mut missing =
            UnlangPolicy::new(3, "nomod", 3, PolicyOutcome::new(PolicyAction::CallModule));
        missing.then.module = Some("bad module".to_string());
        assert!(compile(&[missing], &profiles()).is_err());
    }

    #[test]
    fn test_sections() {
        let mut post = reject(2, "post", 1);
        post.policy_type = PolicyType::PostAuth;
        let compiled = compile(&[apply(1, "auth", 1), post], &profiles()).unwrap();
        let authorize: Vec<&str> = compiled
            .section(PolicyType::Authorize)
            .map(|r| r.policy_name.as_str())
            .collect();
        assert_eq!(authorize, vec!["auth"]);
        assert_eq!(compiled.section(PolicyType::PostAuth).count(), 1);
        assert_eq!(compiled.rule_for(2).unwrap().block_name, "rc_post");
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a/b"), "a\\/b");
        assert_eq!(escape_regex("a\\/b"), "a\\/b");
        assert_eq!(escape_regex("a\\\\/b"), "a\\\\\\/b");
    }

    #[test]
    fn test_deterministic_output() {
        let policies = vec![apply(1, "P1", 10), reject(2, "P2", 100)];
        assert_eq!(compile(&policies, &profiles()), compile(&policies, &profiles()));
    }
}
