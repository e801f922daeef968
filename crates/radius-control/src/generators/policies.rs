//! Compiled policy file (`policy.d/radius_control`)
//!
//! Every compiled rule becomes a named policy block, followed by one
//! dispatcher block per processing section. The authorize dispatcher always
//! ends with the default-deny rule.

use crate::compiler::{CompiledPolicySet, DEFAULT_DENY_BLOCK};
use crate::model::PolicyType;
use crate::render::GENERATED_HEADER;
use std::fmt::Write;

/// Dispatcher block names referenced by the virtual server
pub const AUTHORIZE_DISPATCHER: &str = "radius_control_authorize";
pub const POST_AUTH_DISPATCHER: &str = "radius_control_post_auth";
pub const ACCOUNTING_DISPATCHER: &str = "radius_control_accounting";

fn dispatcher(out: &mut String, name: &str, blocks: &[&str]) {
    let _ = writeln!(out, "\n{} {{", name);
    if blocks.is_empty() {
        out.push_str("\tnoop\n");
    }
    for block in blocks {
        let _ = writeln!(out, "\t{}", block);
    }
    out.push_str("}\n");
}

fn section_blocks(compiled: &CompiledPolicySet, policy_type: PolicyType) -> Vec<&str> {
    compiled
        .section(policy_type)
        .map(|rule| rule.block_name.as_str())
        .collect()
}

pub fn render(compiled: &CompiledPolicySet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);

    for rule in &compiled.rules {
        out.push('\n');
        match rule.policy_id {
            Some(id) => {
                let _ = writeln!(
                    out,
                    "# Policy: {} (id {}, priority {}, {})",
                    super::comment_text(&rule.policy_name),
                    id,
                    rule.priority,
                    rule.policy_type.as_str()
                );
            }
            None => out.push_str("# Default deny: terminal decision for unmatched requests\n"),
        }
        out.push_str(&rule.text);
    }

    let mut authorize = section_blocks(compiled, PolicyType::Authorize);
    authorize.push(DEFAULT_DENY_BLOCK);
    dispatcher(&mut out, AUTHORIZE_DISPATCHER, &authorize);
    dispatcher(
        &mut out,
        POST_AUTH_DISPATCHER,
        &section_blocks(compiled, PolicyType::PostAuth),
    );
    dispatcher(
        &mut out,
        ACCOUNTING_DISPATCHER,
        &section_blocks(compiled, PolicyType::Accounting),
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::model::{AuthorizationProfile, PolicyAction, PolicyOutcome, UnlangPolicy};
    use std::collections::BTreeMap;

    fn policy_set() -> CompiledPolicySet {
        let mut profile = AuthorizationProfile::new(1, "VLAN100");
        profile.vlan_id = Some(100);
        let profiles = BTreeMap::from([(1, profile)]);

        let p1 = UnlangPolicy::new(1, "P1", 10, PolicyOutcome::apply_profile(1));
        let p2 = UnlangPolicy::new(2, "P2", 100, PolicyOutcome::new(PolicyAction::Reject));
        let mut acct = UnlangPolicy::new(3, "acct", 1, PolicyOutcome::new(PolicyAction::Continue));
        acct.policy_type = PolicyType::Accounting;
        let mut on_demand =
            UnlangPolicy::new(4, "guest", 1, PolicyOutcome::new(PolicyAction::Accept));
        on_demand.policy_type = PolicyType::OnDemand;
        compile(&[p2, p1, acct, on_demand], &profiles).unwrap()
    }

    #[test]
    fn test_rules_in_compiled_order_with_headers() {
        let out = render(&policy_set());
        let p1 = out.find("# Policy: P1 (id 1, priority 10, authorize)\nrc_p1 {").unwrap();
        let p2 = out.find("# Policy: P2 (id 2, priority 100, authorize)\nrc_p2 {").unwrap();
        let deny = out.find("rc_default_deny {").unwrap();
        assert!(p1 < p2 && p2 < deny);
    }

    #[test]
    fn test_dispatchers() {
        let out = render(&policy_set());
        assert!(out.contains(
            "\nradius_control_authorize {\n\trc_p1\n\trc_p2\n\trc_default_deny\n}\n"
        ));
        assert!(out.contains("\nradius_control_post_auth {\n\tnoop\n}\n"));
        assert!(out.contains("\nradius_control_accounting {\n\trc_acct\n}\n"));
        // on-demand blocks exist but are not dispatched
        assert!(out.contains("rc_guest {"));
        assert!(!out.contains("\trc_guest\n"));
    }

    #[test]
    fn test_byte_identical_regeneration() {
        assert_eq!(render(&policy_set()), render(&policy_set()));
    }
}
