//! Text rendering shared by the generators
//!
//! Strings are double quoted with `\`, `"` and `%` escaped (the daemon expands
//! `%{...}` inside double quotes); integers, addresses and enumerated names
//! are written bare.

use crate::model::AuthorizationProfile;
use radius_proto::dynauth::{AttributeValue, VendorAttribute};
use std::fmt::Write;

/// Header placed at the top of every generated file
pub const GENERATED_HEADER: &str =
    "# Generated by radius-control. Manual edits are overwritten on the next reconciliation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(u64),
    /// Literal text, escaped and quoted
    Text(String),
    /// Dictionary value name or bare word
    Bare(String),
    /// Attribute reference such as `&control:User-Defined-Network`
    Reference(String),
    /// Double-quoted string with daemon expansions left intact
    Expansion(String),
}

impl Value {
    pub fn render(&self) -> String {
        match self {
            Value::Integer(number) => number.to_string(),
            Value::Text(text) => quote(text),
            Value::Bare(word) | Value::Reference(word) => word.clone(),
            Value::Expansion(template) => format!("\"{}\"", template.replace('"', "\\\"")),
        }
    }
}

/// Quote a literal string
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '%' => quoted.push_str("%%"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Replace characters outside `[A-Za-z0-9_]` and `extra` with `_`
pub fn sanitize_identifier(name: &str, extra: &[char]) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || extra.contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `:=` replace
    Set,
    /// `+=` append
    Add,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Set => ":=",
            Operator::Add => "+=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyItem {
    pub attribute: String,
    pub operator: Operator,
    pub value: Value,
}

impl ReplyItem {
    pub fn set(attribute: &str, value: Value) -> Self {
        ReplyItem {
            attribute: attribute.to_string(),
            operator: Operator::Set,
            value,
        }
    }

    pub fn add(attribute: &str, value: Value) -> Self {
        ReplyItem {
            attribute: attribute.to_string(),
            operator: Operator::Add,
            value,
        }
    }

    /// `Name := value`, or `&Name := value` inside an update block
    pub fn render(&self, reference: bool) -> String {
        format!(
            "{}{} {} {}",
            if reference { "&" } else { "" },
            self.attribute,
            self.operator.as_str(),
            self.value.render()
        )
    }
}

impl From<VendorAttribute> for ReplyItem {
    fn from(attr: VendorAttribute) -> Self {
        let value = match attr.value {
            AttributeValue::Text(text) => Value::Text(text),
            AttributeValue::Integer(number) | AttributeValue::NumericText(number) => {
                Value::Integer(u64::from(number))
            }
            AttributeValue::Enumerated { name, .. } => Value::Bare(name.to_string()),
        };
        ReplyItem {
            attribute: attr.name.to_string(),
            operator: if attr.multi_valued {
                Operator::Add
            } else {
                Operator::Set
            },
            value,
        }
    }
}

/// Where a profile's UDN value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdnSource {
    /// Known at generation time (identity entries)
    Literal(u32),
    /// Copied from the control list at request time (compiled policies)
    Control,
    None,
}

/// Reply attributes of a profile in fixed order:
/// VLAN, bandwidth, timeouts, group policy and ACL, SGT, redirect, UDN.
pub fn profile_reply(profile: &AuthorizationProfile, udn: UdnSource) -> Vec<ReplyItem> {
    let vendor = profile.vendor;
    let mut items: Vec<ReplyItem> = Vec::new();

    if let Some(vlan) = profile.vlan() {
        items.extend(vendor.vlan(&vlan).into_iter().map(ReplyItem::from));
    }

    if let Some(kbps) = profile.bandwidth_down_kbps {
        items.push(ReplyItem::set(
            "WISPr-Bandwidth-Max-Down",
            Value::Integer(u64::from(kbps) * 1000),
        ));
    }
    if let Some(kbps) = profile.bandwidth_up_kbps {
        items.push(ReplyItem::set(
            "WISPr-Bandwidth-Max-Up",
            Value::Integer(u64::from(kbps) * 1000),
        ));
    }

    if let Some(seconds) = profile.session_timeout {
        items.push(ReplyItem::set("Session-Timeout", Value::Integer(u64::from(seconds))));
    }
    if let Some(seconds) = profile.idle_timeout {
        items.push(ReplyItem::set("Idle-Timeout", Value::Integer(u64::from(seconds))));
    }

    if let Some(policy) = profile.group_policy.as_deref().filter(|p| !p.is_empty()) {
        items.push(vendor.group_policy(policy).into());
    }
    if let Some(acl) = profile.downloadable_acl.as_deref().filter(|a| !a.is_empty()) {
        items.push(vendor.downloadable_acl(acl).into());
    }

    if let Some(sgt) = profile.sgt {
        items.push(ReplyItem::set("Security-Group-Tag", Value::Integer(u64::from(sgt))));
        if let Some(pair) = vendor.security_group_tag(sgt) {
            items.push(pair.into());
        }
    }

    if let Some(url) = profile.splash_url.as_deref().filter(|u| !u.is_empty()) {
        items.push(vendor.url_redirect(url).into());
    }

    if profile.include_udn {
        match udn {
            UdnSource::Literal(id) => {
                items.push(ReplyItem::set("User-Defined-Network", Value::Integer(u64::from(id))));
                items.push(ReplyItem::add(
                    "Cisco-AVPair",
                    Value::Text(format!("udn:private-group-id={}", id)),
                ));
            }
            UdnSource::Control => {
                items.push(ReplyItem::set(
                    "User-Defined-Network",
                    Value::Reference("&control:User-Defined-Network".to_string()),
                ));
                items.push(ReplyItem::add(
                    "Cisco-AVPair",
                    Value::Expansion(
                        "udn:private-group-id=%{control:User-Defined-Network}".to_string(),
                    ),
                ));
            }
            UdnSource::None => {}
        }
    }

    items
}

/// `update <list> { ... }` at `depth` tabs
pub fn update_block(out: &mut String, list: &str, items: &[ReplyItem], depth: usize) {
    let indent = "\t".repeat(depth);
    let _ = writeln!(out, "{}update {} {{", indent, list);
    for item in items {
        let _ = writeln!(out, "{}\t{}", indent, item.render(true));
    }
    let _ = writeln!(out, "{}}}", indent);
}

/// Reply lines of an identity entry; every line but the last ends with `,`
pub fn users_reply_lines(items: &[ReplyItem]) -> Vec<String> {
    let last = items.len().saturating_sub(1);
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let separator = if index < last { "," } else { "" };
            format!("\t{}{}", item.render(false), separator)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use radius_proto::Vendor;

    fn full_profile() -> AuthorizationProfile {
        let mut profile = AuthorizationProfile::new(1, "VLAN100");
        profile.vlan_id = Some(100);
        profile.bandwidth_down_kbps = Some(2048);
        profile.bandwidth_up_kbps = Some(512);
        profile.session_timeout = Some(3600);
        profile.idle_timeout = Some(600);
        profile.group_policy = Some("staff".to_string());
        profile.sgt = Some(10);
        profile.splash_url = Some("https://portal.example/welcome?x=%41".to_string());
        profile.include_udn = true;
        profile
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(quote("100%"), "\"100%%\"");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Core Switch #1", &['-', '.']), "Core_Switch__1");
        assert_eq!(sanitize_identifier("ap-01.lab", &['-', '.']), "ap-01.lab");
        assert_eq!(sanitize_identifier("ap-01.lab", &[]), "ap_01_lab");
        assert_eq!(sanitize_identifier("  ", &[]), "unnamed");
    }

    #[test]
    fn test_profile_reply_order_and_types() {
        let items = profile_reply(&full_profile(), UdnSource::Literal(42));
        let rendered: Vec<String> = items.iter().map(|i| i.render(false)).collect();
        assert_eq!(
            rendered,
            vec![
                "Tunnel-Type := VLAN",
                "Tunnel-Medium-Type := IEEE-802",
                "Tunnel-Private-Group-Id := 100",
                "WISPr-Bandwidth-Max-Down := 2048000",
                "WISPr-Bandwidth-Max-Up := 512000",
                "Session-Timeout := 3600",
                "Idle-Timeout := 600",
                "Filter-Id := \"staff\"",
                "Security-Group-Tag := 10",
                "WISPr-Redirection-URL := \"https://portal.example/welcome?x=%%41\"",
                "User-Defined-Network := 42",
                "Cisco-AVPair += \"udn:private-group-id=42\"",
            ]
        );
    }

    #[test]
    fn test_profile_reply_cisco_dialect() {
        let mut profile = full_profile();
        profile.vendor = Vendor::Ise;
        profile.include_udn = false;
        let rendered: Vec<String> = profile_reply(&profile, UdnSource::None)
            .iter()
            .map(|i| i.render(true))
            .collect();
        let contains = |line: &str| rendered.iter().any(|rendered| rendered == line);
        assert!(contains("&Cisco-AVPair += \"ACS:CiscoSecure-Defined-ACL=staff\""));
        assert!(contains("&Cisco-AVPair += \"cts:security-group-tag=000a-00\""));
        assert!(rendered.contains(&"&Security-Group-Tag := 10".to_string()));
    }

    #[test]
    fn test_udn_from_control() {
        let items = profile_reply(&full_profile(), UdnSource::Control);
        let rendered: Vec<String> = items.iter().rev().take(2).map(|i| i.render(true)).collect();
        assert_eq!(
            rendered,
            vec![
                "&Cisco-AVPair += \"udn:private-group-id=%{control:User-Defined-Network}\"",
                "&User-Defined-Network := &control:User-Defined-Network",
            ]
        );
    }

    #[test]
    fn test_users_reply_separators() {
        let items = profile_reply(&full_profile(), UdnSource::None);
        let lines = users_reply_lines(&items);
        assert_eq!(lines.len(), items.len());
        for line in &lines[..lines.len() - 1] {
            assert!(line.ends_with(','), "{}", line);
        }
        assert!(!lines[lines.len() - 1].ends_with(','));

        let single = users_reply_lines(&items[..1]);
        assert_eq!(single, vec!["\tTunnel-Type := VLAN"]);
        assert!(users_reply_lines(&[]).is_empty());
    }

    #[test]
    fn test_update_block() {
        let mut out = String::new();
        let items = [ReplyItem::set("Session-Timeout", Value::Integer(60))];
        update_block(&mut out, "reply", &items, 1);
        assert_eq!(out, "\tupdate reply {\n\t\t&Session-Timeout := 60\n\t}\n");
    }
}
