//! Attributes a policy condition may reference
//!
//! The compiler needs the value type of every attribute it renders: the
//! daemon grammar distinguishes quoted strings from bare integers, addresses
//! and enumerated names.

/// Value type of a dictionary attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    IpAddr,
    /// Named value (e.g. `Service-Type == Framed-User`)
    Enumerated,
}

const ATTRIBUTES: &[(&str, ValueType)] = &[
    ("User-Name", ValueType::String),
    ("User-Password", ValueType::String),
    ("NAS-IP-Address", ValueType::IpAddr),
    ("NAS-IPv6-Address", ValueType::IpAddr),
    ("NAS-Port", ValueType::Integer),
    ("NAS-Port-Id", ValueType::String),
    ("NAS-Port-Type", ValueType::Enumerated),
    ("NAS-Identifier", ValueType::String),
    ("Service-Type", ValueType::Enumerated),
    ("Framed-Protocol", ValueType::Enumerated),
    ("Framed-IP-Address", ValueType::IpAddr),
    ("Filter-Id", ValueType::String),
    ("Reply-Message", ValueType::String),
    ("Class", ValueType::String),
    ("Session-Timeout", ValueType::Integer),
    ("Idle-Timeout", ValueType::Integer),
    ("Called-Station-Id", ValueType::String),
    ("Calling-Station-Id", ValueType::String),
    ("Acct-Status-Type", ValueType::Enumerated),
    ("Acct-Session-Id", ValueType::String),
    ("Acct-Session-Time", ValueType::Integer),
    ("Acct-Input-Octets", ValueType::Integer),
    ("Acct-Output-Octets", ValueType::Integer),
    ("Acct-Terminate-Cause", ValueType::Enumerated),
    ("Event-Timestamp", ValueType::Integer),
    ("Connect-Info", ValueType::String),
    ("Tunnel-Type", ValueType::Enumerated),
    ("Tunnel-Medium-Type", ValueType::Enumerated),
    ("Tunnel-Private-Group-Id", ValueType::String),
    ("EAP-Type", ValueType::Enumerated),
    ("Auth-Type", ValueType::Enumerated),
    ("Packet-Src-IP-Address", ValueType::IpAddr),
    ("Huntgroup-Name", ValueType::String),
    ("SQL-Group", ValueType::String),
    ("LDAP-Group", ValueType::String),
    ("TLS-Client-Cert-Common-Name", ValueType::String),
    ("TLS-Client-Cert-Issuer", ValueType::String),
    ("TLS-Client-Cert-Subject-Alt-Name-Email", ValueType::String),
    ("Tmp-String-0", ValueType::String),
    ("Tmp-String-1", ValueType::String),
    ("Tmp-Integer-0", ValueType::Integer),
    ("Tmp-Integer-1", ValueType::Integer),
    ("Cisco-AVPair", ValueType::String),
    ("Airespace-Wlan-Id", ValueType::Integer),
    ("Aruba-Essid-Name", ValueType::String),
    ("Aruba-Location-Id", ValueType::String),
    ("Aruba-AP-Group", ValueType::String),
    ("Security-Group-Tag", ValueType::Integer),
    ("User-Defined-Network", ValueType::Integer),
];

/// Attribute list qualifiers accepted in front of a name
pub const LISTS: &[&str] = &["request", "reply", "control", "session-state"];

/// A resolved attribute reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRef {
    pub list: Option<&'static str>,
    pub name: &'static str,
    pub value_type: ValueType,
}

impl AttributeRef {
    /// `&Name` or `&list:Name`
    pub fn render(&self) -> String {
        match self.list {
            Some(list) => format!("&{}:{}", list, self.name),
            None => format!("&{}", self.name),
        }
    }
}

/// Look up `name` or `list:name`; names are case-insensitive
pub fn resolve(reference: &str) -> Option<AttributeRef> {
    let reference = reference.trim().trim_start_matches('&');
    let (list, name) = match reference.split_once(':') {
        Some((list, name)) => {
            let list = LISTS.iter().find(|known| known.eq_ignore_ascii_case(list))?;
            (Some(*list), name)
        }
        None => (None, reference),
    };
    let (name, value_type) = ATTRIBUTES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))?;
    Some(AttributeRef {
        list,
        name: *name,
        value_type: *value_type,
    })
}

/// Local dictionary entries for the integer attributes emitted in replies
pub const LOCAL_ATTRIBUTES: &[(&str, u32)] =
    &[("Security-Group-Tag", 3100), ("User-Defined-Network", 3101)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_and_qualified() {
        let attr = resolve("calling-station-id").unwrap();
        assert_eq!(attr.name, "Calling-Station-Id");
        assert_eq!(attr.render(), "&Calling-Station-Id");

        let attr = resolve("Control:Tmp-Integer-0").unwrap();
        assert_eq!(attr.value_type, ValueType::Integer);
        assert_eq!(attr.render(), "&control:Tmp-Integer-0");

        let attr = resolve("&NAS-IP-Address").unwrap();
        assert_eq!(attr.value_type, ValueType::IpAddr);
    }

    #[test]
    fn test_resolve_rejects_unknown() {
        assert!(resolve("Made-Up-Attribute").is_none());
        assert!(resolve("outer:User-Name").is_none());
        assert!(resolve("").is_none());
    }
}
