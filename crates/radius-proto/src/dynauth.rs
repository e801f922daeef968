//! Dynamic Authorization Extensions (RFC 5176)
//!
//! Builds CoA-Request and Disconnect-Request packets and interprets the
//! ACK/NAK a NAS answers with. The payload of a CoA-Request depends on the
//! NAS vendor: the same semantic change ("apply group policy") is carried by
//! different attributes per dialect, see [`Vendor`].

use crate::attributes::{Attribute, AttributeType, ErrorCause, TunnelMediumType, TunnelType};
use crate::auth::{calculate_request_authenticator, verify_response_authenticator};
use crate::message_auth::{sign_dynauth_request, verify_response_message_authenticator};
use crate::packet::{Code, Packet, PacketError};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

/// Default UDP port for dynamic authorization (RFC 5176 Section 3)
pub const DEFAULT_DYNAUTH_PORT: u16 = 3799;

/// Cisco Systems
pub const VENDOR_CISCO: u32 = 9;
/// Wireless ISP roaming (WISPr)
pub const VENDOR_WISPR: u32 = 14122;
/// Cisco Airespace wireless LAN controllers
pub const VENDOR_AIRESPACE: u32 = 14179;
/// Aruba Networks
pub const VENDOR_ARUBA: u32 = 14823;

#[derive(Error, Debug)]
pub enum DynAuthError {
    #[error(
        "request carries no session identifier (User-Name, Acct-Session-Id or Calling-Station-Id)"
    )]
    MissingSessionIdentifier,
    #[error("CoA-Request carries no changes")]
    NoChanges,
    #[error("{vendor} dialect cannot express {change}")]
    Unsupported {
        vendor: &'static str,
        change: &'static str,
    },
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
}

/// Wire location of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeCode {
    /// RFC attribute
    Standard(u8),
    /// RFC 2868 tunnel attribute carrying a tag octet (tag 0)
    Tunnel(u8),
    /// Vendor-Specific sub-attribute
    Vendor { vendor_id: u32, vendor_type: u8 },
}

/// Value of a dialect attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Integer(u32),
    /// Integer carried as decimal text on the wire (e.g. Tunnel-Private-Group-Id)
    NumericText(u32),
    /// Named dictionary value
    Enumerated { name: &'static str, value: u32 },
}

/// An attribute expressed in a vendor dialect, renderable both as a wire
/// attribute and as a dictionary name/value pair for daemon config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorAttribute {
    /// Dictionary name as known to the RADIUS daemon
    pub name: &'static str,
    pub code: AttributeCode,
    pub value: AttributeValue,
    /// Attribute may appear more than once in a reply (appended, not replaced)
    pub multi_valued: bool,
}

impl VendorAttribute {
    fn new(name: &'static str, code: AttributeCode, value: AttributeValue) -> Self {
        VendorAttribute {
            name,
            code,
            value,
            multi_valued: false,
        }
    }

    fn cisco_avpair(pair: String) -> Self {
        VendorAttribute {
            name: "Cisco-AVPair",
            code: AttributeCode::Vendor {
                vendor_id: VENDOR_CISCO,
                vendor_type: 1,
            },
            value: AttributeValue::Text(pair),
            multi_valued: true,
        }
    }

    /// Encode into a wire attribute
    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        let bytes = match &self.value {
            AttributeValue::Text(text) => text.as_bytes().to_vec(),
            AttributeValue::NumericText(number) => number.to_string().into_bytes(),
            AttributeValue::Integer(number) => number.to_be_bytes().to_vec(),
            AttributeValue::Enumerated { value, .. } => value.to_be_bytes().to_vec(),
        };
        match self.code {
            AttributeCode::Standard(attr_type) => Attribute::new(attr_type, bytes),
            AttributeCode::Tunnel(attr_type) => match self.value {
                AttributeValue::Integer(value) | AttributeValue::Enumerated { value, .. } => {
                    Attribute::tagged_integer(attr_type, 0, value)
                }
                _ => Attribute::new(attr_type, bytes),
            },
            AttributeCode::Vendor {
                vendor_id,
                vendor_type,
            } => Attribute::vendor_specific(vendor_id, vendor_type, bytes),
        }
    }
}

/// VLAN assignment by number or by interface/VLAN name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanAssignment {
    Id(u16),
    Name(String),
}

/// A semantic change pushed to a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum CoaChange {
    /// Apply a named group policy / role / ACL
    GroupPolicy(String),
    /// Assign a TrustSec security group tag
    SecurityGroupTag(u16),
    /// Drop the captive-portal redirection from the session
    RemoveUrlRedirect,
    /// Move the session to another VLAN
    Vlan(VlanAssignment),
    /// Replace the session lifetime in seconds
    SessionTimeout(u32),
}

impl CoaChange {
    pub fn kind(&self) -> &'static str {
        match self {
            CoaChange::GroupPolicy(_) => "group-policy",
            CoaChange::SecurityGroupTag(_) => "security-group-tag",
            CoaChange::RemoveUrlRedirect => "url-redirect removal",
            CoaChange::Vlan(_) => "vlan",
            CoaChange::SessionTimeout(_) => "session-timeout",
        }
    }
}

/// Vendor dialect for authorization attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// RFC attributes only
    #[default]
    Default,
    /// Cisco AireOS wireless LAN controllers
    #[serde(rename = "aireos")]
    AireOs,
    /// Cisco IOS/IOS-XE devices managed in ISE style (Cisco-AVPair)
    Ise,
    /// Aruba controllers and instant APs
    Aruba,
}

impl Vendor {
    /// Map a free-form NAS vendor/type string onto a dialect
    pub fn from_nas_type(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "aireos" | "cisco-aireos" | "cisco-wlc" | "airespace" => Vendor::AireOs,
            "ise" | "cisco-ise" | "cisco" | "cisco-ios" => Vendor::Ise,
            "aruba" | "aruba-os" | "arubaos" | "hpe-aruba" => Vendor::Aruba,
            _ => Vendor::Default,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Vendor::Default => "default",
            Vendor::AireOs => "aireos",
            Vendor::Ise => "ise",
            Vendor::Aruba => "aruba",
        }
    }

    /// "Apply group policy" in this dialect
    pub fn group_policy(self, policy: &str) -> VendorAttribute {
        let text = AttributeValue::Text(policy.to_string());
        match self {
            Vendor::Default => VendorAttribute::new(
                "Filter-Id",
                AttributeCode::Standard(AttributeType::FilterId as u8),
                text,
            ),
            Vendor::AireOs => VendorAttribute::new(
                "Airespace-ACL-Name",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_AIRESPACE,
                    vendor_type: 6,
                },
                text,
            ),
            Vendor::Ise => {
                VendorAttribute::cisco_avpair(format!("ACS:CiscoSecure-Defined-ACL={}", policy))
            }
            Vendor::Aruba => VendorAttribute::new(
                "Aruba-User-Role",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_ARUBA,
                    vendor_type: 1,
                },
                text,
            ),
        }
    }

    /// Downloadable ACL reference, where the dialect has one
    pub fn downloadable_acl(self, acl: &str) -> VendorAttribute {
        match self {
            Vendor::Ise | Vendor::AireOs => VendorAttribute::cisco_avpair(format!(
                "ACS:CiscoSecure-Defined-ACL=#ACSACL#-IP-{}",
                acl
            )),
            Vendor::Default | Vendor::Aruba => VendorAttribute::new(
                "Filter-Id",
                AttributeCode::Standard(AttributeType::FilterId as u8),
                AttributeValue::Text(acl.to_string()),
            ),
        }
    }

    /// TrustSec tag as carried to Cisco devices
    pub fn security_group_tag(self, sgt: u16) -> Option<VendorAttribute> {
        match self {
            Vendor::Ise | Vendor::AireOs => Some(VendorAttribute::cisco_avpair(
                format_security_group_tag(sgt),
            )),
            Vendor::Default | Vendor::Aruba => None,
        }
    }

    /// Captive-portal redirection URL
    pub fn url_redirect(self, url: &str) -> VendorAttribute {
        match self {
            Vendor::Ise | Vendor::AireOs => {
                VendorAttribute::cisco_avpair(format!("url-redirect={}", url))
            }
            Vendor::Default | Vendor::Aruba => VendorAttribute::new(
                "WISPr-Redirection-URL",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_WISPR,
                    vendor_type: 4,
                },
                AttributeValue::Text(url.to_string()),
            ),
        }
    }

    /// Clear a previously applied redirection
    pub fn remove_url_redirect(self) -> Option<VendorAttribute> {
        match self {
            Vendor::Ise | Vendor::AireOs => {
                Some(VendorAttribute::cisco_avpair("url-redirect=".to_string()))
            }
            Vendor::Default | Vendor::Aruba => None,
        }
    }

    /// VLAN assignment attributes
    pub fn vlan(self, vlan: &VlanAssignment) -> Vec<VendorAttribute> {
        match (self, vlan) {
            (Vendor::Aruba, VlanAssignment::Id(id)) => vec![VendorAttribute::new(
                "Aruba-User-Vlan",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_ARUBA,
                    vendor_type: 2,
                },
                AttributeValue::Integer(u32::from(*id)),
            )],
            (Vendor::Aruba, VlanAssignment::Name(name)) => vec![VendorAttribute::new(
                "Aruba-Named-User-Vlan",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_ARUBA,
                    vendor_type: 9,
                },
                AttributeValue::Text(name.clone()),
            )],
            (Vendor::AireOs, VlanAssignment::Name(name)) => vec![VendorAttribute::new(
                "Airespace-Interface-Name",
                AttributeCode::Vendor {
                    vendor_id: VENDOR_AIRESPACE,
                    vendor_type: 5,
                },
                AttributeValue::Text(name.clone()),
            )],
            (_, vlan) => {
                let group_id = match vlan {
                    VlanAssignment::Id(id) => AttributeValue::NumericText(u32::from(*id)),
                    VlanAssignment::Name(name) => AttributeValue::Text(name.clone()),
                };
                vec![
                    VendorAttribute::new(
                        "Tunnel-Type",
                        AttributeCode::Tunnel(AttributeType::TunnelType as u8),
                        AttributeValue::Enumerated {
                            name: "VLAN",
                            value: TunnelType::Vlan as u32,
                        },
                    ),
                    VendorAttribute::new(
                        "Tunnel-Medium-Type",
                        AttributeCode::Tunnel(AttributeType::TunnelMediumType as u8),
                        AttributeValue::Enumerated {
                            name: "IEEE-802",
                            value: TunnelMediumType::Ieee802 as u32,
                        },
                    ),
                    VendorAttribute::new(
                        "Tunnel-Private-Group-Id",
                        AttributeCode::Standard(AttributeType::TunnelPrivateGroupId as u8),
                        group_id,
                    ),
                ]
            }
        }
    }

    /// Attributes expressing one change, or an error if the dialect has no form for it
    pub fn render_change(self, change: &CoaChange) -> Result<Vec<VendorAttribute>, DynAuthError> {
        let unsupported = || DynAuthError::Unsupported {
            vendor: self.name(),
            change: change.kind(),
        };
        match change {
            CoaChange::GroupPolicy(policy) => Ok(vec![self.group_policy(policy)]),
            CoaChange::SecurityGroupTag(sgt) => self
                .security_group_tag(*sgt)
                .map(|attr| vec![attr])
                .ok_or_else(unsupported),
            CoaChange::RemoveUrlRedirect => self
                .remove_url_redirect()
                .map(|attr| vec![attr])
                .ok_or_else(unsupported),
            CoaChange::Vlan(vlan) => Ok(self.vlan(vlan)),
            CoaChange::SessionTimeout(seconds) => Ok(vec![VendorAttribute::new(
                "Session-Timeout",
                AttributeCode::Standard(AttributeType::SessionTimeout as u8),
                AttributeValue::Integer(*seconds),
            )]),
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cisco TrustSec encoding: four hex digits plus the "-00" generation suffix
pub fn format_security_group_tag(sgt: u16) -> String {
    format!("cts:security-group-tag={:04x}-00", sgt)
}

/// Attributes identifying the session(s) a request applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentifiers {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub acct_session_id: Option<String>,
    #[serde(default)]
    pub calling_station_id: Option<String>,
}

impl SessionIdentifiers {
    pub fn is_empty(&self) -> bool {
        [
            &self.user_name,
            &self.acct_session_id,
            &self.calling_station_id,
        ]
        .iter()
        .all(|value| value.as_deref().is_none_or(str::is_empty))
    }

    fn to_attributes(&self) -> Result<Vec<Attribute>, PacketError> {
        let mut attributes = Vec::new();
        let fields = [
            (AttributeType::UserName, &self.user_name),
            (AttributeType::AcctSessionId, &self.acct_session_id),
            (AttributeType::CallingStationId, &self.calling_station_id),
        ];
        for (attr_type, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                attributes.push(Attribute::string(attr_type as u8, value)?);
            }
        }
        Ok(attributes)
    }
}

/// Options shared by both request kinds
#[derive(Debug, Clone)]
pub struct RequestOptions<'a> {
    pub identifier: u8,
    pub secret: &'a [u8],
    /// Address of the NAS, carried as NAS-IP-Address / NAS-IPv6-Address
    pub nas_address: Option<IpAddr>,
    pub message_authenticator: bool,
}

fn nas_identification(address: Option<IpAddr>) -> Result<Option<Attribute>, PacketError> {
    match address {
        Some(IpAddr::V4(v4)) => {
            Attribute::ipv4(AttributeType::NasIpAddress as u8, v4.octets()).map(Some)
        }
        Some(IpAddr::V6(v6)) => {
            Attribute::new(AttributeType::NasIpv6Address as u8, v6.octets().to_vec()).map(Some)
        }
        None => Ok(None),
    }
}

fn finish_request(
    mut packet: Packet,
    options: &RequestOptions<'_>,
) -> Result<Packet, DynAuthError> {
    if options.message_authenticator {
        sign_dynauth_request(&mut packet, options.secret)?;
    } else {
        packet.authenticator = calculate_request_authenticator(&packet, options.secret)?;
    }
    Ok(packet)
}

/// Build a Disconnect-Request (code 40)
pub fn build_disconnect_request(
    session: &SessionIdentifiers,
    options: &RequestOptions<'_>,
) -> Result<Packet, DynAuthError> {
    if session.is_empty() {
        return Err(DynAuthError::MissingSessionIdentifier);
    }
    let mut packet = Packet::new(Code::DisconnectRequest, options.identifier, [0u8; 16]);
    if let Some(attr) = nas_identification(options.nas_address)? {
        packet.add_attribute(attr);
    }
    packet.attributes.extend(session.to_attributes()?);
    finish_request(packet, options)
}

/// Build a CoA-Request (code 43) carrying `changes` in the `vendor` dialect
pub fn build_coa_request(
    session: &SessionIdentifiers,
    changes: &[CoaChange],
    vendor: Vendor,
    options: &RequestOptions<'_>,
) -> Result<Packet, DynAuthError> {
    if session.is_empty() {
        return Err(DynAuthError::MissingSessionIdentifier);
    }
    if changes.is_empty() {
        return Err(DynAuthError::NoChanges);
    }
    let mut packet = Packet::new(Code::CoaRequest, options.identifier, [0u8; 16]);
    if let Some(attr) = nas_identification(options.nas_address)? {
        packet.add_attribute(attr);
    }
    packet.attributes.extend(session.to_attributes()?);
    for change in changes {
        for attr in vendor.render_change(change)? {
            packet.add_attribute(attr.to_attribute()?);
        }
    }
    finish_request(packet, options)
}

/// Why a response could not be accepted as an answer to a request
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("malformed response: {0}")]
    Malformed(#[from] PacketError),
    #[error("response code {0} does not answer {1}")]
    UnexpectedCode(Code, Code),
    #[error("response identifier {received} does not match request identifier {expected}")]
    IdentifierMismatch { expected: u8, received: u8 },
    #[error("response authenticator does not verify with the shared secret")]
    BadAuthenticator,
    #[error("Message-Authenticator does not verify with the shared secret")]
    BadMessageAuthenticator,
}

/// Outcome reported by the NAS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynAuthResponse {
    pub code: Code,
    /// ACK (true) or NAK (false)
    pub acknowledged: bool,
    pub error_cause: Option<ErrorCause>,
    pub reply_message: Option<String>,
}

/// Validate a raw response against the request it answers
///
/// Authenticity is checked before any attribute is trusted.
pub fn interpret_response(
    request: &Packet,
    raw: &[u8],
    secret: &[u8],
) -> Result<DynAuthResponse, ResponseError> {
    let response = Packet::decode(raw)?;

    if response.identifier != request.identifier {
        return Err(ResponseError::IdentifierMismatch {
            expected: request.identifier,
            received: response.identifier,
        });
    }

    let (ack, nak) = request
        .code
        .dynauth_replies()
        .ok_or(ResponseError::UnexpectedCode(response.code, request.code))?;
    if response.code != ack && response.code != nak {
        return Err(ResponseError::UnexpectedCode(response.code, request.code));
    }

    if !verify_response_authenticator(raw, &request.authenticator, secret) {
        return Err(ResponseError::BadAuthenticator);
    }
    if verify_response_message_authenticator(raw, &request.authenticator, secret) == Some(false) {
        return Err(ResponseError::BadMessageAuthenticator);
    }

    let error_cause = response
        .find_attribute(AttributeType::ErrorCause as u8)
        .and_then(|attr| attr.as_integer().ok())
        .map(ErrorCause::from_u32);

    Ok(DynAuthResponse {
        code: response.code,
        acknowledged: response.code == ack,
        error_cause,
        reply_message: response.find_string(AttributeType::ReplyMessage as u8),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::VendorSpecific;
    use crate::auth::{calculate_response_authenticator, verify_request_authenticator};

    fn options(secret: &[u8]) -> RequestOptions<'_> {
        RequestOptions {
            identifier: 17,
            secret,
            nas_address: Some("10.0.0.5".parse().unwrap()),
            message_authenticator: false,
        }
    }

    fn session() -> SessionIdentifiers {
        SessionIdentifiers {
            user_name: Some("alice".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_disconnect_requires_session_identifier() {
        let result = build_disconnect_request(&SessionIdentifiers::default(), &options(b"s"));
        assert!(matches!(result, Err(DynAuthError::MissingSessionIdentifier)));

        let blank = SessionIdentifiers {
            calling_station_id: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn test_disconnect_request_layout() {
        let secret = b"nas-secret";
        let packet = build_disconnect_request(&session(), &options(secret)).unwrap();
        assert_eq!(packet.code, Code::DisconnectRequest);
        assert_eq!(packet.identifier, 17);
        assert_eq!(packet.attributes[0].attr_type, AttributeType::NasIpAddress as u8);
        assert_eq!(packet.attributes[0].value, vec![10, 0, 0, 5]);
        assert_eq!(packet.find_string(AttributeType::UserName as u8).as_deref(), Some("alice"));
        assert!(verify_request_authenticator(&packet, secret));
    }

    #[test]
    fn test_coa_request_requires_changes() {
        let result = build_coa_request(&session(), &[], Vendor::Ise, &options(b"s"));
        assert!(matches!(result, Err(DynAuthError::NoChanges)));
    }

    #[test]
    fn test_group_policy_dialects() {
        let secret = b"s";
        let changes = [CoaChange::GroupPolicy("staff".to_string())];

        let default =
            build_coa_request(&session(), &changes, Vendor::Default, &options(secret)).unwrap();
        assert_eq!(default.find_string(AttributeType::FilterId as u8).as_deref(), Some("staff"));

        let aruba =
            build_coa_request(&session(), &changes, Vendor::Aruba, &options(secret)).unwrap();
        let vsa = aruba
            .find_attribute(AttributeType::VendorSpecific as u8)
            .unwrap()
            .as_vendor_specific()
            .unwrap();
        assert_eq!(
            vsa,
            VendorSpecific {
                vendor_id: VENDOR_ARUBA,
                vendor_type: 1,
                value: b"staff".to_vec()
            }
        );

        let ise = build_coa_request(&session(), &changes, Vendor::Ise, &options(secret)).unwrap();
        let vsa = ise
            .find_attribute(AttributeType::VendorSpecific as u8)
            .unwrap()
            .as_vendor_specific()
            .unwrap();
        assert_eq!(vsa.vendor_id, VENDOR_CISCO);
        assert_eq!(vsa.value, b"ACS:CiscoSecure-Defined-ACL=staff");

        let aireos =
            build_coa_request(&session(), &changes, Vendor::AireOs, &options(secret)).unwrap();
        let vsa = aireos
            .find_attribute(AttributeType::VendorSpecific as u8)
            .unwrap()
            .as_vendor_specific()
            .unwrap();
        assert_eq!((vsa.vendor_id, vsa.vendor_type), (VENDOR_AIRESPACE, 6));
    }

    #[test]
    fn test_unsupported_change() {
        let result = build_coa_request(
            &session(),
            &[CoaChange::SecurityGroupTag(10)],
            Vendor::Aruba,
            &options(b"s"),
        );
        assert!(matches!(
            result,
            Err(DynAuthError::Unsupported { vendor: "aruba", .. })
        ));
    }

    #[test]
    fn test_security_group_tag_format() {
        assert_eq!(format_security_group_tag(10), "cts:security-group-tag=000a-00");
        assert_eq!(format_security_group_tag(0xffff), "cts:security-group-tag=ffff-00");
    }

    #[test]
    fn test_vlan_tunnel_attributes() {
        let attrs = Vendor::Default.vlan(&VlanAssignment::Id(100));
        let wire: Vec<Attribute> = attrs.iter().map(|a| a.to_attribute().unwrap()).collect();
        assert_eq!(wire[0].attr_type, AttributeType::TunnelType as u8);
        assert_eq!(wire[0].value, vec![0, 0, 0, 13]);
        assert_eq!(wire[1].value, vec![0, 0, 0, 6]);
        assert_eq!(wire[2].value, b"100".to_vec());
    }

    #[test]
    fn test_vendor_from_nas_type() {
        assert_eq!(Vendor::from_nas_type("Cisco-WLC"), Vendor::AireOs);
        assert_eq!(Vendor::from_nas_type("cisco"), Vendor::Ise);
        assert_eq!(Vendor::from_nas_type(" aruba "), Vendor::Aruba);
        assert_eq!(Vendor::from_nas_type("other"), Vendor::Default);
    }

    fn answer(request: &Packet, code: Code, secret: &[u8], attributes: Vec<Attribute>) -> Vec<u8> {
        let mut response = Packet::new(code, request.identifier, [0u8; 16]);
        response.attributes = attributes;
        response.authenticator =
            calculate_response_authenticator(&response, &request.authenticator, secret).unwrap();
        response.encode().unwrap()
    }

    #[test]
    fn test_interpret_ack_and_nak() {
        let secret = b"nas-secret";
        let request = build_disconnect_request(&session(), &options(secret)).unwrap();

        let ack = answer(&request, Code::DisconnectAck, secret, vec![]);
        let outcome = interpret_response(&request, &ack, secret).unwrap();
        assert!(outcome.acknowledged);
        assert_eq!(outcome.error_cause, None);

        let nak = answer(
            &request,
            Code::DisconnectNak,
            secret,
            vec![Attribute::integer(AttributeType::ErrorCause as u8, 503).unwrap()],
        );
        let outcome = interpret_response(&request, &nak, secret).unwrap();
        assert!(!outcome.acknowledged);
        assert_eq!(outcome.error_cause, Some(ErrorCause::SessionContextNotFound));
    }

    #[test]
    fn test_interpret_rejects_wrong_secret_and_code() {
        let secret = b"nas-secret";
        let request = build_disconnect_request(&session(), &options(secret)).unwrap();

        let forged = answer(&request, Code::DisconnectAck, b"guess", vec![]);
        assert!(matches!(
            interpret_response(&request, &forged, secret),
            Err(ResponseError::BadAuthenticator)
        ));

        let wrong_code = answer(&request, Code::CoaAck, secret, vec![]);
        assert!(matches!(
            interpret_response(&request, &wrong_code, secret),
            Err(ResponseError::UnexpectedCode(Code::CoaAck, Code::DisconnectRequest))
        ));
    }

    #[test]
    fn test_interpret_rejects_identifier_mismatch() {
        let secret = b"nas-secret";
        let request = build_disconnect_request(&session(), &options(secret)).unwrap();
        let mut other = request.clone();
        other.identifier = 18;
        let raw = answer(&other, Code::DisconnectAck, secret, vec![]);
        assert!(matches!(
            interpret_response(&request, &raw, secret),
            Err(ResponseError::IdentifierMismatch { expected: 17, received: 18 })
        ));
    }
}
