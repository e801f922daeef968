/// RADIUS Attribute Types used by dynamic authorization (RFC 2865, 2866, 2868, 2869, 5176)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1) - RFC 2865
    UserName = 1,
    /// NAS-IP-Address (4) - RFC 2865
    NasIpAddress = 4,
    /// Framed-IP-Address (8) - RFC 2865
    FramedIpAddress = 8,
    /// Filter-Id (11) - RFC 2865
    FilterId = 11,
    /// Reply-Message (18) - RFC 2865
    ReplyMessage = 18,
    /// State (24) - RFC 2865
    State = 24,
    /// Class (25) - RFC 2865
    Class = 25,
    /// Vendor-Specific (26) - RFC 2865
    VendorSpecific = 26,
    /// Session-Timeout (27) - RFC 2865
    SessionTimeout = 27,
    /// Idle-Timeout (28) - RFC 2865
    IdleTimeout = 28,
    /// Called-Station-Id (30) - RFC 2865
    CalledStationId = 30,
    /// Calling-Station-Id (31) - RFC 2865
    CallingStationId = 31,
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier = 32,
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId = 44,
    /// Acct-Multi-Session-Id (50) - RFC 2866
    AcctMultiSessionId = 50,
    /// Event-Timestamp (55) - RFC 2869
    EventTimestamp = 55,
    /// Tunnel-Type (64) - RFC 2868
    TunnelType = 64,
    /// Tunnel-Medium-Type (65) - RFC 2868
    TunnelMediumType = 65,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
    /// Tunnel-Private-Group-Id (81) - RFC 2868
    TunnelPrivateGroupId = 81,
    /// NAS-IPv6-Address (95) - RFC 3162
    NasIpv6Address = 95,
    /// Error-Cause (101) - RFC 5176
    ErrorCause = 101,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            4 => Some(AttributeType::NasIpAddress),
            8 => Some(AttributeType::FramedIpAddress),
            11 => Some(AttributeType::FilterId),
            18 => Some(AttributeType::ReplyMessage),
            24 => Some(AttributeType::State),
            25 => Some(AttributeType::Class),
            26 => Some(AttributeType::VendorSpecific),
            27 => Some(AttributeType::SessionTimeout),
            28 => Some(AttributeType::IdleTimeout),
            30 => Some(AttributeType::CalledStationId),
            31 => Some(AttributeType::CallingStationId),
            32 => Some(AttributeType::NasIdentifier),
            44 => Some(AttributeType::AcctSessionId),
            50 => Some(AttributeType::AcctMultiSessionId),
            55 => Some(AttributeType::EventTimestamp),
            64 => Some(AttributeType::TunnelType),
            65 => Some(AttributeType::TunnelMediumType),
            80 => Some(AttributeType::MessageAuthenticator),
            81 => Some(AttributeType::TunnelPrivateGroupId),
            95 => Some(AttributeType::NasIpv6Address),
            101 => Some(AttributeType::ErrorCause),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Tunnel-Type values (RFC 2868 Section 3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TunnelType {
    /// VLAN (13) - RFC 3580
    Vlan = 13,
}

/// Tunnel-Medium-Type values (RFC 2868 Section 3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TunnelMediumType {
    /// IEEE-802 (6)
    Ieee802 = 6,
}

/// Error-Cause values (RFC 5176 Section 3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
    ResidualSessionContextRemoved,
    InvalidEapPacket,
    UnsupportedAttribute,
    MissingAttribute,
    NasIdentificationMismatch,
    InvalidRequest,
    UnsupportedService,
    UnsupportedExtension,
    InvalidAttributeValue,
    AdministrativelyProhibited,
    RequestNotRoutable,
    SessionContextNotFound,
    SessionContextNotRemovable,
    OtherProxyProcessingError,
    ResourcesUnavailable,
    RequestInitiated,
    MultipleSessionSelectionUnsupported,
    /// Value outside the registry
    Other(u32),
}

impl ErrorCause {
    pub fn from_u32(value: u32) -> Self {
        match value {
            201 => ErrorCause::ResidualSessionContextRemoved,
            202 => ErrorCause::InvalidEapPacket,
            401 => ErrorCause::UnsupportedAttribute,
            402 => ErrorCause::MissingAttribute,
            403 => ErrorCause::NasIdentificationMismatch,
            404 => ErrorCause::InvalidRequest,
            405 => ErrorCause::UnsupportedService,
            406 => ErrorCause::UnsupportedExtension,
            407 => ErrorCause::InvalidAttributeValue,
            501 => ErrorCause::AdministrativelyProhibited,
            502 => ErrorCause::RequestNotRoutable,
            503 => ErrorCause::SessionContextNotFound,
            504 => ErrorCause::SessionContextNotRemovable,
            505 => ErrorCause::OtherProxyProcessingError,
            506 => ErrorCause::ResourcesUnavailable,
            507 => ErrorCause::RequestInitiated,
            508 => ErrorCause::MultipleSessionSelectionUnsupported,
            other => ErrorCause::Other(other),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCause::ResidualSessionContextRemoved => 201,
            ErrorCause::InvalidEapPacket => 202,
            ErrorCause::UnsupportedAttribute => 401,
            ErrorCause::MissingAttribute => 402,
            ErrorCause::NasIdentificationMismatch => 403,
            ErrorCause::InvalidRequest => 404,
            ErrorCause::UnsupportedService => 405,
            ErrorCause::UnsupportedExtension => 406,
            ErrorCause::InvalidAttributeValue => 407,
            ErrorCause::AdministrativelyProhibited => 501,
            ErrorCause::RequestNotRoutable => 502,
            ErrorCause::SessionContextNotFound => 503,
            ErrorCause::SessionContextNotRemovable => 504,
            ErrorCause::OtherProxyProcessingError => 505,
            ErrorCause::ResourcesUnavailable => 506,
            ErrorCause::RequestInitiated => 507,
            ErrorCause::MultipleSessionSelectionUnsupported => 508,
            ErrorCause::Other(value) => value,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCause::ResidualSessionContextRemoved => "Residual Session Context Removed",
            ErrorCause::InvalidEapPacket => "Invalid EAP Packet (Ignored)",
            ErrorCause::UnsupportedAttribute => "Unsupported Attribute",
            ErrorCause::MissingAttribute => "Missing Attribute",
            ErrorCause::NasIdentificationMismatch => "NAS Identification Mismatch",
            ErrorCause::InvalidRequest => "Invalid Request",
            ErrorCause::UnsupportedService => "Unsupported Service",
            ErrorCause::UnsupportedExtension => "Unsupported Extension",
            ErrorCause::InvalidAttributeValue => "Invalid Attribute Value",
            ErrorCause::AdministrativelyProhibited => "Administratively Prohibited",
            ErrorCause::RequestNotRoutable => "Request Not Routable (Proxy)",
            ErrorCause::SessionContextNotFound => "Session Context Not Found",
            ErrorCause::SessionContextNotRemovable => "Session Context Not Removable",
            ErrorCause::OtherProxyProcessingError => "Other Proxy Processing Error",
            ErrorCause::ResourcesUnavailable => "Resources Unavailable",
            ErrorCause::RequestInitiated => "Request Initiated",
            ErrorCause::MultipleSessionSelectionUnsupported => {
                "Multiple Session Selection Unsupported"
            }
            ErrorCause::Other(_) => "Unknown Error-Cause",
        }
    }
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_cause_round_trip() {
        for value in [201, 202, 401, 404, 407, 501, 503, 508] {
            assert_eq!(ErrorCause::from_u32(value).as_u32(), value);
        }
        assert_eq!(ErrorCause::from_u32(999), ErrorCause::Other(999));
    }

    #[test]
    fn test_attribute_type_lookup() {
        assert_eq!(AttributeType::from_u8(101), Some(AttributeType::ErrorCause));
        assert_eq!(AttributeType::from_u8(2), None);
    }
}
