/// RADIUS packet codes (RFC 2865 Section 4, RFC 5176 Section 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Accounting-Request (4) - RFC 2866
    AccountingRequest = 4,
    /// Accounting-Response (5) - RFC 2866
    AccountingResponse = 5,
    /// Disconnect-Request (40) - RFC 5176
    DisconnectRequest = 40,
    /// Disconnect-ACK (41) - RFC 5176
    DisconnectAck = 41,
    /// Disconnect-NAK (42) - RFC 5176
    DisconnectNak = 42,
    /// CoA-Request (43) - RFC 5176
    CoaRequest = 43,
    /// CoA-ACK (44) - RFC 5176
    CoaAck = 44,
    /// CoA-NAK (45) - RFC 5176
    CoaNak = 45,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            4 => Some(Code::AccountingRequest),
            5 => Some(Code::AccountingResponse),
            40 => Some(Code::DisconnectRequest),
            41 => Some(Code::DisconnectAck),
            42 => Some(Code::DisconnectNak),
            43 => Some(Code::CoaRequest),
            44 => Some(Code::CoaAck),
            45 => Some(Code::CoaNak),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Requests whose authenticator is computed over the packet itself
    /// (RFC 2866 Section 3, RFC 5176 Section 2.3) rather than being random.
    pub fn has_computed_request_authenticator(self) -> bool {
        matches!(
            self,
            Code::AccountingRequest | Code::DisconnectRequest | Code::CoaRequest
        )
    }

    /// The (ACK, NAK) pair a dynamic authorization request is answered with.
    pub fn dynauth_replies(self) -> Option<(Code, Code)> {
        match self {
            Code::DisconnectRequest => Some((Code::DisconnectAck, Code::DisconnectNak)),
            Code::CoaRequest => Some((Code::CoaAck, Code::CoaNak)),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Code::AccessRequest => "Access-Request",
            Code::AccessAccept => "Access-Accept",
            Code::AccessReject => "Access-Reject",
            Code::AccountingRequest => "Accounting-Request",
            Code::AccountingResponse => "Accounting-Response",
            Code::DisconnectRequest => "Disconnect-Request",
            Code::DisconnectAck => "Disconnect-ACK",
            Code::DisconnectNak => "Disconnect-NAK",
            Code::CoaRequest => "CoA-Request",
            Code::CoaAck => "CoA-ACK",
            Code::CoaNak => "CoA-NAK",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}
