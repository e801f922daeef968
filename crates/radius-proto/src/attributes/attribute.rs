use super::AttributeType;
use crate::packet::PacketError;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes)
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length (253 bytes)
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute value too long: {} bytes (max {})",
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create an integer attribute (32-bit big-endian)
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    /// Create an IP address attribute
    pub fn ipv4(attr_type: u8, value: [u8; 4]) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_vec())
    }

    /// Create a tagged integer attribute (RFC 2868 Section 3)
    ///
    /// The tag occupies the first octet and the value the remaining three.
    pub fn tagged_integer(attr_type: u8, tag: u8, value: u32) -> Result<Self, PacketError> {
        if tag > 0x1f {
            return Err(PacketError::AttributeError(format!(
                "Tunnel tag out of range: {}",
                tag
            )));
        }
        if value > 0x00ff_ffff {
            return Err(PacketError::AttributeError(format!(
                "Tagged integer out of range: {}",
                value
            )));
        }
        let bytes = value.to_be_bytes();
        Self::new(attr_type, vec![tag, bytes[1], bytes[2], bytes[3]])
    }

    /// Create a Vendor-Specific attribute (RFC 2865 Section 5.26)
    pub fn vendor_specific(
        vendor_id: u32,
        vendor_type: u8,
        value: impl Into<Vec<u8>>,
    ) -> Result<Self, PacketError> {
        VendorSpecific {
            vendor_id,
            vendor_type,
            value: value.into(),
        }
        .to_attribute()
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Encoded attribute too long: {} bytes",
                length
            )));
        }

        let mut buffer = Vec::with_capacity(length);
        buffer.push(self.attr_type);
        buffer.push(length as u8);
        buffer.extend_from_slice(&self.value);

        Ok(buffer)
    }

    /// Decode attribute from bytes
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        }

        let attr_type = data[0];
        let length = data[1] as usize;

        if length < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }

        if data.len() < length {
            return Err(PacketError::AttributeError(format!(
                "Insufficient data for attribute: expected {}, got {}",
                length,
                data.len()
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[Self::MIN_LENGTH..length].to_vec(),
        })
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    /// Try to interpret value as a string
    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }

    /// Try to interpret value as an integer (32-bit big-endian)
    pub fn as_integer(&self) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().map_err(|_| {
            PacketError::AttributeError(format!(
                "Expected 4 bytes for integer, got {}",
                self.value.len()
            ))
        })?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Try to interpret value as a Vendor-Specific payload
    pub fn as_vendor_specific(&self) -> Result<VendorSpecific, PacketError> {
        if self.attr_type != AttributeType::VendorSpecific as u8 {
            return Err(PacketError::AttributeError(format!(
                "Attribute {} is not Vendor-Specific",
                self.attr_type
            )));
        }
        VendorSpecific::decode(&self.value)
    }
}

/// Payload of a Vendor-Specific attribute using the RFC 2865 suggested format
///
/// ```text
/// | Vendor-Id (4) | Vendor type (1) | Vendor length (1) | Value ...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorSpecific {
    pub vendor_id: u32,
    pub vendor_type: u8,
    pub value: Vec<u8>,
}

impl VendorSpecific {
    /// Header bytes preceding the vendor value (Vendor-Id + type + length)
    const HEADER_LENGTH: usize = 6;

    pub fn to_attribute(&self) -> Result<Attribute, PacketError> {
        let vendor_length = 2 + self.value.len();
        if vendor_length > u8::MAX as usize {
            return Err(PacketError::AttributeError(format!(
                "Vendor attribute {}/{} too long: {} bytes",
                self.vendor_id,
                self.vendor_type,
                self.value.len()
            )));
        }
        let mut payload = Vec::with_capacity(Self::HEADER_LENGTH + self.value.len());
        payload.extend_from_slice(&self.vendor_id.to_be_bytes());
        payload.push(self.vendor_type);
        payload.push(vendor_length as u8);
        payload.extend_from_slice(&self.value);
        Attribute::new(AttributeType::VendorSpecific as u8, payload)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < Self::HEADER_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Vendor-Specific payload too short: {} bytes",
                payload.len()
            )));
        }
        let vendor_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let vendor_type = payload[4];
        let vendor_length = payload[5] as usize;
        if vendor_length < 2 || 4 + vendor_length > payload.len() {
            return Err(PacketError::AttributeError(format!(
                "Invalid vendor attribute length: {}",
                vendor_length
            )));
        }
        Ok(VendorSpecific {
            vendor_id,
            vendor_type,
            value: payload[Self::HEADER_LENGTH..4 + vendor_length].to_vec(),
        })
    }
}
