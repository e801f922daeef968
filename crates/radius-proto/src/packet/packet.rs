use super::Code;
use crate::attributes::Attribute;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Attribute error: {0}")]
    AttributeError(String),
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// RADIUS Packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// |                         Authenticator                         |
/// |                                                               |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type (1 byte)
    pub code: Code,
    /// Packet identifier for matching requests/responses (1 byte)
    pub identifier: u8,
    /// Request or Response Authenticator (16 bytes)
    pub authenticator: [u8; 16],
    /// List of attributes, in wire order
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Minimum RADIUS packet size (20 bytes: 1 code + 1 id + 2 length + 16 authenticator)
    pub const MIN_PACKET_SIZE: usize = 20;
    /// Maximum RADIUS packet size (4096 bytes as per RFC 2865)
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Encoded attribute section, in wire order
    pub fn encode_attributes(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.length() - Self::MIN_PACKET_SIZE);
        for attr in &self.attributes {
            buffer.extend_from_slice(&attr.encode()?);
        }
        Ok(buffer)
    }

    /// Encode packet to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let attributes = self.encode_attributes()?;
        let total_length = Self::MIN_PACKET_SIZE + attributes.len();
        if total_length > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(total_length));
        }

        let mut buffer = Vec::with_capacity(total_length);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(total_length as u16).to_be_bytes());
        buffer.extend_from_slice(&self.authenticator);
        buffer.extend_from_slice(&attributes);

        Ok(buffer)
    }

    /// Decode packet from bytes
    ///
    /// Trailing bytes beyond the Length field are ignored (RFC 2865 Section 3).
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_PACKET_SIZE {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::InvalidCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;

        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&length) {
            return Err(PacketError::InvalidLength(length));
        }
        if data.len() < length {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..Self::MIN_PACKET_SIZE]);

        let mut attributes = Vec::new();
        let mut attr_data = &data[Self::MIN_PACKET_SIZE..length];
        while !attr_data.is_empty() {
            let attr = Attribute::decode(attr_data)?;
            let attr_len = attr.encoded_length();
            attributes.push(attr);
            attr_data = &attr_data[attr_len..];
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// Get the length of the encoded packet
    pub fn length(&self) -> usize {
        Self::MIN_PACKET_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Find first attribute by type
    pub fn find_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    /// Find all attributes by type
    pub fn find_all_attributes(&self, attr_type: u8) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type == attr_type)
            .collect()
    }

    /// First attribute of the given type decoded as UTF-8 text
    pub fn find_string(&self, attr_type: u8) -> Option<String> {
        self.find_attribute(attr_type)
            .and_then(|attr| attr.as_string().ok())
    }
}
