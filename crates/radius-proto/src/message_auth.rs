//! Message-Authenticator Support (RFC 2869, RFC 5176 Section 3.1)
//!
//! Message-Authenticator is HMAC-MD5 keyed with the shared secret over the
//! whole packet, with the Message-Authenticator value set to zeros.
//!
//! - CoA-Request / Disconnect-Request: the Request Authenticator field is
//!   16 zero octets while computing, and the Request Authenticator is
//!   computed afterwards over the signed packet.
//! - ACK / NAK responses: the Request Authenticator of the request is placed
//!   in the authenticator field while computing.

use crate::attributes::{Attribute, AttributeType};
use crate::auth::calculate_request_authenticator;
use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

/// Calculate Message-Authenticator for a RADIUS packet
///
/// # Arguments
/// * `packet_bytes` - The complete RADIUS packet bytes with Message-Authenticator set to zeros
/// * `secret` - The shared secret
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(packet_bytes);
    let bytes = mac.finalize().into_bytes();

    let mut output = [0u8; 16];
    output.copy_from_slice(&bytes);
    output
}

/// Byte offset of the Message-Authenticator value inside a raw packet, if present
pub fn find_message_authenticator_offset(packet_bytes: &[u8]) -> Option<usize> {
    if packet_bytes.len() < Packet::MIN_PACKET_SIZE {
        return None;
    }
    let length = (u16::from_be_bytes([packet_bytes[2], packet_bytes[3]]) as usize)
        .min(packet_bytes.len());
    let mut offset = Packet::MIN_PACKET_SIZE;
    while offset + Attribute::MIN_LENGTH <= length {
        let attr_type = packet_bytes[offset];
        let attr_len = packet_bytes[offset + 1] as usize;
        if attr_len < Attribute::MIN_LENGTH || offset + attr_len > length {
            return None;
        }
        if attr_type == AttributeType::MessageAuthenticator as u8 && attr_len == 18 {
            return Some(offset + Attribute::MIN_LENGTH);
        }
        offset += attr_len;
    }
    None
}

/// Sign a CoA or Disconnect request: append Message-Authenticator and then
/// compute the Request Authenticator over the signed packet.
pub fn sign_dynauth_request(packet: &mut Packet, secret: &[u8]) -> Result<(), PacketError> {
    packet
        .attributes
        .retain(|attr| attr.attr_type != AttributeType::MessageAuthenticator as u8);
    packet.authenticator = [0u8; 16];
    packet.add_attribute(Attribute::new(
        AttributeType::MessageAuthenticator as u8,
        vec![0u8; 16],
    )?);

    let zeroed = packet.encode()?;
    let mac = calculate_message_authenticator(&zeroed, secret);
    if let Some(attr) = packet.attributes.last_mut() {
        attr.value = mac.to_vec();
    }

    packet.authenticator = calculate_request_authenticator(packet, secret)?;
    Ok(())
}

/// Verify Message-Authenticator in a raw response
///
/// Returns `None` when the response carries no Message-Authenticator.
pub fn verify_response_message_authenticator(
    packet_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Option<bool> {
    let offset = find_message_authenticator_offset(packet_bytes)?;
    let length = u16::from_be_bytes([packet_bytes[2], packet_bytes[3]]) as usize;

    let mut copy = packet_bytes[..length].to_vec();
    let received: [u8; 16] = copy[offset..offset + 16].try_into().ok()?;
    copy[4..Packet::MIN_PACKET_SIZE].copy_from_slice(request_authenticator);
    copy[offset..offset + 16].fill(0);

    Some(calculate_message_authenticator(&copy, secret) == received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_request_authenticator;
    use crate::packet::Code;

    #[test]
    fn test_calculate_message_authenticator_length() {
        let packet = vec![0u8; 20];
        let mac = calculate_message_authenticator(&packet, b"testing123");
        assert_eq!(mac.len(), 16);
        assert_ne!(mac, calculate_message_authenticator(&packet, b"other"));
    }

    #[test]
    fn test_sign_dynauth_request() {
        let secret = b"testing123";
        let mut packet = Packet::new(Code::CoaRequest, 1, [0u8; 16]);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "bob").unwrap());
        sign_dynauth_request(&mut packet, secret).unwrap();

        assert!(verify_request_authenticator(&packet, secret));

        let raw = packet.encode().unwrap();
        let offset = find_message_authenticator_offset(&raw).unwrap();
        let mut zeroed = raw.clone();
        zeroed[4..20].fill(0);
        zeroed[offset..offset + 16].fill(0);
        assert_eq!(
            &raw[offset..offset + 16],
            &calculate_message_authenticator(&zeroed, secret)
        );
    }

    #[test]
    fn test_verify_response_message_authenticator() {
        let secret = b"testing123";
        let request_auth = [9u8; 16];

        let mut response = Packet::new(Code::CoaAck, 1, request_auth);
        response.add_attribute(
            Attribute::new(AttributeType::MessageAuthenticator as u8, vec![0u8; 16]).unwrap(),
        );
        let zeroed = response.encode().unwrap();
        let mac = calculate_message_authenticator(&zeroed, secret);
        response.attributes[0].value = mac.to_vec();
        response.authenticator = [0xaa; 16];
        let raw = response.encode().unwrap();

        assert_eq!(
            verify_response_message_authenticator(&raw, &request_auth, secret),
            Some(true)
        );
        assert_eq!(
            verify_response_message_authenticator(&raw, &request_auth, b"wrong"),
            Some(false)
        );
    }

    #[test]
    fn test_missing_message_authenticator() {
        let raw = Packet::new(Code::CoaAck, 1, [0u8; 16]).encode().unwrap();
        assert_eq!(
            verify_response_message_authenticator(&raw, &[0u8; 16], b"s"),
            None
        );
    }
}
