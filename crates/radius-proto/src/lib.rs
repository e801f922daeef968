//! RADIUS wire protocol for dynamic authorization
//!
//! This crate implements the parts of the RADIUS protocol needed to talk to
//! a NAS as a Dynamic Authorization Client, as defined in RFC 2865, 2869,
//! 3579 and 5176.
//!
//! # Features
//!
//! - Packet encoding and decoding
//! - Vendor-Specific and tagged tunnel attributes
//! - Request/Response Authenticator calculation for codes 40-45
//! - Message-Authenticator (HMAC-MD5) signing and verification
//! - Vendor dialects for CoA payloads (RFC, Cisco AireOS, Cisco ISE, Aruba)
//!
//! # Example
//!
//! ```rust
//! use radius_proto::dynauth::{build_disconnect_request, RequestOptions, SessionIdentifiers};
//! use radius_proto::Code;
//!
//! let session = SessionIdentifiers {
//!     user_name: Some("alice".to_string()),
//!     ..Default::default()
//! };
//! let options = RequestOptions {
//!     identifier: 1,
//!     secret: b"secret",
//!     nas_address: None,
//!     message_authenticator: true,
//! };
//! let packet = build_disconnect_request(&session, &options).unwrap();
//! assert_eq!(packet.code, Code::DisconnectRequest);
//!
//! let bytes = packet.encode().unwrap();
//! ```

pub mod attributes;
pub mod auth;
pub mod dynauth;
pub mod message_auth;
pub mod packet;

pub use attributes::{Attribute, AttributeType, ErrorCause, VendorSpecific};
pub use auth::{
    calculate_request_authenticator, calculate_response_authenticator,
    verify_request_authenticator, verify_response_authenticator,
};
pub use dynauth::{
    CoaChange, DynAuthError, DynAuthResponse, ResponseError, SessionIdentifiers, Vendor,
    VendorAttribute, VlanAssignment,
};
pub use message_auth::{calculate_message_authenticator, sign_dynauth_request};
pub use packet::{Code, Packet, PacketError};
