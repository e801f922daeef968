//! CoA/Disconnect exchanges against an in-process NAD on loopback

use radius_control::{
    AuditLogger, CallerError, CoaClient, CoaConfig, CoaError, MemoryStore, NadRef, ProtocolError,
    RadiusClient,
};
use radius_proto::dynauth::{VENDOR_CISCO, ResponseError};
use radius_proto::{
    Attribute, AttributeType, CoaChange, Code, Packet, SessionIdentifiers, Vendor,
    calculate_response_authenticator, verify_request_authenticator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

const SECRET: &str = "testing123";

#[derive(Clone, Copy)]
enum Behaviour {
    Ack,
    Nak,
    TamperedAck,
    Silent,
    /// An answer carrying another identifier first, then the real one
    StrayThenAck,
}

/// Answers one request and hands it back to the test
async fn fake_nad(behaviour: Behaviour) -> (u16, JoinHandle<Option<Packet>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let (len, peer) =
            tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
                .await
                .ok()?
                .ok()?;
        let request = Packet::decode(&buf[..len]).unwrap();
        assert!(verify_request_authenticator(&request, SECRET.as_bytes()));

        let (ack, nak) = request.code.dynauth_replies().unwrap();
        let mut response = match behaviour {
            Behaviour::Ack | Behaviour::TamperedAck | Behaviour::StrayThenAck => {
                Packet::new(ack, request.identifier, [0u8; 16])
            }
            Behaviour::Nak => {
                let mut packet = Packet::new(nak, request.identifier, [0u8; 16]);
                let cause = Attribute::integer(AttributeType::ErrorCause as u8, 503).unwrap();
                packet.add_attribute(cause);
                packet
            }
            Behaviour::Silent => return Some(request),
        };
        response.authenticator =
            calculate_response_authenticator(&response, &request.authenticator, SECRET.as_bytes())
                .unwrap();
        if let Behaviour::TamperedAck = behaviour {
            response.authenticator[0] ^= 0xff;
        }
        if let Behaviour::StrayThenAck = behaviour {
            let mut stray = Packet::new(ack, request.identifier.wrapping_add(1), [0u8; 16]);
            stray.authenticator =
                calculate_response_authenticator(&stray, &request.authenticator, SECRET.as_bytes())
                    .unwrap();
            socket.send_to(&stray.encode().unwrap(), peer).await.unwrap();
        }
        socket
            .send_to(&response.encode().unwrap(), peer)
            .await
            .unwrap();
        Some(request)
    });
    (port, task)
}

async fn client_for(port: u16, coa_enabled: bool, nas_type: Option<&str>) -> CoaClient {
    let mut nad = RadiusClient::new(1, "wlc-1", "127.0.0.1", SECRET);
    nad.coa_enabled = coa_enabled;
    nad.coa_port = Some(port);
    nad.nas_type = nas_type.map(str::to_string);
    let store = Arc::new(MemoryStore::new());
    store.upsert_client(nad).await;
    let config = CoaConfig {
        timeout_ms: 300,
        bind_address: "127.0.0.1".to_string(),
        ..Default::default()
    };
    CoaClient::new(store, config, Arc::new(AuditLogger::disabled()))
}

fn session() -> SessionIdentifiers {
    SessionIdentifiers {
        user_name: Some("alice".to_string()),
        acct_session_id: Some("0000ABCD".to_string()),
        calling_station_id: None,
    }
}

#[tokio::test]
async fn disconnect_is_acknowledged() {
    let (port, nad) = fake_nad(Behaviour::Ack).await;
    let client = client_for(port, true, None).await;

    let result = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap();
    assert!(result.acknowledged);
    assert_eq!(result.code, Code::DisconnectAck.to_string());

    let request = nad.await.unwrap().unwrap();
    assert_eq!(request.code, Code::DisconnectRequest);
    assert_eq!(request.identifier, result.identifier);
    assert_eq!(
        request.find_string(AttributeType::UserName as u8).as_deref(),
        Some("alice")
    );
    assert!(request.find_attribute(AttributeType::MessageAuthenticator as u8).is_some());
}

#[tokio::test]
async fn response_with_foreign_identifier_is_skipped() {
    let (port, nad) = fake_nad(Behaviour::StrayThenAck).await;
    let client = client_for(port, true, None).await;

    let result = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap();
    assert!(result.acknowledged);
    let request = nad.await.unwrap().unwrap();
    assert_eq!(request.identifier, result.identifier);
}

#[tokio::test]
async fn coa_nak_reports_error_cause() {
    let (port, nad) = fake_nad(Behaviour::Nak).await;
    let client = client_for(port, true, Some("cisco-ise")).await;

    let changes = [CoaChange::GroupPolicy("quarantine".to_string())];
    let result = client
        .send_coa(NadRef::Ip("127.0.0.1".parse().unwrap()), &session(), &changes)
        .await
        .unwrap();
    assert!(!result.acknowledged);
    assert_eq!(result.error_cause, Some(503));

    let request = nad.await.unwrap().unwrap();
    assert_eq!(request.code, Code::CoaRequest);
    let vsa = request
        .find_attribute(AttributeType::VendorSpecific as u8)
        .unwrap()
        .as_vendor_specific()
        .unwrap();
    assert_eq!(vsa.vendor_id, VENDOR_CISCO);
    assert_eq!(Vendor::from_nas_type("cisco-ise"), Vendor::Ise);
}

#[tokio::test]
async fn tampered_response_is_protocol_error() {
    let (port, nad) = fake_nad(Behaviour::TamperedAck).await;
    let client = client_for(port, true, None).await;

    let err = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap_err();
    assert!(matches!(
        err,
        CoaError::Protocol(ProtocolError::Response(ResponseError::BadAuthenticator))
    ));
    nad.await.unwrap();
}

#[tokio::test]
async fn silent_nad_times_out() {
    let (port, nad) = fake_nad(Behaviour::Silent).await;
    let client = client_for(port, true, None).await;

    let err = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap_err();
    assert!(matches!(err, CoaError::Protocol(ProtocolError::Timeout { .. })));
    assert!(nad.await.unwrap().is_some());
}

#[tokio::test]
async fn coa_disabled_sends_nothing() {
    let (port, nad) = fake_nad(Behaviour::Ack).await;
    let client = client_for(port, false, None).await;

    let err = client.send_disconnect(NadRef::Id(1), &session()).await.unwrap_err();
    assert!(matches!(err, CoaError::Caller(CallerError::CoaDisabled(_))));
    // The NAD never sees a packet
    assert!(nad.await.unwrap().is_none());
}
