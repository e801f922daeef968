//! Client table (`clients.conf`)

use super::{ArtifactKind, GenerationError, comment_text};
use crate::model::RadiusClient;
use crate::render::{GENERATED_HEADER, quote, sanitize_identifier};
use ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::fmt::Write;

fn error(client: &RadiusClient, reason: impl std::fmt::Display) -> GenerationError {
    GenerationError::new(
        ArtifactKind::Clients,
        format!("client '{}': {}", client.name, reason),
    )
}

/// Secrets are inlined verbatim, so anything the config parser would
/// interpret is refused instead of escaped.
fn check_secret(client: &RadiusClient) -> Result<(), GenerationError> {
    let secret = &client.secret;
    if secret.is_empty() {
        return Err(error(client, "empty shared secret"));
    }
    if secret.contains('"') || secret.contains('\\') || secret.contains("${") {
        return Err(error(client, "shared secret contains a quote, backslash or ${"));
    }
    if secret.chars().any(char::is_control) {
        return Err(error(client, "shared secret contains a control character"));
    }
    Ok(())
}

/// Render one `client` block per active client
pub fn render(clients: &[RadiusClient]) -> Result<String, GenerationError> {
    let bases: Vec<String> = clients
        .iter()
        .map(|client| sanitize_identifier(&client.name, &['-', '.']))
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);

    for (client, base) in clients.iter().zip(&bases) {
        if !client.enabled {
            continue;
        }
        let network: IpNetwork = client
            .network()
            .ok_or_else(|| error(client, format!("invalid address '{}'", client.ip_address)))?;
        check_secret(client)?;

        let identifier = if counts[base.as_str()] > 1 {
            format!("{}_{}", base, client.id)
        } else {
            base.clone()
        };
        let host_prefix = if network.is_ipv4() { 32 } else { 128 };
        let address = if network.prefix() == host_prefix {
            network.ip().to_string()
        } else {
            network.to_string()
        };
        let address_key = if network.is_ipv4() { "ipaddr" } else { "ipv6addr" };

        out.push('\n');
        if let Some(description) = client.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(out, "# {}", comment_text(description));
        }
        let _ = writeln!(out, "client {} {{", identifier);
        let _ = writeln!(out, "\t{} = {}", address_key, address);
        let _ = writeln!(out, "\tsecret = \"{}\"", client.secret);
        let _ = writeln!(out, "\tshortname = {}", quote(&client.name));
        if let Some(nas_type) = client.nas_type.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "\tnas_type = {}", quote(nas_type));
        }
        if client.require_message_authenticator {
            out.push_str("\trequire_message_authenticator = yes\n");
        }
        if let Some(server) = client.virtual_server.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(
                out,
                "\tvirtual_server = {}",
                sanitize_identifier(server, &['-', '.'])
            );
        }
        if client.radsec_enabled {
            out.push_str("\tproto = *\n");
        }
        out.push_str("}\n");
    }

    Ok(out)
}
