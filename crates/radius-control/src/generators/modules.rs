//! Backend module configuration (`mods-available/sql`)

use super::{ArtifactKind, GenerationError};
use crate::render::{GENERATED_HEADER, quote};
use crate::secrets::SecretDecryptor;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// SQL module options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlModuleOptions {
    /// Enable the module and call it from the virtual server
    #[serde(default)]
    pub enabled: bool,
    /// Driver name, e.g. "rlm_sql_postgresql"
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Query dialect, e.g. "postgresql"
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub login: String,
    /// Stored encrypted; resolved through the secret decryptor
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Load NAS entries from the `nas` table as well as clients.conf
    #[serde(default)]
    pub read_clients: bool,
    #[serde(default = "default_pool_max")]
    pub pool_max: u32,
}

fn default_driver() -> String {
    "rlm_sql_postgresql".to_string()
}

fn default_dialect() -> String {
    "postgresql".to_string()
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "radius".to_string()
}

fn default_pool_max() -> u32 {
    32
}

impl Default for SqlModuleOptions {
    fn default() -> Self {
        SqlModuleOptions {
            enabled: false,
            driver: default_driver(),
            dialect: default_dialect(),
            server: default_server(),
            port: default_port(),
            login: String::new(),
            password: String::new(),
            database: default_database(),
            read_clients: false,
            pool_max: default_pool_max(),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Render the module; the file is written even when disabled and only the
/// activation link follows `enabled`.
pub fn render_sql(
    options: &SqlModuleOptions,
    secrets: &dyn SecretDecryptor,
) -> Result<String, GenerationError> {
    let word_ok = |value: &str| {
        !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if !word_ok(&options.driver) || !word_ok(&options.dialect) {
        return Err(GenerationError::new(
            ArtifactKind::Modules,
            "sql driver and dialect must be plain identifiers",
        ));
    }
    if options.enabled && (options.login.is_empty() || options.server.is_empty()) {
        return Err(GenerationError::new(
            ArtifactKind::Modules,
            "enabled sql module needs a server and a login",
        ));
    }
    let password = if options.password.is_empty() {
        String::new()
    } else {
        secrets
            .decrypt("sql module password", &options.password)
            .map_err(|e| GenerationError::new(ArtifactKind::Modules, e.to_string()))?
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}\n", GENERATED_HEADER);
    out.push_str("sql {\n");
    let _ = writeln!(out, "\tdriver = {}", quote(&options.driver));
    let _ = writeln!(out, "\tdialect = {}", quote(&options.dialect));
    let _ = writeln!(out, "\tserver = {}", quote(&options.server));
    let _ = writeln!(out, "\tport = {}", options.port);
    let _ = writeln!(out, "\tlogin = {}", quote(&options.login));
    let _ = writeln!(out, "\tpassword = {}", quote(&password));
    let _ = writeln!(out, "\tradius_db = {}", quote(&options.database));
    out.push_str(
        "\tacct_table1 = \"radacct\"\n\
         \tacct_table2 = \"radacct\"\n\
         \tpostauth_table = \"radpostauth\"\n\
         \tauthcheck_table = \"radcheck\"\n\
         \tgroupcheck_table = \"radgroupcheck\"\n\
         \tauthreply_table = \"radreply\"\n\
         \tgroupreply_table = \"radgroupreply\"\n\
         \tusergroup_table = \"radusergroup\"\n\
         \tdelete_stale_sessions = yes\n",
    );
    let _ = writeln!(out, "\tread_clients = {}", yes_no(options.read_clients));
    out.push_str("\tclient_table = \"nas\"\n");
    out.push_str("\tgroup_attribute = \"SQL-Group\"\n");
    out.push_str("\tpool {\n\t\tstart = 1\n\t\tmin = 1\n");
    let _ = writeln!(out, "\t\tmax = {}", options.pool_max.max(1));
    out.push_str("\t\tspare = 1\n\t\tuses = 0\n\t\tlifetime = 0\n\t\tidle_timeout = 60\n\t}\n");
    out.push_str("\t$INCLUDE ${modconfdir}/${.:name}/main/${dialect}/queries.conf\n");
    out.push_str("}\n");
    Ok(out)
}
