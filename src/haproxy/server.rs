/// Server-line codec
///
/// One `server` declaration line maps to one [`ServerRecord`]. The two pool
/// flavors carry different extras: web servers may have a sticky-session
/// cookie, database servers carry a `backup` flag plus replication metadata
/// (role, GTID) smuggled into a trailing `# key=value` comment — HAProxy
/// ignores the comment, portero owns it. Metadata is parsed into typed
/// fields right here; raw key/value strings never leave this module.
///
/// Encoding is canonical, not byte-preserving: token order and flag
/// presence round-trip exactly, cosmetic whitespace does not.
use std::collections::HashMap;

/// Which pool flavor a line is being parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Web,
    Db,
}

/// Flavor-specific payload of a server record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerExtras {
    Web(WebExtras),
    Db(DbExtras),
}

/// Extras for web pool servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebExtras {
    /// Sticky-session cookie token
    pub cookie: Option<String>,
}

/// Extras for database pool servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbExtras {
    /// Replication role carried in the trailing comment
    pub role: String,
    /// GTID replication tracking, on unless the comment says `gtid=off`
    pub gtid: bool,
    /// HAProxy `backup` flag
    pub backup: bool,
}

impl Default for DbExtras {
    fn default() -> Self {
        Self {
            role: "Master".to_string(),
            gtid: true,
            backup: false,
        }
    }
}

/// One backend target, decoded from a `server` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    /// Unique within its backend section, compared case-insensitively
    pub name: String,
    pub host: String,
    /// Absent when the address token carries no `:port` suffix
    pub port: Option<u16>,
    /// Health checking enabled (`check`)
    pub check: bool,
    /// Administratively disabled (`disabled`)
    pub disabled: bool,
    pub extras: ServerExtras,
}

impl ServerRecord {
    pub fn kind(&self) -> PoolKind {
        match self.extras {
            ServerExtras::Web(_) => PoolKind::Web,
            ServerExtras::Db(_) => PoolKind::Db,
        }
    }

    /// Case-insensitive name comparison, the uniqueness key within a section.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Split a line at the first `#` into command part and comment part, both
/// trimmed. The comment is metadata, never config syntax.
fn split_comment(line: &str) -> (&str, &str) {
    match line.find('#') {
        Some(pos) => (line[..pos].trim(), line[pos + 1..].trim()),
        None => (line.trim(), ""),
    }
}

/// Parse `key=value` pairs out of a comment, lowercasing keys.
fn parse_meta(comment: &str) -> HashMap<String, String> {
    comment
        .split_whitespace()
        .filter_map(|chunk| {
            chunk
                .split_once('=')
                .map(|(key, value)| (key.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

fn has_flag(tokens: &[&str], flag: &str) -> bool {
    tokens.iter().any(|token| token.eq_ignore_ascii_case(flag))
}

/// Value of the token immediately following `key`, if any.
fn token_value(tokens: &[&str], key: &str) -> Option<String> {
    tokens
        .windows(2)
        .find(|pair| pair[0].eq_ignore_ascii_case(key))
        .map(|pair| pair[1].to_string())
}

/// Split `host[:port]` at the last colon. A present but non-numeric or
/// zero port makes the whole address malformed.
fn split_address(address: &str) -> Option<(String, Option<u16>)> {
    match address.rfind(':') {
        Some(pos) => {
            let port = address[pos + 1..].parse::<u16>().ok().filter(|p| *p > 0)?;
            Some((address[..pos].to_string(), Some(port)))
        }
        None => Some((address.to_string(), None)),
    }
}

/// Decode one configuration line into a server record.
///
/// Returns `None` for anything that is not a well-formed `server`
/// declaration: a record is skipped, never fabricated.
pub fn decode(line: &str, kind: PoolKind) -> Option<ServerRecord> {
    let (command, comment) = split_comment(line);
    if command.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = command.split_whitespace().collect();
    if tokens.len() < 3 || !tokens[0].eq_ignore_ascii_case("server") {
        return None;
    }

    let (host, port) = split_address(tokens[2])?;
    let rest = &tokens[3..];

    let extras = match kind {
        PoolKind::Web => ServerExtras::Web(WebExtras {
            cookie: token_value(rest, "cookie"),
        }),
        PoolKind::Db => {
            let meta = parse_meta(comment);
            ServerExtras::Db(DbExtras {
                role: meta
                    .get("role")
                    .cloned()
                    .unwrap_or_else(|| "Master".to_string()),
                gtid: meta
                    .get("gtid")
                    .map(|value| !value.eq_ignore_ascii_case("off"))
                    .unwrap_or(true),
                backup: has_flag(rest, "backup"),
            })
        }
    };

    Some(ServerRecord {
        name: tokens[1].to_string(),
        host,
        port,
        check: has_flag(rest, "check"),
        disabled: has_flag(rest, "disabled"),
        extras,
    })
}

/// Serialize a record back into canonical line text (without indentation).
pub fn encode(record: &ServerRecord) -> String {
    let address = match record.port {
        Some(port) => format!("{}:{}", record.host, port),
        None => record.host.clone(),
    };

    let mut parts = vec!["server".to_string(), record.name.clone(), address];

    if let ServerExtras::Web(web) = &record.extras {
        if let Some(cookie) = web.cookie.as_deref().filter(|c| !c.is_empty()) {
            parts.push("cookie".to_string());
            parts.push(cookie.to_string());
        }
    }
    if record.check {
        parts.push("check".to_string());
    }
    if let ServerExtras::Db(db) = &record.extras {
        if db.backup {
            parts.push("backup".to_string());
        }
    }
    if record.disabled {
        parts.push("disabled".to_string());
    }

    let mut line = parts.join(" ");
    if let ServerExtras::Db(db) = &record.extras {
        line.push_str(&format!(
            " # role={} gtid={}",
            db.role,
            if db.gtid { "on" } else { "off" }
        ));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_web_server() {
        let record = decode("    server web1 10.0.0.1:80 cookie S1 check", PoolKind::Web).unwrap();

        assert_eq!(record.name, "web1");
        assert_eq!(record.host, "10.0.0.1");
        assert_eq!(record.port, Some(80));
        assert!(record.check);
        assert!(!record.disabled);
        assert_eq!(
            record.extras,
            ServerExtras::Web(WebExtras {
                cookie: Some("S1".to_string())
            })
        );
    }

    #[test]
    fn test_decode_db_server_with_metadata() {
        let record = decode(
            "    server mysql2 10.0.1.2:3306 check backup # role=Master-Master gtid=off",
            PoolKind::Db,
        )
        .unwrap();

        assert_eq!(record.name, "mysql2");
        assert_eq!(record.port, Some(3306));
        assert!(record.check);
        assert_eq!(
            record.extras,
            ServerExtras::Db(DbExtras {
                role: "Master-Master".to_string(),
                gtid: false,
                backup: true,
            })
        );
    }

    #[test]
    fn test_decode_db_metadata_defaults() {
        let record = decode("server mysql1 10.0.1.1:3306 check", PoolKind::Db).unwrap();
        let ServerExtras::Db(db) = record.extras else {
            panic!("expected db extras");
        };

        assert_eq!(db.role, "Master");
        assert!(db.gtid);
        assert!(!db.backup);
    }

    #[test]
    fn test_decode_rejects_malformed_lines() {
        assert!(decode("server", PoolKind::Web).is_none());
        assert!(decode("server lonely", PoolKind::Web).is_none());
        assert!(decode("balance roundrobin", PoolKind::Web).is_none());
        assert!(decode("   # just a comment", PoolKind::Web).is_none());
        assert!(decode("", PoolKind::Web).is_none());
    }

    #[test]
    fn test_decode_rejects_bad_port() {
        assert!(decode("server web1 10.0.0.1:http", PoolKind::Web).is_none());
        assert!(decode("server web1 10.0.0.1:0", PoolKind::Web).is_none());
    }

    #[test]
    fn test_decode_portless_address() {
        let record = decode("server web1 web-host check", PoolKind::Web).unwrap();
        assert_eq!(record.host, "web-host");
        assert_eq!(record.port, None);
        assert_eq!(encode(&record), "server web1 web-host check");
    }

    #[test]
    fn test_encode_create_scenario() {
        let record = ServerRecord {
            name: "web3".to_string(),
            host: "172.18.0.10".to_string(),
            port: Some(80),
            check: true,
            disabled: false,
            extras: ServerExtras::Web(WebExtras {
                cookie: Some("S3".to_string()),
            }),
        };

        assert_eq!(encode(&record), "server web3 172.18.0.10:80 cookie S3 check");
    }

    #[test]
    fn test_encode_db_server() {
        let record = ServerRecord {
            name: "mysql3".to_string(),
            host: "172.18.0.12".to_string(),
            port: Some(3306),
            check: true,
            disabled: true,
            extras: ServerExtras::Db(DbExtras {
                role: "Master-Master".to_string(),
                gtid: true,
                backup: true,
            }),
        };

        assert_eq!(
            encode(&record),
            "server mysql3 172.18.0.12:3306 check backup disabled # role=Master-Master gtid=on"
        );
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let lines = [
            ("server web1 10.0.0.1:80 cookie S1 check", PoolKind::Web),
            ("server web2 10.0.0.2:80 disabled", PoolKind::Web),
            (
                "server mysql1 10.0.1.1:3306 check backup # role=Master gtid=off",
                PoolKind::Db,
            ),
        ];

        for (line, kind) in lines {
            let record = decode(line, kind).unwrap();
            let encoded = encode(&record);
            assert_eq!(decode(&encoded, kind).unwrap(), record, "line: {line}");
        }
    }

    #[test]
    fn test_flags_are_case_insensitive() {
        let record = decode("SERVER web1 10.0.0.1:80 CHECK DISABLED", PoolKind::Web).unwrap();
        assert!(record.check);
        assert!(record.disabled);
    }
}
