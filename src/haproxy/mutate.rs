/// Backend section mutation
///
/// All four operations work on an already-loaded [`LineStore`] and touch
/// only the matched server line (plus the insertion point): every byte
/// outside the edited lines is preserved. Callers run the full
/// load-modify-save cycle and perform duplicate-name validation before
/// inserting or renaming.
use crate::error::{PorteroError, PorteroResult};
use crate::haproxy::section::{collect_server_lines, find_section, is_server_line};
use crate::haproxy::server::{decode, encode, PoolKind, ServerRecord};
use crate::store::LineStore;

/// Indentation applied to newly inserted server lines.
const INDENT: &str = "    ";

/// Decode every well-formed server record inside the backend section, in
/// file order. Malformed lines are skipped, never surfaced.
pub fn parse_servers(lines: &[String], backend: &str, kind: PoolKind) -> Vec<ServerRecord> {
    collect_server_lines(lines, backend)
        .iter()
        .filter_map(|line| decode(line, kind))
        .collect()
}

/// Find one record by case-insensitive name.
pub fn find_server(
    lines: &[String],
    backend: &str,
    kind: PoolKind,
    name: &str,
) -> Option<ServerRecord> {
    parse_servers(lines, backend, kind)
        .into_iter()
        .find(|record| record.is_named(name))
}

/// Index of the server line whose decoded name matches, within the section.
fn locate_server_line(
    store: &LineStore,
    backend: &str,
    kind: PoolKind,
    name: &str,
) -> PorteroResult<usize> {
    let range = find_section(store.lines(), backend)
        .ok_or_else(|| PorteroError::section_not_found(backend))?;

    for index in range.start + 1..range.end {
        if !is_server_line(&store.lines()[index]) {
            continue;
        }
        if let Some(record) = decode(&store.lines()[index], kind) {
            if record.is_named(name) {
                return Ok(index);
            }
        }
    }

    Err(PorteroError::server_not_found(backend, name))
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

/// Insert a new server record into the backend section.
///
/// The insertion point is immediately after the last existing server line
/// (declaration order doubles as the balancer's implicit priority order),
/// or right after the section header when the section holds none.
pub fn insert_server(
    store: &mut LineStore,
    backend: &str,
    record: &ServerRecord,
) -> PorteroResult<()> {
    let range = find_section(store.lines(), backend)
        .ok_or_else(|| PorteroError::section_not_found(backend))?;

    let last_server = (range.start + 1..range.end)
        .filter(|&index| is_server_line(&store.lines()[index]))
        .next_back();

    let insert_at = match last_server {
        Some(index) => index + 1,
        None => range.start + 1,
    };

    store.insert(insert_at, format!("{INDENT}{}", encode(record)));
    Ok(())
}

/// Decode the named server, apply `mutate`, and re-encode the result in
/// place, preserving the original line's indentation. Fields the closure
/// leaves alone (notably `disabled`) carry over unchanged.
pub fn update_server<F>(
    store: &mut LineStore,
    backend: &str,
    kind: PoolKind,
    name: &str,
    mutate: F,
) -> PorteroResult<()>
where
    F: FnOnce(&mut ServerRecord),
{
    let index = locate_server_line(store, backend, kind, name)?;
    let raw = &store.lines()[index];
    let indent = leading_whitespace(raw);

    // locate_server_line only returns indices that decode cleanly
    let mut record = decode(raw, kind)
        .ok_or_else(|| PorteroError::server_not_found(backend, name))?;
    mutate(&mut record);

    store.replace(index, format!("{indent}{}", encode(&record)));
    Ok(())
}

/// Splice the named server line out of the section entirely.
pub fn remove_server(
    store: &mut LineStore,
    backend: &str,
    kind: PoolKind,
    name: &str,
) -> PorteroResult<()> {
    let index = locate_server_line(store, backend, kind, name)?;
    store.remove(index);
    Ok(())
}

/// Flip only the `disabled` flag, leaving every other field untouched.
pub fn set_disabled(
    store: &mut LineStore,
    backend: &str,
    kind: PoolKind,
    name: &str,
    disable: bool,
) -> PorteroResult<()> {
    update_server(store, backend, kind, name, |record| {
        record.disabled = disable;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haproxy::server::{ServerExtras, WebExtras};

    fn fixture() -> LineStore {
        LineStore::new(
            [
                "backend web_back",
                "    balance roundrobin",
                "    server web1 10.0.0.1:80 cookie S1 check",
                "    server web2 10.0.0.2:80 cookie S2 check",
                "backend mysql_back",
                "    server mysql1 10.0.1.1:3306 check # role=Master gtid=on",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    fn web_record(name: &str, host: &str, port: u16) -> ServerRecord {
        ServerRecord {
            name: name.to_string(),
            host: host.to_string(),
            port: Some(port),
            check: true,
            disabled: false,
            extras: ServerExtras::Web(WebExtras {
                cookie: Some("S3".to_string()),
            }),
        }
    }

    #[test]
    fn test_insert_appends_after_last_server() {
        let mut store = fixture();
        insert_server(&mut store, "web_back", &web_record("web3", "172.18.0.10", 80)).unwrap();

        assert_eq!(
            store.lines()[4],
            "    server web3 172.18.0.10:80 cookie S3 check"
        );
        // mysql_back untouched, one line further down
        assert_eq!(store.lines()[5], "backend mysql_back");
    }

    #[test]
    fn test_insert_into_empty_section() {
        let mut store = LineStore::new(
            ["backend web_back", "    balance roundrobin", "backend mysql_back"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        insert_server(&mut store, "web_back", &web_record("web1", "10.0.0.1", 80)).unwrap();

        assert_eq!(store.lines()[1], "    server web1 10.0.0.1:80 cookie S3 check");
    }

    #[test]
    fn test_insert_missing_section() {
        let mut store = fixture();
        let result = insert_server(&mut store, "missing_back", &web_record("x", "1.2.3.4", 80));
        assert!(matches!(result, Err(PorteroError::SectionNotFound { .. })));
        assert_eq!(store, fixture());
    }

    #[test]
    fn test_update_preserves_indent_and_disabled() {
        let mut store = LineStore::new(
            [
                "backend web_back",
                "\t\tserver web1 10.0.0.1:80 check disabled",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        update_server(&mut store, "web_back", PoolKind::Web, "WEB1", |record| {
            record.host = "10.0.0.9".to_string();
        })
        .unwrap();

        assert_eq!(store.lines()[1], "\t\tserver web1 10.0.0.9:80 check disabled");
    }

    #[test]
    fn test_update_missing_server() {
        let mut store = fixture();
        let result = update_server(&mut store, "web_back", PoolKind::Web, "web9", |_| {});
        assert!(matches!(result, Err(PorteroError::ServerNotFound { .. })));
    }

    #[test]
    fn test_remove_leaves_other_lines_untouched() {
        let mut store = fixture();
        remove_server(&mut store, "web_back", PoolKind::Web, "web1").unwrap();

        assert_eq!(
            store.lines(),
            &[
                "backend web_back",
                "    balance roundrobin",
                "    server web2 10.0.0.2:80 cookie S2 check",
                "backend mysql_back",
                "    server mysql1 10.0.1.1:3306 check # role=Master gtid=on",
            ]
        );
    }

    #[test]
    fn test_toggle_scenario() {
        let mut store = LineStore::new(
            ["backend web_back", "    server web1 10.0.0.1:80 check"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        set_disabled(&mut store, "web_back", PoolKind::Web, "web1", true).unwrap();
        assert_eq!(store.lines()[1], "    server web1 10.0.0.1:80 check disabled");

        // idempotent
        set_disabled(&mut store, "web_back", PoolKind::Web, "web1", true).unwrap();
        assert_eq!(store.lines()[1], "    server web1 10.0.0.1:80 check disabled");

        set_disabled(&mut store, "web_back", PoolKind::Web, "web1", false).unwrap();
        assert_eq!(store.lines()[1], "    server web1 10.0.0.1:80 check");
    }

    #[test]
    fn test_section_isolation() {
        // web_back and mysql_back share a server name; only the web copy moves.
        let mut store = LineStore::new(
            [
                "backend web_back",
                "    server shared 10.0.0.1:80 check",
                "backend mysql_back",
                "    server shared 10.0.1.1:3306 check",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        set_disabled(&mut store, "web_back", PoolKind::Web, "shared", true).unwrap();
        assert_eq!(store.lines()[3], "    server shared 10.0.1.1:3306 check");
    }

    #[test]
    fn test_parse_servers_skips_malformed() {
        let lines: Vec<String> = [
            "backend web_back",
            "    server",
            "    server web1 10.0.0.1:80 check",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let records = parse_servers(&lines, "web_back", PoolKind::Web);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "web1");
    }

    #[test]
    fn test_find_server_case_insensitive() {
        let store = fixture();
        let record = find_server(store.lines(), "web_back", PoolKind::Web, "WEB2").unwrap();
        assert_eq!(record.host, "10.0.0.2");
    }
}
