/// Live statistics from `show stat`
///
/// The runtime answers `show stat` with one `#`-prefixed header line
/// naming the CSV columns, then one comma-separated row per monitored
/// object. Rows are matched to the target backend by the `pxname` column;
/// the backend's own aggregate row (`svname` = `BACKEND`) is excluded and
/// rows with the wrong column count are skipped silently. Stats are
/// ephemeral: fetched fresh for every decorate call, never written back.
use std::collections::HashMap;

use crate::runtime::socket::SocketTransport;
use crate::runtime::RuntimeCommand;

/// Runtime counters for one server, keyed by server name in the result map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStat {
    /// Operational status (UP, DOWN, MAINT, ...)
    pub status: String,
    /// Latest health-check status code or description
    pub check_status: String,
    /// Human-readable latest check detail
    pub last_check: String,
    /// Seconds since the last state change
    pub last_change_sec: Option<u64>,
}

fn split_csv(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn field(row: &HashMap<&str, &str>, key: &str) -> String {
    row.get(key).map(|v| v.to_string()).unwrap_or_default()
}

/// Parse a `show stat` response into per-server stats for one backend.
pub fn parse_stats(lines: &[String], backend: &str) -> HashMap<String, RuntimeStat> {
    let mut header: Option<Vec<&str>> = None;
    let mut stats = HashMap::new();

    for line in lines {
        if line.is_empty() || line == "#" {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            header = Some(split_csv(rest.trim_start()));
            continue;
        }
        let Some(columns) = &header else {
            continue;
        };

        let values = split_csv(line);
        if values.len() != columns.len() {
            continue;
        }
        let row: HashMap<&str, &str> = columns.iter().copied().zip(values).collect();

        if row.get("pxname").copied() != Some(backend) {
            continue;
        }
        let server = field(&row, "svname");
        if server.is_empty() || server.eq_ignore_ascii_case("BACKEND") {
            continue;
        }

        let check_status = match field(&row, "check_status") {
            status if !status.is_empty() => status,
            _ => field(&row, "check_code"),
        };

        stats.insert(
            server,
            RuntimeStat {
                status: field(&row, "status"),
                check_status,
                last_check: field(&row, "last_chk"),
                last_change_sec: row.get("lastchg").and_then(|v| v.parse().ok()),
            },
        );
    }

    stats
}

/// Query the admin socket and parse the response for one backend. An
/// unreachable runtime yields an empty map, never an error.
pub async fn fetch_backend_stats(
    socket: &SocketTransport,
    backend: &str,
) -> HashMap<String, RuntimeStat> {
    match socket
        .command_lines(&RuntimeCommand::ShowStat.to_string())
        .await
    {
        Some(lines) => parse_stats(&lines, backend),
        None => HashMap::new(),
    }
}
