/// Session stickiness mode for the web pool
///
/// The web backend either pins clients with an HAProxy-inserted `SRV`
/// cookie or leaves session persistence to the database tier. The mode is
/// encoded directly in the config file as the presence or absence of one
/// `cookie SRV insert indirect nocache` line inside the backend section.
use crate::error::{PorteroError, PorteroResult};
use crate::haproxy::section::find_section;
use crate::store::LineStore;

/// Canonical sticky-cookie directive inserted for HAProxy mode.
const STICKY_DIRECTIVE: &str = "    cookie SRV insert indirect nocache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// HAProxy pins clients to a server with the SRV sticky cookie
    Haproxy,
    /// Sessions are shared through the database, no stickiness
    Database,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Haproxy => "haproxy",
            SessionMode::Database => "database",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "haproxy" => Some(SessionMode::Haproxy),
            "database" => Some(SessionMode::Database),
            _ => None,
        }
    }
}

fn is_sticky_cookie_line(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    matches!(
        (tokens.next(), tokens.next()),
        (Some(kw), Some(name)) if kw.eq_ignore_ascii_case("cookie") && name.eq_ignore_ascii_case("SRV")
    )
}

fn is_option_line(line: &str) -> bool {
    matches!(
        line.split_whitespace().next(),
        Some(token) if token.eq_ignore_ascii_case("option")
    )
}

/// Report the current mode of the named backend section. An absent section
/// defaults to HAProxy mode, matching the balancer's shipped config.
pub fn session_mode(lines: &[String], backend: &str) -> SessionMode {
    let Some(range) = find_section(lines, backend) else {
        return SessionMode::Haproxy;
    };

    if lines[range.start + 1..range.end]
        .iter()
        .any(|line| is_sticky_cookie_line(line))
    {
        SessionMode::Haproxy
    } else {
        SessionMode::Database
    }
}

/// Rewrite the backend section to the requested mode: any existing sticky
/// directive is dropped, and for HAProxy mode the canonical directive is
/// inserted after the section's first `option` line (or at section end when
/// there is none).
pub fn set_session_mode(
    store: &mut LineStore,
    backend: &str,
    mode: SessionMode,
) -> PorteroResult<()> {
    let range = find_section(store.lines(), backend)
        .ok_or_else(|| PorteroError::section_not_found(backend))?;
    let mut end = range.end;

    let mut index = range.start + 1;
    while index < end {
        if is_sticky_cookie_line(&store.lines()[index]) {
            store.remove(index);
            end -= 1;
        } else {
            index += 1;
        }
    }

    if mode == SessionMode::Haproxy {
        let insert_at = (range.start + 1..end)
            .find(|&i| is_option_line(&store.lines()[i]))
            .map(|i| i + 1)
            .unwrap_or(end);
        store.insert(insert_at, STICKY_DIRECTIVE.to_string());
    }

    Ok(())
}
