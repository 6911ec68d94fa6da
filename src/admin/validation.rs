/// Input validation for pool-administration payloads
use std::net::IpAddr;

/// Server names, cookie tokens: letters, digits, `.`, `_`, `-`.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Hostnames follow the identifier charset; IP literals are also accepted.
pub fn is_valid_host(value: &str) -> bool {
    is_valid_identifier(value) || value.parse::<IpAddr>().is_ok()
}

/// Ports are 1-65535; the type already caps the upper bound.
pub fn is_valid_port(port: u16) -> bool {
    port > 0
}
