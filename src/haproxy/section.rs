/// Section scanning over the raw HAProxy configuration lines
///
/// HAProxy config files are line-oriented: `frontend`, `backend`, `listen`,
/// `global` and `defaults` open top-level sections; everything until the
/// next section keyword (or end of file) belongs to the current one. The
/// scanner locates the line range of one named backend section without
/// interpreting anything else in the file.
use std::ops::Range;

/// Keywords that open a top-level section and therefore close the previous one.
const SECTION_KEYWORDS: &[&str] = &["frontend", "backend", "listen", "global", "defaults"];

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Whether the line (after stripping leading whitespace) opens any
/// top-level section. Keywords are case-insensitive.
pub fn is_section_boundary(line: &str) -> bool {
    match first_token(line) {
        Some(token) => SECTION_KEYWORDS
            .iter()
            .any(|kw| token.eq_ignore_ascii_case(kw)),
        None => false,
    }
}

/// Whether the line opens the backend section with the given name, matched
/// as a whole token, case-insensitively.
pub fn opens_backend(line: &str, backend: &str) -> bool {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(kw), Some(name)) => {
            kw.eq_ignore_ascii_case("backend") && name.eq_ignore_ascii_case(backend)
        }
        _ => false,
    }
}

/// Whether the line is a `server` declaration.
pub fn is_server_line(line: &str) -> bool {
    matches!(first_token(line), Some(token) if token.eq_ignore_ascii_case("server"))
}

/// Locate the line range `[header, end)` of the named backend section.
///
/// The range includes the opening `backend <name>` line; the body runs from
/// `start + 1` to `end`. Only the first matching opener is honored. Returns
/// `None` when the section does not exist.
pub fn find_section(lines: &[String], backend: &str) -> Option<Range<usize>> {
    let start = lines.iter().position(|line| opens_backend(line, backend))?;

    let end = lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, line)| is_section_boundary(line))
        .map(|(index, _)| index)
        .unwrap_or(lines.len());

    Some(start..end)
}

/// Collect every raw `server` line inside the named backend section, in
/// file order. Blank lines and non-server directives are ignored. Returns
/// an empty vector when the section is absent.
pub fn collect_server_lines(lines: &[String], backend: &str) -> Vec<String> {
    let Some(range) = find_section(lines, backend) else {
        return Vec::new();
    };

    lines[range.start + 1..range.end]
        .iter()
        .filter(|line| is_server_line(line))
        .map(|line| line.trim_end().to_string())
        .collect()
}
