/// Reload signaling
///
/// The balancer container runs a supervisor loop that watches for sentinel
/// flag files and performs the actual reload/restart. Writing the flag is
/// best effort: a missing directory or denied write is logged and
/// swallowed, never surfaced as a hard error, because the operator can
/// always reload manually.
use std::fs;
use std::path::{Path, PathBuf};

/// Sentinel content the supervisor looks for.
const RELOAD_TOKEN: &str = "reload\n";

const RELOAD_SUFFIX: &str = "reload.flag";
const RESTART_SUFFIX: &str = "restart.flag";

/// Candidate flag paths for one configured flag: the path itself, plus the
/// sibling restart flag derived by suffix substitution.
fn candidate_flags(flag: &Path) -> Vec<PathBuf> {
    let mut targets = vec![flag.to_path_buf()];
    if let Some(text) = flag.to_str() {
        if let Some(prefix) = text.strip_suffix(RELOAD_SUFFIX) {
            targets.push(PathBuf::from(format!("{prefix}{RESTART_SUFFIX}")));
        }
    }
    targets
}

/// Write the reload token to every candidate flag whose directory exists.
/// Returns whether at least one flag was written.
pub fn signal_reload(flag: &Path) -> bool {
    let mut signalled = false;

    for target in candidate_flags(flag) {
        let dir_exists = target.parent().map(Path::is_dir).unwrap_or(false);
        if !dir_exists {
            continue;
        }
        match fs::write(&target, RELOAD_TOKEN) {
            Ok(()) => signalled = true,
            Err(err) => log::debug!("could not write reload flag {}: {err}", target.display()),
        }
    }

    if !signalled {
        log::warn!(
            "could not signal reload via {} (directory missing or not writable)",
            flag.display()
        );
    }
    signalled
}
