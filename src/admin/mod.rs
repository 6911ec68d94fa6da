/// Pool administration operations
///
/// This is the surface the surrounding application (dashboard forms, the
/// CLI) calls. Each operation runs one read-modify-write cycle against the
/// pool's config file, then mirrors the change to the live instance and
/// signals the supervisor — and reports all of it through an explicit
/// [`Outcome`] instead of ambient state. The asymmetry is deliberate: hard
/// failures (validation, lookup misses, I/O) abort before any file write;
/// runtime and reload failures after a committed write only downgrade to
/// warnings, because a half-written config file is worse than config/
/// runtime drift that the next reload reconciles.
pub mod validation;

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::config::{ApiConfig, PoolTarget};
use crate::error::{PorteroError, PorteroResult};
use crate::haproxy::mutate;
use crate::haproxy::server::{DbExtras, PoolKind, ServerExtras, ServerRecord, WebExtras};
use crate::haproxy::session::{self, SessionMode};
use crate::reload::signal_reload;
use crate::runtime::stats::{fetch_backend_stats, RuntimeStat};
use crate::runtime::{Dispatcher, RuntimeCommand, SocketTransport};
use crate::store::LineStore;
use self::validation::{is_valid_host, is_valid_identifier, is_valid_port};

/// Replication role written for every managed database server; the cluster
/// runs master-master replication.
const DB_ROLE: &str = "Master-Master";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// One user-facing message produced by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success<S: Into<String>>(text: S) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning<S: Into<String>>(text: S) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}

/// Result of one administration operation.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Whether the config file was rewritten
    pub changed: bool,
    pub notices: Vec<Notice>,
}

/// Payload for creating or updating a server, per pool flavor.
#[derive(Debug, Clone)]
pub enum ServerSpec {
    Web {
        name: String,
        host: String,
        port: u16,
        cookie: Option<String>,
        check: bool,
    },
    Db {
        name: String,
        host: String,
        port: u16,
        gtid: bool,
    },
}

impl ServerSpec {
    pub fn name(&self) -> &str {
        match self {
            ServerSpec::Web { name, .. } | ServerSpec::Db { name, .. } => name,
        }
    }

    fn host(&self) -> &str {
        match self {
            ServerSpec::Web { host, .. } | ServerSpec::Db { host, .. } => host,
        }
    }

    fn port(&self) -> u16 {
        match self {
            ServerSpec::Web { port, .. } | ServerSpec::Db { port, .. } => *port,
        }
    }

    pub fn kind(&self) -> PoolKind {
        match self {
            ServerSpec::Web { .. } => PoolKind::Web,
            ServerSpec::Db { .. } => PoolKind::Db,
        }
    }

    fn validate(&self) -> PorteroResult<()> {
        let mut errors = Vec::new();

        if !is_valid_identifier(self.name()) {
            errors.push("invalid server name (letters, digits, . _ -)");
        }
        if !is_valid_host(self.host()) {
            errors.push("invalid host (name or IP literal)");
        }
        if !is_valid_port(self.port()) {
            errors.push("invalid port (1-65535)");
        }
        if let ServerSpec::Web {
            cookie: Some(cookie),
            ..
        } = self
        {
            if !cookie.is_empty() && !is_valid_identifier(cookie) {
                errors.push("invalid cookie (letters, digits, . _ -)");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PorteroError::validation(errors.join("; ")))
        }
    }

    /// Record for a freshly created server. New database servers join as
    /// backups with health checks on; they are promoted by hand.
    fn into_new_record(self) -> ServerRecord {
        match self {
            ServerSpec::Web {
                name,
                host,
                port,
                cookie,
                check,
            } => ServerRecord {
                name,
                host,
                port: Some(port),
                check,
                disabled: false,
                extras: ServerExtras::Web(WebExtras {
                    cookie: cookie.filter(|c| !c.is_empty()),
                }),
            },
            ServerSpec::Db {
                name,
                host,
                port,
                gtid,
            } => ServerRecord {
                name,
                host,
                port: Some(port),
                check: true,
                disabled: false,
                extras: ServerExtras::Db(DbExtras {
                    role: DB_ROLE.to_string(),
                    gtid,
                    backup: true,
                }),
            },
        }
    }

    /// Apply this spec onto an existing record, preserving the fields the
    /// caller did not intend to change (`disabled`, and `backup` for
    /// database servers).
    fn apply_to(&self, record: &mut ServerRecord) {
        record.name = self.name().to_string();
        record.host = self.host().to_string();
        record.port = Some(self.port());

        match self {
            ServerSpec::Web { cookie, check, .. } => {
                record.check = *check;
                record.extras = ServerExtras::Web(WebExtras {
                    cookie: cookie.clone().filter(|c| !c.is_empty()),
                });
            }
            ServerSpec::Db { gtid, .. } => {
                record.check = true;
                let backup = match &record.extras {
                    ServerExtras::Db(db) => db.backup,
                    ServerExtras::Web(_) => false,
                };
                record.extras = ServerExtras::Db(DbExtras {
                    role: DB_ROLE.to_string(),
                    gtid: *gtid,
                    backup,
                });
            }
        }
    }
}

/// Display row for one server: the static record overlaid with whatever
/// the runtime reported about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerView {
    pub record: ServerRecord,
    pub status: String,
    pub last_check: String,
}

impl ServerView {
    fn from_record(record: ServerRecord) -> Self {
        let status = if record.disabled { "DISABLED" } else { "OK" };
        Self {
            record,
            status: status.to_string(),
            last_check: "-".to_string(),
        }
    }
}

/// Administration handle for one managed pool.
pub struct PoolAdmin {
    target: PoolTarget,
    kind: PoolKind,
    dispatcher: Dispatcher,
    socket: SocketTransport,
}

impl PoolAdmin {
    pub fn new(target: PoolTarget, kind: PoolKind, api: Option<&ApiConfig>) -> Self {
        let dispatcher = Dispatcher::for_pool(&target, api);
        let socket = SocketTransport::new(&target.runtime_endpoint);
        Self {
            target,
            kind,
            dispatcher,
            socket,
        }
    }

    pub fn backend(&self) -> &str {
        &self.target.backend
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    fn config_path(&self) -> PorteroResult<PathBuf> {
        self.target.resolve_config_path().ok_or_else(|| {
            PorteroError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no config file found for backend '{}'", self.target.backend),
            ))
        })
    }

    fn load(&self) -> PorteroResult<(PathBuf, LineStore)> {
        let path = self.config_path()?;
        let store = LineStore::load(&path)?;
        Ok((path, store))
    }

    /// Reject a name already taken by another record in the section.
    /// Updating a record onto its own original name is allowed.
    fn check_duplicate(
        &self,
        store: &LineStore,
        name: &str,
        original: Option<&str>,
    ) -> PorteroResult<()> {
        let taken = mutate::parse_servers(store.lines(), &self.target.backend, self.kind)
            .iter()
            .any(|record| {
                record.is_named(name)
                    && original.map(|o| !record.is_named(o)).unwrap_or(true)
            });

        if taken {
            Err(PorteroError::duplicate_name(name))
        } else {
            Ok(())
        }
    }

    fn reload_notice(&self, notices: &mut Vec<Notice>) {
        if !signal_reload(&self.target.reload_flag) {
            notices.push(Notice::warning(
                "could not signal the supervisor; reload the balancer manually",
            ));
        }
    }

    /// Static view of the section. When the section is absent or holds no
    /// parseable records, the bootstrap defaults are shown instead.
    pub fn list_servers(&self) -> Vec<ServerView> {
        let records = self
            .load()
            .map(|(_, store)| mutate::parse_servers(store.lines(), &self.target.backend, self.kind))
            .unwrap_or_default();

        if records.is_empty() {
            return default_servers(self.kind);
        }
        records.into_iter().map(ServerView::from_record).collect()
    }

    /// Insert a new server into the section, then signal a reload.
    pub async fn add_server(&self, spec: ServerSpec) -> PorteroResult<Outcome> {
        spec.validate()?;
        let (path, mut store) = self.load()?;
        self.check_duplicate(&store, spec.name(), None)?;

        let name = spec.name().to_string();
        let record = spec.into_new_record();
        mutate::insert_server(&mut store, &self.target.backend, &record)?;
        store.save(&path)?;

        let mut notices = vec![Notice::success(format!(
            "server {name} added to backend {}",
            self.target.backend
        ))];
        self.reload_notice(&mut notices);

        Ok(Outcome {
            changed: true,
            notices,
        })
    }

    /// Rewrite an existing server in place, then signal a reload.
    pub async fn update_server(&self, original: &str, spec: ServerSpec) -> PorteroResult<Outcome> {
        if !is_valid_identifier(original) {
            return Err(PorteroError::validation("invalid original server name"));
        }
        spec.validate()?;
        let (path, mut store) = self.load()?;
        self.check_duplicate(&store, spec.name(), Some(original))?;

        mutate::update_server(&mut store, &self.target.backend, self.kind, original, |record| {
            spec.apply_to(record);
        })?;
        store.save(&path)?;

        let mut notices = vec![Notice::success(format!("server {original} updated"))];
        self.reload_notice(&mut notices);

        Ok(Outcome {
            changed: true,
            notices,
        })
    }

    /// Remove the server from the section, signal a reload, and tell the
    /// live instance to stop routing to it.
    pub async fn remove_server(&self, name: &str) -> PorteroResult<Outcome> {
        if !is_valid_identifier(name) {
            return Err(PorteroError::validation("invalid server name"));
        }
        let (path, mut store) = self.load()?;
        mutate::remove_server(&mut store, &self.target.backend, self.kind, name)?;
        store.save(&path)?;

        let mut notices = vec![Notice::success(format!(
            "server {name} removed from backend {}",
            self.target.backend
        ))];
        self.reload_notice(&mut notices);

        // best effort: the reload will drop it anyway
        self.dispatcher
            .dispatch(&RuntimeCommand::disable(&self.target.backend, name))
            .await;

        Ok(Outcome {
            changed: true,
            notices,
        })
    }

    /// Flip the disabled flag in the file, then mirror the state to the
    /// live instance. A transport failure after the committed edit is a
    /// warning, not a rollback.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> PorteroResult<Outcome> {
        if !is_valid_identifier(name) {
            return Err(PorteroError::validation("invalid server name"));
        }
        let (path, mut store) = self.load()?;
        mutate::set_disabled(&mut store, &self.target.backend, self.kind, name, !enabled)?;
        store.save(&path)?;

        let command = if enabled {
            RuntimeCommand::enable(&self.target.backend, name)
        } else {
            RuntimeCommand::disable(&self.target.backend, name)
        };

        let mut notices = Vec::new();
        if self.dispatcher.dispatch(&command).await {
            notices.push(Notice::success(format!(
                "server {name} {}",
                if enabled { "enabled" } else { "disabled" }
            )));
        } else {
            notices.push(Notice::warning(format!(
                "configuration updated but the runtime was unreachable; server {name} stays in its current live state until reload"
            )));
        }
        self.reload_notice(&mut notices);

        Ok(Outcome {
            changed: true,
            notices,
        })
    }

    /// Logical restart through the runtime only: disable then re-enable.
    /// No file edit happens.
    pub async fn restart_server(&self, name: &str) -> PorteroResult<Outcome> {
        if !is_valid_identifier(name) {
            return Err(PorteroError::validation("invalid server name"));
        }

        let disabled = self
            .dispatcher
            .dispatch(&RuntimeCommand::disable(&self.target.backend, name))
            .await;
        let enabled = self
            .dispatcher
            .dispatch(&RuntimeCommand::enable(&self.target.backend, name))
            .await;

        let notice = if disabled && enabled {
            Notice::success(format!("restart requested for {name}"))
        } else {
            Notice::warning(format!("could not restart {name} through the runtime"))
        };

        Ok(Outcome {
            changed: false,
            notices: vec![notice],
        })
    }

    /// Fresh runtime counters for this pool, keyed by server name.
    pub async fn fetch_stats(&self) -> HashMap<String, RuntimeStat> {
        fetch_backend_stats(&self.socket, &self.target.backend).await
    }

    /// Static view decorated with live status and check details.
    pub async fn list_with_stats(&self) -> Vec<ServerView> {
        let stats = self.fetch_stats().await;
        decorate(self.list_servers(), &stats)
    }

    /// Current session mode of this pool's backend section.
    pub fn session_mode(&self) -> SessionMode {
        self.load()
            .map(|(_, store)| session::session_mode(store.lines(), &self.target.backend))
            .unwrap_or(SessionMode::Haproxy)
    }

    /// Switch between sticky-cookie and database session handling.
    pub async fn set_session_mode(&self, mode: SessionMode) -> PorteroResult<Outcome> {
        let (path, mut store) = self.load()?;
        session::set_session_mode(&mut store, &self.target.backend, mode)?;
        store.save(&path)?;

        let mut notices = vec![Notice::success(match mode {
            SessionMode::Haproxy => "session stickiness handled by HAProxy (SRV cookie)",
            SessionMode::Database => "sessions shared through the database, stickiness off",
        })];
        self.reload_notice(&mut notices);

        Ok(Outcome {
            changed: true,
            notices,
        })
    }
}

/// Overlay runtime stats onto the static view. Servers the runtime does
/// not know about keep their static status.
pub fn decorate(views: Vec<ServerView>, stats: &HashMap<String, RuntimeStat>) -> Vec<ServerView> {
    views
        .into_iter()
        .map(|mut view| {
            let Some(stat) = stats.get(&view.record.name) else {
                return view;
            };
            if !stat.status.is_empty() {
                view.status = stat.status.to_uppercase();
            }

            let mut details = Vec::new();
            if !stat.check_status.is_empty() {
                details.push(stat.check_status.clone());
            }
            if !stat.last_check.is_empty() {
                details.push(stat.last_check.clone());
            }
            if let Some(seconds) = stat.last_change_sec.filter(|s| *s > 0) {
                details.push(format!("changed {} ago", format_duration(seconds)));
            }
            if !details.is_empty() {
                view.last_check = details.join(" / ");
            }
            view
        })
        .collect()
}

/// Bootstrap record sets shown when the backend section is absent. Demo
/// data only, never written back to the file.
fn default_servers(kind: PoolKind) -> Vec<ServerView> {
    let records = match kind {
        PoolKind::Web => vec![
            ServerRecord {
                name: "web1".to_string(),
                host: "192.168.1.10".to_string(),
                port: Some(80),
                check: true,
                disabled: false,
                extras: ServerExtras::Web(WebExtras {
                    cookie: Some("S1".to_string()),
                }),
            },
            ServerRecord {
                name: "web2".to_string(),
                host: "192.168.1.11".to_string(),
                port: Some(80),
                check: true,
                disabled: false,
                extras: ServerExtras::Web(WebExtras {
                    cookie: Some("S2".to_string()),
                }),
            },
        ],
        PoolKind::Db => vec![
            ServerRecord {
                name: "mysql1".to_string(),
                host: "192.168.1.10".to_string(),
                port: Some(3306),
                check: true,
                disabled: false,
                extras: ServerExtras::Db(DbExtras {
                    role: DB_ROLE.to_string(),
                    gtid: true,
                    backup: false,
                }),
            },
            ServerRecord {
                name: "mysql2".to_string(),
                host: "192.168.1.11".to_string(),
                port: Some(3306),
                check: true,
                disabled: false,
                extras: ServerExtras::Db(DbExtras {
                    role: DB_ROLE.to_string(),
                    gtid: true,
                    backup: true,
                }),
            },
        ],
    };

    records.into_iter().map(ServerView::from_record).collect()
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m{}s", seconds % 60);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h{}m", minutes % 60);
    }
    format!("{}d{}h", hours / 24, hours % 24)
}
