/// Portero - backend pool administration for HAProxy
///
/// Portero edits a balancer's configuration file in place (server lines
/// inside named backend sections) and opportunistically mirrors each
/// change to the running instance through its runtime API or admin
/// socket, so the static config and the live state converge without a
/// full restart.
pub mod admin;
pub mod config;
pub mod error;
pub mod haproxy;
pub mod reload;
pub mod runtime;
pub mod store;

pub use admin::{Notice, NoticeLevel, Outcome, PoolAdmin, ServerSpec, ServerView};
pub use error::{PorteroError, PorteroResult};
pub use haproxy::{PoolKind, ServerRecord, SessionMode};
