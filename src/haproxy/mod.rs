/// HAProxy configuration file model: section scanning, the server-line
/// codec, backend mutation, and the web pool's session-mode directive.
pub mod mutate;
pub mod section;
pub mod server;
pub mod session;

pub use server::{DbExtras, PoolKind, ServerExtras, ServerRecord, WebExtras};
pub use session::SessionMode;
