/// Runtime control of a live HAProxy instance
///
/// Administrative commands are mirrored to the running balancer through an
/// ordered chain of transports: the HTTP control API is tried first, the
/// raw admin socket second. Each transport implements one capability —
/// dispatch a command, report success — and the chain stops at the first
/// transport that succeeds. Runtime effects are external and are never
/// rolled back if the paired config-file edit fails (or vice versa).
pub mod api;
pub mod socket;
pub mod stats;

use std::fmt;

use async_trait::async_trait;

pub use api::ApiTransport;
pub use socket::SocketTransport;
pub use stats::RuntimeStat;

/// Commands understood by the HAProxy runtime, rendered into the
/// newline-terminated text protocol on dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    ShowStat,
    ShowServersState { backend: String },
    EnableServer { backend: String, server: String },
    DisableServer { backend: String, server: String },
}

impl RuntimeCommand {
    pub fn enable(backend: &str, server: &str) -> Self {
        RuntimeCommand::EnableServer {
            backend: backend.to_string(),
            server: server.to_string(),
        }
    }

    pub fn disable(backend: &str, server: &str) -> Self {
        RuntimeCommand::DisableServer {
            backend: backend.to_string(),
            server: server.to_string(),
        }
    }
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeCommand::ShowStat => write!(f, "show stat"),
            RuntimeCommand::ShowServersState { backend } => {
                write!(f, "show servers state {backend}")
            }
            RuntimeCommand::EnableServer { backend, server } => {
                write!(f, "enable server {backend}/{server}")
            }
            RuntimeCommand::DisableServer { backend, server } => {
                write!(f, "disable server {backend}/{server}")
            }
        }
    }
}

/// One way of delivering a runtime command to the live instance.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver the command; true means this transport considers it applied.
    async fn dispatch(&self, command: &str) -> bool;
}

/// Ordered transport chain with graceful degradation.
pub struct Dispatcher {
    transports: Vec<Box<dyn Transport>>,
}

impl Dispatcher {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// Build the standard chain for one pool: HTTP API first when
    /// configured, then the pool's admin socket.
    pub fn for_pool(pool: &crate::config::PoolTarget, api: Option<&crate::config::ApiConfig>) -> Self {
        let mut transports: Vec<Box<dyn Transport>> = Vec::new();
        if let Some(api) = api {
            transports.push(Box::new(ApiTransport::new(api)));
        }
        transports.push(Box::new(SocketTransport::new(&pool.runtime_endpoint)));
        Self { transports }
    }

    /// Try each transport in order; true iff one of them succeeded.
    pub async fn dispatch(&self, command: &RuntimeCommand) -> bool {
        let rendered = command.to_string();
        for transport in &self.transports {
            if transport.dispatch(&rendered).await {
                log::debug!("runtime command '{rendered}' applied via {}", transport.name());
                return true;
            }
            log::debug!("transport {} failed for '{rendered}', trying next", transport.name());
        }
        log::warn!("all runtime transports failed for '{rendered}'");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubTransport {
        ok: bool,
        label: &'static str,
    }

    #[async_trait]
    impl Transport for StubTransport {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn dispatch(&self, _command: &str) -> bool {
            self.ok
        }
    }

    #[test]
    fn test_command_rendering() {
        assert_eq!(RuntimeCommand::ShowStat.to_string(), "show stat");
        assert_eq!(
            RuntimeCommand::ShowServersState {
                backend: "web_back".to_string()
            }
            .to_string(),
            "show servers state web_back"
        );
        assert_eq!(
            RuntimeCommand::disable("web_back", "web1").to_string(),
            "disable server web_back/web1"
        );
        assert_eq!(
            RuntimeCommand::enable("mysql_back", "mysql2").to_string(),
            "enable server mysql_back/mysql2"
        );
    }

    #[tokio::test]
    async fn test_dispatch_falls_back_in_order() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(StubTransport {
                ok: false,
                label: "api",
            }),
            Box::new(StubTransport {
                ok: true,
                label: "socket",
            }),
        ]);

        assert!(
            dispatcher
                .dispatch(&RuntimeCommand::enable("web_back", "web1"))
                .await
        );
    }

    #[tokio::test]
    async fn test_dispatch_fails_when_all_transports_fail() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(StubTransport {
                ok: false,
                label: "api",
            }),
            Box::new(StubTransport {
                ok: false,
                label: "socket",
            }),
        ]);

        assert!(
            !dispatcher
                .dispatch(&RuntimeCommand::disable("web_back", "web1"))
                .await
        );
    }

    #[tokio::test]
    async fn test_dispatch_with_no_transports() {
        let dispatcher = Dispatcher::new(Vec::new());
        assert!(!dispatcher.dispatch(&RuntimeCommand::ShowStat).await);
    }
}
