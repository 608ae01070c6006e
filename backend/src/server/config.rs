//! HTTP server configuration object.

use std::net::SocketAddr;
use std::time::Duration;

use lms_backend::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) lock_timeout: Duration,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    /// Serve on `bind_addr`, bounding scope-lock waits by `lock_timeout`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, lock_timeout: Duration) -> Self {
        Self {
            bind_addr,
            lock_timeout,
            db_pool: None,
        }
    }

    /// Persist orderings in PostgreSQL instead of process memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
