//! Builders wiring the sequencing service into HTTP state.

use std::sync::Arc;

use actix_web::web;
use tracing::warn;

use lms_backend::domain::ports::SequenceStore;
use lms_backend::domain::sequencing::Sequencer;
use lms_backend::inbound::http::state::HttpState;
use lms_backend::outbound::memory::InMemorySequenceStore;
use lms_backend::outbound::persistence::DieselSequenceStore;

use super::ServerConfig;

fn state_over<S: SequenceStore + 'static>(store: S) -> HttpState {
    let sequencer = Sequencer::new(Arc::new(store));
    HttpState::new(Arc::new(sequencer.clone()), Arc::new(sequencer))
}

/// Build HTTP state over PostgreSQL when a pool is configured, otherwise
/// over the in-memory store.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let state = match &config.db_pool {
        Some(pool) => state_over(
            DieselSequenceStore::new(pool.clone()).with_lock_timeout(config.lock_timeout),
        ),
        None => {
            warn!("no database configured; orderings are kept in memory and lost on restart");
            state_over(InMemorySequenceStore::default().with_lock_timeout(config.lock_timeout))
        }
    };
    web::Data::new(state)
}
