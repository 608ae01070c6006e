//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend only
//! on the sequencing ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{SequencingCommand, SequencingQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub sequencing: Arc<dyn SequencingCommand>,
    pub sequencing_query: Arc<dyn SequencingQuery>,
}

impl HttpState {
    /// Construct state from the command and query ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use lms_backend::domain::sequencing::Sequencer;
    /// use lms_backend::inbound::http::state::HttpState;
    /// use lms_backend::outbound::memory::InMemorySequenceStore;
    ///
    /// let sequencer = Sequencer::new(Arc::new(InMemorySequenceStore::default()));
    /// let state = HttpState::new(Arc::new(sequencer.clone()), Arc::new(sequencer));
    /// let _query = state.sequencing_query.clone();
    /// ```
    pub fn new(
        sequencing: Arc<dyn SequencingCommand>,
        sequencing_query: Arc<dyn SequencingQuery>,
    ) -> Self {
        Self {
            sequencing,
            sequencing_query,
        }
    }
}
