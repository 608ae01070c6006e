//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod sequence_store;
mod sequencing_command;
mod sequencing_query;

#[cfg(test)]
pub use sequence_store::MockSequenceTransaction;
pub use sequence_store::{
    SequenceStore, SequenceStoreError, SequenceTransaction, TransactionFuture,
};
#[cfg(test)]
pub use sequencing_command::MockSequencingCommand;
pub use sequencing_command::{
    AppendItemRequest, MoveItemRequest, SequencingCommand, TransferItemRequest,
};
#[cfg(test)]
pub use sequencing_query::MockSequencingQuery;
pub use sequencing_query::SequencingQuery;
