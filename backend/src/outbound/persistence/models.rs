//! Internal Diesel row structs for the `sequence_entries` table.
//!
//! These types never leave the persistence layer; conversion into domain
//! types re-validates every column.

use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::sequencing::{
    ScopeKey, ScopeShape, Sequence, SequenceList, SequencedItem,
};

use super::schema::sequence_entries;

/// Row struct for reading ordering records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sequence_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SequenceEntryRow {
    pub list_kind: String,
    pub item_id: Uuid,
    pub scope_id: Uuid,
    pub sequence: i32,
    pub active: bool,
}

/// Insertable struct for new ordering records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sequence_entries)]
pub(crate) struct NewSequenceEntryRow<'a> {
    pub list_kind: &'a str,
    pub item_id: Uuid,
    pub scope_id: Uuid,
    pub sequence: i32,
    pub active: bool,
}

impl<'a> From<&'a SequencedItem> for NewSequenceEntryRow<'a> {
    fn from(item: &'a SequencedItem) -> Self {
        Self {
            list_kind: item.scope.list().as_str(),
            item_id: item.id,
            scope_id: scope_column(&item.scope),
            sequence: item.sequence.get(),
            active: item.active,
        }
    }
}

/// Value stored in `scope_id` for `scope`.
pub(crate) fn scope_column(scope: &ScopeKey) -> Uuid {
    scope.parent().unwrap_or_else(Uuid::nil)
}

impl TryFrom<SequenceEntryRow> for SequencedItem {
    type Error = String;

    fn try_from(row: SequenceEntryRow) -> Result<Self, Self::Error> {
        let list: SequenceList = row.list_kind.parse::<SequenceList>().map_err(|err| err.to_string())?;
        let parent = match list.shape() {
            ScopeShape::Parented(_) => Some(row.scope_id),
            ScopeShape::Global => None,
        };
        let scope = ScopeKey::new(list, parent).map_err(|err| err.to_string())?;
        let sequence = Sequence::from_stored(row.sequence).map_err(|err| err.to_string())?;
        Ok(Self {
            id: row.item_id,
            scope,
            sequence,
            active: row.active,
        })
    }
}
