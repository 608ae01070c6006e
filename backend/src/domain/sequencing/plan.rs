//! Pure write plans for the sequencing operations.
//!
//! Each operation reads the positioned items of the scopes it touches, then
//! emits an ordered list of [`SequenceWrite`]s. Stores execute the writes one
//! statement at a time inside a transaction and check uniqueness of
//! `(scope, sequence)` after every statement, so the order matters: an item is
//! always moved out of the way (to the sentinel, to another scope, or deleted)
//! before the range it vacates is shifted over it.
//!
//! Keeping plans free of I/O lets the same logic drive the Postgres adapter,
//! the in-memory store, and the unit tests below.

use uuid::Uuid;

use super::{ItemRef, ScopeKey, Sequence, SequencedItem, requested_position};

/// Shift every positioned item of `scope` whose sequence lies in
/// `from..=to` (unbounded above when `to` is `None`) by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeShift {
    /// Scope whose items move.
    pub scope: ScopeKey,
    /// Lowest sequence affected.
    pub from: i32,
    /// Highest sequence affected, inclusive.
    pub to: Option<i32>,
    /// Amount added to each affected sequence; always `+1` or `-1`.
    pub delta: i32,
    /// Item left untouched even if it falls inside the range.
    pub exclude: Option<Uuid>,
}

impl RangeShift {
    /// Whether `item` is affected by this shift.
    #[must_use]
    pub fn matches(&self, item: &SequencedItem) -> bool {
        let value = item.sequence.get();
        item.scope == self.scope
            && item.is_positioned()
            && value >= self.from
            && self.to.is_none_or(|to| value <= to)
            && self.exclude != Some(item.id)
    }
}

/// One statement of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceWrite {
    /// Create a new ordering record.
    Insert(SequencedItem),
    /// Overwrite scope, sequence and activity of an existing item.
    Assign {
        /// Item to update.
        item: ItemRef,
        /// Scope the item ends up in.
        scope: ScopeKey,
        /// Sequence the item ends up at.
        sequence: Sequence,
        /// Activity flag after the write.
        active: bool,
    },
    /// Renumber a contiguous block of items.
    Shift(RangeShift),
    /// Drop the ordering record.
    Delete(ItemRef),
}

impl SequenceWrite {
    /// Apply this write to an in-memory table, returning the rows touched.
    pub fn apply_to(&self, rows: &mut Vec<SequencedItem>) -> u64 {
        match self {
            Self::Insert(item) => {
                rows.push(*item);
                1
            }
            Self::Assign {
                item,
                scope,
                sequence,
                active,
            } => {
                let mut touched = 0;
                for row in rows.iter_mut().filter(|row| row.item_ref() == *item) {
                    row.scope = *scope;
                    row.sequence = *sequence;
                    row.active = *active;
                    touched += 1;
                }
                touched
            }
            Self::Shift(shift) => {
                let mut touched = 0;
                for row in rows.iter_mut().filter(|row| shift.matches(row)) {
                    row.sequence = Sequence(row.sequence.get() + shift.delta);
                    touched += 1;
                }
                touched
            }
            Self::Delete(item) => {
                let before = rows.len();
                rows.retain(|row| row.item_ref() != *item);
                u64::try_from(before - rows.len()).unwrap_or(u64::MAX)
            }
        }
    }
}

/// Ordered writes produced for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencePlan {
    writes: Vec<SequenceWrite>,
}

impl SequencePlan {
    /// Writes in execution order.
    #[must_use]
    pub fn writes(&self) -> &[SequenceWrite] {
        &self.writes
    }

    /// Whether the operation needs no writes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn push(&mut self, write: SequenceWrite) {
        self.writes.push(write);
    }
}

impl FromIterator<SequenceWrite> for SequencePlan {
    fn from_iter<I: IntoIterator<Item = SequenceWrite>>(iter: I) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

/// Largest positioned sequence in `items`, or `0` when none are.
#[must_use]
pub fn scope_size(items: &[SequencedItem]) -> i32 {
    items
        .iter()
        .filter(|item| item.is_positioned())
        .map(|item| item.sequence.get())
        .max()
        .unwrap_or(0)
}

/// Position the next appended item of a scope receives.
#[must_use]
pub fn next_position(items: &[SequencedItem]) -> Sequence {
    Sequence(scope_size(items) + 1)
}

/// Whether the positioned items of one scope hold exactly `1..=N`.
#[must_use]
pub fn is_dense(items: &[SequencedItem]) -> bool {
    let mut values: Vec<i32> = items
        .iter()
        .filter(|item| item.is_positioned())
        .map(|item| item.sequence.get())
        .collect();
    values.sort_unstable();
    values
        .iter()
        .zip(1..)
        .all(|(value, expected)| *value == expected)
}

/// Clamp a requested position into `1..=size`.
///
/// `size` is the number of positioned items including the one being moved,
/// so it is at least 1 whenever this is called.
#[must_use]
pub fn clamp_position(requested: i64, size: i32) -> i32 {
    let first = Sequence::FIRST.get();
    requested_position(requested).clamp(first, size.max(first))
}

/// Plan appending a new item at the end of `scope`.
#[must_use]
pub fn plan_append(scope: ScopeKey, id: Uuid, scope_items: &[SequencedItem]) -> SequencePlan {
    std::iter::once(SequenceWrite::Insert(SequencedItem {
        id,
        scope,
        sequence: next_position(scope_items),
        active: true,
    }))
    .collect()
}

/// Progress of a within-scope move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    /// Nothing written yet.
    Pending,
    /// The item sits at the sentinel, freeing its old position.
    Quarantined,
    /// The items between the old and new position have been renumbered.
    Shifted,
    /// The item holds its new position.
    Placed,
}

/// Three-phase move of an item inside its own scope.
///
/// The item is first parked at [`Sequence::SENTINEL`], then the block between
/// its old and new positions slides one step to close the vacated slot and
/// open the target, and finally the item takes the target position. At no
/// statement boundary do two positioned items share a sequence.
///
/// The protocol is an iterator over the writes of each phase.
///
/// # Examples
/// ```
/// use lms_backend::domain::sequencing::{
///     MovePhase, MoveProtocol, ScopeKey, Sequence, SequenceList, SequencedItem,
/// };
/// use uuid::Uuid;
///
/// let scope = ScopeKey::new(SequenceList::LatestTutorials, None).expect("scope");
/// let items: Vec<SequencedItem> = (1..=3)
///     .map(|position| SequencedItem {
///         id: Uuid::new_v4(),
///         scope,
///         sequence: Sequence::position(position).expect("position"),
///         active: true,
///     })
///     .collect();
///
/// let mut protocol = MoveProtocol::new(&items[0], &items, 3).expect("not a no-op");
/// assert_eq!(protocol.phase(), MovePhase::Pending);
/// assert_eq!(protocol.by_ref().count(), 3);
/// assert_eq!(protocol.phase(), MovePhase::Placed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveProtocol {
    item: ItemRef,
    scope: ScopeKey,
    current: i32,
    target: i32,
    phase: MovePhase,
}

impl MoveProtocol {
    /// Prepare a move of `item` towards `requested`, clamped to the scope.
    ///
    /// Returns `None` when the clamped target equals the current position or
    /// the item is not positioned.
    #[must_use]
    pub fn new(item: &SequencedItem, scope_items: &[SequencedItem], requested: i64) -> Option<Self> {
        if !item.is_positioned() {
            return None;
        }
        let current = item.sequence.get();
        let target = clamp_position(requested, scope_size(scope_items).max(current));
        (target != current).then_some(Self {
            item: item.item_ref(),
            scope: item.scope,
            current,
            target,
            phase: MovePhase::Pending,
        })
    }

    /// Phase reached by the writes yielded so far.
    #[must_use]
    pub const fn phase(&self) -> MovePhase {
        self.phase
    }

    /// Clamped destination.
    #[must_use]
    pub const fn target(&self) -> Sequence {
        Sequence(self.target)
    }

    fn shift(&self) -> RangeShift {
        if self.target > self.current {
            RangeShift {
                scope: self.scope,
                from: self.current + 1,
                to: Some(self.target),
                delta: -1,
                exclude: Some(self.item.id),
            }
        } else {
            RangeShift {
                scope: self.scope,
                from: self.target,
                to: Some(self.current - 1),
                delta: 1,
                exclude: Some(self.item.id),
            }
        }
    }
}

impl Iterator for MoveProtocol {
    type Item = SequenceWrite;

    fn next(&mut self) -> Option<Self::Item> {
        let (write, phase) = match self.phase {
            MovePhase::Pending => (
                SequenceWrite::Assign {
                    item: self.item,
                    scope: self.scope,
                    sequence: Sequence::SENTINEL,
                    active: true,
                },
                MovePhase::Quarantined,
            ),
            MovePhase::Quarantined => (SequenceWrite::Shift(self.shift()), MovePhase::Shifted),
            MovePhase::Shifted => (
                SequenceWrite::Assign {
                    item: self.item,
                    scope: self.scope,
                    sequence: self.target(),
                    active: true,
                },
                MovePhase::Placed,
            ),
            MovePhase::Placed => return None,
        };
        self.phase = phase;
        Some(write)
    }
}

/// Plan moving `item` to `requested` within its current scope.
#[must_use]
pub fn plan_move_within(
    item: &SequencedItem,
    scope_items: &[SequencedItem],
    requested: i64,
) -> SequencePlan {
    MoveProtocol::new(item, scope_items, requested)
        .map(Iterator::collect)
        .unwrap_or_default()
}

/// Plan moving `item` out of its scope into `target`.
///
/// A missing or out-of-range `requested` position appends to the end of the
/// target. The item leaves its source scope in the same statement that places
/// it in the target, so the source gap can be closed afterwards without a
/// sentinel phase.
#[must_use]
pub fn plan_move_across(
    item: &SequencedItem,
    target: ScopeKey,
    target_items: &[SequencedItem],
    requested: Option<i64>,
) -> SequencePlan {
    let size = scope_size(target_items);
    let placement = requested
        .map(requested_position)
        .filter(|position| (Sequence::FIRST.get()..=size).contains(position));

    let mut plan = SequencePlan::default();
    let sequence = match placement {
        Some(position) => {
            plan.push(SequenceWrite::Shift(RangeShift {
                scope: target,
                from: position,
                to: None,
                delta: 1,
                exclude: Some(item.id),
            }));
            Sequence(position)
        }
        None => Sequence(size + 1),
    };
    plan.push(SequenceWrite::Assign {
        item: item.item_ref(),
        scope: target,
        sequence,
        active: true,
    });
    if item.is_positioned() {
        plan.push(close_gap(item));
    }
    plan
}

/// Plan hiding `item`: it goes to the sentinel and the items after it slide
/// up to close the gap.
#[must_use]
pub fn plan_deactivate(item: &SequencedItem) -> SequencePlan {
    if !item.active {
        return SequencePlan::default();
    }
    let mut plan = SequencePlan::default();
    plan.push(SequenceWrite::Assign {
        item: item.item_ref(),
        scope: item.scope,
        sequence: Sequence::SENTINEL,
        active: false,
    });
    if item.is_positioned() {
        plan.push(close_gap(item));
    }
    plan
}

/// Plan showing a hidden `item` again at the end of its scope.
#[must_use]
pub fn plan_reactivate(item: &SequencedItem, scope_items: &[SequencedItem]) -> SequencePlan {
    if item.active {
        return SequencePlan::default();
    }
    std::iter::once(SequenceWrite::Assign {
        item: item.item_ref(),
        scope: item.scope,
        sequence: next_position(scope_items),
        active: true,
    })
    .collect()
}

/// Plan deleting `item` and closing the gap it leaves, if any.
#[must_use]
pub fn plan_remove(item: &SequencedItem) -> SequencePlan {
    let mut plan = SequencePlan::default();
    plan.push(SequenceWrite::Delete(item.item_ref()));
    if item.is_positioned() {
        plan.push(close_gap(item));
    }
    plan
}

fn close_gap(item: &SequencedItem) -> SequenceWrite {
    SequenceWrite::Shift(RangeShift {
        scope: item.scope,
        from: item.sequence.get() + 1,
        to: None,
        delta: -1,
        exclude: Some(item.id),
    })
}
