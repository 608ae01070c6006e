//! Dense ordering of catalogue items within a scope.
//!
//! Six orderings in the product keep their items at gapless positions
//! `1..=N`: a course's modules, a module's submodules, a submodule's videos,
//! a course's recommended videos, the dashboard carousel and the latest
//! tutorials list. They differ only in what the parent scope is, so one
//! [`Sequencer`] serves all of them and a [`SequenceList`] tells the store
//! which ordering a scope belongs to.
//!
//! ## Invariants
//! - Within a [`ScopeKey`], the sequences of positioned items (active and not
//!   parked at [`Sequence::SENTINEL`]) are exactly `1..=N`.
//! - [`Sequence::SENTINEL`] is never a real position. Deactivated items and
//!   items parked mid-move hold it.
//! - Item ids are unique per [`SequenceList`]; an item belongs to exactly one
//!   scope of that list at a time.

mod error;
pub mod plan;
mod service;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::error::SequenceError;
pub use self::plan::{MovePhase, MoveProtocol, RangeShift, SequencePlan, SequenceWrite};
pub use self::service::Sequencer;

/// A position in an ordering, or the sentinel.
///
/// # Examples
/// ```
/// use lms_backend::domain::sequencing::Sequence;
///
/// let first = Sequence::position(1).expect("valid position");
/// assert_eq!(first.get(), 1);
/// assert!(Sequence::position(0).is_err());
/// assert!(Sequence::SENTINEL.is_sentinel());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(i32);

impl Sequence {
    /// Reserved marker for items outside the visible order.
    pub const SENTINEL: Self = Self(-1);

    /// The first position of every scope.
    pub const FIRST: Self = Self(1);

    /// Build a real position; `value` must be at least 1.
    pub fn position(value: i32) -> Result<Self, SequenceError> {
        if value >= Self::FIRST.0 {
            Ok(Self(value))
        } else {
            Err(SequenceError::invalid_request(format!(
                "sequence {value} is not a valid position"
            )))
        }
    }

    /// Accept a stored value: either a real position or the sentinel.
    pub fn from_stored(value: i32) -> Result<Self, SequenceError> {
        if value == Self::SENTINEL.0 {
            Ok(Self::SENTINEL)
        } else {
            Self::position(value)
        }
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Whether this is the sentinel marker.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::SENTINEL.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a list's scopes hang off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeShape {
    /// One ordering per parent entity; the label names the parent kind.
    Parented(&'static str),
    /// A single implicit ordering for the whole list.
    Global,
}

/// The orderings maintained by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceList {
    /// Modules of a course.
    CourseModules,
    /// Submodules of a module.
    ModuleSubmodules,
    /// Videos of a submodule.
    SubmoduleVideos,
    /// Recommended videos of a course.
    RecommendedVideos,
    /// Dashboard carousel entries.
    DashboardCarousel,
    /// Latest tutorials list.
    LatestTutorials,
}

impl SequenceList {
    /// Every list, in wire-name order of declaration.
    pub const ALL: [Self; 6] = [
        Self::CourseModules,
        Self::ModuleSubmodules,
        Self::SubmoduleVideos,
        Self::RecommendedVideos,
        Self::DashboardCarousel,
        Self::LatestTutorials,
    ];

    /// Stable wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CourseModules => "course_modules",
            Self::ModuleSubmodules => "module_submodules",
            Self::SubmoduleVideos => "submodule_videos",
            Self::RecommendedVideos => "recommended_videos",
            Self::DashboardCarousel => "dashboard_carousel",
            Self::LatestTutorials => "latest_tutorials",
        }
    }

    /// Whether scopes of this list have a parent entity.
    #[must_use]
    pub const fn shape(self) -> ScopeShape {
        match self {
            Self::CourseModules | Self::RecommendedVideos => ScopeShape::Parented("course"),
            Self::ModuleSubmodules => ScopeShape::Parented("module"),
            Self::SubmoduleVideos => ScopeShape::Parented("submodule"),
            Self::DashboardCarousel | Self::LatestTutorials => ScopeShape::Global,
        }
    }
}

impl fmt::Display for SequenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequenceList {
    type Err = SequenceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|list| list.as_str() == value)
            .ok_or_else(|| SequenceError::invalid_request(format!("unknown sequence list '{value}'")))
    }
}

/// The grouping within which sequences are dense.
///
/// Construction validates the parent against the list's [`ScopeShape`], so a
/// `ScopeKey` always addresses a real ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawScopeKey")]
pub struct ScopeKey {
    list: SequenceList,
    parent: Option<Uuid>,
}

impl ScopeKey {
    /// Build a scope, rejecting a parent mismatch for the list.
    ///
    /// # Examples
    /// ```
    /// use lms_backend::domain::sequencing::{ScopeKey, SequenceList};
    /// use uuid::Uuid;
    ///
    /// assert!(ScopeKey::new(SequenceList::CourseModules, Some(Uuid::new_v4())).is_ok());
    /// assert!(ScopeKey::new(SequenceList::CourseModules, None).is_err());
    /// assert!(ScopeKey::new(SequenceList::LatestTutorials, None).is_ok());
    /// ```
    pub fn new(list: SequenceList, parent: Option<Uuid>) -> Result<Self, SequenceError> {
        match (list.shape(), parent) {
            (ScopeShape::Parented(label), None) => Err(SequenceError::invalid_request(format!(
                "{list} requires a {label} scope"
            ))),
            (ScopeShape::Global, Some(_)) => Err(SequenceError::invalid_request(format!(
                "{list} is a global list and takes no scope"
            ))),
            _ => Ok(Self { list, parent }),
        }
    }

    /// The list this scope belongs to.
    #[must_use]
    pub const fn list(&self) -> SequenceList {
        self.list
    }

    /// Parent entity id, `None` for global lists.
    #[must_use]
    pub const fn parent(&self) -> Option<Uuid> {
        self.parent
    }
}

#[derive(Deserialize)]
struct RawScopeKey {
    list: SequenceList,
    parent: Option<Uuid>,
}

impl TryFrom<RawScopeKey> for ScopeKey {
    type Error = SequenceError;

    fn try_from(raw: RawScopeKey) -> Result<Self, Self::Error> {
        Self::new(raw.list, raw.parent)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "{}/{parent}", self.list),
            None => write!(f, "{}", self.list),
        }
    }
}

/// Address of one sequenced item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// List the item is ordered in.
    pub list: SequenceList,
    /// Catalogue entity id.
    pub id: Uuid,
}

impl ItemRef {
    /// Create a reference.
    #[must_use]
    pub const fn new(list: SequenceList, id: Uuid) -> Self {
        Self { list, id }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} item {}", self.list, self.id)
    }
}

/// An entity's ordering record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedItem {
    /// Catalogue entity id.
    pub id: Uuid,
    /// Scope the item is ordered in.
    pub scope: ScopeKey,
    /// Current position, or the sentinel.
    pub sequence: Sequence,
    /// Whether the item takes part in the visible order.
    pub active: bool,
}

impl SequencedItem {
    /// Reference to this item.
    #[must_use]
    pub const fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.scope.list, self.id)
    }

    /// Whether the item currently occupies a real position.
    #[must_use]
    pub const fn is_positioned(&self) -> bool {
        self.active && !self.sequence.is_sentinel()
    }
}

/// Saturate an arbitrary requested position into the `i32` domain.
///
/// Values are clamped afterwards against the scope size, so saturating here
/// keeps "far past the end" and "far before the start" requests meaningful.
#[must_use]
pub fn requested_position(raw: i64) -> i32 {
    i32::try_from(raw).unwrap_or(if raw < 0 { i32::MIN } else { i32::MAX })
}
