use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;

use crate::domain::{
    checksum::{compute_checksum, Checksum, StockStatus},
    limits,
    validation::{check_range, check_required_text, check_text},
    ParseCodeError, ParseIdError, ValidationError,
};

/// Identifier of an equipment record.
///
/// Positive, unique, assigned in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EquipmentId(NonZeroU32);

impl EquipmentId {
    /// The first identifier handed out in an empty inventory.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Creates an identifier, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// The raw integer value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The identifier immediately after this one, if there is one.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EquipmentId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseIdError::new("equipment", s))
    }
}

/// Sensitivity tag carried by an equipment record.
///
/// Ordered from least to most sensitive. Display-only; nothing in the system
/// enforces access based on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// No handling restrictions.
    #[default]
    Unclassified,
    /// Restricted handling.
    Restricted,
    /// Confidential handling.
    Confidential,
    /// Secret handling.
    Secret,
}

impl Classification {
    /// All classifications, in order.
    pub const ALL: [Self; 4] = [
        Self::Unclassified,
        Self::Restricted,
        Self::Confidential,
        Self::Secret,
    ];

    /// The persisted integer code (0 to 3).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unclassified => 0,
            Self::Restricted => 1,
            Self::Confidential => 2,
            Self::Secret => 3,
        }
    }

    /// The upper-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "UNCLASSIFIED",
            Self::Restricted => "RESTRICTED",
            Self::Confidential => "CONFIDENTIAL",
            Self::Secret => "SECRET",
        }
    }
}

impl TryFrom<u8> for Classification {
    type Error = ParseCodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| ParseCodeError::new("classification", code))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = ParseCodeError;

    /// Accepts the display name in any case, a common abbreviation, or the
    /// integer code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "UNCLASSIFIED" | "UNCLASS" | "U" | "0" => Ok(Self::Unclassified),
            "RESTRICTED" | "R" | "1" => Ok(Self::Restricted),
            "CONFIDENTIAL" | "C" | "2" => Ok(Self::Confidential),
            "SECRET" | "S" | "3" => Ok(Self::Secret),
            _ => Err(ParseCodeError::new("classification", s)),
        }
    }
}

/// The caller-supplied fields of a new equipment record.
///
/// Identity, timestamp and checksum are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquipmentDraft {
    /// Display name; also the key of the name index.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Units currently on hand.
    pub quantity: u32,
    /// Stock level at or below which the item needs resupply.
    pub min_threshold: u32,
    /// Unit of issue, e.g. `ea`, `box`, `case`.
    pub unit: String,
    /// Where the stock is held.
    pub location: String,
    /// Sensitivity tag.
    pub classification: Classification,
}

impl EquipmentDraft {
    /// Creates a draft with the given name and stock levels and empty
    /// optional fields.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: u32, min_threshold: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            min_threshold,
            ..Self::default()
        }
    }

    /// Checks every field against its declared bound.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required_text("name", &self.name, limits::NAME_LEN)?;
        check_text("description", &self.description, limits::DESCRIPTION_LEN)?;
        check_range("quantity", self.quantity, 0, limits::QUANTITY_MAX)?;
        check_range("minimum threshold", self.min_threshold, 0, limits::QUANTITY_MAX)?;
        check_text("unit", &self.unit, limits::UNIT_LEN)?;
        check_text("location", &self.location, limits::LOCATION_LEN)?;
        Ok(())
    }
}

/// One tracked stock-keeping unit.
///
/// Fields are read through accessors; every mutation goes through a method
/// that refreshes `last_updated` and the checksum together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    id: EquipmentId,
    name: NonEmptyString,
    description: String,
    quantity: u32,
    min_threshold: u32,
    unit: String,
    location: String,
    classification: Classification,
    last_updated: DateTime<Utc>,
    checksum: Checksum,
}

impl Equipment {
    /// Builds a fresh record from a validated draft.
    pub(crate) fn new(
        id: EquipmentId,
        draft: EquipmentDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        draft.validate()?;
        let mut item = Self::from_draft(id, draft, now, Checksum::from_fields(0, 0, 0, ""))?;
        item.reseal();
        Ok(item)
    }

    /// Rebuilds a record read back from storage.
    ///
    /// The stored checksum is kept as-is so that drift can be detected with
    /// [`Equipment::checksum_is_current`].
    pub(crate) fn restore(
        id: EquipmentId,
        draft: EquipmentDraft,
        last_updated: DateTime<Utc>,
        checksum: Checksum,
    ) -> Result<Self, ValidationError> {
        draft.validate()?;
        Self::from_draft(id, draft, last_updated, checksum)
    }

    fn from_draft(
        id: EquipmentId,
        draft: EquipmentDraft,
        last_updated: DateTime<Utc>,
        checksum: Checksum,
    ) -> Result<Self, ValidationError> {
        let name =
            NonEmptyString::new(draft.name).map_err(|_| ValidationError::Empty { field: "name" })?;
        Ok(Self {
            id,
            name,
            description: draft.description,
            quantity: draft.quantity,
            min_threshold: draft.min_threshold,
            unit: draft.unit,
            location: draft.location,
            classification: draft.classification,
            last_updated,
            checksum,
        })
    }

    /// Identifier of the record.
    #[must_use]
    pub const fn id(&self) -> EquipmentId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Units on hand.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Resupply threshold.
    #[must_use]
    pub const fn min_threshold(&self) -> u32 {
        self.min_threshold
    }

    /// Unit of issue.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Storage location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Sensitivity tag.
    #[must_use]
    pub const fn classification(&self) -> Classification {
        self.classification
    }

    /// When the record was last changed.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// The validation code as of `last_updated`.
    #[must_use]
    pub const fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Derived stock status.
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.quantity, self.min_threshold)
    }

    /// Whether the stored checksum still matches the record's fields.
    #[must_use]
    pub fn checksum_is_current(&self) -> bool {
        compute_checksum(self) == self.checksum
    }

    /// Replaces the quantity, returning the previous value.
    pub(crate) fn set_quantity(
        &mut self,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, ValidationError> {
        check_range("quantity", quantity, 0, limits::QUANTITY_MAX)?;
        let previous = std::mem::replace(&mut self.quantity, quantity);
        self.last_updated = now;
        self.reseal();
        Ok(previous)
    }

    /// Adopts an identifier assigned by a write-through backend.
    pub(crate) fn reassign_id(&mut self, id: EquipmentId) {
        self.id = id;
        self.reseal();
    }

    fn reseal(&mut self) {
        self.checksum = compute_checksum(self);
    }

    /// The caller-supplied fields of this record, e.g. for re-encoding.
    #[must_use]
    pub fn to_draft(&self) -> EquipmentDraft {
        EquipmentDraft {
            name: self.name.as_str().to_string(),
            description: self.description.clone(),
            quantity: self.quantity,
            min_threshold: self.min_threshold,
            unit: self.unit.clone(),
            location: self.location.clone(),
            classification: self.classification,
        }
    }
}
