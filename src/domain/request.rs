use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, Utc};

use crate::domain::{
    limits,
    validation::{check_range, check_required_text},
    EquipmentId, ParseCodeError, ParseIdError, ValidationError,
};

/// Identifier of a supply request, displayed as `REQ-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(NonZeroU32);

impl RequestId {
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

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REQ-{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ParseIdError;

    /// Accepts `REQ-7`, `req-7` or a bare `7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("REQ-"))
            .map_or(trimmed, |_| &trimmed[4..]);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseIdError::new("request", s))
    }
}

/// Urgency of a supply request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Routine.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Needed soon.
    High,
    /// Needed immediately.
    Critical,
}

impl Priority {
    /// All priorities, in increasing urgency.
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Critical];

    /// The persisted integer code (1 to 4).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// The upper-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ParseCodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| ParseCodeError::new("priority", code))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == upper || p.code().to_string() == upper)
            .ok_or_else(|| ParseCodeError::new("priority", s))
    }
}

/// Where a supply request is in its lifecycle.
///
/// ```text
/// PENDING ──► APPROVED ──► FULFILLED
///    │
///    └──────► DENIED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// Awaiting a decision. Every request starts here.
    #[default]
    Pending,
    /// Accepted, awaiting delivery.
    Approved,
    /// Delivered. Terminal.
    Fulfilled,
    /// Refused. Terminal.
    Denied,
}

impl RequestStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Fulfilled, Self::Denied];

    /// The persisted integer code (0 to 3).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Fulfilled => 2,
            Self::Denied => 3,
        }
    }

    /// The upper-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Fulfilled => "FULFILLED",
            Self::Denied => "DENIED",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Denied) | (Self::Approved, Self::Fulfilled)
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Denied)
    }
}

impl TryFrom<u8> for RequestStatus {
    type Error = ParseCodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| ParseCodeError::new("request status", code))
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| ParseCodeError::new("request status", s))
    }
}

/// The caller-supplied fields of a new supply request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDraft {
    /// The equipment being requested. Must exist when the request is made.
    pub equipment_id: EquipmentId,
    /// How many units are needed.
    pub requested_qty: u32,
    /// Who is asking.
    pub requesting_unit: String,
    /// How urgently.
    pub priority: Priority,
}

impl RequestDraft {
    /// Checks every field against its declared bound.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("requested quantity", self.requested_qty, 1, limits::QUANTITY_MAX)?;
        check_required_text("requesting unit", &self.requesting_unit, limits::UNIT_LEN)?;
        Ok(())
    }
}

/// One outstanding or resolved request for equipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyRequest {
    id: RequestId,
    equipment_id: EquipmentId,
    requested_qty: u32,
    requesting_unit: String,
    priority: Priority,
    status: RequestStatus,
    request_time: DateTime<Utc>,
}

impl SupplyRequest {
    /// Builds a fresh, pending request.
    pub(crate) fn new(
        id: RequestId,
        draft: RequestDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::restore(id, draft, RequestStatus::Pending, now)
    }

    /// Rebuilds a request read back from storage.
    pub(crate) fn restore(
        id: RequestId,
        draft: RequestDraft,
        status: RequestStatus,
        request_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        draft.validate()?;
        Ok(Self {
            id,
            equipment_id: draft.equipment_id,
            requested_qty: draft.requested_qty,
            requesting_unit: draft.requesting_unit,
            priority: draft.priority,
            status,
            request_time,
        })
    }

    /// Identifier of the request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The equipment requested. May no longer resolve.
    #[must_use]
    pub const fn equipment_id(&self) -> EquipmentId {
        self.equipment_id
    }

    /// Units requested.
    #[must_use]
    pub const fn requested_qty(&self) -> u32 {
        self.requested_qty
    }

    /// The requesting unit.
    #[must_use]
    pub fn requesting_unit(&self) -> &str {
        &self.requesting_unit
    }

    /// Urgency.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    /// When the request was made. Never changes.
    #[must_use]
    pub const fn request_time(&self) -> DateTime<Utc> {
        self.request_time
    }

    /// Moves the request to `next`, returning the previous status.
    pub(crate) fn transition(&mut self, next: RequestStatus) -> Result<RequestStatus, ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        Ok(std::mem::replace(&mut self.status, next))
    }

    /// Adopts an identifier assigned by a write-through backend.
    pub(crate) const fn reassign_id(&mut self, id: RequestId) {
        self.id = id;
    }

    /// The caller-supplied fields of this request.
    #[must_use]
    pub fn to_draft(&self) -> RequestDraft {
        RequestDraft {
            equipment_id: self.equipment_id,
            requested_qty: self.requested_qty,
            requesting_unit: self.requesting_unit.clone(),
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    fn draft() -> RequestDraft {
        RequestDraft {
            equipment_id: EquipmentId::FIRST,
            requested_qty: 5,
            requesting_unit: "2nd Platoon".to_string(),
            priority: Priority::High,
        }
    }

    fn pending() -> SupplyRequest {
        SupplyRequest::new(RequestId::FIRST, draft(), Utc.timestamp_opt(0, 0).unwrap()).unwrap()
    }

    #[test]
    fn new_requests_are_pending() {
        assert_eq!(pending().status(), RequestStatus::Pending);
    }

    #[test_case(RequestStatus::Pending, RequestStatus::Approved, true; "approve")]
    #[test_case(RequestStatus::Pending, RequestStatus::Denied, true; "deny")]
    #[test_case(RequestStatus::Approved, RequestStatus::Fulfilled, true; "fulfil")]
    #[test_case(RequestStatus::Pending, RequestStatus::Fulfilled, false; "fulfil unapproved")]
    #[test_case(RequestStatus::Approved, RequestStatus::Denied, false; "deny after approval")]
    #[test_case(RequestStatus::Denied, RequestStatus::Approved, false; "revive denied")]
    #[test_case(RequestStatus::Fulfilled, RequestStatus::Pending, false; "reopen fulfilled")]
    #[test_case(RequestStatus::Pending, RequestStatus::Pending, false; "self loop")]
    fn lifecycle(from: RequestStatus, to: RequestStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn rejected_transition_leaves_status_untouched() {
        let mut request = pending();
        let err = request.transition(RequestStatus::Fulfilled).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                id: RequestId::FIRST,
                from: RequestStatus::Pending,
                to: RequestStatus::Fulfilled,
            }
        );
        assert_eq!(request.status(), RequestStatus::Pending);
    }

    #[test]
    fn approve_then_fulfil() {
        let mut request = pending();
        assert_eq!(
            request.transition(RequestStatus::Approved).unwrap(),
            RequestStatus::Pending
        );
        request.transition(RequestStatus::Fulfilled).unwrap();
        assert!(request.status().is_terminal());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut draft = draft();
        draft.requested_qty = 0;
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::OutOfRange { min: 1, .. })
        ));
    }

    #[test_case("REQ-12", 12; "canonical")]
    #[test_case("req-3", 3; "lower case prefix")]
    #[test_case("44", 44; "bare number")]
    fn request_id_parses(input: &str, expected: u32) {
        assert_eq!(input.parse::<RequestId>().unwrap().get(), expected);
    }

    #[test]
    fn request_id_displays_with_prefix() {
        assert_eq!(RequestId::new(9).unwrap().to_string(), "REQ-9");
        assert!("REQ-0".parse::<RequestId>().is_err());
        assert!("REQ-".parse::<RequestId>().is_err());
    }

    #[test]
    fn priority_parses_name_or_code() {
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("1".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::try_from(0).is_err());
    }
}
