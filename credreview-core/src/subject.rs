//! Identity and status types for the subjects under review.
//!
//! A review session is always scoped to one lecturer. The lecturer profile
//! itself is a subject, and so is every degree and certificate attached to
//! the submission. All three share the same decision shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for a lecturer ID to prevent mixing with credential IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LecturerId(pub String);

impl fmt::Display for LecturerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LecturerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LecturerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for the ID of any reviewed subject (lecturer, degree or certificate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&LecturerId> for SubjectId {
    fn from(id: &LecturerId) -> Self {
        Self(id.0.clone())
    }
}

/// The kind of entity under review.
///
/// The serialized names double as the draft group names, so they must not
/// change without a draft store migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectKind {
    #[serde(rename = "lecturer")]
    Lecturer,
    #[serde(rename = "degrees")]
    Degree,
    #[serde(rename = "certificates")]
    Certificate,
}

impl SubjectKind {
    /// All kinds, in commit order.
    pub const ALL: [SubjectKind; 3] = [
        SubjectKind::Lecturer,
        SubjectKind::Degree,
        SubjectKind::Certificate,
    ];

    /// Name of the persisted draft group for this kind.
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::Lecturer => "lecturer",
            Self::Degree => "degrees",
            Self::Certificate => "certificates",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lecturer => write!(f, "Lecturer"),
            Self::Degree => write!(f, "Degree"),
            Self::Certificate => write!(f, "Certificate"),
        }
    }
}

/// Reference to one subject within a review session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: SubjectId,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<SubjectId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn lecturer(id: &LecturerId) -> Self {
        Self::new(SubjectKind::Lecturer, id)
    }

    pub fn degree(id: impl Into<SubjectId>) -> Self {
        Self::new(SubjectKind::Degree, id)
    }

    pub fn certificate(id: impl Into<SubjectId>) -> Self {
        Self::new(SubjectKind::Certificate, id)
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

/// Review status of a subject, both as reported by the registry and as
/// decided by the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// Normalize a raw status reported by the registry.
    ///
    /// Only the exact tokens `PENDING`, `APPROVED` and `REJECTED` are
    /// recognized. Anything else, including a missing status, widens to
    /// `Pending` so that the reviewer has to decide it explicitly.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("APPROVED") => Self::Approved,
            Some("REJECTED") => Self::Rejected,
            _ => Self::Pending,
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity as supplied by the registry.
///
/// `status` is kept raw: the registry may report values outside the three
/// known statuses, and normalization is the reconciliation step's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedItem {
    pub id: SubjectId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl SubmittedItem {
    pub fn new(id: impl Into<SubjectId>, status: Option<&str>, note: Option<&str>) -> Self {
        Self {
            id: id.into(),
            status: status.map(str::to_string),
            note: note.map(str::to_string),
        }
    }

    pub fn server_status(&self) -> ReviewStatus {
        ReviewStatus::normalize(self.status.as_deref())
    }

    /// Server note, with an empty string treated as absent.
    pub fn server_note(&self) -> Option<&str> {
        self.note.as_deref().filter(|n| !n.is_empty())
    }
}

/// A lecturer's submission: the profile plus attached credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerSubmission {
    pub lecturer: SubmittedItem,
    #[serde(default)]
    pub degrees: Vec<SubmittedItem>,
    #[serde(default)]
    pub certificates: Vec<SubmittedItem>,
}

impl LecturerSubmission {
    pub fn lecturer_id(&self) -> LecturerId {
        LecturerId(self.lecturer.id.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_known_tokens() {
        assert_eq!(ReviewStatus::normalize(Some("PENDING")), ReviewStatus::Pending);
        assert_eq!(
            ReviewStatus::normalize(Some("APPROVED")),
            ReviewStatus::Approved
        );
        assert_eq!(
            ReviewStatus::normalize(Some("REJECTED")),
            ReviewStatus::Rejected
        );
    }

    #[test]
    fn test_normalize_widens_unknown_values_to_pending() {
        assert_eq!(ReviewStatus::normalize(None), ReviewStatus::Pending);
        assert_eq!(ReviewStatus::normalize(Some("")), ReviewStatus::Pending);
        assert_eq!(
            ReviewStatus::normalize(Some("IN_REVIEW")),
            ReviewStatus::Pending
        );
        // Matching is exact, not case-insensitive
        assert_eq!(
            ReviewStatus::normalize(Some("approved")),
            ReviewStatus::Pending
        );
        assert_eq!(
            ReviewStatus::normalize(Some(" REJECTED ")),
            ReviewStatus::Pending
        );
    }

    #[test]
    fn test_status_serializes_as_upper_case() {
        let json = serde_json::to_string(&ReviewStatus::Rejected).unwrap();
        assert_eq!(json, "\"REJECTED\"");
        let parsed: ReviewStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(parsed, ReviewStatus::Approved);
    }

    #[test]
    fn test_submitted_item_empty_note_is_absent() {
        let item = SubmittedItem::new("D1", Some("REJECTED"), Some(""));
        assert_eq!(item.server_note(), None);
        assert_eq!(item.server_status(), ReviewStatus::Rejected);
    }

    #[test]
    fn test_submission_deserializes_with_missing_fields() {
        let json = r#"{"lecturer": {"id": "L1", "status": "SUSPENDED"}}"#;
        let submission: LecturerSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.lecturer_id(), LecturerId::from("L1"));
        assert_eq!(submission.lecturer.server_status(), ReviewStatus::Pending);
        assert!(submission.degrees.is_empty());
        assert!(submission.certificates.is_empty());
    }

    #[test]
    fn test_subject_ref_display() {
        assert_eq!(SubjectRef::degree("12").to_string(), "Degree #12");
        assert_eq!(
            SubjectRef::lecturer(&LecturerId::from("L1")).to_string(),
            "Lecturer #L1"
        );
    }

    proptest! {
        /// Any string that is not one of the three exact tokens normalizes to Pending.
        #[test]
        fn prop_unknown_status_is_pending(raw in "\\PC*") {
            prop_assume!(raw != "APPROVED" && raw != "REJECTED");
            prop_assert_eq!(ReviewStatus::normalize(Some(&raw)), ReviewStatus::Pending);
        }
    }
}
