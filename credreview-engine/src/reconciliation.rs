//! Reconciliation of saved drafts with registry state.
//!
//! When a review opens, the registry's view of each subject and the
//! device's draft of it are merged into one working decision set. A draft
//! always wins: it is the reviewer's most recent, uncommitted intent.

use std::collections::BTreeMap;

use credreview_core::{
    Decision, LecturerId, LecturerSubmission, ReviewError, ReviewStatus, SubjectId, SubmittedItem,
};
use tracing::{debug, error, info};

use crate::draft_store::{DraftSnapshot, DraftStore};
use crate::registry::RegistryClient;
use crate::session::ReviewSession;

/// Merge a fetched submission with the lecturer's saved drafts.
///
/// Pure and deterministic. Drafts for subjects the submission no longer
/// lists are ignored.
pub fn reconcile(submission: &LecturerSubmission, drafts: &DraftSnapshot) -> ReviewSession {
    let lecturer_id = submission.lecturer_id();

    ReviewSession::new(
        lecturer_id,
        seed(&submission.lecturer, &drafts.lecturer),
        seed_group(&submission.degrees, &drafts.degrees),
        seed_group(&submission.certificates, &drafts.certificates),
    )
}

fn seed_group(
    items: &[SubmittedItem],
    drafts: &BTreeMap<SubjectId, Decision>,
) -> BTreeMap<SubjectId, Decision> {
    items
        .iter()
        .map(|item| (item.id.clone(), seed(item, drafts)))
        .collect()
}

fn seed(item: &SubmittedItem, drafts: &BTreeMap<SubjectId, Decision>) -> Decision {
    if let Some(draft) = drafts.get(&item.id) {
        return draft.clone();
    }
    Decision::new(item.server_status(), item.server_note().unwrap_or_default())
}

/// Fetch a lecturer's submission, load their drafts and reconcile.
pub async fn open_session(
    registry: &dyn RegistryClient,
    drafts: &DraftStore,
    lecturer_id: &LecturerId,
) -> Result<ReviewSession, ReviewError> {
    info!("Opening review session for lecturer {}", lecturer_id);

    let submission = registry
        .fetch_lecturer_submission(lecturer_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch submission for lecturer {}: {:#}", lecturer_id, e);
            ReviewError::Registry(format!("{:#}", e))
        })?;

    if submission.lecturer_id() != *lecturer_id {
        error!(
            "Registry returned lecturer {} when asked for {}",
            submission.lecturer_id(),
            lecturer_id
        );
        return Err(ReviewError::Registry(format!(
            "submission for lecturer {} does not match requested lecturer {}",
            submission.lecturer_id(),
            lecturer_id
        )));
    }

    let snapshot = drafts.snapshot(lecturer_id).await;
    let session = reconcile(&submission, &snapshot);

    let restored = session
        .subjects()
        .iter()
        .filter(|subject| snapshot.group(subject.kind).contains_key(&subject.id))
        .count();
    let decided = session
        .subjects()
        .iter()
        .filter_map(|subject| session.decision(subject))
        .filter(|decision| decision.status != ReviewStatus::Pending)
        .count();
    debug!(
        "Lecturer {}: {} draft(s) restored, {} of {} subject(s) already decided",
        lecturer_id,
        restored,
        decided,
        session.subjects().len()
    );

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use credreview_core::{SubjectKind, SubjectRef};
    use proptest::prelude::*;

    fn submission() -> LecturerSubmission {
        LecturerSubmission {
            lecturer: SubmittedItem::new("L1", Some("PENDING"), None),
            degrees: vec![
                SubmittedItem::new("D1", Some("APPROVED"), None),
                SubmittedItem::new("D2", Some("REJECTED"), Some("expired")),
                SubmittedItem::new("D3", None, None),
            ],
            certificates: vec![SubmittedItem::new("C1", Some("UNDER_REVIEW"), Some("x"))],
        }
    }

    fn decision(session: &ReviewSession, subject: SubjectRef) -> Decision {
        session.decision(&subject).cloned().unwrap()
    }

    #[test]
    fn test_server_state_seeds_without_drafts() {
        let session = reconcile(&submission(), &DraftSnapshot::default());

        assert_eq!(session.lecturer_id(), &LecturerId::from("L1"));
        assert_eq!(
            decision(&session, SubjectRef::degree("D1")),
            Decision::approved()
        );
        assert_eq!(
            decision(&session, SubjectRef::degree("D2")),
            Decision::rejected("expired")
        );
        assert_eq!(
            decision(&session, SubjectRef::degree("D3")),
            Decision::pending()
        );
    }

    #[test]
    fn test_unknown_server_status_becomes_pending_with_note() {
        let session = reconcile(&submission(), &DraftSnapshot::default());
        assert_eq!(
            decision(&session, SubjectRef::certificate("C1")),
            Decision::new(ReviewStatus::Pending, "x")
        );
    }

    #[test]
    fn test_draft_overrides_server_state() {
        let mut drafts = DraftSnapshot::default();
        drafts
            .degrees
            .insert(SubjectId::from("D1"), Decision::rejected("bad"));
        drafts
            .lecturer
            .insert(SubjectId::from("L1"), Decision::approved());

        let session = reconcile(&submission(), &drafts);

        assert_eq!(
            decision(&session, SubjectRef::degree("D1")),
            Decision::rejected("bad")
        );
        assert_eq!(
            decision(&session, SubjectRef::lecturer(&LecturerId::from("L1"))),
            Decision::approved()
        );
    }

    #[test]
    fn test_stale_drafts_are_ignored() {
        let mut drafts = DraftSnapshot::default();
        drafts
            .degrees
            .insert(SubjectId::from("D9"), Decision::approved());

        let session = reconcile(&submission(), &drafts);

        assert!(session.state(&SubjectRef::degree("D9")).is_none());
        assert_eq!(
            session.decisions(SubjectKind::Degree).len(),
            submission().degrees.len()
        );
    }

    #[test]
    fn test_drafts_are_scoped_by_group() {
        let mut drafts = DraftSnapshot::default();
        drafts
            .certificates
            .insert(SubjectId::from("D1"), Decision::rejected("wrong group"));

        let session = reconcile(&submission(), &drafts);
        assert_eq!(
            decision(&session, SubjectRef::degree("D1")),
            Decision::approved()
        );
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    fn arb_status() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("PENDING".to_string())),
            Just(Some("APPROVED".to_string())),
            Just(Some("REJECTED".to_string())),
            "[A-Za-z_]{0,12}".prop_map(Some),
        ]
    }

    fn arb_item(prefix: &'static str) -> impl Strategy<Value = SubmittedItem> {
        (0u8..6, arb_status(), proptest::option::of("[ -~]{0,10}")).prop_map(
            move |(n, status, note)| SubmittedItem {
                id: SubjectId(format!("{}{}", prefix, n)),
                status,
                note,
            },
        )
    }

    fn arb_submission() -> impl Strategy<Value = LecturerSubmission> {
        (
            arb_item("L"),
            prop::collection::vec(arb_item("D"), 0..5),
            prop::collection::vec(arb_item("C"), 0..5),
        )
            .prop_map(|(lecturer, degrees, certificates)| LecturerSubmission {
                lecturer,
                degrees,
                certificates,
            })
    }

    fn arb_decision() -> impl Strategy<Value = Decision> {
        prop_oneof![
            "[ -~]{0,8}".prop_map(|note| Decision::new(ReviewStatus::Pending, note)),
            Just(Decision::approved()),
            "[a-z]{1,8}".prop_map(Decision::rejected),
        ]
    }

    fn arb_group(prefix: &'static str) -> impl Strategy<Value = BTreeMap<SubjectId, Decision>> {
        prop::collection::btree_map(
            (0u8..6).prop_map(move |n| SubjectId(format!("{}{}", prefix, n))),
            arb_decision(),
            0..4,
        )
    }

    fn arb_snapshot() -> impl Strategy<Value = DraftSnapshot> {
        (arb_group("L"), arb_group("D"), arb_group("C")).prop_map(
            |(lecturer, degrees, certificates)| DraftSnapshot {
                lecturer,
                degrees,
                certificates,
            },
        )
    }

    proptest! {
        /// Reconciling the same inputs twice yields the same session.
        #[test]
        fn prop_reconcile_is_idempotent(
            submission in arb_submission(),
            drafts in arb_snapshot(),
        ) {
            prop_assert_eq!(reconcile(&submission, &drafts), reconcile(&submission, &drafts));
        }

        /// Every subject with a draft carries exactly the draft's decision.
        #[test]
        fn prop_draft_takes_precedence(
            submission in arb_submission(),
            drafts in arb_snapshot(),
        ) {
            let session = reconcile(&submission, &drafts);
            for subject in session.subjects() {
                if let Some(draft) = drafts.group(subject.kind).get(&subject.id) {
                    prop_assert_eq!(session.decision(&subject), Some(draft));
                }
            }
        }

        /// Without drafts only the exact APPROVED/REJECTED tokens count as
        /// decided; anything else seeds as pending.
        #[test]
        fn prop_server_status_is_normalized(submission in arb_submission()) {
            let session = reconcile(&submission, &DraftSnapshot::default());
            for subject in session.subjects() {
                let item = server_item(&submission, &subject);
                let expected = match item.status.as_deref() {
                    Some("APPROVED") => ReviewStatus::Approved,
                    Some("REJECTED") => ReviewStatus::Rejected,
                    _ => ReviewStatus::Pending,
                };
                prop_assert_eq!(session.decision(&subject).map(|d| d.status), Some(expected));
            }
        }
    }

    /// The item a subject was seeded from. Duplicate IDs collapse to the last.
    fn server_item<'a>(
        submission: &'a LecturerSubmission,
        subject: &SubjectRef,
    ) -> &'a SubmittedItem {
        let items: &[SubmittedItem] = match subject.kind {
            SubjectKind::Lecturer => return &submission.lecturer,
            SubjectKind::Degree => &submission.degrees,
            SubjectKind::Certificate => &submission.certificates,
        };
        items
            .iter()
            .rev()
            .find(|item| item.id == subject.id)
            .unwrap()
    }
}
