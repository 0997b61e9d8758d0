//! Submission identity and resume decisions

use formkit_client::ServiceError;
use formkit_core::Answers;
use formkit_runtime::storage::{load_cached_answers, store_cached_answers};
use formkit_runtime::{
    answers_key, submission_key, ClientStore, FileStore, MemoryStore, ResumeChoice, ResumeDecision,
    SessionOrigin, SubmissionResolver,
};
use formkit_test_utils::{
    abc_form, ids, repeatable_form, single_submission_form, FakeFormService, Operation, FORM_ID,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Harness {
    fake: Arc<FakeFormService>,
    store: Arc<MemoryStore>,
    resolver: SubmissionResolver,
}

fn harness() -> Harness {
    let fake = Arc::new(FakeFormService::new());
    let store = Arc::new(MemoryStore::new());
    let resolver = SubmissionResolver::new(fake.clone(), store.clone(), Arc::new(ids("sub")));
    Harness { fake, store, resolver }
}

fn answers(pairs: &[(&str, &str)]) -> Answers {
    pairs.iter().copied().collect()
}

#[test]
fn submission_id_is_idempotent() {
    let h = harness();
    let first = h.resolver.resolve_submission_id(FORM_ID);
    let second = h.resolver.resolve_submission_id(FORM_ID);

    assert_eq!(first, "sub-1");
    assert_eq!(first, second);
    assert_eq!(h.store.get(&submission_key(FORM_ID)).unwrap(), Some(first));
}

#[test]
fn submission_ids_are_per_form() {
    let h = harness();
    let a = h.resolver.resolve_submission_id("form-a");
    let b = h.resolver.resolve_submission_id("form-b");
    assert_ne!(a, b);
}

#[tokio::test]
async fn prior_answers_fill_in_missing_fields() {
    let h = harness();
    let form = abc_form();
    h.fake
        .insert_submission(&form.form_id, "sub-9", answers(&[("a", "1"), ("b", "2")]));

    let loaded = h.resolver.load_prior_answers(&form, "sub-9").await;
    assert_eq!(loaded, answers(&[("a", "1"), ("b", "2"), ("c", "")]));
}

#[tokio::test]
async fn unreachable_service_falls_back_to_cache() {
    let h = harness();
    let form = abc_form();
    h.fake
        .fail_always(Operation::GetSubmission, ServiceError::Transport("offline".into()));
    store_cached_answers(h.store.as_ref(), &form.form_id, "sub-9", &answers(&[("c", "3")])).unwrap();

    let loaded = h.resolver.load_prior_answers(&form, "sub-9").await;
    assert_eq!(loaded, answers(&[("a", ""), ("b", ""), ("c", "3")]));
}

#[tokio::test]
async fn cached_edits_override_remote_answers() {
    let h = harness();
    let form = abc_form();
    h.fake
        .insert_submission(&form.form_id, "sub-9", answers(&[("a", "1"), ("b", "2")]));
    store_cached_answers(
        h.store.as_ref(),
        &form.form_id,
        "sub-9",
        &answers(&[("a", "1"), ("b", "typed later"), ("c", "3")]),
    )
    .unwrap();

    let loaded = h.resolver.load_prior_answers(&form, "sub-9").await;
    assert_eq!(loaded, answers(&[("a", "1"), ("b", "typed later"), ("c", "3")]));
    assert_eq!(h.fake.calls(Operation::GetSubmission), 1);
}

#[tokio::test]
async fn nothing_anywhere_yields_blanks() {
    let h = harness();
    let form = abc_form();
    h.fake
        .fail_always(Operation::GetSubmission, ServiceError::Timeout);

    let loaded = h.resolver.load_prior_answers(&form, "sub-9").await;
    assert_eq!(loaded, form.blank_answers());
}

#[tokio::test]
async fn first_visit_is_fresh_without_network() {
    let h = harness();
    let form = repeatable_form();

    let decision = h.resolver.begin(&form).await;
    let ResumeDecision::Ready(start) = decision else {
        panic!("expected a ready session, got {decision:?}");
    };
    assert_eq!(start.origin, SessionOrigin::Fresh);
    assert_eq!(start.answers, form.blank_answers());
    assert_eq!(h.fake.calls(Operation::GetSubmission), 0);
}

#[tokio::test]
async fn returning_respondent_chooses_when_repeatable() {
    let h = harness();
    let form = repeatable_form();
    let previous = h.resolver.resolve_submission_id(FORM_ID);
    h.fake
        .insert_submission(FORM_ID, &previous, answers(&[("name", "Alice")]));

    let decision = h.resolver.begin(&form).await;
    let ResumeDecision::ChoiceRequired(pending) = decision else {
        panic!("expected a choice, got {decision:?}");
    };
    assert_eq!(pending.previous_submission_id, previous);
    assert_eq!(pending.previous_answers, answers(&[("name", "Alice"), ("notes", "")]));

    let start = h.resolver.choose(pending, ResumeChoice::ContinuePrevious);
    assert_eq!(start.submission_id, previous);
    assert_eq!(start.origin, SessionOrigin::Resumed);
    assert_eq!(start.answers.get("name"), Some("Alice"));
}

#[tokio::test]
async fn single_submission_form_resumes_silently() {
    let h = harness();
    let form = single_submission_form();
    let previous = h.resolver.resolve_submission_id(FORM_ID);
    h.fake
        .insert_submission(FORM_ID, &previous, answers(&[("name", "Alice")]));

    let ResumeDecision::Ready(start) = h.resolver.begin(&form).await else {
        panic!("choice must never be offered for single-submission forms");
    };
    assert_eq!(start.submission_id, previous);
    assert_eq!(start.origin, SessionOrigin::Resumed);
    assert_eq!(start.answers, answers(&[("name", "Alice"), ("notes", "")]));
}

#[tokio::test]
async fn empty_prior_answers_resume_without_choice() {
    let h = harness();
    let form = repeatable_form();
    let previous = h.resolver.resolve_submission_id(FORM_ID);
    h.fake
        .insert_submission(FORM_ID, &previous, answers(&[("name", ""), ("notes", "")]));

    let decision = h.resolver.begin(&form).await;
    assert!(matches!(decision, ResumeDecision::Ready(ref s) if s.submission_id == previous));
}

#[tokio::test]
async fn start_new_replaces_stored_id_and_cache() {
    let h = harness();
    let form = repeatable_form();
    let previous = h.resolver.resolve_submission_id(FORM_ID);
    h.fake
        .insert_submission(FORM_ID, &previous, answers(&[("name", "Alice")]));
    store_cached_answers(h.store.as_ref(), FORM_ID, &previous, &answers(&[("name", "Alice")])).unwrap();

    let ResumeDecision::ChoiceRequired(pending) = h.resolver.begin(&form).await else {
        panic!("expected a choice");
    };
    let start = h.resolver.choose(pending, ResumeChoice::StartNew);

    assert_ne!(start.submission_id, previous);
    assert_eq!(start.origin, SessionOrigin::Fresh);
    assert_eq!(start.answers, form.blank_answers());
    assert_eq!(h.resolver.resolve_submission_id(FORM_ID), start.submission_id);
    assert!(!h.store.contains(&answers_key(FORM_ID, &previous)));
}

#[tokio::test]
async fn start_over_without_previous_mints_new_id() {
    let h = harness();
    let form = repeatable_form();
    let start = h.resolver.start_over(&form);
    assert_eq!(start.submission_id, "sub-1");
    assert_eq!(h.resolver.resolve_submission_id(FORM_ID), "sub-1");
}

#[test]
fn file_store_keeps_identity_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let fake = Arc::new(FakeFormService::new());

    let first = {
        let store = Arc::new(FileStore::open(&path).unwrap());
        SubmissionResolver::new(fake.clone(), store, Arc::new(ids("run1"))).resolve_submission_id(FORM_ID)
    };
    let store = Arc::new(FileStore::open(&path).unwrap());
    let second = SubmissionResolver::new(fake, store.clone(), Arc::new(ids("run2")))
        .resolve_submission_id(FORM_ID);

    assert_eq!(first, second);
    assert_eq!(load_cached_answers(store.as_ref(), FORM_ID, &first).unwrap(), None);
}
