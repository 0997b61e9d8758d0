//! Builder autosave behavior against the in-memory service

use formkit_client::{FormService, ServiceError};
use formkit_core::{EditError, FieldType, Form};
use formkit_runtime::{AutosaveConfig, BuilderController, SaveOutcome, SaveStatus};
use formkit_test_utils::{choice_form, ids, two_card_form, FakeFormService, Operation, FORM_ID};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn builder_for(fake: &Arc<FakeFormService>, form: Form) -> BuilderController {
    BuilderController::new(form, fake.clone(), Arc::new(ids("new")), AutosaveConfig::default())
}

fn fake_with(form: &Form) -> Arc<FakeFormService> {
    Arc::new(FakeFormService::new().with_form(form.clone()))
}

async fn wait_for_calls(fake: &FakeFormService, op: Operation, count: usize) {
    while fake.calls(op) < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn identity_update_keeps_draft_clean() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    builder.update_local_form(|form| form);

    assert!(!builder.has_changes());
    assert_eq!(builder.status(), SaveStatus::Saved);
    assert!(!builder.save_pending());
}

#[tokio::test(start_paused = true)]
async fn card_title_edit_saves_once() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    builder
        .edit(|form| form.set_card_title("card-1", "Who are you?"))
        .unwrap();
    assert!(builder.has_changes());
    assert_eq!(builder.status(), SaveStatus::Unsaved);

    assert_eq!(builder.save_form().await, SaveOutcome::Saved);
    assert!(!builder.has_changes());
    assert_eq!(builder.status(), SaveStatus::Saved);

    assert_eq!(builder.save_form().await, SaveOutcome::Clean);
    assert_eq!(fake.calls(Operation::UpdateForm), 1);

    let stored = fake.stored_form(FORM_ID).unwrap();
    assert_eq!(stored.cards[0].title, "Who are you?");
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_saves_after_quiet_period() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    for i in 0..5 {
        builder
            .edit(|form| form.set_label("name", format!("Name {i}")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(fake.calls(Operation::UpdateForm), 0);

    tokio::time::sleep(Duration::from_millis(799)).await;
    assert_eq!(fake.calls(Operation::UpdateForm), 0);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(fake.calls(Operation::UpdateForm), 1);
    assert_eq!(builder.status(), SaveStatus::Saved);
    assert_eq!(fake.updates()[0].cards[0].fields[0].label, "Name 4");
}

#[tokio::test(start_paused = true)]
async fn option_only_edit_is_a_change() {
    let form = choice_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    builder.edit(|form| form.add_option("pick", "Maybe")).unwrap();
    assert!(builder.has_changes());
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_draft_dirty() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);
    fake.fail_next(Operation::UpdateForm, 1, ServiceError::status(500, "boom"));

    builder.edit(|form| form.rename("Renamed")).unwrap();
    let outcome = builder.save_form().await;

    assert!(matches!(outcome, SaveOutcome::Failed(ServiceError::Status { status: 500, .. })));
    assert!(builder.has_changes());
    assert_eq!(builder.status(), SaveStatus::Unsaved);
    assert_eq!(builder.form().name, "Renamed");
    assert_eq!(builder.saved_form().name, "Feedback");

    assert_eq!(builder.save_form().await, SaveOutcome::Saved);
    assert!(!builder.has_changes());
}

#[tokio::test(start_paused = true)]
async fn only_one_save_in_flight() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);
    fake.hold(Operation::UpdateForm);

    builder.edit(|form| form.rename("First")).unwrap();
    let background = builder.clone();
    let first = tokio::spawn(async move { background.save_form().await });
    wait_for_calls(&fake, Operation::UpdateForm, 1).await;
    assert_eq!(builder.status(), SaveStatus::Saving);

    assert_eq!(builder.save_form().await, SaveOutcome::InFlight);
    builder.edit(|form| form.rename("Second")).unwrap();
    assert_eq!(builder.save_form().await, SaveOutcome::InFlight);
    assert_eq!(fake.calls(Operation::UpdateForm), 1);

    fake.open(Operation::UpdateForm);
    assert_eq!(first.await.unwrap(), SaveOutcome::Saved);
    assert_eq!(builder.saved_form().name, "First");
    assert!(builder.has_changes());
    assert_eq!(builder.status(), SaveStatus::Unsaved);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(fake.calls(Operation::UpdateForm), 2);
    assert_eq!(fake.max_in_flight(), 1);
    assert!(!builder.has_changes());
    assert_eq!(fake.stored_form(FORM_ID).unwrap().name, "Second");
}

#[tokio::test(start_paused = true)]
async fn flush_waits_out_save_in_flight() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);
    fake.hold(Operation::UpdateForm);

    builder.edit(|form| form.rename("First")).unwrap();
    let background = builder.clone();
    let first = tokio::spawn(async move { background.save_form().await });
    wait_for_calls(&fake, Operation::UpdateForm, 1).await;

    builder.edit(|form| form.rename("Second")).unwrap();
    let flusher = builder.clone();
    let flush = tokio::spawn(async move { flusher.flush().await });
    tokio::task::yield_now().await;
    fake.open(Operation::UpdateForm);

    assert_eq!(first.await.unwrap(), SaveOutcome::Saved);
    assert_eq!(flush.await.unwrap(), SaveOutcome::Saved);
    assert!(!builder.has_changes());
    assert!(!builder.save_pending());
    assert_eq!(fake.stored_form(FORM_ID).unwrap().name, "Second");
}

#[tokio::test(start_paused = true)]
async fn late_response_after_close_is_ignored() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);
    fake.hold(Operation::UpdateForm);

    builder.edit(|form| form.rename("Late")).unwrap();
    let background = builder.clone();
    let save = tokio::spawn(async move { background.save_form().await });
    wait_for_calls(&fake, Operation::UpdateForm, 1).await;

    let status = builder.subscribe_status();
    assert_eq!(*status.borrow(), SaveStatus::Saving);
    builder.close();
    fake.open(Operation::UpdateForm);
    save.await.unwrap();

    assert!(builder.is_closed());
    assert_eq!(builder.saved_form().name, "Feedback");
    assert_eq!(builder.status(), SaveStatus::Unsaved);
    assert_eq!(*status.borrow(), SaveStatus::Unsaved);
    assert_eq!(builder.save_form().await, SaveOutcome::Closed);
}

#[tokio::test(start_paused = true)]
async fn nan_bound_cannot_keep_draft_dirty() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    let n = builder.add_field("card-1", FieldType::Number).unwrap();
    let err = builder
        .edit(|form| form.set_number_bounds(&n, Some(f64::NAN), None))
        .unwrap_err();
    assert!(matches!(err, EditError::NonFiniteBound(_)));

    assert_eq!(builder.save_form().await, SaveOutcome::Saved);
    assert!(!builder.has_changes());

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(fake.calls(Operation::UpdateForm), 1);
    assert_eq!(builder.status(), SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_autosave() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    builder.edit(|form| form.rename("Never sent")).unwrap();
    assert!(builder.save_pending());
    builder.close();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fake.calls(Operation::UpdateForm), 0);
}

#[tokio::test(start_paused = true)]
async fn load_and_add_field() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = BuilderController::load(
        FORM_ID,
        fake.clone(),
        Arc::new(ids("new")),
        AutosaveConfig::default().with_delay(Duration::from_millis(50)),
    )
    .await
    .unwrap();
    assert_eq!(builder.form(), form);

    let field_id = builder
        .add_field("card-2", formkit_core::FieldType::Email)
        .unwrap();
    assert_eq!(builder.current_card_id(), "card-2");
    assert_eq!(builder.current_field_id(), Some(field_id.clone()));

    tokio::time::sleep(Duration::from_millis(60)).await;
    let stored = fake.stored_form(FORM_ID).unwrap();
    assert!(stored.field(&field_id).is_some());
}

#[tokio::test(start_paused = true)]
async fn removing_selected_card_moves_selection() {
    let form = two_card_form();
    let fake = fake_with(&form);
    let builder = builder_for(&fake, form);

    builder.select_field(Some("notes")).unwrap();
    assert_eq!(builder.current_card_id(), "card-2");

    builder.edit(|form| form.remove_card("card-2")).unwrap();
    assert_eq!(builder.current_card_id(), "card-1");
    assert_eq!(builder.current_field_id(), None);
}

#[tokio::test(start_paused = true)]
async fn load_missing_form_is_not_found() {
    let fake = Arc::new(FakeFormService::new());
    let err = BuilderController::load("nope", fake, Arc::new(ids("x")), AutosaveConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

mod exact_calls {
    use super::*;
    use async_trait::async_trait;
    use formkit_client::{PageRequest, SubmissionRecord, SubmitPayload};
    use formkit_core::{Answers, FormSummary};
    use mockall::mock;
    use pretty_assertions::assert_eq;

    mock! {
        pub Service {}

        #[async_trait]
        impl FormService for Service {
            async fn get_form(&self, form_id: &str, custom: bool) -> Result<Form, ServiceError>;
            async fn create_form(&self, form: &Form) -> Result<String, ServiceError>;
            async fn update_form(&self, form: &Form) -> Result<Form, ServiceError>;
            async fn delete_form(&self, form_id: &str) -> Result<(), ServiceError>;
            async fn list_forms(&self, page: PageRequest) -> Result<Vec<FormSummary>, ServiceError>;
            async fn submit(&self, form_id: &str, payload: &SubmitPayload) -> Result<(), ServiceError>;
            async fn get_submission(&self, form_id: &str, submission_id: &str) -> Result<Answers, ServiceError>;
            async fn list_submissions(&self, form_id: &str, page: PageRequest) -> Result<Vec<SubmissionRecord>, ServiceError>;
        }
    }

    impl std::fmt::Debug for MockService {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockService").finish()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_save_makes_no_request() {
        let mut service = MockService::new();
        service
            .expect_update_form()
            .times(1)
            .returning(|form| Ok(form.clone()));

        let builder = BuilderController::new(
            two_card_form(),
            Arc::new(service),
            Arc::new(ids("new")),
            AutosaveConfig::default(),
        );
        builder
            .edit(|form| form.set_card_title("card-2", "Extra"))
            .unwrap();

        assert_eq!(builder.flush().await, SaveOutcome::Saved);
        assert_eq!(builder.save_form().await, SaveOutcome::Clean);
        assert_eq!(builder.flush().await, SaveOutcome::Clean);
    }
}
