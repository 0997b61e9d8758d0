//! Testing utilities for formkit workspace
//!
//! Shared fixtures and an in-memory `FormService` fake.

#![allow(missing_docs)]

mod fake;

pub use fake::{FakeFormService, Operation};

use formkit_core::{Card, Field, FieldType, Form, SequentialIds};

pub const FORM_ID: &str = "form-1";

/// Two cards: a required `name` short text, then an optional `notes` long text
pub fn two_card_form() -> Form {
    let mut form = Form::new(FORM_ID, "Feedback", &SequentialIds::new("card"));
    form.cards = vec![
        Card::new("card-1", "About you").with_field(
            Field::with_defaults("name", FieldType::ShortText)
                .with_label("Name")
                .required(),
        ),
        Card::new("card-2", "Anything else?")
            .with_field(Field::with_defaults("notes", FieldType::LongText).with_label("Notes")),
    ];
    form
}

/// Same form with multiple submissions allowed
pub fn repeatable_form() -> Form {
    let mut form = two_card_form();
    form.multiple_submissions = Some(true);
    form
}

/// Same form restricted to one submission per respondent
pub fn single_submission_form() -> Form {
    let mut form = two_card_form();
    form.multiple_submissions = Some(false);
    form
}

/// One card with optional fields `a`, `b`, `c`
pub fn abc_form() -> Form {
    let mut form = Form::new("form-abc", "ABC", &SequentialIds::new("card"));
    form.cards = vec![Card::new("card-1", "Letters")
        .with_field(Field::with_defaults("a", FieldType::ShortText).with_label("A"))
        .with_field(Field::with_defaults("b", FieldType::ShortText).with_label("B"))
        .with_field(Field::with_defaults("c", FieldType::ShortText).with_label("C"))];
    form
}

/// A form with a choice field, for option edits
pub fn choice_form() -> Form {
    let mut form = Form::new("form-choice", "Poll", &SequentialIds::new("card"));
    form.cards = vec![Card::new("card-1", "Vote")
        .with_field(Field::with_defaults("pick", FieldType::MultipleChoice).with_label("Pick one"))];
    form
}

/// Id generator for tests: `"{prefix}-1"`, `"{prefix}-2"`, ...
pub fn ids(prefix: &str) -> SequentialIds {
    SequentialIds::new(prefix)
}
