//! Required-field validation
//!
//! A field fails validation when it is required and its stored value is
//! absent or the empty string. Type-specific formats are not checked.

use crate::types::{Answers, Card, Form, REQUIRED_MESSAGE};
use indexmap::IndexMap;

/// Validation messages keyed by field id
pub type FieldErrors = IndexMap<String, String>;

/// Errors for the required fields of one card
#[must_use]
pub fn validate_card(card: &Card, answers: &Answers) -> FieldErrors {
    card.fields
        .iter()
        .filter(|f| f.required && f.collects_answer())
        .filter(|f| answers.is_empty_value(&f.field_id))
        .map(|f| (f.field_id.clone(), REQUIRED_MESSAGE.to_string()))
        .collect()
}

/// Errors for the required fields of every card
#[must_use]
pub fn validate_all(form: &Form, answers: &Answers) -> FieldErrors {
    form.cards
        .iter()
        .flat_map(|card| validate_card(card, answers))
        .collect()
}
