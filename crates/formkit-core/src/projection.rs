//! Comparable projection for change detection
//!
//! The builder decides whether the working copy needs saving by comparing a
//! reduced view of two forms rather than the whole value. Timestamps set by
//! the service are not part of the projection, so a save round-trip that only
//! bumps `updatedAt` does not register as an edit.
//!
//! Compared per form: status, name, description, settings, and positionally
//! per card (id, title, description) and per field (id, label, type,
//! required, description, type-specific attributes).

use crate::types::{Card, Field, FieldKind, FieldType, Form, FormStatus, OgMetadata};

/// Reduced view of a form used for equality
#[derive(Debug, Clone, PartialEq)]
pub struct FormProjection<'a> {
    status: FormStatus,
    name: &'a str,
    description: Option<&'a str>,
    multiple_submissions: Option<bool>,
    og_metadata: Option<&'a OgMetadata>,
    cards: Vec<CardProjection<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
struct CardProjection<'a> {
    id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    fields: Vec<FieldProjection<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
struct FieldProjection<'a> {
    id: &'a str,
    label: &'a str,
    field_type: FieldType,
    required: bool,
    description: Option<&'a str>,
    attributes: &'a FieldKind,
}

impl<'a> FormProjection<'a> {
    /// Project a form
    #[must_use]
    pub fn of(form: &'a Form) -> Self {
        Self {
            status: form.status,
            name: &form.name,
            description: form.description.as_deref(),
            multiple_submissions: form.multiple_submissions,
            og_metadata: form.og_metadata.as_ref(),
            cards: form.cards.iter().map(CardProjection::of).collect(),
        }
    }
}

impl<'a> CardProjection<'a> {
    fn of(card: &'a Card) -> Self {
        Self {
            id: &card.card_id,
            title: &card.title,
            description: card.description.as_deref(),
            fields: card.fields.iter().map(FieldProjection::of).collect(),
        }
    }
}

impl<'a> FieldProjection<'a> {
    fn of(field: &'a Field) -> Self {
        Self {
            id: &field.field_id,
            label: &field.label,
            field_type: field.field_type(),
            required: field.required,
            description: field.description.as_deref(),
            attributes: &field.kind,
        }
    }
}

/// Whether two forms are equal for autosave purposes
#[must_use]
pub fn forms_equal(a: &Form, b: &Form) -> bool {
    FormProjection::of(a) == FormProjection::of(b)
}
