//! Builder edit operations
//!
//! Every edit the builder offers, as an operation on `&mut Form`:
//! - Card add/remove/reorder and card text
//! - Field add/remove/reorder and field attributes
//! - Choice options (a choice field never loses its last option)
//! - Form-level name, status and settings
//!
//! An edit that returns `Err` leaves the form untouched.

use crate::error::EditError;
use crate::ids::IdGenerator;
use crate::types::{Card, Field, FieldKind, FieldType, Form, FormStatus, OgMetadata};

/// Re-splice `items` so the element at `from` ends up at `to`
fn splice_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), EditError> {
    let len = items.len();
    if from >= len {
        return Err(EditError::PositionOutOfRange { index: from, len });
    }
    if to >= len {
        return Err(EditError::PositionOutOfRange { index: to, len });
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

impl Form {
    fn require_card_mut(&mut self, card_id: &str) -> Result<&mut Card, EditError> {
        self.card_mut(card_id)
            .ok_or_else(|| EditError::CardNotFound(card_id.to_string()))
    }

    fn require_field_mut(&mut self, field_id: &str) -> Result<&mut Field, EditError> {
        self.field_mut(field_id)
            .ok_or_else(|| EditError::FieldNotFound(field_id.to_string()))
    }

    fn options_mut(&mut self, field_id: &str) -> Result<&mut Vec<String>, EditError> {
        let field = self.require_field_mut(field_id)?;
        match &mut field.kind {
            FieldKind::MultipleChoice { options } | FieldKind::MultipleSelect { options } => {
                Ok(options)
            }
            _ => Err(EditError::NotAChoiceField(field_id.to_string())),
        }
    }

    /// Rename the form; surrounding whitespace is trimmed
    ///
    /// # Errors
    /// - `EditError::EmptyName` if nothing remains after trimming
    pub fn rename(&mut self, name: &str) -> Result<(), EditError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EditError::EmptyName);
        }
        self.name = trimmed.to_string();
        Ok(())
    }

    /// Set the form description
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Set the publication status
    pub fn set_status(&mut self, status: FormStatus) {
        self.status = status;
    }

    /// Set share-preview metadata
    pub fn set_og_metadata(&mut self, metadata: OgMetadata) {
        self.og_metadata = Some(metadata);
    }

    /// Allow or forbid repeat submissions from one browser
    pub fn set_multiple_submissions(&mut self, allowed: bool) {
        self.multiple_submissions = Some(allowed);
    }

    /// Append a new empty card and return its id
    pub fn add_card(&mut self, ids: &dyn IdGenerator, title: impl Into<String>) -> String {
        let card_id = ids.generate();
        self.cards.push(Card::new(card_id.clone(), title));
        card_id
    }

    /// Remove a card and its fields
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown id
    /// - `EditError::LastCard` if it is the only card
    pub fn remove_card(&mut self, card_id: &str) -> Result<Card, EditError> {
        let idx = self
            .card_index(card_id)
            .ok_or_else(|| EditError::CardNotFound(card_id.to_string()))?;
        if self.cards.len() == 1 {
            return Err(EditError::LastCard);
        }
        Ok(self.cards.remove(idx))
    }

    /// Move the card at `from` to position `to`
    ///
    /// # Errors
    /// - `EditError::PositionOutOfRange` if either position is out of range
    pub fn move_card(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        splice_move(&mut self.cards, from, to)
    }

    /// Set a card's title
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown id
    pub fn set_card_title(&mut self, card_id: &str, title: impl Into<String>) -> Result<(), EditError> {
        self.require_card_mut(card_id)?.title = title.into();
        Ok(())
    }

    /// Set a card's description
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown id
    pub fn set_card_description(
        &mut self,
        card_id: &str,
        description: Option<String>,
    ) -> Result<(), EditError> {
        self.require_card_mut(card_id)?.description = description;
        Ok(())
    }

    /// Append a field with type defaults to a card and return its id
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown card
    pub fn add_field(
        &mut self,
        card_id: &str,
        ids: &dyn IdGenerator,
        field_type: FieldType,
    ) -> Result<String, EditError> {
        let card = self.require_card_mut(card_id)?;
        let field_id = ids.generate();
        card.fields.push(Field::with_defaults(field_id.clone(), field_type));
        Ok(field_id)
    }

    /// Append a prepared field to a card
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown card
    pub fn push_field(&mut self, card_id: &str, field: Field) -> Result<(), EditError> {
        self.require_card_mut(card_id)?.fields.push(field);
        Ok(())
    }

    /// Remove a field from whichever card owns it
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` for an unknown id
    pub fn remove_field(&mut self, field_id: &str) -> Result<Field, EditError> {
        for card in &mut self.cards {
            if let Some(idx) = card.fields.iter().position(|f| f.field_id == field_id) {
                return Ok(card.fields.remove(idx));
            }
        }
        Err(EditError::FieldNotFound(field_id.to_string()))
    }

    /// Move a field within its card (drag-and-drop reorder)
    ///
    /// # Errors
    /// - `EditError::CardNotFound` for an unknown card
    /// - `EditError::PositionOutOfRange` if either position is out of range
    pub fn move_field(&mut self, card_id: &str, from: usize, to: usize) -> Result<(), EditError> {
        splice_move(&mut self.require_card_mut(card_id)?.fields, from, to)
    }

    /// Set a field's label
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` for an unknown id
    pub fn set_label(&mut self, field_id: &str, label: impl Into<String>) -> Result<(), EditError> {
        self.require_field_mut(field_id)?.label = label.into();
        Ok(())
    }

    /// Set a field's description
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` for an unknown id
    pub fn set_field_description(
        &mut self,
        field_id: &str,
        description: Option<String>,
    ) -> Result<(), EditError> {
        self.require_field_mut(field_id)?.description = description;
        Ok(())
    }

    /// Set a field's required flag
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` for an unknown id
    pub fn set_required(&mut self, field_id: &str, required: bool) -> Result<(), EditError> {
        self.require_field_mut(field_id)?.required = required;
        Ok(())
    }

    /// Append an option to a choice field
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` / `EditError::NotAChoiceField`
    pub fn add_option(&mut self, field_id: &str, option: impl Into<String>) -> Result<(), EditError> {
        self.options_mut(field_id)?.push(option.into());
        Ok(())
    }

    /// Replace the text of an option
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` / `EditError::NotAChoiceField`
    /// - `EditError::OptionOutOfRange` for a bad index
    pub fn set_option(
        &mut self,
        field_id: &str,
        index: usize,
        option: impl Into<String>,
    ) -> Result<(), EditError> {
        let options = self.options_mut(field_id)?;
        let slot = options.get_mut(index).ok_or_else(|| EditError::OptionOutOfRange {
            field_id: field_id.to_string(),
            index,
        })?;
        *slot = option.into();
        Ok(())
    }

    /// Remove an option from a choice field
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` / `EditError::NotAChoiceField`
    /// - `EditError::OptionOutOfRange` for a bad index
    /// - `EditError::LastOption` when only one option remains
    pub fn remove_option(&mut self, field_id: &str, index: usize) -> Result<String, EditError> {
        let options = self.options_mut(field_id)?;
        if index >= options.len() {
            return Err(EditError::OptionOutOfRange {
                field_id: field_id.to_string(),
                index,
            });
        }
        if options.len() == 1 {
            return Err(EditError::LastOption(field_id.to_string()));
        }
        Ok(options.remove(index))
    }

    /// Set the bounds of a number field
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` / `EditError::NotANumberField`
    /// - `EditError::NonFiniteBound` for NaN or infinite bounds
    /// - `EditError::InvalidBounds` when `min > max`
    pub fn set_number_bounds(
        &mut self,
        field_id: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), EditError> {
        if let Some(bound) = min.into_iter().chain(max).find(|b| !b.is_finite()) {
            return Err(EditError::NonFiniteBound(bound));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(EditError::InvalidBounds { min: lo, max: hi });
            }
        }
        let field = self.require_field_mut(field_id)?;
        match &mut field.kind {
            FieldKind::Number { min: lo, max: hi } => {
                *lo = min;
                *hi = max;
                Ok(())
            }
            _ => Err(EditError::NotANumberField(field_id.to_string())),
        }
    }
}
