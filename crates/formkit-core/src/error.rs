//! Error types for formkit core
//!
//! Builder edits are rejected, never partially applied, when they would
//! break a structural invariant of the form.

/// Builder edit errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// No card with this id
    #[error("card not found: {0}")]
    CardNotFound(String),

    /// No field with this id
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// A form keeps at least one card
    #[error("cannot remove the last card of a form")]
    LastCard,

    /// A choice field keeps at least one option
    #[error("cannot remove the last option of field {0}")]
    LastOption(String),

    /// Option index out of range
    #[error("field {field_id} has no option at index {index}")]
    OptionOutOfRange { field_id: String, index: usize },

    /// Position out of range for a move
    #[error("position {index} out of range (len {len})")]
    PositionOutOfRange { index: usize, len: usize },

    /// Options edited on a field without options
    #[error("field {0} is not a choice field")]
    NotAChoiceField(String),

    /// Bounds edited on a non-number field
    #[error("field {0} is not a number field")]
    NotANumberField(String),

    /// Bounds where min exceeds max
    #[error("invalid bounds: min {min} > max {max}")]
    InvalidBounds { min: f64, max: f64 },

    /// NaN or infinite bound
    #[error("bound must be a finite number, got {0}")]
    NonFiniteBound(f64),

    /// Empty or whitespace-only name
    #[error("form name cannot be empty")]
    EmptyName,
}

impl EditError {
    /// Whether the edit referenced something that does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CardNotFound(_) | Self::FieldNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_error_display() {
        let err = EditError::LastOption("q1".to_string());
        assert!(err.to_string().contains("last option"));
    }

    #[test]
    fn edit_error_not_found() {
        assert!(EditError::CardNotFound("c".into()).is_not_found());
        assert!(!EditError::LastCard.is_not_found());
    }
}
