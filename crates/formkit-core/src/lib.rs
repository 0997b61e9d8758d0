//! formkit Core - form model and change detection
//!
//! Shared by the builder and the public filling flow:
//! - Forms, cards and typed fields with their wire format
//! - Builder edit operations that keep structural invariants
//! - The comparable projection used to decide whether a draft needs saving
//! - Answer mappings and required-field validation
//! - Injectable identifier generation
//!
//! # Example
//!
//! ```rust
//! use formkit_core::{forms_equal, FieldType, Form, UuidGenerator};
//!
//! let ids = UuidGenerator::new();
//! let saved = Form::new("f1", "Feedback", &ids);
//! let mut draft = saved.clone();
//!
//! let card = draft.cards[0].card_id.clone();
//! draft.add_field(&card, &ids, FieldType::Email).unwrap();
//!
//! assert!(!forms_equal(&saved, &draft));
//! ```

#![warn(unreachable_pub)]

pub mod edit;
pub mod error;
pub mod ids;
pub mod projection;
pub mod types;
pub mod validation;

pub use error::EditError;
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use projection::{forms_equal, FormProjection};
pub use types::{
    Answers, Card, Field, FieldKind, FieldType, Form, FormStatus, FormSummary, OgMetadata,
    REQUIRED_MESSAGE,
};
pub use validation::{validate_all, validate_card, FieldErrors};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
