//! formkit Client - the remote Form/Submission Service
//!
//! - `FormService`: every operation the controllers consume
//! - `HttpFormService`: JSON-over-HTTP implementation (reqwest)
//! - `ClientConfig`: API location, timeouts, autosave delay, storage path
//! - Error classification (not-found, transient, permanent)

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod wire;

pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_AUTOSAVE_MS};
pub use error::{ConfigError, ServiceError};
pub use http::HttpFormService;
pub use service::{FormService, PageRequest, SubmissionRecord, SubmitPayload};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
