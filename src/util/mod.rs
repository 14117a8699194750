//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: Base URL checks before any bearer token is sent
//! - **Text processing**: Control-character stripping, case-insensitive matching
//!   and read-time estimates
//!
//! # Examples
//!
//! ```
//! use farmfeed::util::{contains_ignore_case, read_time_minutes, validate_base_url};
//!
//! let url = validate_base_url("https://api.example.com").unwrap();
//! assert!(contains_ignore_case("Organic Maize", "maize"));
//! assert_eq!(read_time_minutes("short story"), 1);
//! ```

mod text;
mod url_validator;

pub use text::{contains_ignore_case, read_time_minutes, strip_control_chars};
pub use url_validator::{validate_base_url, UrlValidationError};
