//! Core domain types and shared logic for the Folio CMS.
//!
//! This crate holds everything that does not touch the database or HTTP:
//! - Account enums and field validation
//! - Password hashing and session tokens
//! - Slugs, taxonomy colors and document field rules
//! - Comment threading
//! - Configuration

pub mod comment;
pub mod config;
pub mod document;
pub mod error;
pub mod password;
pub mod session;
pub mod slug;
pub mod taxonomy;
pub mod user;

pub use comment::{Thread, Threaded, build_threads};
pub use error::{Error, Result};
pub use session::{SessionToken, hash_session_token};
pub use user::{MembershipLevel, UserStatus};
