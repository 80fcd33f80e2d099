//! Library crate for userdir-manager.
//!
//! This crate exposes the building blocks of the TUI:
//! - User service port and HTTP adapter (`api`)
//! - Directory controller owning the in-memory user list (`directory`)
//! - Case-insensitive search filter (`search`)
//! - Application state and update loop (`app`)
//! - UI rendering and widgets (`ui`)
//! - CLI, config directory and logging setup (`config`)
//! - Error and result types (`error`)
//!
//! It is used by the `userdir-manager` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod search;
pub mod ui;

// Re-export commonly used items at the crate root for convenience
pub use api::{HttpUserApi, NewUser, UserApi, UserField, UserId, UserRecord};
pub use directory::{Completion, DirectoryState, Operation, Request, UserDirectory};
pub use error::{ApiError, Result};
