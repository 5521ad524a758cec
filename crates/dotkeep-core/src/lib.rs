//! Declarative, selective and optionally encrypted dotfiles backup.
//!
//! `dotkeep-core` reads a [`Recipe`] describing files, folders and shell
//! commands, and mirrors them into a backup next to the recipe. Plain backups
//! are a directory tree; encrypted backups are a single AES-256-GCM sealed
//! archive whose key is derived from a password. Any subset of entries can be
//! backed up or restored without touching the rest.
//!
//! # Examples
//!
//! ```no_run
//! use dotkeep_core::{Engine, NoPassword, NoopProgress, RunConfig, TomlRecipeStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(RunConfig::new("1.0.0").with_home_dir(Some("/home/me".into())))?;
//! let store = TomlRecipeStore::new("/home/me/backups/dotkeep.toml");
//!
//! let report = engine.backup(&store, &["fish", "brew"], &mut NoPassword, &mut NoopProgress)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod atomic;
pub mod command;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod filter;
pub mod plain;
pub mod recipe;
pub mod report;
pub mod selection;
pub mod symlinks;
pub mod walker;
pub mod worker;

// Re-export main API types
pub use config::RunConfig;
pub use engine::Engine;
pub use engine::NoPassword;
pub use engine::PasswordProvider;
pub use engine::StaticPassword;
pub use error::DotkeepError;
pub use error::Result;
pub use recipe::CommandEntry;
pub use recipe::FileEntry;
pub use recipe::Recipe;
pub use recipe::RecipeStore;
pub use recipe::TomlRecipeStore;
pub use report::NoopProgress;
pub use report::Operation;
pub use report::ProgressCallback;
pub use report::ProgressEvent;
pub use report::RunMode;
pub use report::RunReport;
pub use worker::RunHandle;
