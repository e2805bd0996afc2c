//! Dashboard player - a virtual media player for wall-mounted dashboards.
//!
//! The player mediates between a dashboard front-end and the media sources of
//! its host. It provides:
//!
//! - Media identifier resolution (plain URLs, local library, host media sources)
//! - An optional content-addressed local cache of remote media
//! - Playback state with media-type aware repeat/shuffle policy
//! - A feedback watchdog that drops stale progress when the front-end goes quiet
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dashboard_player::{
//!     config::PlayerConfig,
//!     services::player::{PassthroughHost, PlayerService},
//!     snapshot_store::MemorySnapshotStore,
//! };
//!
//! # async fn run() -> Result<(), dashboard_player::services::player::PlayerError> {
//! let player = PlayerService::from_config(
//!     &PlayerConfig::default(),
//!     Arc::new(PassthroughHost),
//!     reqwest::Client::new(),
//!     Arc::new(MemorySnapshotStore::default()),
//! )
//! .await?;
//!
//! let snapshot = player.play_media("video/mp4", "https://example.com/clip.mp4").await?;
//! println!("now {}", snapshot.state);
//! # Ok(())
//! # }
//! ```

/// Configuration schema definitions and validation.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Player services and their shared building blocks.
pub mod services;

/// Persistence of published player snapshots.
pub mod snapshot_store;

/// Tracing subscriber setup.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use core::{DashboardError, Result};
