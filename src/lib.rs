//! # vibescope
//!
//! A YouTube trend cache and aggregation service.
//!
//! vibescope keeps per-region snapshots of the YouTube trending chart fresh
//! behind a TTL, reduces ad-hoc keyword searches into summary statistics,
//! annotates them with an LLM-produced narrative (with a deterministic
//! heuristic fallback), and serves everything through a small JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────┐
//! │ YouTube API  │──▶│ TrendCache  │──▶│  SQLite    │
//! │ chart/search │   │ score+agg   │   │ batches    │
//! └──────────────┘   └──────┬──────┘   └─────┬─────┘
//!                           │                │
//!                    ┌──────▼──────┐   ┌─────▼─────┐
//!                    │ Annotation  │   │   HTTP    │
//!                    │ model+fall. │   │  (axum)   │
//!                    └─────────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vibescope init                # create database
//! vibescope serve               # start the trend API
//! vibescope refresh             # run the retention janitor once
//! vibescope stats               # inspect cache state
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and wire shapes |
//! | [`error`] | Error taxonomy |
//! | [`youtube`] | YouTube Data API client |
//! | [`score`] | Vibe-score heuristics |
//! | [`aggregate`] | Video-list reduction |
//! | [`annotate`] | Model annotation with fallback |
//! | [`cache`] | Refresh-and-serve orchestration |
//! | [`janitor`] | Retention cleanup |
//! | [`server`] | HTTP API |
//! | [`stats`] | Cache statistics CLI command |
//! | [`store`] | Storage abstraction (SQLite + in-memory) |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod annotate;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod janitor;
pub mod migrate;
pub mod models;
pub mod score;
pub mod server;
pub mod stats;
pub mod store;
pub mod youtube;
