//! # Ticket Search Gateway
//!
//! A thin HTTP gateway in front of a full-text search engine holding support
//! tickets. It shapes free-text queries into a boosted multi-field engine
//! query, normalizes the engine's answer, and proxies readiness and
//! status-update calls to the external indexing service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │  Client  │──▶│           Gateway            │──▶│  Engine  │
//! │  (tsg)   │   │ query builder ▸ result shaper│   │ (_search)│
//! └──────────┘   └──────────────┬───────────────┘   └──────────┘
//!                               │ /ready, /update-status
//!                               ▼
//!                         ┌──────────┐
//!                         │ Indexer  │
//!                         └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`models`] | Tickets, search requests and response payloads |
//! | [`query`] | Query builder |
//! | [`shape`] | Result shaper |
//! | [`engine`] | Search engine trait and HTTP backend |
//! | [`indexer`] | Indexing/status service trait and HTTP backend |
//! | [`error`] | Gateway error kinds |
//! | [`gateway`] | Search / ready / update-status orchestration |
//! | [`server`] | HTTP surface |
//! | [`client`] | Gateway client and readiness poller |
//! | [`view`] | Client view state and terminal rendering |

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod indexer;
pub mod models;
pub mod query;
pub mod server;
pub mod shape;
pub mod view;
