//! Greenhouse telemetry engine
//!
//! Ties a [`greenhouse_connectors::DataProvider`] to the pipeline in
//! [`greenhouse_core`] and publishes a [`DisplayView`] for the display layer.
//!
//! ```text
//! provider ──events──► Scheduler ──records──► RecordStore
//!                          │
//!                          └──► watch<DisplayView> ──► display
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use greenhouse_connectors::{WebSocketConfig, WebSocketProvider};
//! use greenhouse_core::MemoryStore;
//! use greenhouse_engine::{Engine, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = WebSocketProvider::new(WebSocketConfig::new("ws://controller.local:8080"))?;
//! let engine = Engine::spawn(EngineConfig::default(), provider, MemoryStore::new())?;
//!
//! let mut view = engine.view();
//! view.changed().await?;
//! println!("state: {}", view.borrow().connection_state);
//!
//! let (_final_view, store) = engine.shutdown().await?;
//! println!("stored {} records", store.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod view;

pub use config::{ChannelAlphas, EngineConfig};
pub use engine::{Engine, EngineHandle};
pub use error::{ConfigError, EngineError, EngineResult};
pub use scheduler::{Scheduler, TickSummary};
pub use view::{Counters, DeviceEvent, DisplayView};
