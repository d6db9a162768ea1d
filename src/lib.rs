//! Skew engine — estimates the frequency-calibration skew of CW/RTTY
//! skimmers by correlating their spots against a set of trusted reference
//! stations.
//!
//! This crate provides:
//! - A band classifier and reference registry (§4.1, §4.2)
//! - A bounded spot window and admission policy (§4.3)
//! - A correlation engine and per-skimmer deviation table (§4.4, §4.5)
//! - An activity monitor and counter-wrap guard (§4.6, §4.7)
//! - A batch bootstrap analyzer over historical archives (§4.8)
//! - Skew snapshot construction for publication (§4.9)
//!
//! # Example
//!
//! ```rust
//! use skew_engine::{config::EngineConfig, reference::ReferenceRegistry, engine::Engine, stats::SkimmerStats};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let registry = ReferenceRegistry::parse("W1REF\n", config.max_ref);
//! let stats = Arc::new(SkimmerStats::new());
//! let mut engine = Engine::new(config, registry, stats);
//!
//! let frame = "14020.00|AA1A|W1REF|CQ|14020|20|25|CW|1|1700000000000|1700000000500|extra";
//! engine.handle_frame("PROD_SPOT", frame, 1_700_000_000);
//! ```

pub mod activity;
pub mod band;
pub mod bootstrap;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod metrics;
pub mod reference;
pub mod skimmer;
pub mod snapshot;
pub mod spot;
pub mod stats;
pub mod window;
pub mod wire;

pub use config::EngineConfig;
pub use engine::Engine;
pub use reference::ReferenceRegistry;
pub use skimmer::{Skimmer, SkimmerTable};
pub use spot::{Mode, Spot, SpotType};
pub use stats::{SkimmerStats, StatsSummary};
