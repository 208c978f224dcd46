//! souveraine-api: typed gateway to the IA Souveraine Burkina backend
//!
//! The backend performs retrieval-augmented generation, speech-to-text and
//! text-to-speech. This crate only speaks its HTTP contract: a liveness
//! probe, the intelligent chat exchange, voice chat and document upload.

pub mod error;
pub mod gateway;
pub mod http;
pub mod types;

pub use error::{Error, Result};
pub use gateway::Backend;
pub use http::{Endpoints, GatewayConfig, HttpGateway, resolve_url};
pub use types::*;
