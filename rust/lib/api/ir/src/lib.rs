//! Stub generator Intermediate Representation (IR)
//!
//! Data structures shared between:
//! - the generator library (type catalog, emitters, orchestrator)
//! - the `stubgen` binary (loads a project from JSON)
//!
//! Layers:
//! 1. Types:   field kinds and parameter directions
//! 2. Model:   structs, couplets and remote calls
//! 3. DAV:     raw and resolved field constraints
//! 4. DB:      sibling database projects for cross references
//! 5. Project: aggregates all of the above

pub mod types;
pub mod model;
pub mod dav;
pub mod db;
pub mod project;

pub use types::*;
pub use model::*;
pub use dav::*;
pub use db::*;
pub use project::*;
