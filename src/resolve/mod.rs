//! Resolution layer turning catalog source rows into derived rows
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Propagator  │────▶│ Materializer │────▶│ CompatStorer│
//! │ (schedule)  │     │  (persist)   │     │  (storage)  │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                            │                    ▲
//!                            ▼                    │
//!                     ┌──────────────┐     ┌─────────────┐
//!                     │   Resolver   │     │  Projector  │
//!                     │ (evaluate)   │     │  (latest)   │
//!                     └──────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`resolver`]: Pure constraint evaluation over candidate lists
//! - [`materializer`]: Atomic replacement of derived rows per owner
//! - [`propagator`]: Change events to recomputation targets
//! - [`cycle`]: Dependency cycle detection before requirement writes
//! - [`projector`]: Newest matching release per target artifact
//! - [`error`]: Engine error types

pub mod cycle;
pub mod error;
pub mod materializer;
pub mod projector;
pub mod propagator;
pub mod resolver;
