//! # Synchronization Primitives
//!
//! Hand-off structures between producer threads and the command stage.

pub mod activation;

pub use activation::{ActivationQueue, DrainFlags};
