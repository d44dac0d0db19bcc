//! Core monitoring logic.
//!
//! This module contains the input event seam, the per-event activity
//! classification and the periodic update loop.

pub mod activity;
pub mod input;
pub mod ticker;

pub use activity::*;
pub use input::*;
pub use ticker::*;
