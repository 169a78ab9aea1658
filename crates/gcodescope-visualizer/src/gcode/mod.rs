//! G-Code model types
//!
//! This module provides:
//! - Line splitting with cumulative byte percentages
//! - Command, layer and locator types shared by the worker and the model

pub mod command;
pub mod lines;

pub use command::*;
pub use lines::*;
