//! Application-level orchestration utilities.
//!
//! This module owns run lifecycle control (start/cancel/quit) and the checks and
//! processing around a run, such as path validation and exit-code reporting.
//! UI/CLI layers call into this module to keep responsibilities separated.

#[cfg(feature = "tui")]
mod controller;
mod post_process;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::{prepare_run, process_run_completion};
