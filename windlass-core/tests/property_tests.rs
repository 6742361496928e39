//! Property and scenario tests for the Windlass core library
//!
//! These exercise the public API the way the dashboard does: gate admission
//! under contention, the streaming sentinel protocol under arbitrary frame
//! boundaries, and the delta telemetry engine across poll sequences.

// Allow common test patterns that Clippy warns about
#![allow(clippy::redundant_clone)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::float_cmp)]

mod properties;
