//! Synchronization core for a collaborative multi-page whiteboard.
//!
//! This crate owns the client-side replica of a board document: the page and
//! item model, causal ordering of edits via vector clocks, transactional
//! undo/redo, buffering of outbound operations while offline, and the
//! ephemeral laser-pointer presence channel. It contains no I/O and no
//! timers — the host wires it to a transport and a clock, and subscribes to
//! [`session::BoardEvent`]s for rendering.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Top-level [`session::BoardSession`]: mutations, remote deltas, events |
//! | [`doc`] | Pages, strokes, assets, and groups |
//! | [`clock`] | Vector clock and concurrency detection |
//! | [`history`] | Invertible history entries and the undo/redo stacks |
//! | [`pages`] | Page-list operations (add/delete/rename/reorder) |
//! | [`queue`] | Bounded offline operation queue |
//! | [`presence`] | Throttled laser-pointer presence with stale sweep |
//! | [`throttle`] | Reusable drop-style throttle |
//! | [`sanitize`] | Text/URL sanitization gate for untrusted content |
//! | [`wire`] | Delta model and protobuf codec |
//! | [`consts`] | Shared numeric constants (caps, windows, thresholds) |

pub mod clock;
pub mod consts;
pub mod doc;
pub mod history;
pub mod pages;
pub mod presence;
pub mod queue;
pub mod sanitize;
pub mod session;
pub mod throttle;
pub mod wire;
