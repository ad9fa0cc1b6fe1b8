//! ICS document building and serialization.
//!
//! Titles are truncated twice on purpose: `build` cuts them in the model with
//! a single `…`, and `serialize` clips the rendered SUMMARY lines again with
//! `...` so the output text honours the limit whatever the renderer did.

mod build;
mod render;
mod timezone;

pub use build::{
    BuildOptions, BuiltDocument, CalendarDocument, ICS_VERSION, PRODUCT_ID, TITLE_ELLIPSIS, build,
    build_event, truncate_title,
};
pub use render::{POST_PASS_MARKER, enforce_title_limit, render, serialize};
pub use timezone::{OffsetRule, RuleKind, TimezoneDefinition};
