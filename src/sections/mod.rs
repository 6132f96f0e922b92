// src/sections/mod.rs
//! Turns the free-form `profile_data` text returned by the analysis service
//! into titled sections, a positional identity and classified lines.
//!
//! Everything here is pure: no I/O, no shared state, nothing can fail.

pub mod identity;
pub mod line;
pub mod parser;
pub mod summary;

pub use identity::{extract_identity, ProfileIdentity, IDENTITY_PLACEHOLDER};
pub use line::{render_line, LineKind};
pub use parser::{parse_sections, Section, SectionPolicy, Sections, MISC_SECTION_TITLE};
pub use summary::{full_summary_text, LeadSummary, RenderedSection};
