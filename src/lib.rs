pub mod admin_cli;
pub mod auth;
pub mod core;
pub mod linkedin_analysis;
pub mod logging;
pub mod sections;
pub mod utils;
pub mod web;

pub use sections::{
    extract_identity, full_summary_text, parse_sections, render_line, LeadSummary, LineKind,
    ProfileIdentity, Section, SectionPolicy, Sections,
};
pub use web::start_web_server;
