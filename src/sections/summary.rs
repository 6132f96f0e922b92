// src/sections/summary.rs
use super::identity::{extract_identity, ProfileIdentity};
use super::line::{render_line, LineKind};
use super::parser::{parse_sections, SectionPolicy, Sections};
use serde::Serialize;

/// Text used by "copy full summary": each title followed by its body, sections
/// separated by a blank line.
pub fn full_summary_text(sections: &Sections) -> String {
    sections
        .iter()
        .map(|section| {
            if section.body.is_empty() {
                section.title.clone()
            } else {
                format!("{}\n{}", section.title, section.body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedSection {
    pub title: String,
    pub body: String,
    pub lines: Vec<LineKind>,
}

/// Everything the presentation layer needs to show one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct LeadSummary {
    pub identity: ProfileIdentity,
    pub policy: SectionPolicy,
    pub sections: Vec<RenderedSection>,
    pub full_text: String,
}

impl LeadSummary {
    pub fn from_profile_text(text: &str, policy: SectionPolicy) -> Self {
        let sections = parse_sections(text, policy);
        Self::from_sections(&sections, policy)
    }

    pub fn from_sections(sections: &Sections, policy: SectionPolicy) -> Self {
        let rendered = sections
            .iter()
            .map(|section| RenderedSection {
                title: section.title.clone(),
                body: section.body.clone(),
                lines: section.body_lines().map(render_line).collect(),
            })
            .collect();

        Self {
            identity: extract_identity(sections),
            policy,
            sections: rendered,
            full_text: full_summary_text(sections),
        }
    }
}
