// src/sections/identity.rs
use super::parser::Sections;
use serde::{Deserialize, Serialize};

pub const IDENTITY_PLACEHOLDER: &str = "-";

/// Name, role and company shown on top of a lead summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIdentity {
    pub name: String,
    pub title: String,
    pub company: String,
}

impl Default for ProfileIdentity {
    fn default() -> Self {
        Self {
            name: IDENTITY_PLACEHOLDER.to_string(),
            title: IDENTITY_PLACEHOLDER.to_string(),
            company: IDENTITY_PLACEHOLDER.to_string(),
        }
    }
}

/// Read name/title/company from lines 0, 1 and 2 of the first section body.
///
/// Extraction is positional only. If the upstream text reorders those lines the
/// result is wrong but plausible; callers rely on this staying stable for
/// analyses that are already stored.
pub fn extract_identity(sections: &Sections) -> ProfileIdentity {
    let Some(first) = sections.first() else {
        return ProfileIdentity::default();
    };

    let mut lines = first.body_lines().map(clean_identity_line);
    let mut next_field = || {
        lines
            .next()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| IDENTITY_PLACEHOLDER.to_string())
    };

    let name = next_field();
    let title = next_field();
    let company = next_field();

    ProfileIdentity {
        name,
        title,
        company,
    }
}

fn clean_identity_line(line: &str) -> String {
    let line = line.trim();
    line.strip_prefix("- ").unwrap_or(line).trim().to_string()
}
