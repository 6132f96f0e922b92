// src/sections/parser.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Title used for body lines that appear before any title line.
pub const MISC_SECTION_TITLE: &str = "Miscellaneous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines().filter(|line| !line.trim().is_empty())
    }
}

/// How the analysis text is cut into sections.
///
/// A deployment picks one of these and uses it everywhere; results from the
/// two policies are not interchangeable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionPolicy {
    /// Blank-line delimited blocks, first line of each block is the title.
    /// Repeated titles stay separate entries.
    Blocks,
    /// Lines without a hyphen open a section, hyphen lines feed the current one.
    /// Titles are unique and repeated titles accumulate.
    #[default]
    Heuristic,
}

impl SectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionPolicy::Blocks => "blocks",
            SectionPolicy::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for SectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blocks" | "block" | "blank-line" => Ok(SectionPolicy::Blocks),
            "heuristic" | "lines" => Ok(SectionPolicy::Heuristic),
            other => anyhow::bail!(
                "Unknown section policy: {}. Use 'blocks' or 'heuristic'",
                other
            ),
        }
    }
}

/// Ordered sections, in first-appearance order of the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sections(Vec<Section>);

impl Sections {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Section> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.0.iter()
    }

    /// Body of the first section with this title.
    pub fn get(&self, title: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|section| section.title == title)
            .map(|section| section.body.as_str())
    }

    pub fn titles(&self) -> Vec<&str> {
        self.0.iter().map(|section| section.title.as_str()).collect()
    }

    fn push(&mut self, section: Section) {
        self.0.push(section);
    }

    fn get_mut(&mut self, title: &str) -> Option<&mut Section> {
        self.0.iter_mut().find(|section| section.title == title)
    }
}

impl From<Vec<Section>> for Sections {
    fn from(sections: Vec<Section>) -> Self {
        Self(sections)
    }
}

impl IntoIterator for Sections {
    type Item = Section;
    type IntoIter = std::vec::IntoIter<Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Sections {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Split analysis text into titled sections using `policy`.
pub fn parse_sections(text: &str, policy: SectionPolicy) -> Sections {
    let text = text.replace("\r\n", "\n");
    match policy {
        SectionPolicy::Blocks => parse_blocks(&text),
        SectionPolicy::Heuristic => parse_heuristic(&text),
    }
}

fn parse_blocks(text: &str) -> Sections {
    let mut sections = Sections::new();

    for block in text.split("\n\n") {
        let mut lines = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let Some(title) = lines.next() else {
            continue;
        };
        let body = lines.collect::<Vec<_>>().join("\n");
        sections.push(Section::new(title, body));
    }

    sections
}

fn parse_heuristic(text: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !line.contains('-') {
            if sections.get_mut(line).is_none() {
                sections.push(Section::new(line, ""));
            }
            current = Some(line.to_string());
            continue;
        }

        let title = current.as_deref().unwrap_or(MISC_SECTION_TITLE);
        match sections.get_mut(title) {
            Some(section) => {
                if !section.body.is_empty() {
                    section.body.push('\n');
                }
                section.body.push_str(line);
            }
            None => sections.push(Section::new(title, line)),
        }
    }

    sections
}
