// src/web/types.rs

use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};

use crate::core::database::{AnalysisRecord, User};
use crate::sections::{
    LeadSummary, LineKind, ProfileIdentity, SectionPolicy, IDENTITY_PLACEHOLDER,
};

pub struct ServerConfig {
    pub section_policy: SectionPolicy,
}

// ===== Requests =====

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalyzeRequest {
    pub linkedin_url: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SetCreditsRequest {
    pub user_id: String,
    pub credits: i64,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SetRoleRequest {
    pub user_id: String,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SetPlanRequest {
    pub user_id: String,
    pub plan: String,
}

// ===== Payloads =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub role: String,
    pub plan: String,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role().to_string(),
            plan: user.plan().to_string(),
            credits: user.credits,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalysisListItem {
    pub id: String,
    pub linkedin_url: String,
    pub identity: ProfileIdentity,
    pub created_at: DateTime<Utc>,
}

impl AnalysisListItem {
    pub fn new(record: &AnalysisRecord, policy: SectionPolicy) -> Self {
        let summary = LeadSummary::from_profile_text(&record.profile_data, policy);
        Self {
            id: record.id.clone(),
            linkedin_url: record.linkedin_url.clone(),
            identity: summary.identity,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalysisData {
    pub id: String,
    pub linkedin_url: String,
    pub created_at: DateTime<Utc>,
    pub summary: LeadSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<i64>,
}

impl AnalysisData {
    pub fn new(record: &AnalysisRecord, policy: SectionPolicy) -> Self {
        Self {
            id: record.id.clone(),
            linkedin_url: record.linkedin_url.clone(),
            created_at: record.created_at,
            summary: LeadSummary::from_profile_text(&record.profile_data, policy),
            credits_remaining: None,
        }
    }

    pub fn with_credits_remaining(mut self, credits: i64) -> Self {
        self.credits_remaining = Some(credits);
        self
    }
}

// ===== Standard Response Envelopes =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_format: Option<DisplayFormat>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DisplayFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<DisplaySection>>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DisplaySection {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<String>>,
}

impl DisplayFormat {
    /// Lead-card layout: identity header, then one entry per section with its list items as points
    pub fn lead_summary(summary: &LeadSummary) -> Self {
        let identity = &summary.identity;
        let mut sections = vec![DisplaySection {
            title: identity.name.clone(),
            content: headline(identity),
            points: None,
        }];

        sections.extend(summary.sections.iter().map(|section| {
            let points: Vec<String> = section
                .lines
                .iter()
                .filter(|line| !matches!(line, LineKind::Plain { .. }))
                .map(|line| line.text().trim().to_string())
                .filter(|point| !point.is_empty())
                .collect();

            DisplaySection {
                title: section.title.clone(),
                content: section.body.clone(),
                points: if points.is_empty() { None } else { Some(points) },
            }
        }));

        Self {
            format_type: "lead_summary".to_string(),
            sections: Some(sections),
        }
    }
}

// "Title at Company", leaving out whichever part is missing
fn headline(identity: &ProfileIdentity) -> String {
    let known = |field: &str| field != IDENTITY_PLACEHOLDER && !field.is_empty();

    match (known(&identity.title), known(&identity.company)) {
        (true, true) => format!("{} at {}", identity.title, identity.company),
        (true, false) => identity.title.clone(),
        (false, true) => identity.company.clone(),
        (false, false) => String::new(),
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            display_format: None,
        }
    }

    pub fn with_display_format(mut self, display_format: DisplayFormat) -> Self {
        self.display_format = Some(display_format);
        self
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}
