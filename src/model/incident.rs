//! Incident records and the enums that constrain them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ReporterError;

/// Display name used when an anonymous reporter gave no name
pub const ANONYMOUS_REPORTER: &str = "Anonymous";

/// Display name used when an owning user no longer exists
pub const UNKNOWN_REPORTER: &str = "Unknown";

/// Kind of report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    /// Corruption or misconduct
    Redflag,
    /// Infrastructure or public service failure
    Intervention,
}

impl IncidentKind {
    pub const ALL: [IncidentKind; 2] = [IncidentKind::Redflag, IncidentKind::Intervention];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentKind::Redflag => "redflag",
            IncidentKind::Intervention => "intervention",
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentKind {
    type Err = ReporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redflag" => Ok(IncidentKind::Redflag),
            "intervention" => Ok(IncidentKind::Intervention),
            _ => Err(ReporterError::validation(
                "Invalid incident type. Must be one of: redflag, intervention",
            )),
        }
    }
}

/// Review status. Every status may move to every other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    #[default]
    Pending,
    Investigating,
    Resolved,
    Rejected,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 4] = [
        IncidentStatus::Pending,
        IncidentStatus::Investigating,
        IncidentStatus::Resolved,
        IncidentStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = ReporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(IncidentStatus::Pending),
            "investigating" => Ok(IncidentStatus::Investigating),
            "resolved" => Ok(IncidentStatus::Resolved),
            "rejected" => Ok(IncidentStatus::Rejected),
            _ => Err(ReporterError::validation(
                "Invalid status. Must be one of: pending, investigating, resolved, rejected",
            )),
        }
    }
}

/// Sub-classification of an incident.
///
/// Red flag and intervention categories are disjoint except for `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // Red flag
    Bribery,
    Embezzlement,
    Fraud,
    AbuseOfOffice,
    Nepotism,
    ConflictOfInterest,
    // Intervention
    RoadInfrastructure,
    WaterSupply,
    Electricity,
    WasteManagement,
    PublicTransport,
    Healthcare,
    Education,
    Security,
    // Both
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bribery => "bribery",
            Category::Embezzlement => "embezzlement",
            Category::Fraud => "fraud",
            Category::AbuseOfOffice => "abuse_of_office",
            Category::Nepotism => "nepotism",
            Category::ConflictOfInterest => "conflict_of_interest",
            Category::RoadInfrastructure => "road_infrastructure",
            Category::WaterSupply => "water_supply",
            Category::Electricity => "electricity",
            Category::WasteManagement => "waste_management",
            Category::PublicTransport => "public_transport",
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Security => "security",
            Category::Other => "other",
        }
    }

    /// Whether this category may be used with the given incident kind
    pub fn allowed_for(&self, kind: IncidentKind) -> bool {
        match self {
            Category::Other => true,
            Category::Bribery
            | Category::Embezzlement
            | Category::Fraud
            | Category::AbuseOfOffice
            | Category::Nepotism
            | Category::ConflictOfInterest => kind == IncidentKind::Redflag,
            Category::RoadInfrastructure
            | Category::WaterSupply
            | Category::Electricity
            | Category::WasteManagement
            | Category::PublicTransport
            | Category::Healthcare
            | Category::Education
            | Category::Security => kind == IncidentKind::Intervention,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ReporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match s {
            "bribery" => Category::Bribery,
            "embezzlement" => Category::Embezzlement,
            "fraud" => Category::Fraud,
            "abuse_of_office" => Category::AbuseOfOffice,
            "nepotism" => Category::Nepotism,
            "conflict_of_interest" => Category::ConflictOfInterest,
            "road_infrastructure" => Category::RoadInfrastructure,
            "water_supply" => Category::WaterSupply,
            "electricity" => Category::Electricity,
            "waste_management" => Category::WasteManagement,
            "public_transport" => Category::PublicTransport,
            "healthcare" => Category::Healthcare,
            "education" => Category::Education,
            "security" => Category::Security,
            "other" => Category::Other,
            _ => return Err(ReporterError::validation(format!("Unknown category '{s}'"))),
        };
        Ok(category)
    }
}

/// A stored incident.
///
/// `owner` is the registered reporter. An incident without an owner is
/// anonymous; there is no separate flag to drift out of sync.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: IncidentKind,
    pub category: Option<Category>,
    pub location: String,
    pub status: IncidentStatus,
    pub owner: Option<String>,
    /// Lower-cased contact email left by an anonymous reporter
    pub reporter_email: Option<String>,
    pub reporter_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn is_anonymous(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }

    /// Name shown for an unowned incident
    pub fn reporter_display_name(&self) -> String {
        self.reporter_name
            .clone()
            .unwrap_or_else(|| ANONYMOUS_REPORTER.to_string())
    }
}

/// Field changes applied to a stored incident in one write.
///
/// `None` leaves the field untouched. `updated_at` is always written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<IncidentKind>,
    pub category: Option<Category>,
    pub location: Option<String>,
    pub status: Option<IncidentStatus>,
}

impl IncidentChanges {
    /// Apply to an in-memory record
    pub fn apply(&self, incident: &mut Incident, at: DateTime<Utc>) {
        if let Some(ref title) = self.title {
            incident.title = title.clone();
        }
        if let Some(ref description) = self.description {
            incident.description = description.clone();
        }
        if let Some(kind) = self.kind {
            incident.kind = kind;
        }
        if let Some(category) = self.category {
            incident.category = Some(category);
        }
        if let Some(ref location) = self.location {
            incident.location = location.clone();
        }
        if let Some(status) = self.status {
            incident.status = status;
        }
        incident.updated_at = at;
    }
}

/// Count filter for the stats aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub kind: Option<IncidentKind>,
}

impl IncidentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(status: IncidentStatus) -> Self {
        Self {
            status: Some(status),
            kind: None,
        }
    }

    pub fn kind(kind: IncidentKind) -> Self {
        Self {
            status: None,
            kind: Some(kind),
        }
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        self.status.is_none_or(|s| s == incident.status)
            && self.kind.is_none_or(|k| k == incident.kind)
    }
}

/// Incident as returned to callers, with the reporter's display name resolved
#[derive(Debug, Clone, Serialize)]
pub struct IncidentView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub location: String,
    pub status: IncidentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncidentView {
    pub fn new(incident: Incident, user_name: String) -> Self {
        let is_anonymous = incident.is_anonymous();
        Self {
            id: incident.id,
            title: incident.title,
            description: incident.description,
            kind: incident.kind,
            category: incident.category,
            location: incident.location,
            status: incident.status,
            user_id: incident.owner,
            user_name,
            reporter_name: if is_anonymous {
                incident.reporter_name
            } else {
                None
            },
            is_anonymous,
            created_at: incident.created_at,
            updated_at: incident.updated_at,
        }
    }
}

/// Aggregate counts for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentStats {
    pub total: u64,
    pub pending: u64,
    pub investigating: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub redflags: u64,
    pub interventions: u64,
}

impl IncidentStats {
    pub fn set_status_count(&mut self, status: IncidentStatus, count: u64) {
        match status {
            IncidentStatus::Pending => self.pending = count,
            IncidentStatus::Investigating => self.investigating = count,
            IncidentStatus::Resolved => self.resolved = count,
            IncidentStatus::Rejected => self.rejected = count,
        }
    }

    pub fn set_kind_count(&mut self, kind: IncidentKind, count: u64) {
        match kind {
            IncidentKind::Redflag => self.redflags = count,
            IncidentKind::Intervention => self.interventions = count,
        }
    }
}
