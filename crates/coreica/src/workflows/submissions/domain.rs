use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an authenticated account. Accounts are managed by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityId(pub Uuid);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for persisted applicant submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for persisted job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobPostingId(pub Uuid);

impl fmt::Display for JobPostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Client supplied token used to collapse duplicate submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(pub String);

/// Location of an uploaded file inside the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(pub String);

impl StorageKey {
    /// `<identity>/<unix millis>.<ext>`; unique per identity and instant.
    pub fn for_upload(owner: &IdentityId, at: DateTime<Utc>, extension: &str) -> Self {
        Self(format!("{}/{}.{}", owner, at.timestamp_millis(), extension))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Authorization tags attached to identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRole {
    User,
    Company,
    Admin,
}

impl IdentityRole {
    pub const fn label(self) -> &'static str {
        match self {
            IdentityRole::User => "user",
            IdentityRole::Company => "company",
            IdentityRole::Admin => "admin",
        }
    }

    /// Roles permitted to manage job postings.
    pub const fn is_elevated(self) -> bool {
        matches!(self, IdentityRole::Company | IdentityRole::Admin)
    }
}

/// Engineering branches offered on the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "Mechanical Engineering")]
    Mechanical,
    #[serde(rename = "Civil Engineering")]
    Civil,
    #[serde(rename = "Electrical Engineering")]
    Electrical,
    #[serde(rename = "Electronics & Communication Engineering")]
    ElectronicsCommunication,
    #[serde(rename = "Polytechnic - Mechanical")]
    PolytechnicMechanical,
    #[serde(rename = "Polytechnic - Civil")]
    PolytechnicCivil,
    #[serde(rename = "Polytechnic - Electrical")]
    PolytechnicElectrical,
    #[serde(rename = "Polytechnic - Electronics")]
    PolytechnicElectronics,
    #[serde(rename = "Chemical Engineering")]
    Chemical,
    #[serde(rename = "Aeronautical Engineering")]
    Aeronautical,
    #[serde(rename = "Automobile Engineering")]
    Automobile,
    #[serde(rename = "Production Engineering")]
    Production,
    Other,
}

impl Branch {
    pub const ALL: [Branch; 13] = [
        Branch::Mechanical,
        Branch::Civil,
        Branch::Electrical,
        Branch::ElectronicsCommunication,
        Branch::PolytechnicMechanical,
        Branch::PolytechnicCivil,
        Branch::PolytechnicElectrical,
        Branch::PolytechnicElectronics,
        Branch::Chemical,
        Branch::Aeronautical,
        Branch::Automobile,
        Branch::Production,
        Branch::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Branch::Mechanical => "Mechanical Engineering",
            Branch::Civil => "Civil Engineering",
            Branch::Electrical => "Electrical Engineering",
            Branch::ElectronicsCommunication => "Electronics & Communication Engineering",
            Branch::PolytechnicMechanical => "Polytechnic - Mechanical",
            Branch::PolytechnicCivil => "Polytechnic - Civil",
            Branch::PolytechnicElectrical => "Polytechnic - Electrical",
            Branch::PolytechnicElectronics => "Polytechnic - Electronics",
            Branch::Chemical => "Chemical Engineering",
            Branch::Aeronautical => "Aeronautical Engineering",
            Branch::Automobile => "Automobile Engineering",
            Branch::Production => "Production Engineering",
            Branch::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|branch| branch.label() == raw)
    }
}

/// Study year buckets shown on the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YearOfStudy {
    #[serde(rename = "1st Year")]
    First,
    #[serde(rename = "2nd Year")]
    Second,
    #[serde(rename = "3rd Year")]
    Third,
    #[serde(rename = "4th Year")]
    Fourth,
    #[serde(rename = "Final Year")]
    Final,
    #[serde(rename = "Recent Graduate")]
    RecentGraduate,
}

impl YearOfStudy {
    pub const ALL: [YearOfStudy; 6] = [
        YearOfStudy::First,
        YearOfStudy::Second,
        YearOfStudy::Third,
        YearOfStudy::Fourth,
        YearOfStudy::Final,
        YearOfStudy::RecentGraduate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            YearOfStudy::First => "1st Year",
            YearOfStudy::Second => "2nd Year",
            YearOfStudy::Third => "3rd Year",
            YearOfStudy::Fourth => "4th Year",
            YearOfStudy::Final => "Final Year",
            YearOfStudy::RecentGraduate => "Recent Graduate",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|year| year.label() == raw)
    }
}

/// Industry areas a student can express interest in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestArea {
    #[serde(rename = "Manufacturing & Production")]
    Manufacturing,
    #[serde(rename = "Construction & Infrastructure")]
    Construction,
    #[serde(rename = "Power & Energy")]
    PowerEnergy,
    #[serde(rename = "Automation & Control")]
    Automation,
    #[serde(rename = "Quality Assurance")]
    QualityAssurance,
    #[serde(rename = "Project Management")]
    ProjectManagement,
    #[serde(rename = "Research & Development")]
    ResearchDevelopment,
    #[serde(rename = "Maintenance & Operations")]
    Maintenance,
    #[serde(rename = "Sales & Marketing")]
    SalesMarketing,
    Consulting,
    Other,
}

impl InterestArea {
    pub const ALL: [InterestArea; 11] = [
        InterestArea::Manufacturing,
        InterestArea::Construction,
        InterestArea::PowerEnergy,
        InterestArea::Automation,
        InterestArea::QualityAssurance,
        InterestArea::ProjectManagement,
        InterestArea::ResearchDevelopment,
        InterestArea::Maintenance,
        InterestArea::SalesMarketing,
        InterestArea::Consulting,
        InterestArea::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            InterestArea::Manufacturing => "Manufacturing & Production",
            InterestArea::Construction => "Construction & Infrastructure",
            InterestArea::PowerEnergy => "Power & Energy",
            InterestArea::Automation => "Automation & Control",
            InterestArea::QualityAssurance => "Quality Assurance",
            InterestArea::ProjectManagement => "Project Management",
            InterestArea::ResearchDevelopment => "Research & Development",
            InterestArea::Maintenance => "Maintenance & Operations",
            InterestArea::SalesMarketing => "Sales & Marketing",
            InterestArea::Consulting => "Consulting",
            InterestArea::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|area| area.label() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Internship,
    FullTime,
    PartTime,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Internship, JobType::FullTime, JobType::PartTime];

    pub const fn label(self) -> &'static str {
        match self {
            JobType::Internship => "internship",
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|kind| kind.label() == raw)
    }
}

/// Review state of an applicant submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Raw applicant form exactly as typed. Nothing here is trusted until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub branch: String,
    pub college: Option<String>,
    pub year_of_study: Option<String>,
    pub interest_area: String,
    pub additional_info: Option<String>,
}

impl ApplicationForm {
    /// Assign a field by its wire name. Returns `false` for unknown names.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "full_name" => self.full_name = value,
            "email" => self.email = value,
            "phone" => self.phone = Some(value),
            "branch" => self.branch = value,
            "college" => self.college = Some(value),
            "year_of_study" => self.year_of_study = Some(value),
            "interest_area" => self.interest_area = value,
            "additional_info" => self.additional_info = Some(value),
            _ => return false,
        }
        true
    }
}

/// Raw job posting form exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPostingForm {
    pub company_name: String,
    pub role: String,
    pub job_type: String,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub requirements: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub application_deadline: Option<String>,
}

/// Applicant details after validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub branch: Branch,
    pub college: Option<String>,
    pub year_of_study: Option<YearOfStudy>,
    pub interest_area: InterestArea,
    pub additional_info: Option<String>,
}

/// Job posting details after validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPostingDetails {
    pub company_name: String,
    pub role: String,
    pub job_type: JobType,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub requirements: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub application_deadline: Option<NaiveDate>,
}

/// Persisted applicant submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub owner: IdentityId,
    pub details: ApplicantDetails,
    pub resume: Option<StorageKey>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl ApplicationRecord {
    /// Whether this record answers a resubmission by `owner` carrying `key` at or after `since`.
    pub fn matches_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> bool {
        self.owner == *owner
            && self.idempotency_key.as_ref() == Some(key)
            && self.created_at >= since
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id,
            status: self.status.label(),
            resume_attached: self.resume.is_some(),
            created_at: self.created_at,
        }
    }
}

/// Persisted job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPostingRecord {
    pub id: JobPostingId,
    pub owner: IdentityId,
    pub details: JobPostingDetails,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl JobPostingRecord {
    pub fn matches_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> bool {
        self.owner == *owner
            && self.idempotency_key.as_ref() == Some(key)
            && self.created_at >= since
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub resume_attached: bool,
    pub created_at: DateTime<Utc>,
}
