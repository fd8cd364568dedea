use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use validator::ValidateEmail;

use super::domain::{
    ApplicantDetails, ApplicationForm, Branch, InterestArea, JobPostingDetails, JobPostingForm,
    JobType, YearOfStudy,
};

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 255;
const PHONE_MAX_CHARS: usize = 32;
const SHORT_TEXT_MAX_CHARS: usize = 200;
const LONG_TEXT_MAX_CHARS: usize = 5000;

/// Closed value sets a field may be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSet {
    Branch,
    YearOfStudy,
    InterestArea,
    JobType,
}

impl ChoiceSet {
    pub fn accepts(self, raw: &str) -> bool {
        match self {
            ChoiceSet::Branch => Branch::parse(raw).is_some(),
            ChoiceSet::YearOfStudy => YearOfStudy::parse(raw).is_some(),
            ChoiceSet::InterestArea => InterestArea::parse(raw).is_some(),
            ChoiceSet::JobType => JobType::parse(raw).is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    Email,
    Choice(ChoiceSet),
    Date,
}

/// One row of an entity's constraint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub max_chars: usize,
    pub format: FieldFormat,
}

const fn rule(
    field: &'static str,
    required: bool,
    max_chars: usize,
    format: FieldFormat,
) -> FieldRule {
    FieldRule {
        field,
        required,
        max_chars,
        format,
    }
}

pub const APPLICATION_RULES: &[FieldRule] = &[
    rule("full_name", true, NAME_MAX_CHARS, FieldFormat::Text),
    rule("email", true, EMAIL_MAX_CHARS, FieldFormat::Email),
    rule("phone", false, PHONE_MAX_CHARS, FieldFormat::Text),
    rule(
        "branch",
        true,
        NAME_MAX_CHARS,
        FieldFormat::Choice(ChoiceSet::Branch),
    ),
    rule("college", false, SHORT_TEXT_MAX_CHARS, FieldFormat::Text),
    rule(
        "year_of_study",
        false,
        NAME_MAX_CHARS,
        FieldFormat::Choice(ChoiceSet::YearOfStudy),
    ),
    rule(
        "interest_area",
        true,
        NAME_MAX_CHARS,
        FieldFormat::Choice(ChoiceSet::InterestArea),
    ),
    rule(
        "additional_info",
        false,
        LONG_TEXT_MAX_CHARS,
        FieldFormat::Text,
    ),
];

pub const JOB_POSTING_RULES: &[FieldRule] = &[
    rule("company_name", true, NAME_MAX_CHARS, FieldFormat::Text),
    rule("role", true, NAME_MAX_CHARS, FieldFormat::Text),
    rule(
        "job_type",
        true,
        NAME_MAX_CHARS,
        FieldFormat::Choice(ChoiceSet::JobType),
    ),
    rule("duration", false, NAME_MAX_CHARS, FieldFormat::Text),
    rule("stipend", false, NAME_MAX_CHARS, FieldFormat::Text),
    rule("location", false, SHORT_TEXT_MAX_CHARS, FieldFormat::Text),
    rule("description", true, LONG_TEXT_MAX_CHARS, FieldFormat::Text),
    rule("requirements", false, LONG_TEXT_MAX_CHARS, FieldFormat::Text),
    rule("contact_email", true, EMAIL_MAX_CHARS, FieldFormat::Email),
    rule("contact_phone", false, PHONE_MAX_CHARS, FieldFormat::Text),
    rule(
        "application_deadline",
        false,
        NAME_MAX_CHARS,
        FieldFormat::Date,
    ),
];

/// Field lookup by wire name so a rule table can be applied to any form.
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FormFields for ApplicationForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "full_name" => Some(&self.full_name),
            "email" => Some(&self.email),
            "phone" => self.phone.as_deref(),
            "branch" => Some(&self.branch),
            "college" => self.college.as_deref(),
            "year_of_study" => self.year_of_study.as_deref(),
            "interest_area" => Some(&self.interest_area),
            "additional_info" => self.additional_info.as_deref(),
            _ => None,
        }
    }
}

impl FormFields for JobPostingForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "company_name" => Some(&self.company_name),
            "role" => Some(&self.role),
            "job_type" => Some(&self.job_type),
            "duration" => self.duration.as_deref(),
            "stipend" => self.stipend.as_deref(),
            "location" => self.location.as_deref(),
            "description" => Some(&self.description),
            "requirements" => self.requirements.as_deref(),
            "contact_email" => Some(&self.contact_email),
            "contact_phone" => self.contact_phone.as_deref(),
            "application_deadline" => self.application_deadline.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    Required,
    InvalidEmail,
    InvalidChoice,
    InvalidDate,
    TooLong { max_chars: usize },
}

impl ViolationReason {
    pub const fn code(self) -> &'static str {
        match self {
            ViolationReason::Required => "required",
            ViolationReason::InvalidEmail => "invalid_email",
            ViolationReason::InvalidChoice => "invalid_choice",
            ViolationReason::InvalidDate => "invalid_date",
            ViolationReason::TooLong { .. } => "too_long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: ViolationReason,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ViolationReason::Required => write!(f, "{} is required", self.field),
            ViolationReason::InvalidEmail => {
                write!(f, "{} must be a valid email address", self.field)
            }
            ViolationReason::InvalidChoice => write!(f, "{} is not a valid choice", self.field),
            ViolationReason::InvalidDate => {
                write!(f, "{} must be a calendar date (YYYY-MM-DD)", self.field)
            }
            ViolationReason::TooLong { max_chars } => {
                write!(f, "{} must be at most {max_chars} characters", self.field)
            }
        }
    }
}

/// Every violated constraint of a rejected form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn contains(&self, field: &str, reason: ViolationReason) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.reason == reason)
    }
}

/// Apply a rule table, collecting every violation rather than stopping at the first.
pub fn check_fields<F: FormFields + ?Sized>(form: &F, rules: &[FieldRule]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for rule in rules {
        let value = form.field(rule.field).map(str::trim).unwrap_or_default();

        if value.is_empty() {
            if rule.required {
                violations.push(FieldViolation {
                    field: rule.field,
                    reason: ViolationReason::Required,
                });
            }
            continue;
        }

        if value.chars().count() > rule.max_chars {
            violations.push(FieldViolation {
                field: rule.field,
                reason: ViolationReason::TooLong {
                    max_chars: rule.max_chars,
                },
            });
            continue;
        }

        let reason = match rule.format {
            FieldFormat::Text => None,
            FieldFormat::Email => {
                (!is_deliverable_email(value)).then_some(ViolationReason::InvalidEmail)
            }
            FieldFormat::Choice(set) => {
                (!set.accepts(value)).then_some(ViolationReason::InvalidChoice)
            }
            FieldFormat::Date => parse_calendar_date(value)
                .is_none()
                .then_some(ViolationReason::InvalidDate),
        };

        if let Some(reason) = reason {
            violations.push(FieldViolation {
                field: rule.field,
                reason,
            });
        }
    }

    violations
}

/// Syntax check plus a dotted domain; bare hosts such as `asha@localhost` are refused.
fn is_deliverable_email(value: &str) -> bool {
    value.to_string().validate_email()
        && value.rsplit_once('@').is_some_and(|(_, domain)| {
            domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
        })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the UTC calendar date.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc).date_naive())
    })
}

fn required_text(value: &str) -> String {
    value.trim().to_string()
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Stateless validator turning raw forms into normalized details.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionValidator;

impl SubmissionValidator {
    pub fn application(&self, form: &ApplicationForm) -> Result<ApplicantDetails, ValidationError> {
        let violations = check_fields(form, APPLICATION_RULES);
        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        let (Some(branch), Some(interest_area)) = (
            Branch::parse(&form.branch),
            InterestArea::parse(&form.interest_area),
        ) else {
            return Err(ValidationError {
                violations: vec![FieldViolation {
                    field: "branch",
                    reason: ViolationReason::InvalidChoice,
                }],
            });
        };

        Ok(ApplicantDetails {
            full_name: required_text(&form.full_name),
            email: required_text(&form.email),
            phone: optional_text(form.phone.as_deref()),
            branch,
            college: optional_text(form.college.as_deref()),
            year_of_study: optional_text(form.year_of_study.as_deref())
                .and_then(|year| YearOfStudy::parse(&year)),
            interest_area,
            additional_info: optional_text(form.additional_info.as_deref()),
        })
    }

    pub fn job_posting(&self, form: &JobPostingForm) -> Result<JobPostingDetails, ValidationError> {
        let violations = check_fields(form, JOB_POSTING_RULES);
        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        let Some(job_type) = JobType::parse(&form.job_type) else {
            return Err(ValidationError {
                violations: vec![FieldViolation {
                    field: "job_type",
                    reason: ViolationReason::InvalidChoice,
                }],
            });
        };

        Ok(JobPostingDetails {
            company_name: required_text(&form.company_name),
            role: required_text(&form.role),
            job_type,
            duration: optional_text(form.duration.as_deref()),
            stipend: optional_text(form.stipend.as_deref()),
            location: optional_text(form.location.as_deref()),
            description: required_text(&form.description),
            requirements: optional_text(form.requirements.as_deref()),
            contact_email: required_text(&form.contact_email),
            contact_phone: optional_text(form.contact_phone.as_deref()),
            application_deadline: optional_text(form.application_deadline.as_deref())
                .and_then(|raw| parse_calendar_date(&raw)),
        })
    }
}
