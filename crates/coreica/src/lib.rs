//! Submission pipeline for the Coreica recruiting platform: applicant and job posting intake,
//! resume staging, persistence ports, and best-effort confirmation mail.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
