use crate::infra::{
    InMemoryApplicationRepository, InMemoryAttachmentStore, InMemoryJobPostingRepository,
    InMemoryRoleDirectory,
};
use async_trait::async_trait;
use clap::Args;
use coreica::error::AppError;
use coreica::workflows::submissions::{
    ApplicationForm, ApplicationRequest, ApplicationStatus, DispatchError, EmailTemplates,
    IdempotencyKey, IdentityId, JobPostingForm, JobPostingRequest, Notification,
    NotificationDispatcher, ResumeUpload, SubmissionConfig, SubmissionError, SubmissionPorts,
    SubmissionService,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the job posting portion of the demo.
    #[arg(long)]
    pub(crate) skip_job_posting: bool,
    /// Print the rendered HTML of each confirmation email.
    #[arg(long)]
    pub(crate) show_emails: bool,
}

/// Prints confirmation emails instead of sending them.
struct ConsoleDispatcher {
    templates: EmailTemplates,
    show_body: bool,
}

#[async_trait]
impl NotificationDispatcher for ConsoleDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let email = self.templates.render(notification);
        println!("  Email -> {}: {}", notification.to, email.subject);
        if self.show_body {
            println!("{}", email.html);
        }
        Ok(())
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        skip_job_posting,
        show_emails,
    } = args;

    let admin = IdentityId(Uuid::new_v4());
    let student = IdentityId(Uuid::new_v4());
    let company = IdentityId(Uuid::new_v4());

    let job_postings = InMemoryJobPostingRepository::default();
    let attachments = InMemoryAttachmentStore::default();
    let ports = SubmissionPorts {
        applications: Arc::new(InMemoryApplicationRepository::default()),
        job_postings: Arc::new(job_postings.clone()),
        roles: Arc::new(InMemoryRoleDirectory::with_admins([admin])),
        attachments: Arc::new(attachments.clone()),
        notifications: Arc::new(ConsoleDispatcher {
            templates: EmailTemplates::new("http://localhost:8080"),
            show_body: show_emails,
        }),
    };
    let service = SubmissionService::new(ports, SubmissionConfig::default());

    println!("Coreica submission demo");

    println!("\nApplication without resume");
    let accepted = match service
        .submit_application(application(student, asha(), None, None))
        .await
    {
        Ok(receipt) => {
            println!(
                "- Application {} stored with status {} (resume attached: {})",
                receipt.record.id,
                receipt.record.status.label(),
                receipt.record.resume.is_some()
            );
            Some(receipt.record.id)
        }
        Err(err) => {
            report_failure(&err);
            None
        }
    };

    println!("\nApplication with a malformed email");
    let mut form = asha();
    form.email = "not-an-email".to_string();
    if let Err(err) = service
        .submit_application(application(student, form, None, None))
        .await
    {
        report_failure(&err);
    }

    println!("\nApplication with an executable resume");
    let upload = ResumeUpload::new("resume.exe", vec![0; 1024]);
    if let Err(err) = service
        .submit_application(application(student, asha(), Some(upload), None))
        .await
    {
        report_failure(&err);
    }

    println!("\nApplication with a PDF resume, submitted twice");
    let key = IdempotencyKey(Uuid::new_v4().to_string());
    for attempt in 1..=2 {
        let upload = ResumeUpload::new("Asha_Rao_CV.pdf", b"%PDF-1.7 demo".to_vec());
        match service
            .submit_application(application(student, asha(), Some(upload), Some(key.clone())))
            .await
        {
            Ok(receipt) => println!(
                "- Attempt {attempt}: application {} (replayed: {})",
                receipt.record.id, receipt.replayed
            ),
            Err(err) => report_failure(&err),
        }
    }
    println!("  Stored resumes: {:?}", attachments.keys());

    if let Some(id) = accepted {
        println!("\nAdmin review");
        match service
            .review_application(&admin, &id, ApplicationStatus::Approved)
            .await
        {
            Ok(record) => match serde_json::to_string_pretty(&record.status_view()) {
                Ok(json) => println!("  Status payload:\n{json}"),
                Err(err) => println!("  Status payload unavailable: {err}"),
            },
            Err(err) => println!("  Review failed: {err}"),
        }
        if let Err(err) = service
            .review_application(&student, &id, ApplicationStatus::Rejected)
            .await
        {
            println!("  Applicant attempting review: {err}");
        }
    }

    if skip_job_posting {
        return Ok(());
    }

    println!("\nInternship posting");
    match service
        .submit_job_posting(JobPostingRequest {
            owner: company,
            form: internship(),
            idempotency_key: None,
        })
        .await
    {
        Ok(receipt) => {
            println!(
                "- Job posting {} live: {} (role grant: {:?})",
                receipt.record.id, receipt.record.is_active, receipt.role_grant
            );
            println!("  Active postings: {}", job_postings.active().len());
        }
        Err(err) => report_failure(&err),
    }

    Ok(())
}

fn report_failure(err: &SubmissionError) {
    println!(
        "- Rejected at {:?} step ({}): {}",
        err.step(),
        err.action().label(),
        err.user_message()
    );
    if let SubmissionError::Validation(rejection) = err {
        for violation in &rejection.violations {
            println!("    - {violation}");
        }
    }
}

fn application(
    owner: IdentityId,
    form: ApplicationForm,
    resume: Option<ResumeUpload>,
    idempotency_key: Option<IdempotencyKey>,
) -> ApplicationRequest {
    ApplicationRequest {
        owner,
        form,
        resume,
        idempotency_key,
    }
}

fn asha() -> ApplicationForm {
    ApplicationForm {
        full_name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        branch: "Mechanical Engineering".to_string(),
        interest_area: "Manufacturing & Production".to_string(),
        ..ApplicationForm::default()
    }
}

fn internship() -> JobPostingForm {
    JobPostingForm {
        company_name: "Acme Forge".to_string(),
        role: "R&D Intern".to_string(),
        job_type: "internship".to_string(),
        location: Some("Pune".to_string()),
        description: "Support the R&D lab".to_string(),
        contact_email: "hr@acme.test".to_string(),
        ..JobPostingForm::default()
    }
}
