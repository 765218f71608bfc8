use crate::infra::{build_service, BoardService};
use clap::Args;
use jobboard::board::{
    Actor, ApplicationQuery, ApplicationStatus, ExperienceLevel, JobType, NewJob, NewRecruiter,
    NewSeeker, ResumeUpload,
};
use jobboard::config::{StorageBackend, StorageConfig};
use jobboard::error::AppError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Resume file to attach (PDF, DOC or DOCX). A small generated PDF is used otherwise.
    #[arg(long)]
    pub(crate) resume: Option<PathBuf>,
    /// Leave the job posted instead of finishing with a cascading delete.
    #[arg(long)]
    pub(crate) keep_job: bool,
}

const SAMPLE_RESUME: &[u8] = b"%PDF-1.7\n% sample resume for the lifecycle demo\n%%EOF\n";

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { resume, keep_job } = args;

    let workspace = tempfile::Builder::new()
        .prefix("jobboard-demo-")
        .tempdir()?;
    let storage = StorageConfig {
        backend: StorageBackend::Disk,
        data_dir: workspace.path().to_path_buf(),
    };

    println!("Job board lifecycle demo");
    println!("- Storage: {}", workspace.path().display());
    let service = build_service(&storage)?;

    let recruiter = service.register_recruiter(NewRecruiter {
        name: "Rhea Lind".to_string(),
        email: "rhea@northwind.example".to_string(),
        credential_hash: "$argon2id$demo-recruiter".to_string(),
        company: Some("Northwind".to_string()),
    })?;
    let recruiter_actor = Actor::Recruiter(recruiter.id);
    service.upsert_recruiter_profile(
        &recruiter_actor,
        recruiter.id,
        BTreeMap::from([("team".to_string(), "Platform".to_string())]),
    )?;

    let seeker = service.register_seeker(NewSeeker {
        name: "Sam Okafor".to_string(),
        email: "sam@mail.example".to_string(),
        credential_hash: "$argon2id$demo-seeker".to_string(),
        phone: None,
    })?;
    let seeker_actor = Actor::Seeker(seeker.id);
    service.upsert_profile(
        &seeker_actor,
        seeker.id,
        BTreeMap::from([("headline".to_string(), "Backend engineer".to_string())]),
    )?;
    println!(
        "- Registered recruiter {} and seeker {} (profile on file: {})",
        recruiter.id,
        seeker.id,
        service.check_profile_exists(seeker.id)?
    );

    let job = service.post_job(
        &recruiter_actor,
        NewJob {
            title: "Backend Engineer".to_string(),
            company: "Northwind".to_string(),
            location: "Remote".to_string(),
            description: "Own the order pipeline.".to_string(),
            salary_range: Some("60k-75k".to_string()),
            job_type: JobType::FullTime,
            experience_level: ExperienceLevel::Mid,
        },
    )?;
    println!("- Posted {} \"{}\" at {}", job.id, job.title, job.company);

    let upload = load_resume(resume.as_deref())?;
    println!(
        "- Resume: {} ({} bytes)",
        upload.declared_mime,
        upload.size_bytes()
    );
    let application = service.create_application_with_resume(
        &seeker_actor,
        job.id,
        Some("I have shipped two payment systems.".to_string()),
        upload,
    )?;
    let address = application
        .resume
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    println!(
        "- Application {} -> {} (resume stored at {})",
        application.id, application.status, address
    );

    match service.create_application(&seeker_actor, job.id, None) {
        Ok(duplicate) => println!("  Unexpected second application {}", duplicate.id),
        Err(err) => println!("  Second application refused: {err}"),
    }

    let saved = service.save_job(&seeker_actor, job.id)?;
    println!("- Seeker bookmarked the job ({})", saved.id);

    let accepted =
        service.transition_status(application.id, ApplicationStatus::Accepted, &recruiter_actor)?;
    println!("- Recruiter moved {} to {}", accepted.id, accepted.status);
    match service.transition_status(application.id, ApplicationStatus::Withdrawn, &seeker_actor) {
        Ok(withdrawn) => println!("  Unexpected withdrawal to {}", withdrawn.status),
        Err(err) => println!("  Withdrawal refused: {err}"),
    }

    let inbox = service.list_applications(ApplicationQuery::ByRecruiter(recruiter.id))?;
    println!("- Recruiter inbox holds {} application(s)", inbox.len());
    print_payload("Application payload", &service, application.id);

    if keep_job {
        return Ok(());
    }

    match service.delete_job(&recruiter_actor, job.id, false) {
        Ok(_) => println!("  Job deleted without dependents"),
        Err(err) => println!("- Plain delete refused: {err}"),
    }
    let removal = service.delete_job(&recruiter_actor, job.id, true)?;
    println!(
        "- Cascading delete removed {} with {} bookmark(s); {} application(s) kept",
        removal.job.id,
        removal.purged_saved_jobs.len(),
        removal.retained_applications
    );
    print_payload("Application after job removal", &service, application.id);

    Ok(())
}

fn load_resume(path: Option<&Path>) -> Result<ResumeUpload, AppError> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            Ok(ResumeUpload::new(mime.essence_str(), bytes))
        }
        None => Ok(ResumeUpload::new("application/pdf", SAMPLE_RESUME)),
    }
}

fn print_payload(label: &str, service: &BoardService, id: jobboard::board::ApplicationId) {
    let details = match service.application(id) {
        Ok(details) => details,
        Err(err) => {
            println!("  {label} unavailable: {err}");
            return;
        }
    };
    match serde_json::to_string_pretty(&details) {
        Ok(json) => println!("  {label}:\n{json}"),
        Err(err) => println!("  {label} unavailable: {err}"),
    }
}
