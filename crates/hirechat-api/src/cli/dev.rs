//! Development seeding for the collaborator tables.
//!
//! Job applications, entitlements and sessions are owned by other
//! subsystems in production. These commands write them directly so the
//! messaging API can be exercised locally.

use anyhow::Result;
use chrono::{Duration, Utc};
use console::style;

use hirechat_types::identity::{ApplicationId, JobApplication, UserId};

use crate::state::AppState;

pub async fn application(
    state: &AppState,
    employer: Option<UserId>,
    candidate: Option<UserId>,
    json: bool,
) -> Result<()> {
    let application = JobApplication {
        id: ApplicationId::new(),
        employer_id: employer.unwrap_or_default(),
        candidate_id: candidate.unwrap_or_default(),
    };
    if application.employer_id == application.candidate_id {
        anyhow::bail!("employer and candidate must be different users");
    }
    let job_id = uuid::Uuid::now_v7();
    state.applications.register(&application, job_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&application)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Application {}",
        style("✓").green().bold(),
        style(application.id).cyan()
    );
    println!("  Job:       {job_id}");
    println!("  Employer:  {}", application.employer_id);
    println!("  Candidate: {}", application.candidate_id);
    println!();
    Ok(())
}

pub async fn entitle(state: &AppState, employer: &UserId, days: i64, json: bool) -> Result<()> {
    let active_until = Utc::now() + Duration::days(days);
    state.entitlements.grant(employer, active_until).await?;

    if json {
        let grant = serde_json::json!({
            "employer_id": employer,
            "active_until": active_until,
        });
        println!("{}", serde_json::to_string_pretty(&grant)?);
    } else {
        println!(
            "  {} {} may message candidates until {}",
            style("✓").green().bold(),
            employer,
            active_until.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Issue a session token. The plaintext is shown once; only its hash is stored.
pub async fn token(state: &AppState, user: &UserId, hours: i64, json: bool) -> Result<()> {
    let token = state.sessions.issue(user, Duration::hours(hours)).await?;

    if json {
        let issued = serde_json::json!({ "user_id": user, "token": token });
        println!("{}", serde_json::to_string_pretty(&issued)?);
    } else {
        println!();
        println!(
            "  {} Session token for {} (save this -- it won't be shown again):",
            style("🔑").bold(),
            user
        );
        println!();
        println!("  {}", style(&token).yellow().bold());
        println!();
    }
    Ok(())
}
