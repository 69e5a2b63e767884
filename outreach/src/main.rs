//! Main entry point for the outreach binary
//!
//! Wires the real services into the orchestrator and performs one run.

use clap::Parser;

use outreach::{
    services::{CsvLeadStore, DiscordNotifier, FileTemplateRenderer, JsonRunStateStore, SmtpMailSender, SystemClock},
    Args, EnvConfig, LeadStore, Orchestrator, OutreachResult, RunOutcome,
};
use shared::{logging, run_debug, run_info, RunId};

#[tokio::main]
async fn main() -> OutreachResult<()> {
    let args = Args::parse();

    let run_id = RunId::init();
    logging::init_tracing_with_level(Some(&args.log_level));

    let leads = CsvLeadStore::new(&args.leads);

    if args.summary {
        let table = leads.load().await?;
        println!("{} leads in {}", table.len(), leads.location());
        for (status, count) in table.status_counts() {
            println!("  {status:<10} {count}");
        }
        return Ok(());
    }

    logging::log_startup(run_id, &format!("outreach run ({} policy)", args.policy));

    // Configuration errors are the only non-zero exit
    let env = EnvConfig::from_env()?;
    let settings = args.run_settings(env.subject_template.clone());
    let mailer = SmtpMailSender::from_config(env.smtp)?;
    let notifier = DiscordNotifier::from_url(env.discord_webhook_url)?;

    run_debug!(
        run_id,
        "Leads: {}, templates: {}, state: {}",
        args.leads.display(),
        args.templates.display(),
        args.state_file.display()
    );

    let mut orchestrator = Orchestrator::new(
        leads,
        JsonRunStateStore::new(&args.state_file),
        FileTemplateRenderer::new(&args.templates),
        mailer,
        SystemClock,
        settings,
    );
    if let Some(notifier) = notifier {
        orchestrator = orchestrator.with_notifier(Box::new(notifier));
    }

    let outcome = orchestrator.run_once().await;
    match &outcome {
        RunOutcome::Sent { .. } => logging::log_success(run_id, &format!("Run finished: {outcome}")),
        _ => run_info!(run_id, "🏁 Run finished: {}", outcome),
    }

    Ok(())
}
