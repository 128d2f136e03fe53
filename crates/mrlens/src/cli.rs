use anyhow::Context;
use clap::{Parser, Subcommand};
use mrlens_api::{
    models::{MergeRequestId, ProjectId},
    traits::{ProjectSource, ReviewActions},
    ApiProvider,
};

use crate::{
    app::App,
    application_config::{inner_application_config, ApplicationConfig},
    dispatcher::ActionDispatcher,
    snapshot::SnapshotFetcher,
    summary::{format_duration, summarize, summarize_projects, Summary},
};

#[derive(Parser)]
#[command(author, version, about = "Browse AI code reviews of GitLab merge requests")]
pub struct Command {
    #[command(flatten)]
    config: inner_application_config::InnerApplicationConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List projects known to the review backend
    Projects,
    /// Open the terminal dashboard
    Dashboard {
        /// Open this project directly instead of the project list
        project_id: Option<ProjectId>,
    },
    /// Print review statistics for a project
    Summary {
        project_id: ProjectId,
        #[arg(long)]
        json: bool,
    },
    /// Import projects from GitLab into the backend
    Sync,
    /// Ask the backend to analyse a merge request again
    Rerun { mr_id: MergeRequestId },
    /// Post the latest review's issues to GitLab
    Recommend { mr_id: MergeRequestId },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Command::parse();

    let config = ApplicationConfig::new(cli.config)?;
    let api = ApiProvider::http(config.api_options())?;

    match cli.command.unwrap_or(Commands::Dashboard { project_id: None }) {
        Commands::Projects => {
            let projects = api.list_projects().await?;
            let overview = summarize_projects(&projects);

            for p in &projects {
                println!(
                    "{:>5}  {:<40} #{:<8} MRs {:>4}  open {:>4}  reviewed {:>4}",
                    p.id,
                    p.path_with_namespace,
                    p.gitlab_id,
                    p.mrs_count.unwrap_or_default(),
                    p.open_mrs_count.unwrap_or_default(),
                    p.reviewed_mrs_count.unwrap_or_default(),
                );
            }
            println!(
                "{} projects, {} MRs, {} open, {} reviewed",
                overview.projects, overview.mrs, overview.open_mrs, overview.reviewed_mrs
            );
        }
        Commands::Dashboard { project_id } => {
            tracing::info!("starting tui");
            let mut app = App::default().start_with_project(project_id);
            if let Err(e) = app.register_pages(api).run().await {
                tracing::error!("{}", e);
                return Err(e);
            }
            tracing::info!("stopping tui");
        }
        Commands::Summary { project_id, json } => {
            let snapshot = SnapshotFetcher::new(api)
                .fetch(project_id)
                .await
                .with_context(|| format!("failed to fetch project {project_id}"))?;
            let summary = summarize(&snapshot.merge_requests);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", snapshot.project.path_with_namespace);
                print_summary(&summary);
            }
        }
        Commands::Sync => {
            let report = api.sync_projects().await?;
            println!(
                "{}: {} created, {} updated, {} total",
                report.status, report.created, report.updated, report.total
            );
        }
        Commands::Rerun { mr_id } => {
            ActionDispatcher::new(api).request_reanalysis(mr_id).await?;
            println!("analysis restarted for merge request {mr_id}");
        }
        Commands::Recommend { mr_id } => {
            let mr = api.get_merge_request(mr_id).await?;
            ActionDispatcher::new(api)
                .request_recommendation_post(&mr)
                .await?;
            println!("recommendations posted for !{}", mr.mr_iid);
        }
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("  merge requests    {}", summary.total);
    println!("  reviewed          {}", summary.with_review);
    println!("  ready for merge   {}", summary.rec_merge);
    println!("  changes requested {}", summary.rec_needs_fixes);
    println!("  rejected          {}", summary.rec_reject);
    println!("  issues            {}", summary.total_issues);
    println!(
        "  avg AI time       {}",
        format_duration(summary.avg_processing_ms)
    );
    match summary.last_analyzed_at {
        Some(at) => println!("  last analysis     {}", at.to_rfc3339()),
        None => println!("  last analysis     —"),
    }
}
