mod action;
mod app;
mod application_config;
mod cli;
mod components;
mod config;
mod dispatcher;
mod integrity;
mod logging;
mod page;
mod scheduler;
mod selection;
mod snapshot;
mod summary;
mod tui;
mod view;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let log_path = logging::initialize_logging()?;
    logging::initialize_panic_handler();

    tracing::debug!(log = %log_path.display(), "starting mrlens");

    cli::run().await?;

    Ok(())
}
