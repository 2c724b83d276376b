//! Command handlers. Each one builds a context from the environment.

use color_eyre::Result;
use tracing::info;

use crate::config::{Configuration, ContextOptions};
use crate::context::{CureContext, StartupOutcome};

const ENV_DATA_DIR: &str = "CURE_DATA_DIR";

/// Build a context and run the startup sequence.
async fn start(realtime: bool) -> Result<(CureContext, StartupOutcome)> {
    let config = Configuration::from_env()?;
    let config = if realtime {
        config
    } else {
        config.with_auto_realtime(false)
    };

    let mut options = ContextOptions::new();
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        options = options.with_data_dir(dir);
    }

    let context = CureContext::init(options)?;
    let outcome = context.configure(config)?.wait().await;
    info!("Startup outcome: {:?}", outcome);
    Ok((context, outcome))
}

fn describe(outcome: StartupOutcome) -> &'static str {
    match outcome {
        StartupOutcome::Online => "online",
        StartupOutcome::Offline => "offline (serving cached content)",
        StartupOutcome::Failed => "failed (no credentials accepted, nothing cached)",
    }
}

/// Start once and print what is known.
pub async fn handle_run_command() -> Result<()> {
    let (context, outcome) = start(false).await?;
    println!("status:      {}", describe(outcome));
    println!("language:    {}", context.language());
    println!(
        "collections: {}",
        context.known_collections().into_iter().collect::<Vec<_>>().join(", ")
    );
    println!(
        "stores:      {}",
        context.known_stores().into_iter().collect::<Vec<_>>().join(", ")
    );
    context.shutdown().await;
    Ok(())
}

/// Sync one collection, or everything.
pub async fn handle_sync_command(name: Option<String>) -> Result<()> {
    let (context, _) = start(false).await?;
    let ok = match &name {
        Some(name) => context.sync(name).await,
        None => context.sync_all().await,
    };
    let target = name.as_deref().unwrap_or("all collections");
    if ok {
        println!("synced {}", target);
    } else {
        println!("sync of {} failed", target);
    }
    context.shutdown().await;
    Ok(())
}

/// Print available languages, one per line.
pub async fn handle_languages_command() -> Result<()> {
    let (context, _) = start(false).await?;
    let current = context.language();
    for language in context.available_languages().await {
        let marker = if language == current { "*" } else { " " };
        println!("{} {}", marker, language);
    }
    context.shutdown().await;
    Ok(())
}

/// Start with realtime and print update events until Ctrl-C.
pub async fn handle_watch_command() -> Result<()> {
    let (context, outcome) = start(true).await?;
    println!("status: {}", describe(outcome));
    println!("watching for updates, Ctrl-C to stop");

    let mut updates = context.subscribe();
    loop {
        tokio::select! {
            event = updates.recv() => match event {
                Some(event) => println!("updated: {}", event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    context.shutdown().await;
    Ok(())
}
