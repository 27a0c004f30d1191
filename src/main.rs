use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use search_intent::config::Config;
use search_intent::session::{Handlers, SessionState, SessionStore};
use search_intent::web::{self, AppState};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("search_intent=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let handlers = Handlers::from_config(&config)?;

    match args.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            let addr = format!(
                "{}:{}",
                host.unwrap_or_else(|| config.host.clone()),
                port.unwrap_or(config.port)
            );
            let state = Arc::new(AppState::new(handlers, SessionStore::new(config.session_ttl))?);
            web::serve(state, &addr).await?;
        }
        Command::Analyze { keyword, k, summarize } => {
            analyze(&handlers, &keyword, k, summarize).await?;
        }
    }

    Ok(())
}

async fn analyze(handlers: &Handlers, keyword: &str, k: u32, summarize: bool) -> Result<(), Box<dyn Error>> {
    let mut session = SessionState::new();
    let report = handlers.run(&mut session, keyword, k).await?;

    for failure in &report.failures {
        eprintln!("Skipped {failure}");
    }
    if report.listed == 0 {
        eprintln!("No search results for \"{keyword}\"");
        return Ok(());
    }

    println!("{}", session.all_content());

    if summarize && session.has_responses() {
        let summary = handlers.summarize_further(&mut session).await?;
        println!("\n==== Overall summary ====\n\n{summary}");
    }
    Ok(())
}
