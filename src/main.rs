use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use match_commentary::config::{load_config, ApiKey};
use match_commentary::model::demo_events::demo_events;
use match_commentary::model::game_event::load_events;
use match_commentary::{CommentaryPipeline, GeminiClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("match_commentary=info".parse()?),
        )
        .init();

    // Missing credential halts startup before any call is made.
    let api_key = ApiKey::from_env()?;
    let config = load_config();

    let events = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_events(&path)?,
        None => demo_events(),
    };
    let Some(first) = events.first() else {
        anyhow::bail!("no events to comment on");
    };

    let client = GeminiClient::new(&config.endpoint, api_key, config.request_timeout())?;
    let pipeline = CommentaryPipeline::from_config(Arc::new(client), &config);

    match pipeline
        .narrate_two_stage(first, "Dramatic", &first.primary_player)
        .await
    {
        Ok(narrative) => println!("{}\n", narrative),
        Err(e) => eprintln!("Two-stage commentary failed: {}\n", e),
    }

    let report = pipeline.match_report(&events, "Neutral").await;
    println!("MATCH REPORT:\n{}\n", report.summary);
    println!("KEY MOMENTS: {:?}", report.key_moments);

    Ok(())
}
