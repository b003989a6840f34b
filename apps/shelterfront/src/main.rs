use std::sync::Arc;

use anyhow::Result;
use api_client::ApiClient;
use card_view::{CardRenderer, ContainerHost, InMemoryPage, LoadOutcome};
use clap::Parser;
use tracing::info;
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    /// Resource collections to load, e.g. `--endpoint shelters --endpoint pets`
    #[arg(long, default_value = "shelters")]
    endpoint: Vec<String>,
    /// Container the cards render into
    #[arg(long, default_value = "shelter-card-container")]
    container: String,
    /// Override the configured API base URL
    #[arg(long)]
    api_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = load_settings();

    let base = args.api_base_url.unwrap_or(settings.api_base_url);
    let base = Url::parse(&base)?;
    info!(%base, "using API base");

    let mut client = ApiClient::new(base);
    if let Some(token) = settings.bearer_token {
        client = client.with_bearer_token(token);
    }

    let page = Arc::new(InMemoryPage::with_containers([args.container.clone()]));
    let renderer = CardRenderer::new(
        Arc::new(client),
        Arc::clone(&page) as Arc<dyn ContainerHost>,
    );

    for endpoint in &args.endpoint {
        match renderer.load_once(endpoint, &args.container).await {
            LoadOutcome::Rendered { cards } => {
                println!("Rendered {cards} card(s) from '{endpoint}'.");
            }
            LoadOutcome::Failed { kind } => {
                println!("Loading '{endpoint}' failed ({kind:?}); fallback message shown.");
            }
            LoadOutcome::MissingContainer => {
                println!("Container '{}' does not exist.", args.container);
            }
            LoadOutcome::Cancelled => {}
        }
    }

    println!("{}", page.content(&args.container).await?);
    Ok(())
}
