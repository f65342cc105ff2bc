use clap::Parser;
use privacy_pal::Extension;
use privacy_pal::browser::PageSource;
use privacy_pal::browser::web::WebDriverPage;
use privacy_pal::cache::FileStorage;
use privacy_pal::config::PalConfig;
use privacy_pal::display::{render_badge, render_popup};
use privacy_pal::fetch::ScrapeClient;
use privacy_pal::server::{self, ScrapeState, WebDriverRenderer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

mod args;
use args::{Args, Command};

/// Tab id used for the single page a scan drives
const SCAN_TAB: u32 = 1;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    let result = match args.command {
        Command::Serve => serve(&config).await,
        Command::Scan {
            url,
            watch_secs,
            learn_more,
        } => scan(&config, &url, watch_secs, learn_more).await,
        Command::Show { url, learn_more } => show(&config, &url, learn_more).await,
    };

    if let Err(e) = result {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<PalConfig, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => PalConfig::from_file(path)?,
        None => PalConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(storage) = &args.storage {
        config.storage_path = storage.clone();
    }
    Ok(config)
}

async fn serve(config: &PalConfig) -> Result<(), Box<dyn Error>> {
    let renderer = WebDriverRenderer::new(&config.webdriver_url, config.fetch_timeout());
    server::serve(&config.listen_addr, ScrapeState::new(Arc::new(renderer))).await?;
    Ok(())
}

async fn scan(config: &PalConfig, url: &str, watch_secs: u64, learn_more: bool) -> Result<(), Box<dyn Error>> {
    println!("Note: scanning requires a WebDriver server (e.g., ChromeDriver) and the scrape service.");
    println!("Set WEBDRIVER_URL and API_URL if not using the defaults.");

    let storage = FileStorage::open(&config.storage_path).await?;
    let runtime = Extension::new(Arc::new(storage))
        .with_debounce(config.debounce())
        .start();
    let fetcher = Arc::new(ScrapeClient::new(&config.api_url, config.fetch_timeout())?);

    let page = Arc::new(WebDriverPage::connect(&config.webdriver_url).await?);
    page.open(url).await?;
    let (mutations, poller) = page.watch_mutations(config.mutation_poll());

    let start_time = std::time::Instant::now();
    let watcher = runtime
        .watcher(SCAN_TAB, page.clone(), fetcher)
        .spawn(mutations);
    tokio::time::sleep(Duration::from_secs(watch_secs)).await;
    let summary = watcher.shutdown().await;
    poller.abort();

    ::log::info!(
        "Watched {} for {:.2} seconds ({} scans)",
        url,
        start_time.elapsed().as_secs_f64(),
        summary.map(|s| s.scans).unwrap_or(0)
    );

    let location = page.location().await.unwrap_or_else(|_| url.to_string());
    let session = runtime.popup().open(Some(&location)).await;
    println!("{}", render_popup(session.domain(), &session.view(), learn_more));
    println!("Badge: {}", render_badge(runtime.badges.state(SCAN_TAB).await));
    session.close().await;

    if let Ok(page) = Arc::try_unwrap(page) {
        page.close().await;
    }
    runtime.shutdown();
    Ok(())
}

async fn show(config: &PalConfig, url: &str, learn_more: bool) -> Result<(), Box<dyn Error>> {
    let storage = FileStorage::open(&config.storage_path).await?;
    let runtime = Extension::new(Arc::new(storage)).start();

    let session = runtime.popup().open(Some(url)).await;
    println!("{}", render_popup(session.domain(), &session.view(), learn_more));
    if let Some(record) = runtime.cache.get(session.domain()).await {
        println!(
            "Source: {} (fetched {})",
            record.url,
            privacy_pal::utils::age_since(record.timestamp, privacy_pal::utils::now_millis())
        );
    }
    session.close().await;
    runtime.shutdown();
    Ok(())
}
