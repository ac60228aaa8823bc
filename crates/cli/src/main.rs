use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use segue_core::fetch::{HttpTransport, Transport};
use segue_core::{
    extract_bundle, Engine, EngineConfig, NavigationOutcome, NoopRuntime, Page, PageBundle,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "segue", about = "Headless PJAX navigation: fetch, extract and splice pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and print the bundle the engine would splice in
    Extract {
        /// The URL to fetch
        url: String,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON instead of compact format
        #[arg(long)]
        json: bool,
    },
    /// Load a page, then follow each href in turn without full reloads
    Walk {
        /// The page to start from
        start: String,

        /// Links to follow, resolved against the current location
        #[arg(required = true)]
        hrefs: Vec<String>,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Extract { url, config, json } => extract(&url, config, json).await,
            Commands::Walk {
                start,
                hrefs,
                config,
            } => walk(&start, &hrefs, config).await,
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> CliResult<EngineConfig> {
    Ok(match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    })
}

async fn extract(url: &str, config: Option<PathBuf>, as_json: bool) -> CliResult<()> {
    let config = load_config(config)?;
    let container = config.container()?;
    let url = Url::parse(url)?;

    let transport = HttpTransport::new()?;
    let header = [(config.request_header.as_str(), "true")];
    let response = transport.get(&url, &header).await?;
    if !response.is_success() {
        return Err(format!("HTTP {} for {}", response.status, response.url).into());
    }
    let bundle = extract_bundle(&response.body, &response.url, &container)?;
    print_bundle(&bundle, as_json)?;
    Ok(())
}

/// Fetch `url` as an ordinary page load and hand it to a fresh engine.
async fn boot(
    url: &Url,
    config: &EngineConfig,
    transport: &HttpTransport,
) -> CliResult<Engine<HttpTransport, NoopRuntime>> {
    let response = transport.get(url, &[]).await?;
    if !response.is_success() {
        return Err(format!("HTTP {} for {}", response.status, response.url).into());
    }
    let page = Page::from_html(&response.body, response.url);
    Ok(Engine::new(config.clone(), transport.clone(), NoopRuntime, page)?)
}

async fn walk(start: &str, hrefs: &[String], config: Option<PathBuf>) -> CliResult<()> {
    let config = load_config(config)?;
    let transport = HttpTransport::new()?;
    let mut engine = boot(&Url::parse(start)?, &config, &transport).await?;
    println!("start: {} {:?}", engine.page().location(), engine.page().title());

    for (step, href) in hrefs.iter().enumerate() {
        debug!(step, href = %href, "following link");
        let outcome = engine.navigate_to(href).await;
        let label = match &outcome {
            NavigationOutcome::Applied(_) => "applied".to_string(),
            NavigationOutcome::FullReload { error: Some(e), .. } => format!("full load ({e})"),
            NavigationOutcome::FullReload { error: None, .. } => "full load".to_string(),
            NavigationOutcome::Rejected(e) => format!("rejected ({e})"),
            other => format!("{other:?}").to_lowercase(),
        };
        if let NavigationOutcome::FullReload { url, .. } = &outcome {
            engine = boot(url, &config, &transport).await?;
        }
        let page = engine.page();
        println!(
            "{:>2}. {} -> {}: {:?} history={} cached={}",
            step + 1,
            href,
            label,
            page.title(),
            page.history().len(),
            engine.cache_len(),
        );
        println!("    at {}", page.location());
    }
    Ok(())
}

fn print_bundle(bundle: &PageBundle, as_json: bool) -> CliResult<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(bundle)?);
        return Ok(());
    }
    println!("title: {}", bundle.title);
    println!("url: {}", bundle.url);
    println!("content: {} bytes", bundle.content_html.len());
    println!("inline styles: {}", bundle.inline_styles.len());
    for sheet in &bundle.stylesheets {
        let href = sheet
            .absolute_href
            .as_deref()
            .or(sheet.href.as_deref())
            .unwrap_or("-");
        println!("stylesheet: {}", href);
    }
    for script in &bundle.scripts {
        match script.absolute_src.as_deref().or(script.src.as_deref()) {
            Some(src) => {
                let mut flags = Vec::new();
                if script.is_async {
                    flags.push("async");
                }
                if script.defer {
                    flags.push("defer");
                }
                println!("script: {} {}", src, flags.join(" "));
            }
            None => println!(
                "script: inline {} ({} bytes)",
                script.script_type.as_deref().unwrap_or("text/javascript"),
                script.content.len()
            ),
        }
    }
    println!("extras: {}", bundle.extras.len());
    println!("---");
    println!("{}", bundle.content_html.trim());
    Ok(())
}
