use core::time::Duration;
use std::path::PathBuf;

use anyhow::Context;
use pscr::{
    config::{
        Credentials, DEFAULT_BASE_URL, DEFAULT_SNAPSHOT, DEFAULT_STORE_TIMEOUT, HarvestOptions,
        Site, StoreConfig,
    },
    db::Store,
    harvest::{harvest, write_json},
    model::Snapshot,
    scrape::Chrome,
    targets::load_targets,
};

#[derive(clap::Parser)]
#[command(name = "student-scraper", about = "Collects student progress from the tutoring site")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct StoreArgs {
    /// Postgres connection string of the snapshot store.
    #[arg(long, env = "STORE_URL")]
    store_url: Option<String>,
    #[arg(long, env = "STORE_KEY", hide_env_values = true)]
    store_key: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Scrape every targeted student and write the collected records.
    Scrape {
        #[arg(long, value_name = "file", default_value = "target_students.txt")]
        targets: PathBuf,
        #[arg(short, long, value_name = "file", default_value = "student_data.json")]
        output: PathBuf,
        #[arg(long, env = "SITE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        #[arg(long, env = "MATH_ACADEMY_USERNAME")]
        username: String,
        #[arg(long, env = "MATH_ACADEMY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, default_value_t = 3)]
        pause_secs: u64,
        #[arg(long, default_value_t = 10)]
        ready_timeout_secs: u64,
        /// Show the browser window.
        #[arg(long)]
        headed: bool,
        /// Also append the run to the snapshot store.
        #[arg(long)]
        store: bool,
        #[command(flatten)]
        store_args: StoreArgs,
    },
    /// Export the newest stored snapshot for the read API.
    Latest {
        #[arg(short, long, value_name = "file", env = "SNAPSHOT_PATH", default_value = DEFAULT_SNAPSHOT)]
        output: PathBuf,
        #[command(flatten)]
        store_args: StoreArgs,
    },
}

async fn connect_store(args: StoreArgs) -> anyhow::Result<Store> {
    let url = args
        .store_url
        .context("no store configured, set STORE_URL or --store-url")?;
    let config = StoreConfig {
        url,
        key: args.store_key,
        connect_timeout: DEFAULT_STORE_TIMEOUT,
    };
    Store::connect(&config)
        .await
        .context("connecting to the snapshot store")
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Scrape {
            targets,
            output,
            base_url,
            username,
            password,
            pause_secs,
            ready_timeout_secs,
            headed,
            store,
            store_args,
        } => {
            let targets = load_targets(&targets)
                .with_context(|| format!("reading target list {}", targets.display()))?;
            let credentials = Credentials::resolve(username, password)?;
            let store = if store {
                Some(connect_store(store_args).await?)
            } else {
                None
            };

            let site = Site::new(base_url);
            let chrome = Chrome::launch(
                !headed,
                site.clone(),
                Duration::from_secs(ready_timeout_secs),
            )?;
            let options = HarvestOptions {
                pause: Duration::from_secs(pause_secs),
            };

            let records = harvest(&chrome, &site, &credentials, &targets, &options).await;
            if records.is_empty() {
                return Ok(());
            }

            write_json(&output, &records)?;

            if let Some(store) = store {
                let payload = Snapshot::new(site.roster(), &records).to_value()?;
                if !store.insert(payload).await {
                    tracing::warn!(target: "db", "snapshot was not stored");
                }
            }
        }
        Commands::Latest { output, store_args } => {
            let store = connect_store(store_args).await?;
            let Some(data) = store.latest().await else {
                tracing::warn!(target: "db", "no snapshot in the store");
                return Ok(());
            };
            write_json(&output, &data)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    use clap::Parser;

    pretty_env_logger::init_timed();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!(target: "main", "\x1b[31m{e:?}\x1b[0m");
        std::process::exit(1);
    }
}
