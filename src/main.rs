use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use tokio::time::MissedTickBehavior;

use gleaner::config::{Config, StorageKind};
use gleaner::feed::{
    discover_feed, fetch_feed, normalize_url, subscribe, FeedClient,
};
use gleaner::storage::{Article, Database, FeedScope, FeedStore, JsonStore, StoreError};
use gleaner::trigger::{completion_message, run_refresh, RefreshTrigger, TriggerError};

/// Get the config directory path (~/.config/gleaner/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gleaner"))
}

fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    // Store files are user-private
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(config_dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "gleaner", about = "Find, fetch and refresh RSS/Atom feeds")]
struct Args {
    /// Config file (default: ~/.config/gleaner/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a site URL to its feed URL
    Discover { url: String },
    /// Fetch a feed and print it as JSON
    Parse { url: String },
    /// Subscribe to the feed behind a site or feed URL
    Add { url: String },
    /// Unsubscribe from a feed and drop its articles
    Remove { feed_id: i64 },
    /// List subscribed feeds
    Feeds,
    /// List articles, newest first
    Articles {
        /// Only show articles not yet read
        #[arg(long)]
        unread: bool,
    },
    /// Mark one article read
    Read { article_id: i64 },
    /// Mark every article read
    ReadAll,
    /// Run one refresh cycle
    Refresh {
        /// Run as the scheduled trigger with this secret
        #[arg(long)]
        secret: Option<String>,
    },
    /// Refresh on a timer until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let client = FeedClient::new(&config.user_agent, config.request_timeout())
        .context("Failed to build HTTP client")?;

    // Network-only commands never open a store
    match &args.command {
        Command::Discover { url } => return cmd_discover(&client, url).await,
        Command::Parse { url } => return cmd_parse(&client, url).await,
        _ => {}
    }

    match config.storage {
        StorageKind::Sqlite => {
            let path = match &config.database_path {
                Some(p) => p.clone(),
                None => {
                    ensure_config_dir(&config_dir)?;
                    config_dir.join("gleaner.db")
                }
            };
            let db = match Database::open(&path.to_string_lossy()).await {
                Ok(db) => db,
                Err(StoreError::InstanceLocked) => {
                    eprintln!("Error: {}", StoreError::InstanceLocked);
                    std::process::exit(1);
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
            };
            run(args.command, &config, &db, &client).await
        }
        StorageKind::Json => {
            let path = match &config.json_path {
                Some(p) => p.clone(),
                None => {
                    ensure_config_dir(&config_dir)?;
                    config_dir.join("gleaner.json")
                }
            };
            let store = JsonStore::load(&path)
                .await
                .with_context(|| format!("Failed to open store file {}", path.display()))?;
            run(args.command, &config, &store, &client).await
        }
    }
}

async fn cmd_discover(client: &FeedClient, raw: &str) -> Result<()> {
    let url = normalize_url(raw)?;
    let found = discover_feed(client, &url).await?;
    println!("{} ({:?})", found.feed_url, found.rule);
    Ok(())
}

async fn cmd_parse(client: &FeedClient, raw: &str) -> Result<()> {
    let url = normalize_url(raw)?;
    let feed = fetch_feed(client, url.as_str()).await?;
    let json = serde_json::to_string_pretty(&feed).context("Failed to encode feed")?;
    println!("{json}");
    Ok(())
}

async fn run<S: FeedStore>(
    command: Command,
    config: &Config,
    store: &S,
    client: &FeedClient,
) -> Result<()> {
    let user = config.user.as_str();

    match command {
        Command::Discover { .. } | Command::Parse { .. } => {}
        Command::Add { url } => {
            let sub = subscribe(store, client, user, &url, config.subscribe_cap).await?;
            println!(
                "Added feed {} \"{}\" <{}> with {} articles",
                sub.feed.id,
                sub.feed.title,
                sub.feed.url,
                sub.articles.len()
            );
        }
        Command::Remove { feed_id } => {
            if store.delete_feed(feed_id).await? {
                println!("Removed feed {feed_id}");
            } else {
                bail!("No feed with id {feed_id}");
            }
        }
        Command::Feeds => {
            for feed in store.list_feeds(FeedScope::User(user)).await? {
                println!("{:>5}  {}  <{}>", feed.id, feed.title, feed.url);
            }
        }
        Command::Articles { unread } => {
            for article in visible_articles(store.list_articles(user).await?, unread) {
                let mark = if article.is_read { "x" } else { " " };
                println!(
                    "{:>6} [{mark}] {}  {}  <{}>",
                    article.id, article.pub_date, article.title, article.link
                );
            }
        }
        Command::Read { article_id } => {
            if store.mark_article_read(article_id).await? {
                println!("Marked article {article_id} read");
            } else {
                println!("Article {article_id} was already read or does not exist");
            }
        }
        Command::ReadAll => {
            let n = store.mark_all_read(user).await?;
            println!("Marked {n} articles read");
        }
        Command::Refresh { secret } => {
            let expected = config.cron_secret();
            let trigger = match &secret {
                Some(credential) => RefreshTrigger::Scheduled {
                    credential: credential.as_str(),
                },
                None => RefreshTrigger::Manual,
            };
            match run_refresh(trigger, expected.as_ref(), store, client, config.refresh_cap).await
            {
                Ok(summary) => println!("{}", completion_message(&summary)),
                Err(TriggerError::Unauthorized) => bail!("Unauthorized"),
                Err(e) => return Err(e.into()),
            }
        }
        Command::Watch => watch(config, store, client).await?,
    }

    Ok(())
}

fn visible_articles(articles: Vec<Article>, unread_only: bool) -> Vec<Article> {
    if unread_only {
        articles.into_iter().filter(|a| !a.is_read).collect()
    } else {
        articles
    }
}

/// Runs a refresh every `refresh_interval_minutes` until Ctrl-C.
///
/// With a cron secret configured each tick goes through the scheduled trigger,
/// otherwise through the manual one.
async fn watch<S: FeedStore>(config: &Config, store: &S, client: &FeedClient) -> Result<()> {
    let Some(period) = config.refresh_interval() else {
        bail!("refresh_interval_minutes must be set to use watch");
    };
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let secret: Option<SecretString> = config.cron_secret();
    tracing::info!(
        interval_minutes = config.refresh_interval_minutes,
        scheduled = secret.is_some(),
        "Watching feeds"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let trigger = match &secret {
                    Some(s) => RefreshTrigger::Scheduled { credential: s.expose_secret() },
                    None => RefreshTrigger::Manual,
                };
                match run_refresh(trigger, secret.as_ref(), store, client, config.refresh_cap).await {
                    Ok(summary) => println!("{}", completion_message(&summary)),
                    Err(e) => tracing::warn!(error = %e, "Refresh cycle failed"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Interrupted, stopping watch");
                break;
            }
        }
    }

    Ok(())
}
