//! Xtream catalog - command line front end
//! Logs in, mirrors the provider catalog and plays live channels

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use xtream_catalog::api::XtreamProvider;
use xtream_catalog::cache::{CatalogCache, StartupDecision};
use xtream_catalog::clock::SystemClock;
use xtream_catalog::config::JsonSettingsStore;
use xtream_catalog::models::Credentials;
use xtream_catalog::player::{ExternalPlayer, PlaybackEngine, PlaybackState};
use xtream_catalog::session::{AccountService, ChannelSession};
use xtream_catalog::store::CatalogStore;

#[derive(Parser)]
#[command(name = "xtream_catalog")]
#[command(about = "Xtream Codes catalog cache and live channel player", version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials with the provider and remember the account
    Login {
        server: String,
        username: String,
        password: String,
    },
    /// Refresh the cached catalog when it is stale
    Refresh {
        /// Refresh even when the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// List live categories
    Categories,
    /// List the channels of a category
    Channels { category_id: String },
    /// Play a live channel by content id
    Play { content_id: i64 },
    /// Forget the account and the cached catalog
    Logout,
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct App {
    cache: Arc<CatalogCache>,
    account: AccountService,
    session: ChannelSession,
    engine: Arc<ExternalPlayer>,
}

impl App {
    fn open() -> Result<Self> {
        let settings = Arc::new(JsonSettingsStore::open_default());
        let config = settings.snapshot();
        let store = Arc::new(
            CatalogStore::open(&config.database_path()).context("Failed to open catalog store")?,
        );
        let clock = Arc::new(SystemClock);
        let provider = Arc::new(XtreamProvider::new(&config.user_agent));
        let cache = Arc::new(CatalogCache::new(store, provider, clock.clone()));
        let engine = Arc::new(ExternalPlayer::new(&config.external_player, &config.user_agent));

        let account = AccountService::new(cache.clone(), clock.clone());
        let session = ChannelSession::new(cache.clone(), settings, engine.clone(), clock);

        Ok(Self {
            cache,
            account,
            session,
            engine,
        })
    }

    async fn refresh(&self, force: bool) -> Result<()> {
        let profile = self.account.require_profile()?;
        let decision = self.cache.startup_decision();
        if decision == StartupDecision::UseCache && !force {
            info!("Catalog is fresh, nothing to do");
            return Ok(());
        }

        let report = self.cache.refresh_all(&profile.credentials()).await?;
        if report.all_failed() {
            bail!("Every catalog request failed");
        }
        if !report.is_complete() {
            warn!(skipped = ?report.skipped, "Catalog partially refreshed");
        }
        Ok(())
    }

    /// Make sure there is something to browse before reading lists
    async fn ensure_catalog(&self) -> Result<()> {
        match self.cache.startup_decision() {
            StartupDecision::UseCache => Ok(()),
            StartupDecision::UseCacheAndRefresh => {
                if let Err(e) = self.refresh(false).await {
                    warn!("Serving stale catalog, refresh failed: {:#}", e);
                }
                Ok(())
            }
            StartupDecision::MustRefresh => self.refresh(false).await,
        }
    }

    async fn play(&self, content_id: i64) -> Result<()> {
        let Some(channel) = self.cache.store().live_channel_rows(content_id)?.into_iter().next() else {
            bail!("No live channel with id {}", content_id);
        };

        let mut state = self.engine.subscribe();
        self.session.load_categories().await;
        self.session.play_channel(&channel).await?;

        // Wait for the player process to go away
        loop {
            match &*state.borrow_and_update() {
                PlaybackState::Idle => break,
                PlaybackState::Error(message) => bail!("Playback failed: {}", message),
                _ => {}
            }
            if state.changed().await.is_err() {
                break;
            }
        }
        self.session.stop().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = App::open()?;

    match cli.command {
        Commands::Login {
            server,
            username,
            password,
        } => {
            let profile = app
                .account
                .login(&Credentials::new(&server, &username, &password))
                .await?;
            println!("Logged in as {} ({})", profile.username, profile.status);
            app.refresh(true).await?;
        }
        Commands::Refresh { force } => app.refresh(force).await?,
        Commands::Categories => {
            app.ensure_catalog().await?;
            app.session.load_categories().await;
            for category in app.session.categories() {
                println!("{}\t{}", category.category_id, category.category_name);
            }
        }
        Commands::Channels { category_id } => {
            app.ensure_catalog().await?;
            app.session.load_categories().await;
            let Some(category) = app
                .session
                .categories()
                .into_iter()
                .find(|c| c.category_id == category_id)
            else {
                bail!("Unknown or blocked category {}", category_id);
            };
            app.session.select_category(category).await;
            for channel in app.session.channels() {
                println!("{}\t{}", channel.content_id, channel.name);
            }
        }
        Commands::Play { content_id } => {
            app.ensure_catalog().await?;
            app.play(content_id).await?;
        }
        Commands::Logout => {
            app.account.logout()?;
            println!("Logged out");
        }
    }

    app.session.shutdown();
    Ok(())
}
