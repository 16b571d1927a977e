//! Sync CLI commands for synchronizing with the server.

use std::sync::Arc;

use clap::{Args, Subcommand};

use treedeck::config::Config;
use treedeck::db::LocalStore;
use treedeck::remote::{check_server, HttpRemote, RemoteAdapter};
use treedeck::sync::{
    DeltaSync, FullCollectionSync, SyncManager, SyncOptions, SyncPusher,
};

use super::format_timestamp;

/// Sync with remote server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,

    /// Push all pending changes, then pull the complete remote
    /// collections (also reconciles remote hard deletes)
    Full,

    /// Run in the foreground, syncing periodically until Ctrl-C
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            Some(SyncSubcommand::Status) => self.status(store, config).await,
            None => {
                let remote = self.remote(config)?;
                self.sync(store, config, remote, false).await
            }
            Some(SyncSubcommand::Full) => {
                let remote = self.remote(config)?;
                self.sync(store, config, remote, true).await
            }
            Some(SyncSubcommand::Watch) => {
                let remote = self.remote(config)?;
                self.watch(store, config, remote).await
            }
        }
    }

    fn remote(&self, config: &Config) -> Result<Arc<dyn RemoteAdapter>, Box<dyn std::error::Error>> {
        let url = config.sync.server_url.as_deref().ok_or(
            "Sync is not configured. Set sync.server_url in your config file \
             or the TREEDECK_SERVER_URL environment variable.",
        )?;
        Ok(Arc::new(HttpRemote::new(url)))
    }

    /// One explicit push-then-pull pass. Unlike the background manager
    /// this surfaces errors to the caller instead of logging them.
    async fn sync(
        &self,
        store: &LocalStore,
        config: &Config,
        remote: Arc<dyn RemoteAdapter>,
        full: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let resolver = config.sync.policy.resolver(store.clone());

        println!("Syncing with server...");

        let pusher = SyncPusher::new(store.clone(), remote.clone());
        let stats = pusher.push().await?;
        if stats.processed > 0 {
            println!(
                "  pushed {} change(s), {} failed",
                stats.succeeded, stats.failed
            );
        } else {
            println!("  nothing to push");
        }

        if full {
            FullCollectionSync::new(store.clone(), remote, resolver)
                .sync()
                .await?;
            println!("  pulled full collections");
        } else {
            DeltaSync::new(store.clone(), remote, resolver).sync().await?;
            println!("  pulled changes");
        }

        store
            .set_last_sync_timestamp(treedeck::models::now_ms())
            .await?;
        println!("Sync complete.");
        Ok(())
    }

    async fn watch(
        &self,
        store: &LocalStore,
        config: &Config,
        remote: Arc<dyn RemoteAdapter>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let options = SyncOptions {
            interval_ms: config.sync.interval_ms,
            policy: config.sync.policy,
            enabled: true,
        };
        let manager = SyncManager::new(store.clone(), remote, options);

        manager.sync_once().await;
        manager.start();
        println!(
            "Watching; syncing every {}s. Press Ctrl-C to stop.",
            config.sync.interval_ms / 1000
        );

        tokio::signal::ctrl_c().await?;
        manager.stop();
        println!("\nStopped.");
        Ok(())
    }

    async fn status(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!();
            println!("Or set environment variable:");
            println!("  TREEDECK_SERVER_URL");
            return Ok(());
        }

        let server_url = config.sync.server_url.as_ref().unwrap();

        println!("Server:    {}", server_url);
        println!(
            "Auto-sync: {} (every {}s)",
            if config.sync.enabled {
                "enabled"
            } else {
                "disabled"
            },
            config.sync.interval_ms / 1000
        );
        println!("Policy:    {:?}", config.sync.policy);

        match store.get_last_sync_timestamp().await? {
            Some(ts) => println!("Last sync: {}", format_timestamp(ts)),
            None => println!("Last sync: never"),
        }

        let counts = store.queue_counts().await?;
        if counts.is_empty() {
            println!("Queue:     empty");
        } else {
            let summary: Vec<String> = counts
                .iter()
                .map(|(status, n)| format!("{} {}", n, status))
                .collect();
            println!("Queue:     {}", summary.join(", "));
        }
        println!();

        print!("Server status: ");
        if check_server(server_url).await {
            println!("✓ reachable");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }
}
