use clap::{Args, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;

use treedeck::config::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the config file path in use
    Path,

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("actor: {}", config.actor.value);
                        println!("  source: {}", config.actor.source);
                        println!();

                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.enabled: {}", config.sync.enabled);
                        println!("sync.interval_ms: {}", config.sync.interval_ms);
                        println!("sync.policy: {:?}", config.sync.policy);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Path => {
                let path = config
                    .config_file
                    .clone()
                    .unwrap_or_else(Config::default_config_path);
                println!("{}", path.display());
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'treedeck config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                writeln!(file, "# treedeck configuration")?;
                writeln!(
                    file,
                    "# database_path: {}",
                    Config::default_data_dir().join("treedeck.db").display()
                )?;
                writeln!(file, "# actor: local")?;
                writeln!(file, "# sync:")?;
                writeln!(file, "#   server_url: \"http://localhost:8080\"")?;
                writeln!(file, "#   enabled: true")?;
                writeln!(file, "#   interval_ms: 600000")?;
                writeln!(file, "#   policy: lww")?;

                println!("Created config file: {}", config_path.display());
                Ok(())
            }
        }
    }
}
