use clap::{Args, Subcommand, ValueEnum};

use treedeck::config::Config;
use treedeck::db::LocalStore;
use treedeck::models::Field;

use super::format_timestamp;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct FieldCommand {
    #[command(subcommand)]
    pub command: FieldSubcommand,
}

#[derive(Subcommand)]
pub enum FieldSubcommand {
    /// Add a field to a node (appended at the end of the card)
    Add {
        /// Node ID the field belongs to
        node_id: String,

        /// Field name
        name: String,

        /// Initial value
        #[arg(long)]
        value: Option<String>,
    },

    /// Set or clear a field's value
    Set {
        /// Field ID
        id: String,

        /// New value; omit together with --clear to empty the field
        value: Option<String>,

        /// Clear the value instead of setting one
        #[arg(long, conflicts_with = "value")]
        clear: bool,
    },

    /// List a node's active fields in card order
    List {
        /// Node ID
        node_id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Soft-delete a field (remaining fields close the gap)
    Rm {
        /// Field ID
        id: String,
    },

    /// Restore a soft-deleted field at the end of the card
    Restore {
        /// Field ID
        id: String,
    },

    /// Show a field's full change history
    History {
        /// Field ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl FieldCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FieldSubcommand::Add {
                node_id,
                name,
                value,
            } => {
                if name.trim().is_empty() {
                    return Err("Field name cannot be empty".into());
                }

                let mut field = Field::new(node_id, name.trim(), &config.actor.value);
                if let Some(value) = value {
                    field = field.with_value(value);
                }

                let created = store.create_field(&field).await?;
                println!(
                    "Created field {} at position {}",
                    created.id, created.card_order
                );
                Ok(())
            }

            FieldSubcommand::Set { id, value, clear } => {
                if value.is_none() && !clear {
                    return Err("Pass a value, or --clear to empty the field".into());
                }
                let updated = store
                    .update_field_value(id, value.clone(), &config.actor.value)
                    .await?;
                match &updated.value {
                    Some(v) => println!("Set {} = {}", updated.name, v),
                    None => println!("Cleared {}", updated.name),
                }
                Ok(())
            }

            FieldSubcommand::List { node_id, format } => {
                let fields = store.list_fields(node_id).await?;

                if fields.is_empty() {
                    println!("No fields found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&fields)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<3}  {:<36}  {:<20}  VALUE", "#", "ID", "NAME");
                        println!("{}", "-".repeat(90));
                        for field in &fields {
                            println!(
                                "{:<3}  {:<36}  {:<20}  {}",
                                field.card_order,
                                field.id,
                                field.name,
                                field.value.as_deref().unwrap_or("(empty)")
                            );
                        }
                    }
                }
                Ok(())
            }

            FieldSubcommand::Rm { id } => {
                let deleted = store.soft_delete_field(id, &config.actor.value).await?;
                println!("Deleted field {} ({})", deleted.id, deleted.name);
                Ok(())
            }

            FieldSubcommand::Restore { id } => {
                let restored = store.restore_field(id, &config.actor.value).await?;
                println!(
                    "Restored field {} at position {}",
                    restored.id, restored.card_order
                );
                Ok(())
            }

            FieldSubcommand::History { id, format } => {
                let entries = store.get_field_history(id).await?;

                if entries.is_empty() {
                    println!("No history for field {}", id);
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        for entry in &entries {
                            println!(
                                "r{:<4} {:<7} {:>20} -> {:<20}  {} by {}",
                                entry.rev,
                                entry.action.as_str(),
                                entry.prev_value.as_deref().unwrap_or("-"),
                                entry.new_value.as_deref().unwrap_or("-"),
                                format_timestamp(entry.updated_at),
                                entry.updated_by
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
