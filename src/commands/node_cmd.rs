use clap::{Args, Subcommand, ValueEnum};

use treedeck::config::Config;
use treedeck::db::{LocalStore, NodePatch};
use treedeck::models::Node;

use super::format_timestamp;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct NodeCommand {
    #[command(subcommand)]
    pub command: NodeSubcommand,
}

#[derive(Subcommand)]
pub enum NodeSubcommand {
    /// Create a new node
    Add {
        /// Name of the node
        name: String,

        /// Subtitle shown under the name
        #[arg(long)]
        subtitle: Option<String>,

        /// Parent node ID; omit for a root node
        #[arg(long)]
        parent: Option<String>,
    },

    /// List active nodes (roots, or children of --parent)
    List {
        /// Parent node ID
        #[arg(long)]
        parent: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a node with its fields
    Show {
        /// Node ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rename or retitle a node
    Set {
        /// Node ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New subtitle
        #[arg(long)]
        subtitle: Option<String>,
    },

    /// Soft-delete a node
    Rm {
        /// Node ID
        id: String,
    },

    /// Restore a soft-deleted node
    Restore {
        /// Node ID
        id: String,
    },

    /// List soft-deleted nodes (roots, or children of --parent)
    Deleted {
        /// Parent node ID
        #[arg(long)]
        parent: Option<String>,
    },
}

impl NodeCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            NodeSubcommand::Add {
                name,
                subtitle,
                parent,
            } => {
                if name.trim().is_empty() {
                    return Err("Node name cannot be empty".into());
                }

                let mut node = Node::new(name.trim(), &config.actor.value);
                if let Some(subtitle) = subtitle {
                    node = node.with_subtitle(subtitle);
                }
                if let Some(parent) = parent {
                    node = node.with_parent(parent);
                }

                let created = store.create_node(&node).await?;
                println!("Created node {}", created.id);
                Ok(())
            }

            NodeSubcommand::List { parent, format } => {
                let nodes = match parent {
                    Some(parent_id) => store.list_children(parent_id).await?,
                    None => store.list_root_nodes().await?,
                };

                if nodes.is_empty() {
                    println!("No nodes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&nodes)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  UPDATED", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for node in &nodes {
                            println!(
                                "{:<36}  {:<30}  {}",
                                node.id,
                                truncate(&node.name, 30),
                                format_timestamp(node.updated_at)
                            );
                        }
                        println!("\nTotal: {} node(s)", nodes.len());
                    }
                }
                Ok(())
            }

            NodeSubcommand::Show { id, format } => {
                let node = store
                    .get_node(id)
                    .await?
                    .ok_or_else(|| format!("Node not found: {}", id))?;
                let fields = store.list_fields(id).await?;

                match format {
                    OutputFormat::Json => {
                        let doc = serde_json::json!({ "node": node, "fields": fields });
                        println!("{}", serde_json::to_string_pretty(&doc)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", node.name);
                        println!("{}", "=".repeat(node.name.len()));
                        if !node.subtitle.is_empty() {
                            println!("{}", node.subtitle);
                        }
                        println!("ID:      {}", node.id);
                        if let Some(parent_id) = &node.parent_id {
                            println!("Parent:  {}", parent_id);
                        }
                        println!("Updated: {} by {}", format_timestamp(node.updated_at), node.updated_by);
                        if node.is_deleted() {
                            println!("Status:  deleted");
                        }

                        if !fields.is_empty() {
                            println!("\nFields:");
                            for field in &fields {
                                println!(
                                    "  {}. {} = {}",
                                    field.card_order,
                                    field.name,
                                    field.value.as_deref().unwrap_or("(empty)")
                                );
                            }
                        }
                    }
                }
                Ok(())
            }

            NodeSubcommand::Set { id, name, subtitle } => {
                if name.is_none() && subtitle.is_none() {
                    return Err("Nothing to update; pass --name or --subtitle".into());
                }
                let patch = NodePatch {
                    name: name.clone(),
                    subtitle: subtitle.clone(),
                };
                let updated = store.update_node(id, patch, &config.actor.value).await?;
                println!("Updated node {}", updated.id);
                Ok(())
            }

            NodeSubcommand::Rm { id } => {
                let deleted = store.soft_delete_node(id, &config.actor.value).await?;
                println!("Deleted node {} ({})", deleted.id, deleted.name);
                Ok(())
            }

            NodeSubcommand::Restore { id } => {
                let restored = store.restore_node(id, &config.actor.value).await?;
                println!("Restored node {} ({})", restored.id, restored.name);
                Ok(())
            }

            NodeSubcommand::Deleted { parent } => {
                let nodes = match parent {
                    Some(parent_id) => store.list_deleted_children(parent_id).await?,
                    None => store.list_deleted_nodes().await?,
                };

                if nodes.is_empty() {
                    println!("No deleted nodes");
                    return Ok(());
                }

                println!("{:<36}  {:<30}  DELETED", "ID", "NAME");
                println!("{}", "-".repeat(80));
                for node in &nodes {
                    let deleted_at = node.deleted_at.map(format_timestamp).unwrap_or_default();
                    println!(
                        "{:<36}  {:<30}  {}",
                        node.id,
                        truncate(&node.name, 30),
                        deleted_at
                    );
                }
                Ok(())
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_names_pass_through() {
        assert_eq!(truncate("Inbox", 30), "Inbox");
        let exact = "a".repeat(30);
        assert_eq!(truncate(&exact, 30), exact);
    }

    #[test]
    fn test_truncate_long_names_get_ellipsis() {
        let long = "a".repeat(40);
        let cut = truncate(&long, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_handles_multibyte_names() {
        // Each é is two bytes; a byte-indexed cut would land mid-char.
        let long = "é".repeat(31);
        let cut = truncate(&long, 30);
        assert_eq!(cut, format!("{}...", "é".repeat(27)));

        let mixed = format!("{}日本語カード", "x".repeat(28));
        assert!(truncate(&mixed, 30).ends_with("..."));
    }
}
