//! # prefstore CLI - inspect and edit preference stores
//!
//! A command-line front end over the scoped preference registry.
//!
//! ## Features
//! - Read, write and remove entries by node path
//! - List keys and child nodes, print the whole tree
//! - Sync a store with its backing file
//! - Export the encoded backing document
//!
//! ## Usage
//! ```bash
//! # Write a value into the system store (flushed immediately)
//! prefstore put ui.window width 1280
//!
//! # Read it back from the same node, other separator
//! prefstore get ui/window width
//!
//! # Work with a user's store in a custom directory
//! prefstore --dir ~/.config/my-app --user alice tree
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use prefstore::{
    CodecKind, NodeSnapshot, PreferencesConfig, RegistryBuilder, Result, Scope, Store,
    TreeSnapshot,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// prefstore CLI - hierarchical preferences on disk
#[derive(Parser)]
#[command(name = "prefstore")]
#[command(version)]
#[command(about = "Inspect and edit hierarchical, file-backed preference stores")]
#[command(long_about = None)]
struct Cli {
    /// Preferences directory (defaults to $PREFSTORE_DIR or .preferences)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Use this user's store instead of the system store
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Backing-file format (defaults to $PREFSTORE_FORMAT or json)
    #[arg(short, long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a key
    Get {
        /// Node path, `.` or `/` separated
        path: String,

        /// Key to read
        key: String,

        /// Printed when the key is not set
        #[arg(long)]
        default: Option<String>,
    },

    /// Set a key and flush
    Put {
        /// Node path, `.` or `/` separated
        path: String,

        /// Key to write
        key: String,

        /// Value to store
        value: String,
    },

    /// Remove a key and flush
    #[command(alias = "rm")]
    Remove {
        /// Node path, `.` or `/` separated
        path: String,

        /// Key to remove
        key: String,
    },

    /// List the keys of a node
    Keys {
        /// Node path (defaults to the root)
        #[arg(default_value = "/")]
        path: String,
    },

    /// List the children of a node
    #[command(alias = "ls")]
    Children {
        /// Node path (defaults to the root)
        #[arg(default_value = "/")]
        path: String,
    },

    /// Remove a node with its subtree and flush
    RemoveNode {
        /// Node path, `.` or `/` separated
        path: String,
    },

    /// Print the whole tree
    Tree,

    /// Merge the backing file into the store and flush
    Sync,

    /// Print the encoded backing document
    Export,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Binary,
}

impl From<FormatArg> for CodecKind {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => CodecKind::Json,
            FormatArg::Binary => CodecKind::Binary,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    // Run command
    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e.user_message());
            std::process::exit(1);
        }
    }
}

/// Main command runner; `Ok(false)` means a lookup found nothing
fn run(cli: Cli) -> Result<bool> {
    let store = open_store(cli.dir, cli.user, cli.format)?;

    match cli.command {
        Commands::Get { path, key, default } => cmd_get(&store, &path, &key, default),
        Commands::Put { path, key, value } => cmd_put(&store, &path, &key, &value).map(|_| true),
        Commands::Remove { path, key } => cmd_remove(&store, &path, &key).map(|_| true),
        Commands::Keys { path } => cmd_keys(&store, &path).map(|_| true),
        Commands::Children { path } => cmd_children(&store, &path).map(|_| true),
        Commands::RemoveNode { path } => cmd_remove_node(&store, &path).map(|_| true),
        Commands::Tree => cmd_tree(&store).map(|_| true),
        Commands::Sync => cmd_sync(&store).map(|_| true),
        Commands::Export => cmd_export(&store).map(|_| true),
    }
}

fn open_store(
    dir: Option<PathBuf>,
    user: Option<String>,
    format: Option<FormatArg>,
) -> Result<Store> {
    let mut builder = RegistryBuilder::from_config(PreferencesConfig::from_env()?);
    if let Some(dir) = dir {
        builder = builder.directory(dir);
    }
    if let Some(format) = format {
        builder = builder.format(format.into());
    }
    let registry = builder.build();

    let scope = match user {
        Some(name) => {
            // Rejects names that normalize to nothing
            registry.user_root_for(&name)?;
            Scope::user(&name)
        }
        None => Scope::System,
    };
    registry.store(scope)
}

fn cmd_get(store: &Store, path: &str, key: &str, default: Option<String>) -> Result<bool> {
    match store.get(path, key).or(default) {
        Some(value) => {
            println!("{}", value);
            Ok(true)
        }
        None => {
            eprintln!(
                "{}",
                format!("'{}' is not set in {}", key, prefstore::path::normalize(path)).yellow()
            );
            Ok(false)
        }
    }
}

fn cmd_put(store: &Store, path: &str, key: &str, value: &str) -> Result<()> {
    store.put(path, key, value);
    store.flush()?;
    println!(
        "{} {} {} = {}",
        "Set".green().bold(),
        prefstore::path::normalize(path).blue(),
        key.yellow(),
        value
    );
    Ok(())
}

fn cmd_remove(store: &Store, path: &str, key: &str) -> Result<()> {
    store.remove(path, key);
    store.flush()?;
    println!(
        "{} {} {}",
        "Removed".green().bold(),
        prefstore::path::normalize(path).blue(),
        key.yellow()
    );
    Ok(())
}

fn cmd_keys(store: &Store, path: &str) -> Result<()> {
    for key in store.keys(path) {
        println!("{}", key);
    }
    Ok(())
}

fn cmd_children(store: &Store, path: &str) -> Result<()> {
    for name in store.children_names(path) {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_remove_node(store: &Store, path: &str) -> Result<()> {
    store.remove_node(path)?;
    store.flush()?;
    println!(
        "{} {}",
        "Removed node".green().bold(),
        prefstore::path::normalize(path).blue()
    );
    Ok(())
}

fn cmd_tree(store: &Store) -> Result<()> {
    let snapshot: TreeSnapshot = store.snapshot();
    println!("{}", "/".blue().bold());
    for entry in &snapshot.entries {
        print_entry(1, &entry.key, entry.get().unwrap_or_default());
    }
    for child in &snapshot.children {
        print_node(1, child);
    }

    let stats = store.stats();
    println!();
    println!(
        "{}",
        format!("{} nodes, {} entries", stats.node_count, stats.entry_count).dimmed()
    );
    Ok(())
}

fn print_node(depth: usize, node: &NodeSnapshot) {
    println!("{}{}", "  ".repeat(depth), format!("{}/", node.name).blue().bold());
    for entry in &node.entries {
        print_entry(depth + 1, &entry.key, entry.get().unwrap_or_default());
    }
    for child in &node.children {
        print_node(depth + 1, child);
    }
}

fn print_entry(depth: usize, key: &str, value: &str) {
    println!("{}{} = {}", "  ".repeat(depth), key.yellow(), value);
}

fn cmd_sync(store: &Store) -> Result<()> {
    let stats = store.sync()?;
    if !stats.has_changes() {
        println!("{}", "Already in sync.".green());
        return Ok(());
    }
    println!("{}", "Synced with backing file:".blue().bold());
    println!("  Added:         {}", stats.entries_added.to_string().green());
    println!("  Updated:       {}", stats.entries_updated.to_string().yellow());
    println!("  Removed:       {}", stats.entries_removed.to_string().red());
    println!("  Nodes created: {}", stats.nodes_created.to_string().cyan());
    Ok(())
}

fn cmd_export(store: &Store) -> Result<()> {
    let bytes = store.export()?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}
