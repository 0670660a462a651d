use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cms_rest_api::api;
use cms_rest_api::categories::Category;
use cms_rest_api::comments::Comment;
use cms_rest_api::config::Config;
use cms_rest_api::error::StoreError;
use cms_rest_api::options::BlogOption;
use cms_rest_api::tags::{get_tag_names, resolve_aliases, sync_object_tags, PgTagStore};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// The address to bind to (defaults to BIND_ADDR)
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },
    /// Category commands
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Comment commands
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },
    /// Tag commands
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Option commands
    Options {
        #[command(subcommand)]
        command: OptionCommands,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Print the category tree
    Tree,
    /// List all categories
    List,
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Print the threaded comments of a post
    Tree {
        /// The post ID
        post_id: i64,
    },
    /// Print the number of stored comments
    Count,
}

#[derive(Subcommand)]
enum TagCommands {
    /// Replace the tags of a post with a comma separated list
    Sync {
        /// The post ID
        post_id: i64,
        /// Tag names, e.g. "rust, databases"
        tags: String,
    },
    /// Expand tag IDs with their aliases
    Resolve {
        /// Tag IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Print the tag names of a post
    Names {
        /// The post ID
        post_id: i64,
    },
}

#[derive(Subcommand)]
enum OptionCommands {
    /// Print an option value
    Get { name: String },
    /// Set an option value
    Set { name: String, value: String },
    /// Delete an option
    Del { name: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn connect(config: &Config) -> anyhow::Result<PgConnection> {
    PgConnection::establish(&config.database_url)
        .with_context(|| "Error connecting to database".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or(config.bind_addr);
            info!("Starting server on {}", addr);

            let pool = config.build_pool()?;
            let app = api::create_router(pool);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            axum::serve(listener, app).await?;
        }
        Commands::Categories { command } => {
            let mut conn = connect(&config)?;
            match command {
                CategoryCommands::Tree => print_json(&Category::get_tree(&mut conn)?)?,
                CategoryCommands::List => print_json(&Category::get_all(&mut conn)?)?,
            }
        }
        Commands::Comments { command } => {
            let mut conn = connect(&config)?;
            match command {
                CommentCommands::Tree { post_id } => {
                    print_json(&Comment::get_tree_for_post(&mut conn, post_id)?)?
                }
                CommentCommands::Count => println!("{}", Comment::count_all(&mut conn)?),
            }
        }
        Commands::Tags { command } => {
            let mut conn = connect(&config)?;
            match command {
                TagCommands::Sync { post_id, tags } => {
                    let report = conn.transaction::<_, StoreError, _>(|conn| {
                        sync_object_tags(&mut PgTagStore::new(conn), post_id, &tags)
                    })?;
                    print_json(&report)?;
                }
                TagCommands::Resolve { ids } => {
                    let ids: BTreeSet<i64> = ids.into_iter().collect();
                    let resolved = resolve_aliases(&mut PgTagStore::new(&mut conn), &ids)?;
                    print_json(&resolved)?;
                }
                TagCommands::Names { post_id } => {
                    print_json(&get_tag_names(&mut PgTagStore::new(&mut conn), post_id)?)?;
                }
            }
        }
        Commands::Options { command } => {
            let mut conn = connect(&config)?;
            match command {
                OptionCommands::Get { name } => match BlogOption::get(&mut conn, &name)? {
                    Some(value) => println!("{}", value),
                    None => bail!("Option {} is not set", name),
                },
                OptionCommands::Set { name, value } => {
                    print_json(&BlogOption::set(&mut conn, &name, &value)?)?;
                }
                OptionCommands::Del { name } => {
                    if BlogOption::delete(&mut conn, &name)? == 0 {
                        bail!("Option {} is not set", name);
                    }
                }
            }
        }
    }

    Ok(())
}
