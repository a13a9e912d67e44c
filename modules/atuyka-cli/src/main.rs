//! Command-line driver: lists services, prints their schemas and pages
//! through posts of one or more accounts.

use std::cmp::Reverse;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use atuyka_paginator::{MergedPaginator, Paginator};
use atuyka_services::{
    load_config, token_from_env, AtuykaConfig, Paged, Post, ServiceClient, ServiceRegistry,
};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atuyka")]
#[command(about = "Browse content services through one normalized model")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available services
    Services,

    /// Print endpoint schemas of a service
    Schemas {
        /// Service slug
        service: String,
    },

    /// Print posts made by a user, newest first as served
    Posts {
        /// Service slug
        service: String,

        /// User handle or ID
        user: String,

        /// Stop after this many posts
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Merge posts of several accounts into one timeline, newest first
    Feed {
        /// Accounts as `service:user`
        #[arg(required = true)]
        accounts: Vec<String>,

        /// Stop after this many posts
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Fetch the user or post a URL points at
    Resolve {
        url: String,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AtuykaConfig::default(),
    };
    let registry = ServiceRegistry::init_global(config);

    match cli.command {
        Commands::Services => cmd_services(registry),
        Commands::Schemas { service } => cmd_schemas(registry, &service),
        Commands::Posts {
            service,
            user,
            limit,
        } => cmd_posts(registry, &service, &user, limit).await,
        Commands::Feed { accounts, limit } => cmd_feed(registry, &accounts, limit).await,
        Commands::Resolve { url } => cmd_resolve(registry, &url).await,
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("atuyka=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_services(registry: &ServiceRegistry) -> Result<()> {
    for service in registry.service_infos()? {
        let auth = if service.authorization { " [token]" } else { "" };
        println!("{:<12} {}{auth}", service.slug, service.name);
    }
    Ok(())
}

fn cmd_schemas(registry: &ServiceRegistry, service: &str) -> Result<()> {
    let schemas = registry.schemas(service)?;
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

async fn connect(registry: &ServiceRegistry, service: &str) -> Result<Arc<dyn ServiceClient>> {
    let client = registry.create(service, token_from_env(service))?;
    client
        .start()
        .await
        .with_context(|| format!("Failed to start {service} client"))?;
    Ok(client)
}

async fn cmd_posts(registry: &ServiceRegistry, service: &str, user: &str, limit: usize) -> Result<()> {
    let client = connect(registry, service).await?;

    let mut posts = Paged::new(client.clone()).posts(Some(user)).with_limit(limit);
    while let Some(post) = posts.next().await? {
        print_json(&post)?;
    }

    client.close().await?;
    Ok(())
}

async fn cmd_feed(registry: &ServiceRegistry, accounts: &[String], limit: usize) -> Result<()> {
    let mut clients = Vec::new();
    let mut sources = Vec::new();

    for account in accounts {
        let (service, user) = account
            .split_once(':')
            .with_context(|| format!("Expected service:user, got {account:?}"))?;

        let client = connect(registry, service).await?;
        sources.push(Paged::new(client.clone()).posts(Some(user)));
        clients.push(client);
    }

    info!(sources = sources.len(), limit, "Merging feeds");
    let merged = MergedPaginator::new(sources, |post: &Post| Reverse(post.created_at)).with_limit(limit);

    let mut stream = merged.into_stream();
    while let Some(post) = stream.next().await {
        print_json(&post?)?;
    }

    for client in clients {
        client.close().await?;
    }
    Ok(())
}

async fn cmd_resolve(registry: &ServiceRegistry, url: &str) -> Result<()> {
    match registry.get_resource(url).await? {
        Some(resource) => print_json(&resource),
        None => anyhow::bail!("No service recognises {url}"),
    }
}
