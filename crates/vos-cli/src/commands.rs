use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use colored::Colorize;
use vos_sdk::{
    ClientConfig, HttpTransport, LocalFsWriter, ObjectStats, StagedUploader, StagingTransport,
    UploadOptions,
};
use vos_server::{ServerConfig, VosServer};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Config => cmd_config(),
        Command::Upload(args) => cmd_upload(args, &format).await,
        Command::Stat(args) => cmd_stat(args, &format).await,
        Command::Commit(args) => cmd_commit(args, &format).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind}"))?;
    }

    let server = VosServer::new(config)?;
    let listener = tokio::net::TcpListener::bind(server.config().bind_addr).await?;
    println!(
        "{} VOS server on {}",
        "✓".green().bold(),
        listener.local_addr()?.to_string().bold()
    );
    server
        .serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", ServerConfig::default().to_toml_string()?);
    Ok(())
}

fn transport(remote: &RemoteArgs, max_attempts: u32) -> anyhow::Result<HttpTransport> {
    let mut config = ClientConfig::new(&remote.server).with_max_attempts(max_attempts);
    if let Some(token) = &remote.token {
        config = config.with_bearer_token(token);
    }
    Ok(HttpTransport::new(&config)?)
}

async fn cmd_upload(args: UploadArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let transport = Arc::new(transport(&args.remote, args.max_attempts)?);
    let uploader = StagedUploader::new(transport, Arc::new(LocalFsWriter::new()), args.max_attempts);

    let mut options = UploadOptions::default();
    if let Some(content_type) = &args.content_type {
        options = options.with_content_type(content_type);
    }
    let outcome = uploader
        .upload_with(
            &args.remote.repository,
            &args.remote.branch,
            &args.path,
            Bytes::from(data),
            &options,
        )
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.stats)?),
        OutputFormat::Text => {
            println!(
                "{} Staged {} on {}",
                "✓".green().bold(),
                args.path.bold(),
                args.remote.branch.yellow()
            );
            print_stats(&outcome.stats);
            if outcome.attempts > 1 {
                println!(
                    "  Attempts: {} {}",
                    outcome.attempts,
                    "(branch committed during upload)".dimmed()
                );
            }
        }
    }
    Ok(())
}

async fn cmd_stat(args: StatArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let transport = transport(&args.remote, 1)?;
    let stats = transport
        .stat(&args.remote.repository, &args.remote.branch, &args.path)
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("{}", stats.path.bold());
            print_stats(&stats);
        }
    }
    Ok(())
}

async fn cmd_commit(args: CommitArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let transport = transport(&args.remote, 1)?;
    let summary = transport
        .commit(&args.remote.repository, &args.remote.branch)
        .await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!(
                "{} Committed {} ({} objects), staging generation now {}",
                "✓".green().bold(),
                summary.branch.yellow(),
                summary.len(),
                summary.generation.to_string().cyan()
            );
            for object in &summary.objects {
                println!("  {} {}", "+".green(), object.path);
            }
        }
    }
    Ok(())
}

fn print_stats(stats: &ObjectStats) {
    println!("  Address: {}", stats.physical_address.blue());
    println!("  Checksum: {}", stats.checksum.dimmed());
    println!("  Size: {} bytes", stats.size_bytes);
    if let Some(content_type) = &stats.content_type {
        println!("  Content-Type: {content_type}");
    }
}
