//! Pipeline Services - Command Line Entry Point
//!
//! Builds components and pipelines from a manifest, then either runs the
//! main loop until Ctrl-C or reports what was built.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pipeline_services::{
    config::{self, PipelineManifest, ServiceConfig, StreamMuxSettings},
    logging,
    main_loop::install_interrupt_handler,
    PipelineState, Services,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pipeline-services")]
#[command(about = "Registry and ownership engine for media pipelines")]
#[command(version)]
struct Cli {
    /// Service configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a manifest and run the main loop until Ctrl-C
    Run {
        /// Pipeline manifest (.toml or .json)
        manifest: PathBuf,
    },

    /// Apply a manifest, print the resulting registries and tear down
    Check {
        manifest: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a manifest and write a DOT graph for every pipeline
    Dump {
        manifest: PathBuf,

        /// Output directory for the .dot files
        #[arg(short, long)]
        output: PathBuf,

        /// Prefix file names with a timestamp
        #[arg(long)]
        timestamp: bool,
    },

    /// Write the default service configuration
    InitConfig {
        /// Destination (defaults to the platform config directory)
        path: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct PipelineSummary {
    name: String,
    state: PipelineState,
    components: Vec<String>,
    streammux: StreamMuxSettings,
}

#[derive(Serialize)]
struct Summary {
    components: Vec<String>,
    sources_in_use: usize,
    pipelines: Vec<PipelineSummary>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::load(path).context("loading service configuration"),
        None => Ok(ServiceConfig::load_or_default()),
    }
}

fn build(services: &Services, manifest: &Path) -> anyhow::Result<()> {
    let manifest = PipelineManifest::load(manifest)?;
    manifest.apply(services).context("applying manifest")
}

fn summarize(services: &Services) -> anyhow::Result<Summary> {
    let mut pipelines = Vec::new();
    for name in services.pipeline_list() {
        pipelines.push(PipelineSummary {
            state: services.pipeline_get_state(&name)?,
            components: services.pipeline_components(&name)?,
            streammux: services.pipeline_streammux_settings(&name)?,
            name,
        });
    }
    Ok(Summary {
        components: services.component_list(),
        sources_in_use: services.num_sources_in_use(),
        pipelines,
    })
}

/// Pipelines first so every component is released before it is deleted.
fn teardown(services: &Services) {
    if let Err(e) = services.pipeline_delete_all() {
        tracing::warn!("Failed to delete pipelines: {}", e);
    }
    if let Err(e) = services.component_delete_all() {
        tracing::warn!("Failed to delete components: {}", e);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    if let Commands::Dump { output, .. } = &cli.command {
        config.dot_dump_dir = Some(output.clone());
    }
    logging::init(&config);

    match cli.command {
        Commands::InitConfig { path } => {
            let path = path
                .or_else(config::config_path)
                .context("no config directory on this platform")?;
            config.save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Run { manifest } => {
            tracing::info!("Starting pipeline services");
            let services = Services::new(config);
            let result = build(&services, &manifest).and_then(|_| {
                install_interrupt_handler(services.main_loop_handle())
                    .context("installing interrupt handler")?;
                services.run_main_loop()?;
                Ok(())
            });
            tracing::info!("Shutting down...");
            teardown(&services);
            result
        }
        Commands::Check { manifest, json } => {
            let services = Services::new(config);
            let result = build(&services, &manifest)
                .and_then(|_| summarize(&services))
                .and_then(|summary| {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                    } else {
                        println!("components: {}", summary.components.join(", "));
                        println!("sources in use: {}", summary.sources_in_use);
                        for p in &summary.pipelines {
                            println!("{} [{}]: {}", p.name, p.state, p.components.join(" -> "));
                        }
                    }
                    Ok(())
                });
            teardown(&services);
            result
        }
        Commands::Dump {
            manifest,
            timestamp,
            ..
        } => {
            let services = Services::new(config);
            let result = build(&services, &manifest).and_then(|_| {
                for name in services.pipeline_list() {
                    let path = if timestamp {
                        services.pipeline_dump_to_dot_with_ts(&name, &name)?
                    } else {
                        services.pipeline_dump_to_dot(&name, &name)?
                    };
                    println!("{}", path.display());
                }
                Ok(())
            });
            teardown(&services);
            result
        }
    }
}
