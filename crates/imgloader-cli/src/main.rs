#![doc = include_str!("../README.md")]

mod app;

use anyhow::Context;
use app::cache::DiskImageCache;
use app::config::{CliArgs, Command, Config};
use app::image::HeaderImageFactory;
use app::report::{Report, write_reports};
use app::streams::FileStreams;
use app::telemetry::init_telemetry;
use clap::Parser;
use futures::future::join_all;
use imgloader::{Collaborators, ImageLoaderModule};
use std::process::ExitCode;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let result = run(config).await;
    providers.shutdown();
    result
}

async fn run(config: Config) -> anyhow::Result<ExitCode> {
    let cache = DiskImageCache::open(config.cache)
        .await
        .context("failed to open the image cache")?;
    let collaborators = Collaborators {
        cache,
        streams: FileStreams,
        images: HeaderImageFactory,
    };
    let module = ImageLoaderModule::start(collaborators, config.context)
        .context("failed to start the image loader")?;
    let loader = &module;

    let all_ok = match &config.command {
        Command::Prefetch { uris } => {
            let reports = join_all(uris.iter().map(|uri| async move {
                Report::new(uri, loader.prefetch_image(Some(uri.as_str())).await)
            }))
            .await;
            write_reports(std::io::stdout().lock(), &reports)?
        }
        Command::Size { uris } => {
            let reports = join_all(uris.iter().map(|uri| async move {
                Report::new(uri, loader.get_size(Some(uri.as_str())).await)
            }))
            .await;
            write_reports(std::io::stdout().lock(), &reports)?
        }
    };

    module.shutdown().await;

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn log_startup_info(_config: &Config) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Starting image loader with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Starting image loader with cache at {}",
            _config.cache.directory.display()
        );
    }
}
