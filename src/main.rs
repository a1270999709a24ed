mod change;
mod config;
mod fetch;
mod monitor;
mod price;
mod store;

use std::{
    env::var,
    fs::{File, OpenOptions},
    future::Future,
    path::Path,
    sync::Mutex,
};

use tracing::{error, info, warn};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{
        self,
        format::{DefaultFields, Format},
    },
    prelude::*,
};

use crate::{
    config::MonitorConfig,
    fetch::{HttpFetcher, PageFetcher, WebDriverFetcher},
    monitor::{Monitor, read_links},
    store::PriceStore,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type FileLayer<S> = fmt::Layer<S, DefaultFields, Format, Mutex<File>>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = MonitorConfig::default();
    init_tracing(&config.log_file);

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match var("WEBDRIVER_URL") {
        Ok(server_url) => {
            let fetcher = WebDriverFetcher::connect(
                &server_url,
                &config.user_agent,
                config.poll_interval,
                config.settle_delay,
            )
            .await?;
            run(fetcher, config, stop).await
        }
        Err(_) => {
            let fetcher = HttpFetcher::new(
                &config.user_agent,
                config.request_timeout,
                config.reload_interval,
            )?;
            run(fetcher, config, stop).await
        }
    }
}

/// Logs to the console and appends the same lines to `log_file`.
fn init_tracing(log_file: &Path) {
    let level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (file, file_error) = match file_layer(log_file) {
        Ok(layer) => (Some(layer), None),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(level)
        .with(fmt::layer())
        .with(file)
        .init();

    if let Some(e) = file_error {
        warn!("logging to console only, cannot open {}: {}", log_file.display(), e);
    }
}

fn file_layer<S>(log_file: &Path) -> std::io::Result<FileLayer<S>> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    Ok(fmt::layer().with_writer(Mutex::new(file)))
}

/// Runs one pass over the links file, ending early when `stop` resolves.
///
/// The fetcher is closed on every way out, including errors and interruption.
async fn run<F: PageFetcher>(
    fetcher: F,
    config: MonitorConfig,
    stop: impl Future<Output = ()>,
) -> Result<(), Error> {
    let (fetcher, outcome) = match PriceStore::open(&config.db_path) {
        Ok(store) => {
            let links_file = config.links_file.clone();
            let mut monitor = Monitor::new(fetcher, store, config);
            let outcome = tokio::select! {
                outcome = process(&mut monitor, &links_file) => outcome,
                _ = stop => {
                    println!("\n⏹️ Monitoring stopped by user");
                    info!("monitoring stopped by user");
                    Ok(())
                }
            };
            (monitor.into_fetcher(), outcome)
        }
        Err(e) => (fetcher, Err(e.into())),
    };

    if let Err(e) = &outcome {
        println!("\n❌ An error occurred: {e}");
        error!("fatal error: {}", e);
    }
    if let Err(e) = fetcher.close().await {
        error!("failed to close fetcher: {}", e);
    }
    info!("monitoring finished");
    outcome
}

async fn process<F: PageFetcher>(monitor: &mut Monitor<F>, links_file: &Path) -> Result<(), Error> {
    let links = read_links(links_file)
        .await
        .map_err(|e| format!("failed to read {}: {}", links_file.display(), e))?;
    monitor.process_all_links(&links).await;
    Ok(())
}
