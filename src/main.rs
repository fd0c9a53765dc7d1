use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{info, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{filter, fmt, prelude::*};

use crosscoap::{Proxy, ProxyConfig, ACCESS_LOG_TARGET};

#[derive(Parser, Debug)]
#[clap(name = "crosscoap", about = "CoAP-to-HTTP translating proxy")]
struct Opt {
    /// CoAP listen address and port
    #[clap(long = "listen", default_value = "0.0.0.0:5683")]
    listen: SocketAddr,
    /// Backend HTTP server URL
    #[clap(long = "backend", default_value = "")]
    backend: String,
    /// Error log file name (default is stderr)
    #[clap(long = "errorlog")]
    errorlog: Option<PathBuf>,
    /// Access log file name (default is no access log)
    #[clap(long = "accesslog")]
    accesslog: Option<PathBuf>,
    /// Maximum size in bytes for the HTTP cache
    #[clap(long = "cachemaxsize", default_value_t = crosscoap::cache::DEFAULT_MAX_SIZE)]
    cachemaxsize: u64,
    /// Maximum age in seconds of entries in the HTTP cache
    #[clap(long = "cachemaxage", default_value_t = 600)]
    cachemaxage: u64,
}

fn append_writer(path: &Path) -> anyhow::Result<BoxMakeWriter> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("error opening log file {}", path.display()))?;
    Ok(BoxMakeWriter::new(Arc::new(file)))
}

/// Two sinks: everything at INFO and above goes to the error log
/// (stderr or a file), access lines go to their own file when one is
/// configured and are discarded otherwise.
fn init_logging(opt: &Opt) -> anyhow::Result<()> {
    let error_writer = match &opt.errorlog {
        Some(path) => append_writer(path)?,
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let error_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(error_writer)
        .with_filter(filter::filter_fn(|meta| {
            meta.target() != ACCESS_LOG_TARGET && *meta.level() <= Level::INFO
        }));

    let access_layer = match &opt.accesslog {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(append_writer(path)?)
                .with_filter(filter::filter_fn(|meta| meta.target() == ACCESS_LOG_TARGET)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(error_layer)
        .with(access_layer)
        .init();
    Ok(())
}

fn main() {
    let opt = Opt::parse();
    if opt.backend.is_empty() {
        let _ = Opt::command().print_help();
        std::process::exit(1);
    }
    if let Err(err) = init_logging(&opt) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
    let code = match run(opt) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

#[tokio::main]
async fn run(opt: Opt) -> anyhow::Result<()> {
    let socket = tokio::net::UdpSocket::bind(opt.listen)
        .await
        .with_context(|| format!("can't listen on UDP {}", opt.listen))?;

    let proxy = Arc::new(
        Proxy::new(ProxyConfig {
            backend_url: opt.backend,
            http_timeout: crosscoap::proxy::DEFAULT_HTTP_TIMEOUT,
            cache_max_size: opt.cachemaxsize,
            cache_max_age: Duration::from_secs(opt.cachemaxage),
        })
        .context("can't start proxy")?,
    );

    info!("crosscoap started: listening for CoAP on UDP {}", opt.listen);
    proxy.serve(socket).await?;
    Ok(())
}
