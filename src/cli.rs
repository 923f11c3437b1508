//! Command-line interface
//!
//! Flags and environment variables override values from the JSON config file.

use crate::{Config, OutputFormat};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "screenshot-api")]
#[command(about = "HTTP service that renders web pages in headless Chrome and returns screenshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Validate configuration and print the effective settings
    Validate,
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    #[arg(long, global = true, help = "Bind address")]
    pub host: Option<IpAddr>,

    #[arg(long, global = true, env = "PORT", help = "Server port")]
    pub port: Option<u16>,

    #[arg(long, global = true, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, global = true, help = "Default output format (png, jpeg)")]
    pub format: Option<OutputFormat>,

    #[arg(long, global = true, help = "Navigation timeout in seconds")]
    pub navigation_timeout: Option<u64>,

    #[arg(long, global = true, help = "Expose Prometheus metrics on this address")]
    pub metrics_listen: Option<SocketAddr>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.bind.set_ip(host);
        }

        if let Some(port) = self.port {
            config.server.bind.set_port(port);
        }

        if let Some(chrome_path) = &self.chrome_path {
            config.browser.chrome_path = Some(chrome_path.clone());
        }

        if let Some(format) = self.format {
            config.capture.default_format = format;
        }

        if let Some(timeout) = self.navigation_timeout {
            config.capture.navigation_timeout = Duration::from_secs(timeout);
        }

        if let Some(addr) = self.metrics_listen {
            config.metrics.prometheus_listen = Some(addr);
        }
    }
}
