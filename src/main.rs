mod app;
mod config;
mod data;
mod export;
mod net;
mod state;
mod status;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use app::SheetExplorerApp;
use clap::Parser;
use eframe::egui;
use env_logger::Env;
use net::http::HttpSheetService;
use net::worker::RequestWorker;

/// Upload a spreadsheet, search its rows and export what matches.
#[derive(Parser, Debug)]
#[command(name = "sheet-explorer")]
#[command(version)]
pub struct Args {
    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the query service
    #[arg(long)]
    pub api_url: Option<String>,

    /// Log filter, e.g. `debug` or `sheet_explorer=trace`
    #[arg(long)]
    pub log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Defaults → config file → environment → command line
    let config = {
        let file = config::load_config_with_precedence(args.config.clone())?;
        let merged = config::merge_config(file);
        let with_env = config::apply_env_overrides(merged);
        config::apply_cli_overrides(with_env, args.api_url.clone(), args.log_level.clone())
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .init();
    log::info!("configuration resolved: {config:?}");

    // Service calls run here; the UI thread only drains their completions.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let service = HttpSheetService::new(&config.api_base_url, config.request_timeout)
        .context("Failed to build HTTP client")?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Sheet Explorer",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let worker = RequestWorker::new(handle, Arc::new(service))
                .with_waker(move || ctx.request_repaint());
            Ok(Box::new(SheetExplorerApp::new(&config, worker)))
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_does_not_error() {
        let err = Args::try_parse_from(["sheet-explorer", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn no_args_defaults() {
        let args = Args::parse_from(["sheet-explorer"]);
        assert_eq!(args.config, None);
        assert_eq!(args.api_url, None);
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn all_flags() {
        let args = Args::parse_from([
            "sheet-explorer",
            "--config",
            "/tmp/sheet.toml",
            "--api-url",
            "http://10.0.0.5:8000",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/sheet.toml")));
        assert_eq!(args.api_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["sheet-explorer", "--theme", "dark"]).is_err());
    }
}
