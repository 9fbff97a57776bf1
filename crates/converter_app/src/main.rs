//! converter_app: submit spreadsheets for conversion, track them, fetch artifacts.

mod config;
mod dialog;
mod effects;
mod logging;
mod render;
mod session;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use converter_core::{JobState, Msg, Notice};
use converter_engine::{HostBridge, ReqwestService};
use converter_logging::{conv_debug, conv_info};

use config::AppConfig;
use dialog::TerminalSaveDialog;
use session::{Session, SessionEnd};

#[derive(Parser)]
#[command(name = "converter_app")]
#[command(
    about = "Convert spreadsheets to SDP files on a remote conversion service",
    long_about = None
)]
struct Cli {
    /// RON config file (defaults to ./converter.ron when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Conversion service URL; overrides config and API_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload files and follow their conversion to the end
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show conversions known to the service
    List,
    /// Save a finished artifact
    Download {
        name: String,
        /// Save without asking
        #[arg(short, long)]
        yes: bool,
        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    logging::initialize(config.log_destination, config.level_filter());
    converter_logging::set_ipc_debug(config.ipc_debug);
    conv_info!("Using conversion service at {}", config.base_url);

    let service = ReqwestService::new(config.service_settings())
        .context("building the HTTP client")?;
    if service.probe().await.is_none() {
        eprintln!("warning: {} is not answering", config.base_url);
    }

    let (assume_yes, output) = match &cli.command {
        Command::Download { yes, output, .. } => (*yes, output.clone()),
        _ => (false, None),
    };
    let bridge = Arc::new(HostBridge::new(
        Arc::new(service),
        Arc::new(TerminalSaveDialog::new(assume_yes, output)),
        config.bridge_settings(),
    ));

    let command = async {
        match cli.command {
            Command::Convert { files } => convert(Arc::clone(&bridge), &files).await,
            Command::List => list(Arc::clone(&bridge)).await,
            Command::Download { name, .. } => download(Arc::clone(&bridge), &name).await,
        }
    };
    run_then_shutdown(&bridge, command).await
}

/// Runs a command and then cancels any poller it left behind, whatever the result.
async fn run_then_shutdown<F>(bridge: &HostBridge, command: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let result = command.await;
    let cancelled = bridge.shutdown();
    conv_debug!("Command finished; {} poller(s) left to cancel", cancelled);
    result
}

async fn quit_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Starts a session and loads the server snapshot into it.
async fn start_session(bridge: Arc<HostBridge>, live: bool) -> Result<Session> {
    let mut session = Session::new(bridge, live);
    session.dispatch(Msg::RefreshRequested);
    if session.run_until_settled(quit_signal()).await == SessionEnd::Interrupted {
        bail!("interrupted");
    }
    Ok(session)
}

fn input_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn convert(bridge: Arc<HostBridge>, files: &[PathBuf]) -> Result<()> {
    let mut session = start_session(bridge, true).await?;
    for path in files {
        session.dispatch(Msg::FileSelected {
            input_name: input_name(path),
            location: path.clone(),
            selected_at: effects::now_millis(),
        });
    }
    let end = session.run_until_settled(quit_signal()).await;

    let view = session.view();
    println!("{}", render::render_table(&view));
    if end == SessionEnd::Interrupted {
        bail!("interrupted; unfinished jobs keep running on the service");
    }
    let failed = view
        .jobs
        .iter()
        .filter(|row| row.state == JobState::Failed)
        .count();
    if failed > 0 {
        bail!("{failed} conversion(s) failed");
    }
    Ok(())
}

async fn list(bridge: Arc<HostBridge>) -> Result<()> {
    let session = start_session(bridge, false).await?;
    let view = session.view();
    if let Some(Notice::Error(message)) = &view.notice {
        bail!("could not list conversions: {message}");
    }
    println!("{}", render::render_table(&view));
    Ok(())
}

async fn download(bridge: Arc<HostBridge>, name: &str) -> Result<()> {
    let mut session = start_session(bridge, false).await?;
    if let Some(Notice::Error(message)) = session.view().notice {
        bail!("could not list conversions: {message}");
    }
    let Some(client_id) = session
        .state()
        .find_by_output_name(name)
        .map(|job| job.client_id)
    else {
        bail!("the service lists no conversion named {name}");
    };

    session.dispatch(Msg::DownloadRequested { client_id });
    if session.run_until_settled(quit_signal()).await == SessionEnd::Interrupted {
        bail!("interrupted");
    }
    match session.view().notice {
        Some(Notice::Error(message)) => bail!(message),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use converter_engine::{
        BridgeSettings, ConversionService, PollOutcome, PreparedUpload, SaveDialog, ServiceError,
        SnapshotEntry, StatusReport, SubmitResponse,
    };

    struct Unreachable;

    #[async_trait]
    impl ConversionService for Unreachable {
        async fn submit(&self, _upload: PreparedUpload) -> Result<SubmitResponse, ServiceError> {
            Err(ServiceError::Transport("offline".to_string()))
        }
        async fn status(&self, _job_id: &str) -> Result<StatusReport, ServiceError> {
            Err(ServiceError::Transport("offline".to_string()))
        }
        async fn list(&self) -> Result<Vec<SnapshotEntry>, ServiceError> {
            Ok(Vec::new())
        }
        async fn download(&self, _name: &str) -> Result<Bytes, ServiceError> {
            Err(ServiceError::Transport("offline".to_string()))
        }
    }

    struct NeverSave;

    #[async_trait]
    impl SaveDialog for NeverSave {
        async fn choose_destination(&self, _suggested: &Path) -> Option<PathBuf> {
            None
        }
    }

    fn bridge_with_running_poller() -> HostBridge {
        let bridge = HostBridge::new(
            Arc::new(Unreachable),
            Arc::new(NeverSave),
            BridgeSettings::default(),
        );
        bridge.registry().register("u-1".to_string(), |token| async move {
            token.cancelled().await;
            PollOutcome::Cancelled
        });
        bridge
    }

    #[tokio::test]
    async fn finished_command_cancels_leftover_pollers() {
        let bridge = bridge_with_running_poller();
        assert_eq!(bridge.registry().active_count(), 1);

        run_then_shutdown(&bridge, async { Ok(()) }).await.unwrap();

        assert_eq!(bridge.registry().active_count(), 0);
    }

    #[tokio::test]
    async fn failed_command_still_cancels_pollers() {
        let bridge = bridge_with_running_poller();

        let failing = async { Err(anyhow::anyhow!("1 conversion(s) failed")) };
        let result = run_then_shutdown(&bridge, failing).await;

        assert!(result.is_err());
        assert!(!bridge.registry().is_active("u-1"));
    }
}
