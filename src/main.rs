//! Binary entry point for the Longhorn snapshotter CLI.

use std::collections::HashMap;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use longhorn_snapshotter::{
    KubeConnector, LonghornBackend, LonghornSnapshotter, PLUGIN_NAME, SnapshotBackend,
    SnapshotterConfig, SnapshotterError, VolumeEntry, VolumeSnapshotter,
};

mod cli;

use cli::{Cli, CreateSnapshotCommand, VolumeCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid tag {0:?}: expected KEY=VALUE")]
    InvalidTag(String),
    #[error(transparent)]
    Snapshotter(#[from] SnapshotterError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

type Snapshotter = LonghornSnapshotter<LonghornBackend, KubeConnector>;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(&cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: &Cli) -> Result<(), CliError> {
    let config =
        SnapshotterConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let backend =
        LonghornBackend::from_config(&config).map_err(|err| CliError::Config(err.to_string()))?;
    tracing::debug!(plugin = PLUGIN_NAME, backend = backend.base_url(), "starting");
    let snapshotter = LonghornSnapshotter::new(backend, KubeConnector)
        .with_probe_window(config.probe_window());

    match cli {
        Cli::CreateSnapshot(command) => create_snapshot(&snapshotter, command).await,
        Cli::DeleteSnapshot(command) => {
            snapshotter.delete_snapshot(&command.snapshot).await?;
            Ok(())
        }
        Cli::VolumeInfo(command) => volume_info(snapshotter, command).await,
        Cli::VolumeId(command) => volume_id(snapshotter, command).await,
        Cli::ListVolumes => {
            let volumes = snapshotter
                .backend()
                .list_volumes()
                .await
                .map_err(SnapshotterError::from)?;
            write_volumes(io::stdout(), &volumes)?;
            Ok(())
        }
    }
}

async fn create_snapshot(
    snapshotter: &Snapshotter,
    command: &CreateSnapshotCommand,
) -> Result<(), CliError> {
    let tags = parse_tags(&command.tags)?;
    let snapshot_id = snapshotter
        .create_snapshot(&command.volume, "", &tags)
        .await?;
    writeln!(io::stdout(), "{snapshot_id}")?;
    Ok(())
}

async fn volume_info(mut snapshotter: Snapshotter, command: &VolumeCommand) -> Result<(), CliError> {
    snapshotter.init(&HashMap::new()).await?;
    let info = snapshotter.get_volume_info(&command.volume, "").await?;
    writeln!(io::stdout(), "{}", info.volume_type)?;
    Ok(())
}

async fn volume_id(mut snapshotter: Snapshotter, command: &VolumeCommand) -> Result<(), CliError> {
    snapshotter.init(&HashMap::new()).await?;
    let record = snapshotter.volume_record(&command.volume).await?;
    let handle = snapshotter.get_volume_id(&record)?;
    writeln!(io::stdout(), "{handle}")?;
    Ok(())
}

fn parse_tags(raw: &[String]) -> Result<HashMap<String, String>, CliError> {
    raw.iter()
        .map(|tag| {
            tag.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
                .ok_or_else(|| CliError::InvalidTag(tag.clone()))
        })
        .collect()
}

fn write_volumes(mut target: impl Write, volumes: &[VolumeEntry]) -> Result<(), io::Error> {
    for volume in volumes {
        let identifier = volume
            .reference()
            .map_or_else(|| String::from("-"), |reference| reference.into_string());
        let probe = if volume.snapshot_get_url.is_some() {
            "probe"
        } else {
            "no-probe"
        };
        writeln!(target, "{identifier}\t{probe}")?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
