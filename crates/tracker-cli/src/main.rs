//! `tracker`: talk to a GPS tracker's UART service over a TCP bridge.

mod config;
mod tcp;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracker_link::Connection;
use tracker_protocol::{EntryKind, FindMyKeys, SysInfo};

use crate::config::CliConfig;
use crate::tcp::TcpTransport;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Files, telemetry and AGNSS for a BLE GPS tracker")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bridge address (host:port); overrides the config file
    #[arg(short, long, global = true)]
    address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory on the tracker
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Download a file
    Get {
        path: String,
        /// Output file (defaults to the remote file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Resume from this byte offset, appending to the output
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Delete a file
    Rm { path: String },
    /// Show position, fix and battery state
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Wake the GPS receiver
    Wakeup,
    /// Keep the GPS powered for this many minutes (0 cancels)
    KeepAlive { minutes: u16 },
    /// Upload an AGNSS assistance blob
    Agnss { file: PathBuf },
    /// Find My advertising keys
    Findmy {
        #[command(subcommand)]
        action: FindMyAction,
    },
}

#[derive(Subcommand)]
enum FindMyAction {
    /// Show whether the tracker advertises on Find My
    Status,
    /// Print the stored public key and epoch
    Read,
    /// Store a 68-byte key blob and start advertising
    Write { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let address = config
        .resolve_address(cli.address.as_deref())
        .ok_or("no tracker address: pass --address or set `address` in the config file")?;

    tracker_link::describe_metrics();
    let (transport, events) = TcpTransport::connect(&address).await?;
    let conn = Connection::open(transport, events, config.link);
    info!(%address, chunk_size = conn.chunk_size(), "connected");

    match cli.command {
        Commands::Ls { path } => list(&conn, &path).await,
        Commands::Get {
            path,
            output,
            offset,
        } => {
            let output = output.unwrap_or_else(|| default_output(&path));
            get(&conn, &path, &output, offset).await
        }
        Commands::Rm { path } => {
            conn.delete_file(&path).await?;
            info!(%path, "deleted");
            Ok(())
        }
        Commands::Info { json } => {
            let sys_info = conn.get_sys_info().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sys_info)?);
            } else {
                print_sys_info(&sys_info);
            }
            Ok(())
        }
        Commands::Wakeup => {
            conn.trigger_gps_wakeup().await?;
            info!("GPS wakeup sent");
            Ok(())
        }
        Commands::KeepAlive { minutes } => {
            conn.set_gps_keep_alive(minutes).await?;
            info!(minutes, "GPS keep-alive set");
            Ok(())
        }
        Commands::Agnss { file } => {
            let blob = std::fs::read(&file)?;
            conn.upload_agnss_with_progress(&blob, |written, total| {
                debug!(written, total, "AGNSS progress");
            })
            .await?;
            info!(bytes = blob.len(), "AGNSS data committed");
            Ok(())
        }
        Commands::Findmy { action } => findmy(&conn, action).await,
    }
}

async fn list(conn: &Connection<TcpTransport>, path: &str) -> CliResult<()> {
    for entry in conn.list_directory(path).await? {
        match (entry.kind, entry.size) {
            (EntryKind::Directory, _) => println!("d {:>10}  {}/", "", entry.name),
            (EntryKind::File, Some(size)) => println!("- {:>10}  {}", size, entry.name),
            (EntryKind::File, None) => println!("- {:>10}  {}", "?", entry.name),
        }
    }
    Ok(())
}

async fn get(
    conn: &Connection<TcpTransport>,
    path: &str,
    output: &Path,
    offset: u32,
) -> CliResult<()> {
    let data = conn
        .download_file_with_progress(path, offset, |received, total| {
            debug!(received, total, "download progress");
        })
        .await?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(offset > 0)
        .truncate(offset == 0)
        .open(output)?;
    file.write_all(&data)?;
    info!(%path, output = %output.display(), bytes = data.len(), "downloaded");
    Ok(())
}

async fn findmy(conn: &Connection<TcpTransport>, action: FindMyAction) -> CliResult<()> {
    match action {
        FindMyAction::Status => {
            let enabled = conn.findmy_enabled().await?;
            println!("find my:    {}", if enabled { "enabled" } else { "disabled" });
        }
        FindMyAction::Read => match conn.read_findmy_keys().await? {
            Some(keys) => {
                println!("public key: {}", hex::encode(keys.public_key));
                println!("epoch:      {}", keys.epoch);
            }
            None => println!("no keys stored"),
        },
        FindMyAction::Write { file } => {
            let keys = FindMyKeys::from_bytes(&std::fs::read(&file)?)?;
            conn.write_findmy_keys(&keys).await?;
            info!(epoch = keys.epoch, "Find My keys written");
        }
    }
    Ok(())
}

fn default_output(remote: &str) -> PathBuf {
    let name = remote.rsplit('/').find(|part| !part.is_empty()).unwrap_or("download.bin");
    PathBuf::from(name)
}

fn print_sys_info(info: &SysInfo) {
    match info.position() {
        Some((lat, lon)) => println!("position:   {:.6}, {:.6} ({:.1} m)", lat, lon, info.altitude),
        None => println!("position:   no fix"),
    }
    println!("satellites: {} (hdop {:.1})", info.satellites, info.hdop);
    println!("speed:      {:.1} km/h, course {:.0}°", info.speed, info.course);
    match info.timestamp() {
        Some(ts) => println!("time:       {} UTC", ts),
        None => println!("time:       unknown"),
    }
    println!("battery:    {:.2} V", info.battery_voltage);
    println!("gps:        {}", info.gps_state);

    if let Some(ext) = &info.extended {
        println!("charge:     {}%", ext.battery_percent);
        println!("keep-alive: {} s", ext.keep_alive_remaining_s);
        println!("stationary: {}", ext.is_stationary);
        if let Some(t) = ext.temperature_c {
            println!("temp:       {:.1} °C", t);
        }
        if let Some(p) = ext.pressure_pa {
            println!("pressure:   {:.0} Pa", p);
        }
    }
}
