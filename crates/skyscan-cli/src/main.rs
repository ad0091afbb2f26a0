use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use skyscan_core::encoding::AzimuthEncoding;
use skyscan_core::matrix::ScanBounds;
use skyscan_core::{DishError, Orientation};
use skyscan_link::{doctor as link_doctor, available_ports, CommandChannel, DishChannel, SerialLink, Timing, TimingConfig};
use skyscan_search::{doctor as search_doctor, acquire_lock, ElevationSearch, EndBound, Finetune, FixedPointing, PointingSource, RasterScan, TrackStop, Tracker, TrackingParams};

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use time::macros::format_description;
use time::OffsetDateTime;

const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Parser)]
#[command(name = "skyscan", version, about = "skyscan - signal-driven pointing for serial-controlled satellite dishes")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config and check the serial port is present.
    Doctor,
    /// List serial ports reported by the OS.
    Ports,
    /// Interactive passthrough to the dish controller ("exit" to leave).
    Terminal,
    /// Raster-scan a region of sky into a signal-strength matrix.
    Scan {
        #[arg(long)]
        start_az: Option<i32>,
        #[arg(long)]
        end_az: Option<i32>,
        #[arg(long)]
        start_el: Option<i32>,
        #[arg(long)]
        end_el: Option<i32>,
    },
    /// Sweep elevation at a fixed azimuth and park on the strongest point.
    Elevation {
        #[arg(long)]
        azimuth: i32,
    },
    /// Probe azimuth offsets around a position and keep the first improvement.
    Finetune {
        #[arg(long)]
        azimuth: i32,
        #[arg(long)]
        elevation: i32,
    },
    /// Follow the signal until it leaves view, Ctrl-C, or the deadline.
    Track {
        #[arg(long)]
        azimuth: i32,
        #[arg(long)]
        elevation: i32,
        #[arg(long)]
        duration_s: Option<u64>,
    },
    /// Point at the target and verify the signal clears the noise floor.
    Lock {
        #[arg(long)]
        azimuth_deg: Option<f64>,
        #[arg(long)]
        elevation_deg: Option<f64>,
        #[arg(long)]
        finetune: bool,
    },
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Config {
    serial: SerialCfg,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    scan: ScanCfg,
    #[serde(default)]
    elevation: ElevationCfg,
    #[serde(default)]
    tracking: TrackingCfg,
    target: Option<TargetCfg>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct SerialCfg {
    port: String,
    baud: Option<u32>,
    azimuth_encoding: Option<AzimuthEncoding>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ScanCfg {
    start_az: Option<i32>,
    end_az: Option<i32>,
    start_el: Option<i32>,
    end_el: Option<i32>,
    step: Option<i32>,
    end_bound: Option<EndBound>,
    output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ElevationCfg {
    start: Option<i32>,
    end: Option<i32>,
    step: Option<i32>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TrackingCfg {
    az_step: Option<i32>,
    el_step: Option<i32>,
    min_az: Option<i32>,
    max_az: Option<i32>,
    min_el: Option<i32>,
    max_el: Option<i32>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct TargetCfg {
    name: String,
    azimuth_deg: f64,
    elevation_deg: f64,
}

/// What a blocking dish session needs, detached from the parsed config.
#[derive(Debug, Clone)]
struct Session {
    port: String,
    baud: u32,
    timing: Timing,
    encoding: AzimuthEncoding,
}

impl Config {
    fn session(&self) -> Session {
        Session {
            port: self.serial.port.clone(),
            baud: self.serial.baud.unwrap_or(DEFAULT_BAUD),
            timing: Timing::from(&self.timing),
            encoding: self.serial.azimuth_encoding.unwrap_or_default(),
        }
    }

    fn scan_step(&self) -> i32 {
        self.scan.step.unwrap_or(skyscan_search::raster::GRID_STEP)
    }

    fn elevation_search(&self) -> ElevationSearch {
        let mut s = ElevationSearch::new(self.session().timing.motion);
        s.start = self.elevation.start.unwrap_or(s.start);
        s.end = self.elevation.end.unwrap_or(s.end);
        s.step = self.elevation.step.unwrap_or(s.step);
        s
    }

    fn tracking_params(&self) -> TrackingParams {
        let d = TrackingParams::default();
        let t = &self.tracking;
        TrackingParams {
            az_step: t.az_step.unwrap_or(d.az_step),
            el_step: t.el_step.unwrap_or(d.el_step),
            azimuth_bounds: t.min_az.unwrap_or(*d.azimuth_bounds.start())..=t.max_az.unwrap_or(*d.azimuth_bounds.end()),
            elevation_bounds: t.min_el.unwrap_or(*d.elevation_bounds.start())..=t.max_el.unwrap_or(*d.elevation_bounds.end()),
            settle: self.session().timing.motion,
        }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Ports => ports(),
        Command::Terminal => terminal(&cfg).await?,
        Command::Scan { start_az, end_az, start_el, end_el } => scan(&cfg, [start_az, end_az, start_el, end_el]).await?,
        Command::Elevation { azimuth } => elevation(&cfg, azimuth).await?,
        Command::Finetune { azimuth, elevation } => finetune(&cfg, azimuth, elevation).await?,
        Command::Track { azimuth, elevation, duration_s } => track(&cfg, azimuth, elevation, duration_s).await?,
        Command::Lock { azimuth_deg, elevation_deg, finetune } => lock(&cfg, azimuth_deg, elevation_deg, finetune).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    let session = cfg.session();

    link_doctor::check_serial(&session.port, session.baud)?;
    link_doctor::check_timing(&session.timing)?;
    let [start_az, end_az, start_el, end_el] = scan_bounds(cfg, [None; 4]);
    search_doctor::check_scan(start_az, end_az, start_el, end_el, cfg.scan_step())?;
    search_doctor::check_elevation(&cfg.elevation_search())?;
    search_doctor::check_tracking(&cfg.tracking_params())?;

    if let Some(t) = &cfg.target {
        let mut source = FixedPointing { azimuth_deg: t.azimuth_deg, elevation_deg: t.elevation_deg };
        let at = source.pointing(&t.name)?.to_orientation().with_context(|| format!("target {}", t.name))?;
        info!("doctor: target {} maps to {}", t.name, at);
    }

    if link_doctor::port_present(&session.port) {
        info!("doctor: serial port {} present", session.port);
    } else {
        warn!("doctor: serial port {} not found; available: {:?}", session.port, available_ports());
    }

    info!("doctor: OK");
    Ok(())
}

fn ports() {
    let ports = available_ports();
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for p in ports {
        println!("{}", p);
    }
}

/// Opens the link, enters terminal mode and identifies the firmware.
/// With `park`, also drives to the reference orientation.
fn open_session(session: &Session, park: bool) -> Result<DishChannel> {
    let link = match SerialLink::open(&session.port, session.baud) {
        Ok(link) => link,
        Err(e) => {
            warn!("available serial ports: {:?}", available_ports());
            return Err(e).context("open dish serial link");
        }
    };

    let mut ch = link.enter_terminal_mode(session.timing, session.encoding)?;
    let version = ch.identify().context("identify dish")?;
    info!("dish: firmware {:?}", version);

    if park {
        ch.park().context("park dish")?;
        info!("dish: parked at {}", Orientation::REFERENCE);
    }
    Ok(ch)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.context("dish session task")?
}

async fn terminal(cfg: &Config) -> Result<()> {
    let session = cfg.session();
    blocking(move || {
        let mut ch = open_session(&session, false)?;
        println!("connected to {} @ {}; enter a command, \"exit\" to leave", session.port, session.baud);

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!(">> ");
            stdout.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let cmd = line.trim();
            if cmd == "exit" {
                break;
            }
            if cmd.is_empty() {
                continue;
            }
            let reply = ch.send(cmd, session.timing.command)?;
            if !reply.is_empty() {
                println!("{}", reply.trim_end());
            }
        }
        Ok(())
    })
    .await
}

fn scan_bounds(cfg: &Config, overrides: [Option<i32>; 4]) -> [i32; 4] {
    let s = &cfg.scan;
    [
        overrides[0].or(s.start_az).unwrap_or(0),
        overrides[1].or(s.end_az).unwrap_or(3599),
        overrides[2].or(s.start_el).unwrap_or(100),
        overrides[3].or(s.end_el).unwrap_or(700),
    ]
}

async fn scan(cfg: &Config, overrides: [Option<i32>; 4]) -> Result<()> {
    let [start_az, end_az, start_el, end_el] = scan_bounds(cfg, overrides);
    let bounds: ScanBounds = search_doctor::check_scan(start_az, end_az, start_el, end_el, cfg.scan_step())?;
    let session = cfg.session();
    let raster = RasterScan::new(bounds, session.timing.motion)
        .with_step(cfg.scan_step())
        .with_end_bound(cfg.scan.end_bound.unwrap_or_default());

    let stamp = OffsetDateTime::now_utc().format(format_description!("[year][month][day]-[hour][minute][second]"))?;
    let dir = PathBuf::from(cfg.scan.output_dir.clone().unwrap_or_else(|| "scans".into()));
    let matrix_path = dir.join(format!("scan-{}.txt", stamp));
    let settings_path = dir.join(format!("scan-{}.settings.txt", stamp));

    info!(
        "scan: {} cells from {:?}, estimated {:?}",
        raster.cells(),
        bounds,
        raster.estimate(&session.timing)
    );

    let out_path = matrix_path.clone();
    let matrix = blocking(move || {
        bounds.save_settings(&settings_path).context("write scan settings")?;
        let mut ch = open_session(&session, true)?;
        let m = raster.run(&mut ch, |m| m.save(&matrix_path))?;
        ch.park().context("park dish")?;
        Ok(m)
    })
    .await?;

    println!("scan complete: {} x {} -> {}", matrix.rows(), matrix.cols(), out_path.display());
    println!("peak strength: {:?}", matrix.max());
    Ok(())
}

async fn elevation(cfg: &Config, azimuth: i32) -> Result<()> {
    let search = cfg.elevation_search();
    search_doctor::check_elevation(&search)?;
    Orientation::new(azimuth, search.start)?;
    let session = cfg.session();

    let out = blocking(move || {
        let mut ch = open_session(&session, true)?;
        Ok(search.run(&mut ch, azimuth)?)
    })
    .await?;

    for (el, s) in &out.samples {
        println!("el={} strength={}", el, s);
    }
    println!("best: {} strength={}", out.best, out.strength);
    Ok(())
}

async fn finetune(cfg: &Config, azimuth: i32, elevation: i32) -> Result<()> {
    let locked = Orientation::new(azimuth, elevation)?;
    let session = cfg.session();

    let out = blocking(move || {
        let mut ch = open_session(&session, true)?;
        ch.move_to(locked, session.timing.motion)?;
        let baseline = ch.query_signal_strength().context("baseline sample")?;
        info!("finetune: baseline {} at {}", baseline, locked);
        Ok(Finetune::new(session.timing.motion).run(&mut ch, locked, baseline)?)
    })
    .await?;

    println!(
        "{}: {} strength={}",
        if out.improved { "improved" } else { "unchanged" },
        out.orientation,
        out.strength
    );
    Ok(())
}

async fn track(cfg: &Config, azimuth: i32, elevation: i32, duration_s: Option<u64>) -> Result<()> {
    let start = Orientation::new(azimuth, elevation)?;
    let params = cfg.tracking_params();
    search_doctor::check_tracking(&params)?;
    let session = cfg.session();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("track: interrupt received, stopping after this iteration");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }
    if let Some(secs) = duration_s {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!("track: {}s deadline reached", secs);
            cancel.store(true, Ordering::SeqCst);
        });
    }

    let out = blocking(move || {
        let mut ch = open_session(&session, true)?;
        ch.move_to(start, session.timing.motion)?;
        Ok(Tracker::new(params).run(&mut ch, start, &cancel)?)
    })
    .await?;

    let why = match out.stop {
        TrackStop::OutOfView => "satellite out of view",
        TrackStop::Cancelled => "cancelled",
    };
    println!(
        "tracking stopped ({}) after {} iterations at {} strength={:?}",
        why, out.iterations, out.last_good, out.best_strength
    );
    Ok(())
}

async fn lock(cfg: &Config, azimuth_deg: Option<f64>, elevation_deg: Option<f64>, finetune: bool) -> Result<()> {
    let (name, mut source) = match (azimuth_deg, elevation_deg, &cfg.target) {
        (Some(azimuth_deg), Some(elevation_deg), t) => (
            t.as_ref().map(|t| t.name.clone()).unwrap_or_else(|| "manual".into()),
            FixedPointing { azimuth_deg, elevation_deg },
        ),
        (None, None, Some(t)) => (
            t.name.clone(),
            FixedPointing { azimuth_deg: t.azimuth_deg, elevation_deg: t.elevation_deg },
        ),
        _ => anyhow::bail!("lock needs --azimuth-deg and --elevation-deg, or a [target] config section"),
    };
    // reject unreachable pointings before touching the port
    source.pointing(&name)?.to_orientation()?;
    let session = cfg.session();

    let result = blocking(move || {
        let mut ch = open_session(&session, true)?;
        let sample = acquire_lock(&mut ch, &mut source, &name)?;
        println!("satellite lock achieved at {} strength={}", sample.orientation, sample.strength);
        if finetune {
            let out = Finetune::new(session.timing.motion).run(&mut ch, sample.orientation, sample.strength)?;
            println!("finetuned to {} strength={}", out.orientation, out.strength);
        }
        Ok(())
    })
    .await;

    if let Err(e) = &result {
        if let Some(DishError::SignalLoss { strength, .. }) = e.downcast_ref::<DishError>() {
            println!("no satellite signal detected (strength {}); check the dish orientation and try again", strength);
        }
    }
    result
}
