mod clock;
mod error;
mod locale;
mod prefs;
mod render_loop;
mod services;
mod storage;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::clock::catalog::TimezoneCatalog;
use crate::clock::registry::ClockRegistry;
use crate::clock::store::ClockEntryStore;
use crate::prefs::{PreferencesStore, TimeFormat};
use crate::render_loop::{LoopState, RenderLoop, sleep_until};
use crate::services::chime::{ChimePlayer, Muted, TerminalBell};
use crate::services::geolocation::{GeolocationProvider, IpGeolocation};
use crate::services::weather;
use crate::storage::JsonFileStore;
use crate::ui::app::GuiContext;

#[derive(Parser, Debug)]
#[command(
    name = "worldclock",
    version,
    about = "Analog clocks for the cities you care about"
)]
struct Cli {
    /// Directory holding storage.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    weather_api_key: Option<String>,

    /// Do not add a clock for the local timezone.
    #[arg(long)]
    no_locate: bool,

    #[arg(long)]
    mute: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    list_timezones: bool,

    #[arg(long, default_value = "")]
    filter: String,

    #[arg(long, value_name = "NAME=TIMEZONE")]
    add: Option<String>,

    #[arg(long, value_name = "NAME")]
    remove: Option<String>,

    /// Print the saved clocks as JSON.
    #[arg(long)]
    export: bool,

    /// Print one reading of every clock.
    #[arg(long)]
    snapshot: bool,

    /// Run the clocks on the terminal instead of a window.
    #[arg(long)]
    headless: bool,

    /// Readings to print with --headless; 0 keeps going.
    #[arg(long, default_value_t = 0)]
    ticks: u64,
}

impl Cli {
    fn wants_terminal(&self) -> bool {
        self.add.is_some() || self.remove.is_some() || self.export || self.snapshot || self.headless
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    if cli.list_timezones {
        for timezone in TimezoneCatalog::list(&cli.filter) {
            println!("{timezone}");
        }
        return Ok(());
    }

    let data_dir = resolve_data_dir(cli.data_dir.clone());
    let storage = JsonFileStore::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
    info!(path = %storage.path().display(), "using storage");
    let prefs = PreferencesStore::new(Box::new(storage.clone()));

    if cli.wants_terminal() {
        let mut registry =
            ClockRegistry::from_store(ClockEntryStore::open(Box::new(storage)), None);
        return run_terminal(&cli, &mut registry, prefs.get().time_format);
    }

    let language = prefs.get().language;
    let weather = weather::dispatcher_for(cli.weather_api_key.as_deref(), &language);
    if weather.is_none() {
        info!("no weather API key, weather is off");
    }
    let registry = ClockRegistry::from_store(ClockEntryStore::open(Box::new(storage)), weather);
    let geolocation = if cli.no_locate {
        None
    } else {
        Some(Arc::new(IpGeolocation::new()) as Arc<dyn GeolocationProvider>)
    };

    ui::app::run_gui(GuiContext {
        registry,
        prefs,
        chime: chime_player(cli.mute),
        geolocation,
        weather_api_key: cli.weather_api_key,
    })
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level '{level}'"))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| dirs::data_dir().map(|dir| dir.join("worldclock")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn chime_player(mute: bool) -> Box<dyn ChimePlayer> {
    if mute {
        Box::new(Muted)
    } else {
        Box::new(TerminalBell)
    }
}

fn run_terminal(cli: &Cli, registry: &mut ClockRegistry, time_format: TimeFormat) -> Result<()> {
    if let Some(raw) = &cli.add {
        let (name, timezone) = parse_add_arg(raw)?;
        registry
            .add_clock(name, timezone)
            .with_context(|| format!("cannot add '{name}'"))?;
        println!("added {name} ({timezone})");
    }

    if let Some(name) = &cli.remove {
        let removed = registry
            .remove_clock(name)
            .with_context(|| format!("cannot remove '{name}'"))?;
        if removed {
            println!("removed {name}");
        } else {
            println!("no clock named {name}");
        }
    }

    if cli.export {
        println!("{}", registry.store().export_json());
    }

    if cli.snapshot {
        let mut render_loop = RenderLoop::new();
        render_loop.start(Instant::now());
        render_loop.tick(registry, Utc::now(), &Muted);
        print_readings(registry, time_format);
    }

    if cli.headless {
        let chime = chime_player(cli.mute);
        let mut render_loop = RenderLoop::new();
        render_loop.start(Instant::now());
        let mut printed = 0_u64;
        while render_loop.state() == LoopState::Running {
            if let Some(deadline) = render_loop.next_due() {
                sleep_until(deadline);
            }
            let now = Instant::now();
            if render_loop
                .poll(now, registry, Utc::now(), chime.as_ref())
                .is_none()
            {
                continue;
            }
            print_readings(registry, time_format);
            printed += 1;
            if cli.ticks != 0 && printed >= cli.ticks {
                render_loop.cancel();
            }
        }
    }

    Ok(())
}

fn parse_add_arg(raw: &str) -> Result<(&str, &str)> {
    let Some((name, timezone)) = raw.split_once('=') else {
        bail!("--add expects NAME=TIMEZONE, got '{raw}'");
    };
    let (name, timezone) = (name.trim(), timezone.trim());
    if name.is_empty() || timezone.is_empty() {
        bail!("--add expects NAME=TIMEZONE, got '{raw}'");
    }
    if !TimezoneCatalog::contains(timezone) {
        bail!("unknown timezone '{timezone}', see --list-timezones");
    }
    Ok((name, timezone))
}

fn print_readings(registry: &ClockRegistry, time_format: TimeFormat) {
    if registry.all().is_empty() {
        println!("no clocks configured");
        return;
    }
    for widget in registry.all() {
        let time = widget
            .local_time
            .map(|local| local.format(time_format.pattern()).to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        println!(
            "{:<16} {:<22} {:>11}  hour {:>6.2}  minute {:>6.2}  second {:>6.2}",
            widget.name,
            widget.timezone,
            time,
            widget.hands.hour_deg,
            widget.hands.minute_deg,
            widget.hands.second_deg,
        );
    }
}
