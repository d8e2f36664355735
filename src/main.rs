//! flagtip - Country-flag tooltips for usernames on a feed
//!
//! A terminal host for the location pipeline: it renders a feed, turns mouse
//! movement into hover events and shows where each author is based.

use std::fs::{self, File};
use std::io;
use std::panic;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flagtip::app::App;
use flagtip::bridge::peer::{load_location_table, spawn_http_peer, spawn_static_peer};
use flagtip::bridge::ResolverChannel;
use flagtip::cache::FileStore;
use flagtip::cli::{Cli, ResolverSource, StartupConfig};
use flagtip::config::Config;
use flagtip::feed;
use flagtip::session::Session;
use flagtip::stats::CacheStats;
use flagtip::ui::{self, HitMap};

/// Default log filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "flagtip=info";

/// Simulated round-trip time of table-backed resolvers
const TABLE_LATENCY: Duration = Duration::from_millis(300);

/// Redraw period while idle, fast enough for the tooltip fade
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Sets up a panic hook that restores the terminal before printing the panic message.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Logs to stderr; used when no TUI owns the terminal
fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Logs to a file so output does not corrupt the TUI
fn init_file_logging(file: File) {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
}

/// Runs the resolver peer selected on the command line
fn connect_resolver(source: &ResolverSource) -> io::Result<ResolverChannel> {
    let (channel, peer) = ResolverChannel::pair();
    match source {
        ResolverSource::Sample => {
            spawn_static_peer(feed::sample_locations(), TABLE_LATENCY, peer);
        }
        ResolverSource::Table(path) => {
            let table = load_location_table(path)?;
            info!(entries = table.len(), path = %path.display(), "loaded location table");
            spawn_static_peer(table, TABLE_LATENCY, peer);
        }
        ResolverSource::Http(endpoint) => {
            info!(%endpoint, "using resolver sidecar");
            spawn_http_peer(endpoint.clone(), peer);
        }
    }
    Ok(channel)
}

/// Forwards terminal input from a blocking reader thread
fn spawn_input_reader() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(event) = event::read() {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    rx
}

enum Tick {
    Input(Event),
    Frame,
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let mut input = spawn_input_reader();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        let view = app.view().await;
        let mut hits = HitMap::default();
        {
            let document = app.session.page.read().await;
            terminal.draw(|f| hits = ui::render(f, &document, &view))?;
        }
        app.set_hits(hits);

        let tick = tokio::select! {
            Some(event) = input.recv() => Tick::Input(event),
            Some(report) = app.session.watcher.reports.recv() => {
                debug!(attached = report.attached, url = %report.url, "rescan finished");
                Tick::Frame
            }
            _ = frames.tick() => Tick::Frame,
        };

        if let Tick::Input(event) = tick {
            match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key).await,
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let store = match &startup.cache_dir {
        Some(dir) => FileStore::with_dir(dir.clone()),
        None => FileStore::new().ok_or("could not determine a cache directory")?,
    };
    let config = Config {
        // Terminal cells, not pixels
        tooltip_offset: 1,
        ..Config::default()
    };

    if startup.show_stats {
        init_stderr_logging();
        let stats = CacheStats::load(&store, &config.namespace, Utc::now(), config.recent_limit)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to read cache stats");
                CacheStats::default()
            });
        print!("{}", stats.render());
        return Ok(());
    }

    fs::create_dir_all(store.dir())?;
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(store.dir().join("flagtip.log"))?;
    init_file_logging(log_file);

    let posts = match &startup.feed {
        Some(path) => feed::load_feed(path)?,
        None => feed::sample_feed(),
    };
    let channel = connect_resolver(&startup.resolver)?;
    let session = Session::start(config, Arc::new(store), channel, feed::home_page(&posts)).await;
    let mut app = App::new(session, posts);

    setup_panic_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;

    app.session.shutdown().await;
    result?;
    Ok(())
}
