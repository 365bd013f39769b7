use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use wavedeck::app::App;
use wavedeck::catalog::StaticCatalog;
use wavedeck::config::Config;
use wavedeck::event::sources::{self, IrReceiver, LircSocket, TermInput};
use wavedeck::event::EventLoop;
use wavedeck::player::NullPlayer;
use wavedeck::saver::DisabledScreensaver;
use wavedeck::timer;

#[derive(Parser)]
#[command(name = "wavedeck", about = "Music appliance UI runtime")]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to a file; the terminal belongs to the UI.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("wavedeck.log")?;
    let mut builder = env_logger::Builder::from_default_env();
    if cli.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Starting wavedeck in {:?} mode", config.current.mode);

    let (events, queue) = sources::channel();

    // Input channels. Optional ones degrade silently when absent.
    let _input = TermInput::spawn(events.clone());
    let _buttons = sources::init_gpio_buttons(&config.gpio, &events);
    let _encoders = sources::init_rotary_encoders(&config.gpio, &events);
    let ir: Option<Box<dyn IrReceiver>> = if config.usage.use_lirc {
        match LircSocket::connect(LircSocket::DEFAULT_PATH) {
            Ok(socket) => Some(Box::new(socket)),
            Err(e) => {
                warn!("IR remote unavailable: {e:#}");
                None
            }
        }
    } else {
        None
    };

    let mut event_loop = EventLoop::new(&config, Some(queue), None, ir)?;

    let config = Rc::new(RefCell::new(config));
    let catalog = Rc::new(StaticCatalog);
    let player = NullPlayer::new().handle();
    let mut app = App::new(
        config.clone(),
        player,
        Box::new(DisabledScreensaver),
        catalog.clone(),
        catalog.clone(),
        catalog.clone(),
        catalog,
    );

    let _timer = timer::start(&config.borrow().timer, app.shared.clone(), events.clone());

    app.start();
    event_loop.dispatch(&mut app, App::shutdown).await
}
