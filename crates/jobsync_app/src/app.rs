use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use jobsync_core::{update, DashboardState, DashboardView, Msg};
use jobsync_engine::{EngineHandle, MemoryCredentials};
use jobsync_logging::{sync_info, sync_warn};

use crate::config::{config_path, load_config, tokens_from_env, AppConfig};
use crate::effects::EffectRunner;
use crate::render::render_lines;

const TICK: Duration = Duration::from_millis(75);

pub fn run_app() -> anyhow::Result<()> {
    let path = config_path();
    let loaded = load_config(&path);
    let config = loaded.as_ref().cloned().unwrap_or_else(|_| AppConfig::default());
    jobsync_logging::initialize(config.log_target.into(), config.log_level());
    if let Err(err) = &loaded {
        sync_warn!("Using default settings: {}", err);
    }

    let (access, refresh) = tokens_from_env();
    if access.is_none() {
        sync_warn!("No access token configured; requests are sent unauthenticated");
    }
    let credentials = Arc::new(MemoryCredentials::new(access, refresh));
    let settings = config.client_settings();
    sync_info!("Syncing with {}", settings.base_url);

    let engine = EngineHandle::new(settings, credentials).context("starting sync engine")?;
    let runner = EffectRunner::new(engine);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_input_reader(msg_tx.clone());
    // Background tick so engine events are picked up without user input.
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(TICK);
        }
    });

    let mut state = DashboardState::new();
    draw(&state.view())?;

    while let Ok(msg) = msg_rx.recv() {
        let mut inbox = runner.pending_messages();
        inbox.push(msg);

        let mut keep_running = true;
        for msg in inbox {
            let (next, effects) = update(state, msg);
            state = next;
            keep_running &= runner.run(effects);
        }

        if state.consume_dirty() {
            draw(&state.view())?;
        }
        if !keep_running {
            break;
        }
    }

    sync_info!("Exiting");
    Ok(())
}

fn spawn_input_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if msg_tx.send(Msg::InputSubmitted(line)).is_err() {
                return;
            }
        }
        let _ = msg_tx.send(Msg::InputSubmitted("quit".to_string()));
    });
}

fn draw(view: &DashboardView) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out)?;
    for line in render_lines(view) {
        writeln!(out, "{line}")?;
    }
    write!(out, "> ")?;
    out.flush()
}
