//! Headless mode runner - main event loop without a UI
//!
//! Reads NDJSON commands, turns them into engine messages and writes every
//! engine event (plus query answers) back out as NDJSON.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, Interval};

use shipyard_api::ApiClient;
use shipyard_app::config::Settings;
use shipyard_app::{Engine, EngineEvent, Message};
use shipyard_core::prelude::*;
use shipyard_core::{ResourceId, User};

use super::{emit_engine_event, Command, HeadlessEvent, ResourceView};

/// Capacity of the stdin line channel
const INPUT_CHANNEL_CAPACITY: usize = 64;

/// Run in headless mode against `api`, reading stdin and writing stdout
pub async fn run_headless<A>(api: Arc<A>, settings: Settings) -> Result<()>
where
    A: ApiClient + Send + Sync + 'static,
{
    info!("═══════════════════════════════════════════════════════");
    info!("shipyard starting in HEADLESS mode");
    info!("═══════════════════════════════════════════════════════");

    let (line_tx, line_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(line_tx);
    });

    let mut engine = Engine::new(api, settings);
    let mut stdout = std::io::stdout();
    let result = run_event_loop(&mut engine, line_rx, &mut stdout).await;

    info!("shipyard headless mode exiting");
    result
}

/// Drive `engine` from `lines` until `quit` or end of input
///
/// The initial listing completes before the first command is read. At end
/// of input, outstanding saves are awaited before shutdown.
pub async fn run_event_loop<A, W>(
    engine: &mut Engine<A>,
    mut lines: mpsc::Receiver<String>,
    out: &mut W,
) -> Result<()>
where
    A: ApiClient + Send + Sync + 'static,
    W: Write,
{
    let mut events = engine.subscribe();
    let mut ticker = engine
        .state
        .settings
        .api
        .refresh_interval()
        .map(|period| interval_at(Instant::now() + period, period));

    engine.process_message(Message::Refresh);
    engine.settle().await;
    emit_events(&mut events, out);
    HeadlessEvent::ready(&engine.state.user.id, engine.state.snapshots.len()).emit_to(out);

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        let input = tokio::select! {
            msg = engine.recv_message() => Input::Message(msg),
            line = lines.recv() => Input::Line(line),
            _ = tick(&mut ticker) => Input::Tick,
        };

        match input {
            Input::Message(Some(msg)) => engine.process_message(msg),
            Input::Message(None) => {
                info!("Message channel closed");
                break;
            }
            Input::Line(Some(line)) => match Command::parse(&line) {
                Ok(Some(command)) => {
                    handle_command(engine, command, &mut events, out).await;
                }
                Ok(None) => {}
                Err(message) => {
                    warn!("{}", message);
                    HeadlessEvent::error(message, false).emit_to(out);
                }
            },
            Input::Line(None) => {
                info!("Input closed; waiting for outstanding requests");
                engine.settle().await;
                emit_events(&mut events, out);
                break;
            }
            Input::Tick => engine.process_message(Message::Refresh),
        }

        emit_events(&mut events, out);
    }

    engine.shutdown().await;
    emit_events(&mut events, out);
    Ok(())
}

enum Input {
    Message(Option<Message>),
    Line(Option<String>),
    Tick,
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn handle_command<A, W>(
    engine: &mut Engine<A>,
    command: Command,
    events: &mut broadcast::Receiver<EngineEvent>,
    out: &mut W,
) where
    A: ApiClient + Send + Sync + 'static,
    W: Write,
{
    match command {
        Command::Open { id } => engine.process_message(Message::OpenDraft { id }),
        Command::Close { id, force } => engine.process_message(Message::CloseDraft { id, force }),
        Command::Edit { id, edit } => engine.process_message(Message::Edit { id, edit }),
        Command::Apply { id, op } => engine.process_message(Message::ApplyOperation { id, op }),
        Command::Undo { id } => engine.process_message(Message::Undo { id }),
        Command::Reset { id } => engine.process_message(Message::Reset { id }),
        Command::Save { id, force } => engine.process_message(Message::Save { id, force }),
        Command::Refresh => engine.process_message(Message::Refresh),
        Command::User { id, admin } => {
            let user = if admin {
                User::admin(id.clone(), id)
            } else {
                User::new(id.clone(), id)
            };
            engine.process_message(Message::SetUser { user });
        }
        Command::List { filter } => {
            HeadlessEvent::resources(engine.state.summaries(&filter)).emit_to(out);
        }
        Command::Show { id } => match resource_view(engine, &id) {
            Ok(view) => HeadlessEvent::resource(view).emit_to(out),
            Err(e) => HeadlessEvent::error(e.to_string(), false).emit_to(out),
        },
        Command::History { id } => {
            let history = &engine.state.history;
            let records = match &id {
                Some(id) => history.for_resource(id).cloned().collect(),
                None => history.recent().cloned().collect(),
            };
            HeadlessEvent::history(records).emit_to(out);
        }
        Command::Wait => {
            engine.settle().await;
            emit_events(events, out);
            HeadlessEvent::idle().emit_to(out);
        }
        Command::Quit => engine.process_message(Message::Quit),
    }
}

fn resource_view<A>(engine: &Engine<A>, id: &ResourceId) -> Result<ResourceView>
where
    A: ApiClient + Send + Sync + 'static,
{
    let state = &engine.state;
    let resource = state.snapshots.load(id)?;
    Ok(ResourceView {
        id: id.clone(),
        name: resource.name.clone(),
        revision: state.snapshots.revision(id).unwrap_or_default(),
        can_edit: state.can_edit(id),
        dirty: state.is_dirty(id),
        conflict: state.has_conflict(id),
        saving: state.saves.is_saving(id),
        snapshot: resource.config.clone(),
        draft: state.drafts.get(id).map(|draft| draft.config().clone()),
        last_error: state.save_errors.get(id).cloned(),
    })
}

fn emit_events<W: Write>(events: &mut broadcast::Receiver<EngineEvent>, out: &mut W) {
    loop {
        match events.try_recv() {
            Ok(event) => emit_engine_event(out, &event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Headless output lagged; {} events skipped", skipped);
                HeadlessEvent::error(format!("{skipped} events dropped"), false).emit_to(out);
            }
            Err(_) => break,
        }
    }
}

/// Spawn stdin reader task that forwards lines to the event loop (blocking version)
fn spawn_stdin_reader_blocking(line_tx: mpsc::Sender<String>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
