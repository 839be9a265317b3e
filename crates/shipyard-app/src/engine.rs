//! Engine - shared orchestration for the editor
//!
//! The Engine owns the application state, the message channel and the
//! control-plane client. Frontends (the headless runner, tests) feed it
//! messages and subscribe to [`EngineEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use shipyard_api::ApiClient;
use shipyard_core::prelude::*;
use tokio::sync::{broadcast, mpsc};

use crate::config::Settings;
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::process::process_message;
use crate::state::{AppPhase, AppState};

/// Capacity of the message channel
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the event broadcast; slow subscribers lag past this
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct Engine<A> {
    /// TEA application state
    pub state: AppState,

    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,
    event_tx: broadcast::Sender<EngineEvent>,
    api: Arc<A>,
    request_timeout: Duration,
}

impl<A> Engine<A>
where
    A: ApiClient + Send + Sync + 'static,
{
    /// Create an engine signed in as the session user from `settings`
    pub fn new(api: Arc<A>, settings: Settings) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let request_timeout = settings.api.request_timeout();
        let user = settings.session.user();
        info!("Engine started for user {}", user.id);

        Self {
            state: AppState::new(user, settings),
            msg_tx,
            msg_rx,
            event_tx,
            api,
            request_timeout,
        }
    }

    /// Sender for messages produced outside the engine
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Run one message (and its follow-ups), then publish queued events
    pub fn process_message(&mut self, message: Message) {
        process_message(
            &mut self.state,
            message,
            &self.msg_tx,
            &self.api,
            self.request_timeout,
        );
        self.flush_events();
    }

    /// Process every message already queued without waiting
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Wait for the next message from a background task
    pub async fn recv_message(&mut self) -> Option<Message> {
        self.msg_rx.recv().await
    }

    /// Process messages until no listing or save is outstanding
    pub async fn settle(&mut self) {
        self.drain_pending_messages();
        while !self.state.is_idle() {
            match self.msg_rx.recv().await {
                Some(msg) => self.process_message(msg),
                None => break,
            }
        }
    }

    /// Publish `Shutdown` and mark the state as quitting
    pub async fn shutdown(&mut self) {
        if !self.state.is_idle() {
            info!(
                "Shutting down with {} save(s) in flight",
                self.state.saves.in_flight_count()
            );
        }
        self.state.phase = AppPhase::Quitting;
        self.state.emit(EngineEvent::Shutdown);
        self.flush_events();
    }

    fn flush_events(&mut self) {
        for event in self.state.take_events() {
            trace!("event: {}", event.event_type());
            // no subscribers is fine
            let _ = self.event_tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{FieldEdit, RowRef};
    use shipyard_api::test_utils::{test_deployment, test_server};
    use shipyard_api::{InjectedFailure, MemoryApi};
    use shipyard_core::{
        FieldPath, FieldValue, PermissionLevel, PortMapping, ResourceId, SaveErrorKind,
    };

    fn admin_settings() -> Settings {
        let mut settings = Settings::default();
        settings.session.user_id = "root".into();
        settings.session.admin = true;
        settings
    }

    async fn loaded_engine(api: MemoryApi) -> Engine<MemoryApi> {
        let mut engine = Engine::new(Arc::new(api), admin_settings());
        engine.process_message(Message::Refresh);
        engine.settle().await;
        engine
    }

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn collect(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_refresh_loads_snapshots() {
        let engine = loaded_engine(MemoryApi::new([
            test_deployment("dep-1", "web"),
            test_server("srv-1", "edge"),
        ]))
        .await;
        assert_eq!(engine.state.snapshots.len(), 2);
        assert_eq!(engine.state.phase, AppPhase::Running);
    }

    #[tokio::test]
    async fn test_edit_and_save_round_trip() {
        let mut engine = loaded_engine(MemoryApi::new([test_deployment("dep-1", "web")])).await;
        let mut events = engine.subscribe();
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetRowField {
                path: path("ports"),
                row: RowRef::Index(0),
                field: "local".into(),
                value: " 443 ".into(),
            },
        });
        assert!(engine.state.is_dirty(&id));

        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });
        engine.settle().await;

        // server normalized the port
        assert!(!engine.state.is_dirty(&id));
        assert_eq!(
            engine.state.snapshots.load(&id).unwrap().config.list_items(&path("ports")).unwrap(),
            vec![FieldValue::Port(PortMapping::new("443", "8080"))]
        );

        let submissions = engine.api().submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].partial.changed_fields(), vec!["ports"]);
        assert_eq!(submissions[0].operator, "root");

        let kinds: Vec<_> = collect(&mut events).iter().map(|e| e.event_type()).collect();
        assert!(kinds.contains(&"draft_opened"));
        assert!(kinds.contains(&"save_started"));
        assert!(kinds.contains(&"save_succeeded"));
    }

    #[tokio::test]
    async fn test_only_one_save_in_flight() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.hold_updates();
        let mut engine = loaded_engine(api).await;
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetText {
                path: path("image"),
                value: "redis".into(),
            },
        });
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });
        let mut events = engine.subscribe();
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });

        let refused = collect(&mut events);
        assert!(matches!(
            refused.as_slice(),
            [EngineEvent::SaveFailed { error, .. }] if error.kind == SaveErrorKind::InFlight
        ));

        engine.api().release(1);
        engine.settle().await;
        assert_eq!(engine.api().max_in_flight(&id), 1);
        assert_eq!(engine.api().submissions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edits() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.fail_next_update(InjectedFailure::Network("connection reset".into()))
            .await;
        let mut engine = loaded_engine(api).await;
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetText {
                path: path("image"),
                value: "redis".into(),
            },
        });
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });
        engine.settle().await;

        assert!(engine.state.is_dirty(&id));
        assert_eq!(
            engine.state.save_errors.get(&id).map(|e| e.kind),
            Some(SaveErrorKind::Network)
        );
        assert!(!engine.state.history.recent().next().unwrap().success);
    }

    #[tokio::test]
    async fn test_save_rejected_after_remote_downgrade() {
        let api = MemoryApi::new([
            test_deployment("dep-1", "web").with_permission("alice", PermissionLevel::Update)
        ]);
        let mut settings = Settings::default();
        settings.session.user_id = "alice".into();
        let mut engine = Engine::new(Arc::new(api), settings);
        engine.process_message(Message::Refresh);
        engine.settle().await;
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetText {
                path: path("image"),
                value: "redis".into(),
            },
        });
        // revoked server-side, not yet refreshed locally
        engine
            .api()
            .set_permission(&id, "alice", PermissionLevel::Read)
            .await;
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });
        engine.settle().await;

        assert_eq!(
            engine.state.save_errors.get(&id).map(|e| e.kind),
            Some(SaveErrorKind::PermissionRevoked)
        );
        assert!(engine.state.is_dirty(&id));
    }

    #[tokio::test]
    async fn test_request_timeout_becomes_save_error() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.hold_updates();
        let mut settings = admin_settings();
        settings.api.request_timeout_ms = 20;
        let mut engine = Engine::new(Arc::new(api), settings);
        engine.process_message(Message::Refresh);
        engine.settle().await;
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetText {
                path: path("network"),
                value: "host".into(),
            },
        });
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });
        engine.settle().await;

        assert_eq!(
            engine.state.save_errors.get(&id).map(|e| e.kind),
            Some(SaveErrorKind::Timeout)
        );
        assert!(!engine.state.saves.is_saving(&id));
    }

    #[tokio::test]
    async fn test_listing_during_failed_save_is_not_lost() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.hold_updates();
        api.fail_next_update(InjectedFailure::Network("connection reset".into()))
            .await;
        let mut engine = loaded_engine(api).await;
        let id = ResourceId::from("dep-1");

        engine.process_message(Message::Edit {
            id: id.clone(),
            edit: FieldEdit::SetText {
                path: path("image"),
                value: "redis".into(),
            },
        });
        engine.process_message(Message::Save {
            id: id.clone(),
            force: false,
        });

        // another client changes the network while the save is parked
        let mut remote = test_deployment("dep-1", "web");
        if let shipyard_core::Config::Deployment(c) = &mut remote.config {
            c.network = "host".into();
        }
        engine.api().put_resource(remote).await;
        engine.process_message(Message::Refresh);
        while engine.state.refreshing {
            let msg = engine.recv_message().await.unwrap();
            engine.process_message(msg);
        }

        engine.api().release(1);
        engine.settle().await;

        let snapshot = engine.state.snapshots.load(&id).unwrap();
        assert_eq!(
            snapshot.config.get(&path("network")).unwrap(),
            FieldValue::text("host")
        );
        assert!(engine.state.has_conflict(&id));
        assert!(engine.state.is_dirty(&id));
    }

    #[tokio::test]
    async fn test_shutdown_emits_event() {
        let mut engine = loaded_engine(MemoryApi::new([])).await;
        let mut events = engine.subscribe();
        engine.shutdown().await;
        assert!(engine.should_quit());
        assert_eq!(collect(&mut events), vec![EngineEvent::Shutdown]);
    }
}
