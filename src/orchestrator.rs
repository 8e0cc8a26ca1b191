use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::config::Timeouts;
use crate::registry::Registry;
use crate::session::GameSession;
use crate::types::{Answer, ClientMsg, Phase, ServerMsg};

/// Outbound delivery to live connections: one unbounded sender per socket.
/// Sending to a vanished connection is a no-op.
pub struct Hub {
    connections: dashmap::DashMap<String, UnboundedSender<ServerMsg>>,
}

impl Hub {
    fn new() -> Self {
        Self { connections: dashmap::DashMap::new() }
    }

    /// Registers a connection and returns the receiving end its socket task
    /// should pump to the wire.
    pub fn register(&self, connection_id: String) -> UnboundedReceiver<ServerMsg> {
        let (tx, rx) = unbounded_channel();
        self.connections.insert(connection_id, tx);
        rx
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    pub fn send_to(&self, connection_id: &str, msg: ServerMsg) {
        if let Some(tx) = self.connections.get(connection_id) {
            let _ = tx.send(msg);
        }
    }

    fn send_each<'a>(&self, ids: impl Iterator<Item = &'a String>, msg: &ServerMsg) {
        for id in ids {
            self.send_to(id, msg.clone());
        }
    }
}

/// Routes connection-scoped requests to the right room, enforces phase and
/// authorization legality, and decides what gets broadcast where.
pub struct Orchestrator {
    registry: Mutex<Registry>,
    pub hub: Hub,
    timeouts: Timeouts,
}

impl Orchestrator {
    pub fn new(timeouts: Timeouts) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::new()),
            hub: Hub::new(),
            timeouts,
        })
    }
}

fn reject(orch: &Orchestrator, connection_id: &str, text: &str) {
    orch.hub.send_to(connection_id, ServerMsg::Message { message: text.to_string() });
}

fn broadcast_info(hub: &Hub, session: &GameSession) {
    let info = session.public_info();
    hub.send_each(session.players.keys(), &info);
}

fn broadcast_reveal(hub: &Hub, session: &GameSession) {
    let reveal = ServerMsg::RevealInfo {
        number_of_reds: session.number_of_reds(),
        guesses: session.all_guesses(),
    };
    hub.send_each(session.players.keys(), &reveal);
}

/// Resolves the connection's current room, rejecting if it has none. A
/// mapping to a room that no longer exists is dropped on the spot.
fn validate(orch: &Orchestrator, registry: &mut Registry, connection_id: &str) -> Option<String> {
    let Some(alias) = registry.room_of(connection_id).cloned() else {
        reject(orch, connection_id, "You are not in a game session");
        return None;
    };
    if registry.get_session(&alias).is_none() {
        registry.clear_room(connection_id);
        tracing::warn!("connection {} mapped to missing room {}", connection_id, alias);
        reject(orch, connection_id, "Game session not found");
        return None;
    }
    Some(alias)
}

/// Removes the connection from whatever room it is in before it creates or
/// joins another. A departing creator tears the whole room down.
fn leave_previous_session(orch: &Orchestrator, registry: &mut Registry, connection_id: &str) {
    let Some(alias) = registry.room_of(connection_id).cloned() else {
        return;
    };
    if registry.get_session(&alias).is_none() {
        registry.clear_room(connection_id);
        tracing::warn!("connection {} mapped to missing room {}", connection_id, alias);
        return;
    }
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };

    if session.creator_id == connection_id {
        let members: Vec<String> = session.players.keys().cloned().collect();
        registry.delete_session(&alias);
        for id in &members {
            registry.clear_room(id);
        }
        orch.hub.send_each(
            members.iter().filter(|id| id.as_str() != connection_id),
            &ServerMsg::LeaveSessionOnClientSide,
        );
        tracing::info!("room {} torn down by its creator", alias);
        return;
    }

    session.remove_player(connection_id);
    let remaining: Vec<String> = session.players.keys().cloned().collect();
    let info = session.public_info();
    if remaining.is_empty() {
        registry.delete_session(&alias);
    } else {
        orch.hub.send_each(remaining.iter(), &info);
    }
    registry.clear_room(connection_id);
    orch.hub.send_to(connection_id, ServerMsg::LeaveSessionOnClientSide);
}

/// Deferred fallback for the answer and guess phases. Timers are never
/// cancelled; a stale one whose phase already advanced is a no-op.
fn schedule_phase_timeout(orch: Arc<Orchestrator>, alias: String, expected: Phase) {
    tokio::spawn(async move {
        tokio::time::sleep(orch.timeouts.phase).await;
        let mut registry = orch.registry.lock().await;
        let Some(session) = registry.get_session_mut(&alias) else {
            return;
        };
        if session.state != expected {
            return;
        }
        match expected {
            Phase::Answer => {
                tracing::info!("room {}: answer phase timed out", alias);
                session.state = Phase::Guess;
                broadcast_info(&orch.hub, session);
            }
            Phase::Guess => {
                tracing::info!("room {}: guess phase timed out", alias);
                session.state = Phase::Reveal;
                broadcast_info(&orch.hub, session);
                broadcast_reveal(&orch.hub, session);
            }
            _ => {}
        }
    });
}

/// Deferred round reset once every red-answering player has been found.
fn schedule_auto_reset(orch: Arc<Orchestrator>, alias: String) {
    tokio::spawn(async move {
        tokio::time::sleep(orch.timeouts.auto_reset).await;
        let mut registry = orch.registry.lock().await;
        let Some(session) = registry.get_session_mut(&alias) else {
            return;
        };
        if session.state != Phase::Reveal {
            return;
        }
        session.reset();
        tracing::info!("room {}: round auto-reset", alias);
        broadcast_info(&orch.hub, session);
    });
}

/// Entry point for every parsed client message.
pub async fn handle_message(orch: &Arc<Orchestrator>, connection_id: &str, msg: ClientMsg) {
    match msg {
        ClientMsg::CreateSession { player_name, room_alias } => {
            create_session(orch, connection_id, player_name, room_alias).await;
        }
        ClientMsg::JoinSession { player_name, room_alias } => {
            join_session(orch, connection_id, player_name, room_alias).await;
        }
        ClientMsg::LeaveSession => leave_session(orch, connection_id).await,
        ClientMsg::StartGame => start_game(orch, connection_id).await,
        ClientMsg::SubmitQuestion { question } => {
            submit_question(orch, connection_id, question).await;
        }
        ClientMsg::SubmitAnswer { answer } => submit_answer(orch, connection_id, answer).await,
        ClientMsg::SubmitGuess { guess } => submit_guess(orch, connection_id, guess).await,
        ClientMsg::GetPlayerGuess { target_name } => {
            get_player_guess(orch, connection_id, target_name).await;
        }
        ClientMsg::ResetRound => reset_round(orch, connection_id).await,
    }
}

async fn create_session(
    orch: &Arc<Orchestrator>,
    connection_id: &str,
    player_name: String,
    room_alias: String,
) {
    let mut registry = orch.registry.lock().await;
    leave_previous_session(orch, &mut registry, connection_id);

    let Some(session) =
        registry.create_session(player_name, connection_id.to_string(), room_alias.clone())
    else {
        reject(orch, connection_id, "Room already exists");
        return;
    };
    let info = session.public_info();
    registry.set_room(connection_id.to_string(), room_alias.clone());
    orch.hub.send_to(connection_id, info);
    tracing::info!("room {} created by {}", room_alias, connection_id);
}

async fn join_session(
    orch: &Arc<Orchestrator>,
    connection_id: &str,
    player_name: String,
    room_alias: String,
) {
    let mut registry = orch.registry.lock().await;
    leave_previous_session(orch, &mut registry, connection_id);

    let Some(session) = registry.get_session_mut(&room_alias) else {
        reject(orch, connection_id, "Room does not exist");
        return;
    };
    if session.find_player_by_name(&player_name).is_some() {
        reject(orch, connection_id, "Player nickname already exists in this room!");
        return;
    }
    if session.state != Phase::Wait {
        // Mid-game joins are unsupported.
        reject(orch, connection_id, "Game already started");
        return;
    }

    session.add_player(connection_id.to_string(), player_name);
    let info = session.public_info();
    let members: Vec<String> = session.players.keys().cloned().collect();
    registry.set_room(connection_id.to_string(), room_alias.clone());
    orch.hub.send_each(members.iter(), &info);
    tracing::info!("{} joined room {}", connection_id, room_alias);
}

async fn leave_session(orch: &Arc<Orchestrator>, connection_id: &str) {
    let mut registry = orch.registry.lock().await;
    leave_previous_session(orch, &mut registry, connection_id);
    orch.hub.send_to(connection_id, ServerMsg::LeaveSessionOnClientSide);
}

/// Transport-level disconnect. Peers are not proactively notified; only an
/// explicit leave broadcasts to the room.
pub async fn disconnect(orch: &Arc<Orchestrator>, connection_id: &str) {
    let mut registry = orch.registry.lock().await;
    registry.handle_disconnect(connection_id);
}

async fn start_game(orch: &Arc<Orchestrator>, connection_id: &str) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    if session.creator_id != connection_id {
        reject(orch, connection_id, "Only creator can start game");
        return;
    }
    session.state = Phase::Questions;
    broadcast_info(&orch.hub, session);
}

async fn submit_question(orch: &Arc<Orchestrator>, connection_id: &str, question: String) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    if !session.submit_question(connection_id, question) {
        // A rejected submission leaves the phase untouched.
        reject(
            orch,
            connection_id,
            "Cannot submit question - not in question phase or not creator",
        );
        return;
    }
    reject(orch, connection_id, "Question submitted");
    session.state = Phase::Answer;
    broadcast_info(&orch.hub, session);
    drop(registry);
    schedule_phase_timeout(orch.clone(), alias, Phase::Answer);
}

async fn submit_answer(orch: &Arc<Orchestrator>, connection_id: &str, answer: Answer) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    // Wrong-phase or non-final submissions are absorbed silently.
    if !session.submit_answer(connection_id, answer) {
        return;
    }
    session.state = Phase::Guess;
    broadcast_info(&orch.hub, session);
    drop(registry);
    schedule_phase_timeout(orch.clone(), alias, Phase::Guess);
}

async fn submit_guess(orch: &Arc<Orchestrator>, connection_id: &str, guess: i64) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    if !session.submit_guess(connection_id, guess) {
        return;
    }
    session.state = Phase::Reveal;
    broadcast_info(&orch.hub, session);
    broadcast_reveal(&orch.hub, session);
}

async fn get_player_guess(orch: &Arc<Orchestrator>, connection_id: &str, target_name: String) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    if session.find_player_by_name(&target_name).is_none() {
        reject(orch, connection_id, "Player not found");
        return;
    }
    let Some(answer) = session.player_answer(connection_id, &target_name) else {
        reject(orch, connection_id, "Answer not found");
        return;
    };
    let revealed = ServerMsg::PlayerAnswer { name: target_name, answer };
    orch.hub.send_each(session.players.keys(), &revealed);

    // Every red has been found; start a fresh round shortly.
    if session.consumed_checks() == session.number_of_reds() {
        drop(registry);
        schedule_auto_reset(orch.clone(), alias);
    }
}

async fn reset_round(orch: &Arc<Orchestrator>, connection_id: &str) {
    let mut registry = orch.registry.lock().await;
    let Some(alias) = validate(orch, &mut registry, connection_id) else {
        return;
    };
    let Some(session) = registry.get_session_mut(&alias) else {
        return;
    };
    session.reset();
    broadcast_info(&orch.hub, session);
}
