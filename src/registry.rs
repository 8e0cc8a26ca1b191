use std::collections::HashMap;

use crate::session::GameSession;

/// Holds every active room and which room each connection is in.
///
/// The orchestrator owns a single `Registry` behind a mutex, so all
/// mutations here run one event at a time.
pub struct Registry {
    /// room alias -> session
    sessions: HashMap<String, GameSession>,
    /// connection id -> room alias
    user_rooms: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            user_rooms: HashMap::new(),
        }
    }

    /// Claims `alias` and creates its session with the creator as first
    /// player. Returns `None` if the alias is already taken.
    pub fn create_session(
        &mut self,
        player_name: String,
        creator_id: String,
        alias: String,
    ) -> Option<&mut GameSession> {
        if self.sessions.contains_key(&alias) {
            return None;
        }
        let mut session = GameSession::new(creator_id.clone(), alias.clone());
        session.add_player(creator_id, player_name);
        self.sessions.insert(alias.clone(), session);
        self.sessions.get_mut(&alias)
    }

    pub fn get_session(&self, alias: &str) -> Option<&GameSession> {
        self.sessions.get(alias)
    }

    pub fn get_session_mut(&mut self, alias: &str) -> Option<&mut GameSession> {
        self.sessions.get_mut(alias)
    }

    pub fn delete_session(&mut self, alias: &str) {
        self.sessions.remove(alias);
    }

    pub fn room_of(&self, connection_id: &str) -> Option<&String> {
        self.user_rooms.get(connection_id)
    }

    pub fn set_room(&mut self, connection_id: String, alias: String) {
        self.user_rooms.insert(connection_id, alias);
    }

    pub fn clear_room(&mut self, connection_id: &str) {
        self.user_rooms.remove(connection_id);
    }

    /// Removes a dropped connection from its room, deleting the room if it
    /// becomes empty. No-op for connections without a room.
    pub fn handle_disconnect(&mut self, connection_id: &str) {
        let Some(alias) = self.user_rooms.remove(connection_id) else {
            return;
        };
        if let Some(session) = self.sessions.get_mut(&alias) {
            session.remove_player(connection_id);
            if session.players.is_empty() {
                self.delete_session(&alias);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_session_rejects_taken_alias() {
        let mut registry = Registry::new();
        assert!(registry
            .create_session("Alice".to_string(), "c1".to_string(), "R1".to_string())
            .is_some());
        assert!(registry
            .create_session("Bob".to_string(), "c2".to_string(), "R1".to_string())
            .is_none());

        let session = registry.get_session("R1").unwrap();
        assert_eq!(session.creator_id, "c1");
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn delete_session_is_idempotent() {
        let mut registry = Registry::new();
        registry.create_session("Alice".to_string(), "c1".to_string(), "R1".to_string());
        registry.delete_session("R1");
        registry.delete_session("R1");
        assert!(registry.get_session("R1").is_none());
    }

    #[test]
    fn disconnect_removes_player_and_empty_room() {
        let mut registry = Registry::new();
        registry.create_session("Alice".to_string(), "c1".to_string(), "R1".to_string());
        registry.set_room("c1".to_string(), "R1".to_string());
        registry
            .get_session_mut("R1")
            .unwrap()
            .add_player("c2".to_string(), "Bob".to_string());
        registry.set_room("c2".to_string(), "R1".to_string());

        registry.handle_disconnect("c2");
        assert_eq!(registry.get_session("R1").unwrap().players.len(), 1);
        assert!(registry.room_of("c2").is_none());

        registry.handle_disconnect("c1");
        assert!(registry.get_session("R1").is_none());
        assert!(registry.room_of("c1").is_none());
    }

    #[test]
    fn disconnect_without_room_is_noop() {
        let mut registry = Registry::new();
        registry.handle_disconnect("ghost");
        assert!(registry.room_of("ghost").is_none());
    }
}
