use serde::{Deserialize, Serialize};

/// A player in a game session. Identity is the connection id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

/// The round phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Wait,
    Questions,
    Answer,
    Guess,
    Reveal,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wait => write!(f, "wait"),
            Self::Questions => write!(f, "questions"),
            Self::Answer => write!(f, "answer"),
            Self::Guess => write!(f, "guess"),
            Self::Reveal => write!(f, "reveal"),
        }
    }
}

/// A player's hidden binary answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Red,
    Black,
}

/// Messages sent from clients to the server via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    CreateSession {
        player_name: String,
        room_alias: String,
    },
    #[serde(rename_all = "camelCase")]
    JoinSession {
        player_name: String,
        room_alias: String,
    },
    LeaveSession,
    StartGame,
    SubmitQuestion { question: String },
    SubmitAnswer { answer: Answer },
    SubmitGuess { guess: i64 },
    #[serde(rename_all = "camelCase")]
    GetPlayerGuess { target_name: String },
    ResetRound,
}

/// Messages sent from the server to clients via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Full public room snapshot.
    #[serde(rename_all = "camelCase")]
    SessionInfo {
        alias: String,
        state: Phase,
        players: Vec<(String, Player)>,
        creator_id: String,
        question: String,
    },
    /// End-of-round aggregate: red count plus everyone's guesses.
    #[serde(rename_all = "camelCase")]
    RevealInfo {
        number_of_reds: usize,
        guesses: Vec<(String, i64)>,
    },
    /// Result of a reveal lookup, broadcast to the whole room.
    PlayerAnswer { name: String, answer: Answer },
    /// Human-readable rejection or info text for a single recipient.
    Message { message: String },
    /// Instructs the client to clear its local room state.
    LeaveSessionOnClientSide,
}
