use std::collections::{HashMap, HashSet};

use crate::types::{Answer, Phase, Player};

/// The state of one room's current round.
///
/// Phase legality and one-time privileges are enforced here; duplicate-name
/// checks and broadcast decisions belong to the orchestrator.
pub struct GameSession {
    pub alias: String,
    pub creator_id: String,
    pub players: HashMap<String, Player>,
    pub state: Phase,
    pub question: String,
    answers: HashMap<String, Answer>,
    guesses: HashMap<String, i64>,
    /// Connection ids that have used their one-time reveal check this round.
    consumed_check: HashSet<String>,
}

impl GameSession {
    pub fn new(creator_id: String, alias: String) -> Self {
        Self {
            alias,
            creator_id,
            players: HashMap::new(),
            state: Phase::Wait,
            question: String::new(),
            answers: HashMap::new(),
            guesses: HashMap::new(),
            consumed_check: HashSet::new(),
        }
    }

    /// Returns the round to `wait` and clears everything except the player
    /// set, alias and creator.
    pub fn reset(&mut self) {
        self.state = Phase::Wait;
        self.question.clear();
        self.answers.clear();
        self.guesses.clear();
        self.consumed_check.clear();
    }

    pub fn add_player(&mut self, player_id: String, player_name: String) {
        self.players.insert(
            player_id.clone(),
            Player { id: player_id, name: player_name },
        );
    }

    pub fn remove_player(&mut self, player_id: &str) {
        self.players.remove(player_id);
    }

    pub fn find_player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    /// Sets the round's question. Only the creator may do this, and only in
    /// the `questions` phase. Does not itself advance the phase.
    pub fn submit_question(&mut self, player_id: &str, question: String) -> bool {
        if self.state != Phase::Questions {
            return false;
        }
        if player_id != self.creator_id {
            return false;
        }
        self.question = question;
        true
    }

    /// Records (or overwrites) a player's answer. Returns true exactly when
    /// every player has now answered, signaling the caller to advance.
    pub fn submit_answer(&mut self, player_id: &str, answer: Answer) -> bool {
        if self.state != Phase::Answer {
            return false;
        }
        self.answers.insert(player_id.to_string(), answer);
        self.answers.len() == self.players.len()
    }

    /// Records a player's guess of the red count. Returns true exactly when
    /// every player has now guessed.
    pub fn submit_guess(&mut self, player_id: &str, guess: i64) -> bool {
        if self.state != Phase::Guess {
            return false;
        }
        self.guesses.insert(player_id.to_string(), guess);
        self.guesses.len() == self.players.len()
    }

    /// One-time-per-round reveal lookup: resolves `target_name` and returns
    /// that player's answer, consuming the finder's privilege. Fails without
    /// consuming anything if the finder already checked this round, the phase
    /// is not `reveal`, the name is unknown, or the target never answered.
    pub fn player_answer(&mut self, finder_id: &str, target_name: &str) -> Option<Answer> {
        if self.consumed_check.contains(finder_id) {
            tracing::debug!("player {} already used their check", finder_id);
            return None;
        }
        if self.state != Phase::Reveal {
            tracing::debug!("reveal lookup outside reveal phase");
            return None;
        }

        let target = self.find_player_by_name(target_name)?;
        let answer = self.answers.get(&target.id).copied()?;
        self.consumed_check.insert(finder_id.to_string());
        Some(answer)
    }

    /// Count of players whose recorded answer is `red`, recomputed from the
    /// answers map so resubmission within a round cannot skew it.
    pub fn number_of_reds(&self) -> usize {
        self.answers.values().filter(|a| **a == Answer::Red).count()
    }

    pub fn consumed_checks(&self) -> usize {
        self.consumed_check.len()
    }

    pub fn all_guesses(&self) -> Vec<(String, i64)> {
        self.guesses.iter().map(|(id, g)| (id.clone(), *g)).collect()
    }

    /// The public snapshot broadcast as `sessionInfo`.
    pub fn public_info(&self) -> crate::types::ServerMsg {
        crate::types::ServerMsg::SessionInfo {
            alias: self.alias.clone(),
            state: self.state,
            players: self
                .players
                .iter()
                .map(|(id, p)| (id.clone(), p.clone()))
                .collect(),
            creator_id: self.creator_id.clone(),
            question: self.question.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_players(names: &[(&str, &str)]) -> GameSession {
        let mut session = GameSession::new("c1".to_string(), "R1".to_string());
        for (id, name) in names {
            session.add_player(id.to_string(), name.to_string());
        }
        session
    }

    #[test]
    fn submit_answer_signals_completion_only_on_last_player() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob"), ("c3", "Eve")]);
        session.state = Phase::Answer;

        assert!(!session.submit_answer("c1", Answer::Red));
        assert!(!session.submit_answer("c2", Answer::Black));
        assert!(session.submit_answer("c3", Answer::Black));
    }

    #[test]
    fn submit_answer_outside_answer_phase_is_ignored() {
        let mut session = session_with_players(&[("c1", "Alice")]);
        assert!(!session.submit_answer("c1", Answer::Red));
        assert_eq!(session.number_of_reds(), 0);
    }

    #[test]
    fn resubmission_does_not_overcount_reds() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Answer;

        session.submit_answer("c1", Answer::Red);
        session.submit_answer("c1", Answer::Red);
        assert_eq!(session.number_of_reds(), 1);

        session.submit_answer("c1", Answer::Black);
        assert_eq!(session.number_of_reds(), 0);
    }

    #[test]
    fn submit_question_requires_creator_and_phase() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        assert!(!session.submit_question("c1", "early".to_string()));

        session.state = Phase::Questions;
        assert!(!session.submit_question("c2", "not mine".to_string()));
        assert!(session.submit_question("c1", "Pick a color".to_string()));
        assert_eq!(session.question, "Pick a color");
        assert_eq!(session.state, Phase::Questions);
    }

    #[test]
    fn submit_guess_signals_completion_only_when_all_guessed() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Guess;

        assert!(!session.submit_guess("c1", 1));
        assert!(session.submit_guess("c2", 2));

        let mut guesses = session.all_guesses();
        guesses.sort();
        assert_eq!(guesses, vec![("c1".to_string(), 1), ("c2".to_string(), 2)]);
    }

    #[test]
    fn reveal_lookup_is_once_per_round() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Answer;
        session.submit_answer("c1", Answer::Red);
        session.submit_answer("c2", Answer::Black);
        session.state = Phase::Reveal;

        assert_eq!(session.player_answer("c2", "Alice"), Some(Answer::Red));
        // Second lookup by the same finder fails regardless of target.
        assert_eq!(session.player_answer("c2", "Bob"), None);
        assert_eq!(session.player_answer("c2", "Alice"), None);
        assert_eq!(session.consumed_checks(), 1);
    }

    #[test]
    fn reveal_lookup_on_unknown_or_unanswered_target_keeps_privilege() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Answer;
        session.submit_answer("c1", Answer::Red);
        session.state = Phase::Reveal;

        assert_eq!(session.player_answer("c1", "Nobody"), None);
        // Bob never answered.
        assert_eq!(session.player_answer("c1", "Bob"), None);
        assert_eq!(session.consumed_checks(), 0);

        assert_eq!(session.player_answer("c1", "Alice"), Some(Answer::Red));
        assert_eq!(session.consumed_checks(), 1);
    }

    #[test]
    fn reveal_lookup_outside_reveal_phase_fails() {
        let mut session = session_with_players(&[("c1", "Alice")]);
        session.state = Phase::Answer;
        session.submit_answer("c1", Answer::Red);

        assert_eq!(session.player_answer("c1", "Alice"), None);
        assert_eq!(session.consumed_checks(), 0);
    }

    #[test]
    fn consumed_checks_never_exceed_player_count() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Answer;
        session.submit_answer("c1", Answer::Red);
        session.submit_answer("c2", Answer::Red);
        session.state = Phase::Reveal;

        session.player_answer("c1", "Bob");
        session.player_answer("c2", "Alice");
        session.player_answer("c1", "Alice");

        assert!(session.consumed_checks() <= session.players.len());
        assert!(session.consumed_checks() <= session.number_of_reds());
    }

    #[test]
    fn reset_clears_round_but_keeps_players() {
        let mut session = session_with_players(&[("c1", "Alice"), ("c2", "Bob")]);
        session.state = Phase::Questions;
        session.submit_question("c1", "Pick a color".to_string());
        session.state = Phase::Answer;
        session.submit_answer("c1", Answer::Red);
        session.submit_answer("c2", Answer::Black);
        session.state = Phase::Guess;
        session.submit_guess("c1", 1);
        session.state = Phase::Reveal;
        session.player_answer("c2", "Alice");

        session.reset();

        assert_eq!(session.state, Phase::Wait);
        assert_eq!(session.question, "");
        assert_eq!(session.number_of_reds(), 0);
        assert!(session.all_guesses().is_empty());
        assert_eq!(session.consumed_checks(), 0);
        assert_eq!(session.players.len(), 2);
        assert_eq!(session.alias, "R1");
        assert_eq!(session.creator_id, "c1");
    }
}
