//! Engine with a random-move safety net
//!
//! The primary search is chosen once, when the table is built. If it ever
//! answers with an error, or with a move that is not legal in the position it
//! was asked about, this switches to [`RandomMoveSearch`] for the rest of the
//! session and re-issues the request that failed. The orchestrator never
//! learns which implementation answered.

use super::{AiDifficulty, AiMove, AiReply, AiRequest, MoveSearch, RandomMoveSearch};
use crate::core::error::AiError;
use crate::oracle::chess::{legal_moves_of, move_endpoints};
use bevy::prelude::*;
use std::path::Path;

/// Checks `choice` against the legal moves of the FEN `board`.
fn check_legal(board: &str, choice: &AiMove) -> Result<(), AiError> {
    let (_, moves) = legal_moves_of(board).map_err(|e| AiError::Protocol(e.to_string()))?;
    let wanted = Some((choice.from, choice.to));
    if moves.iter().any(|m| move_endpoints(m) == wanted) {
        Ok(())
    } else {
        Err(AiError::IllegalMove {
            from: choice.from,
            to: choice.to,
        })
    }
}

pub struct ResilientSearch {
    primary: Option<Box<dyn MoveSearch>>,
    fallback: RandomMoveSearch,
    pending: Option<AiRequest>,
}

impl ResilientSearch {
    pub fn new(primary: Option<Box<dyn MoveSearch>>, fallback: RandomMoveSearch) -> Self {
        Self {
            primary,
            fallback,
            pending: None,
        }
    }

    /// Tries to launch the engine at `engine_path`; without a path, or when
    /// the launch fails, plays randomly from the start.
    pub fn from_engine_path(
        engine_path: Option<&Path>,
        difficulty: AiDifficulty,
        seed: Option<u64>,
    ) -> Self {
        let mut fallback = RandomMoveSearch::new(seed);
        fallback.set_difficulty(difficulty);
        let primary = engine_path.and_then(|path| Self::launch(path, difficulty));
        Self::new(primary, fallback)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn launch(path: &Path, difficulty: AiDifficulty) -> Option<Box<dyn MoveSearch>> {
        match super::UciEngine::spawn(path, difficulty) {
            Ok(engine) => Some(Box::new(engine)),
            Err(e) => {
                warn!("[AI] Engine unavailable, using random moves: {}", e);
                None
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn launch(_path: &Path, _difficulty: AiDifficulty) -> Option<Box<dyn MoveSearch>> {
        warn!("[AI] External engines are not supported on this platform");
        None
    }

    pub fn is_using_fallback(&self) -> bool {
        self.primary.is_none()
    }
}

impl MoveSearch for ResilientSearch {
    fn name(&self) -> &'static str {
        match &self.primary {
            Some(primary) => primary.name(),
            None => self.fallback.name(),
        }
    }

    fn request_best_move(&mut self, request: AiRequest) {
        self.pending = Some(request.clone());
        match self.primary.as_mut() {
            Some(primary) => primary.request_best_move(request),
            None => self.fallback.request_best_move(request),
        }
    }

    fn poll_reply(&mut self) -> Option<AiReply> {
        if let Some(primary) = self.primary.as_mut() {
            let reply = primary.poll_reply()?;
            let verdict = match (&reply.result, self.pending.as_ref()) {
                (Ok(choice), Some(request)) if request.epoch == reply.epoch => {
                    check_legal(&request.board, choice)
                }
                (Ok(_), _) => Ok(()),
                (Err(e), _) => Err(e.clone()),
            };
            match verdict {
                Ok(()) => {
                    self.pending = None;
                    return Some(reply);
                }
                Err(e) => {
                    warn!(
                        "[AI] {} failed ({}); switching to random moves for this session",
                        primary.name(),
                        e
                    );
                    primary.stop();
                    self.primary = None;
                    match self.pending.take() {
                        Some(request) => self.fallback.request_best_move(request),
                        None => return None,
                    }
                }
            }
        }
        let reply = self.fallback.poll_reply();
        if reply.is_some() {
            self.pending = None;
        }
        reply
    }

    fn stop(&mut self) {
        self.pending = None;
        if let Some(primary) = self.primary.as_mut() {
            primary.stop();
        }
        self.fallback.stop();
    }

    fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        if let Some(primary) = self.primary.as_mut() {
            primary.set_difficulty(difficulty);
        }
        self.fallback.set_difficulty(difficulty);
    }
}
