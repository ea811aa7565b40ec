//! Legal-move-biased random play
//!
//! Used when no engine is available. Prefers captures, then promotions, and
//! otherwise picks uniformly among all legal moves. Answers immediately.

use super::{AiDifficulty, AiMove, AiReply, AiRequest, MoveSearch};
use crate::core::error::AiError;
use crate::oracle::chess::{archetype_of, legal_moves_of, move_endpoints};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use shakmaty::Move;

pub struct RandomMoveSearch {
    rng: StdRng,
    reply: Option<AiReply>,
    difficulty: AiDifficulty,
}

impl Default for RandomMoveSearch {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RandomMoveSearch {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            reply: None,
            difficulty: AiDifficulty::default(),
        }
    }

    fn choose(&mut self, board: &str) -> Result<AiMove, AiError> {
        let (_, moves) = legal_moves_of(board).map_err(|e| AiError::Protocol(e.to_string()))?;

        let captures: Vec<&Move> = moves.iter().filter(|m| m.is_capture()).collect();
        let promotions: Vec<&Move> = moves.iter().filter(|m| m.is_promotion()).collect();
        let everything: Vec<&Move> = moves.iter().collect();

        let pool = [captures, promotions, everything]
            .into_iter()
            .find(|class| !class.is_empty())
            .ok_or(AiError::NoLegalMove)?;
        let chosen = pool.choose(&mut self.rng).ok_or(AiError::NoLegalMove)?;

        let (from, to) = move_endpoints(chosen).ok_or(AiError::NoLegalMove)?;
        Ok(AiMove {
            from,
            to,
            promotion: chosen.promotion().map(archetype_of),
        })
    }
}

impl MoveSearch for RandomMoveSearch {
    fn name(&self) -> &'static str {
        "random"
    }

    fn request_best_move(&mut self, request: AiRequest) {
        let result = self.choose(&request.board);
        match &result {
            Ok(m) => debug!(
                "[AI] Random ({:?}) picked {} -> {}",
                self.difficulty, m.from, m.to
            ),
            Err(e) => warn!("[AI] Random search found nothing: {}", e),
        }
        self.reply = Some(AiReply {
            epoch: request.epoch,
            result,
        });
    }

    fn poll_reply(&mut self) -> Option<AiReply> {
        self.reply.take()
    }

    fn stop(&mut self) {
        self.reply = None;
    }

    fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        self.difficulty = difficulty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardPosition;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn ask(search: &mut RandomMoveSearch, board: &str) -> AiReply {
        search.request_best_move(AiRequest {
            epoch: 4,
            board: board.to_string(),
        });
        search.poll_reply().unwrap()
    }

    #[test]
    fn test_replies_with_legal_move_and_echoes_epoch() {
        let mut search = RandomMoveSearch::new(Some(3));
        let reply = ask(&mut search, START);
        assert_eq!(reply.epoch, 4);
        let m = reply.result.unwrap();
        assert!(m.from.rank() <= 1);
        assert!(search.poll_reply().is_none());
    }

    #[test]
    fn test_prefers_captures() {
        // White can take the d5 pawn with e4; every other move is quiet.
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        let mut search = RandomMoveSearch::new(Some(11));
        for _ in 0..10 {
            let m = ask(&mut search, fen).result.unwrap();
            assert_eq!(m.to, BoardPosition::from_algebraic("d5").unwrap());
        }
    }

    #[test]
    fn test_no_legal_move_and_bad_board() {
        let mut search = RandomMoveSearch::new(Some(1));
        let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        assert_eq!(ask(&mut search, mated).result, Err(AiError::NoLegalMove));
        assert!(matches!(
            ask(&mut search, "garbage").result,
            Err(AiError::Protocol(_))
        ));
    }

    #[test]
    fn test_stop_discards_reply() {
        let mut search = RandomMoveSearch::new(Some(1));
        search.request_best_move(AiRequest {
            epoch: 0,
            board: START.to_string(),
        });
        search.stop();
        assert!(search.poll_reply().is_none());
    }
}
