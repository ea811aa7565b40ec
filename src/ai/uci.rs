//! External engine over the UCI protocol
//!
//! The engine runs as a child process. A reader thread forwards its stdout
//! line by line into a channel, and each search runs as a task on Bevy's
//! `AsyncComputeTaskPool` so the frame loop never blocks on the engine.
//!
//! ```text
//! spawn : uci -> uciok, setoption Skill Level, isready -> readyok
//! search: isready -> readyok, position fen <fen>, go movetime <ms> -> bestmove <move>
//! stop  : stop (the task is dropped; its bestmove is swallowed by the next sync)
//! ```
//!
//! Every search starts with an `isready` round trip and discards whatever
//! arrives before `readyok`, so a late `bestmove` from an abandoned search can
//! never be mistaken for the answer to a new one.

use super::{parse_uci_move, AiDifficulty, AiMove, AiReply, AiRequest, MoveSearch};
use crate::core::error::AiError;
use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task, TaskPool};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use futures_lite::future;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long the engine gets to answer handshake commands
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack on top of the requested think time before a search counts as hung
const SEARCH_GRACE: Duration = Duration::from_secs(5);

type SharedStdin = Arc<Mutex<ChildStdin>>;
type SharedLines = Arc<Mutex<Receiver<String>>>;

/// A running UCI engine process
pub struct UciEngine {
    child: Child,
    stdin: SharedStdin,
    lines: SharedLines,
    task: Option<Task<AiReply>>,
    difficulty: AiDifficulty,
}

impl UciEngine {
    /// Launches the engine at `path` and completes the UCI handshake.
    pub fn spawn(path: impl AsRef<OsStr>, difficulty: AiDifficulty) -> Result<Self, AiError> {
        Self::spawn_with_args(path, std::iter::empty::<&OsStr>(), difficulty)
    }

    pub fn spawn_with_args<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        difficulty: AiDifficulty,
    ) -> Result<Self, AiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let spawn_error = |reason: String| AiError::Spawn {
            path: program.to_string_lossy().into_owned(),
            reason,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("no stdout".to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| spawn_error(e.to_string()))?;

        let mut engine = Self {
            child,
            stdin: Arc::new(Mutex::new(stdin)),
            lines: Arc::new(Mutex::new(rx)),
            task: None,
            difficulty,
        };
        engine.handshake()?;
        info!(
            "[AI] UCI engine '{}' ready ({:?})",
            program.to_string_lossy(),
            difficulty
        );
        Ok(engine)
    }

    fn handshake(&mut self) -> Result<(), AiError> {
        let lines = lock(&self.lines)?;
        send(&self.stdin, "uci")?;
        wait_for(&lines, "uciok", HANDSHAKE_TIMEOUT, "uci")?;
        send(
            &self.stdin,
            &format!(
                "setoption name Skill Level value {}",
                self.difficulty.skill_level()
            ),
        )?;
        send(&self.stdin, "isready")?;
        wait_for(&lines, "readyok", HANDSHAKE_TIMEOUT, "isready")
    }

    pub fn is_searching(&self) -> bool {
        self.task.is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, AiError> {
    mutex
        .lock()
        .map_err(|_| AiError::Protocol("engine session lock poisoned".to_string()))
}

fn send(stdin: &SharedStdin, command: &str) -> Result<(), AiError> {
    let mut stdin = lock(stdin)?;
    writeln!(stdin, "{command}").map_err(|_| AiError::ProcessGone)?;
    stdin.flush().map_err(|_| AiError::ProcessGone)
}

/// Reads lines until one equals `token`, discarding everything before it.
fn wait_for(
    lines: &Receiver<String>,
    token: &str,
    timeout: Duration,
    command: &'static str,
) -> Result<(), AiError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(remaining) {
            Ok(line) if line.trim() == token => return Ok(()),
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => return Err(AiError::Timeout(command)),
            Err(RecvTimeoutError::Disconnected) => return Err(AiError::ProcessGone),
        }
    }
}

fn run_search(
    stdin: &SharedStdin,
    lines: &SharedLines,
    board: &str,
    movetime_ms: u64,
) -> Result<AiMove, AiError> {
    let lines = lock(lines)?;
    send(stdin, "isready")?;
    wait_for(&lines, "readyok", HANDSHAKE_TIMEOUT, "isready")?;
    send(stdin, &format!("position fen {board}"))?;
    send(stdin, &format!("go movetime {movetime_ms}"))?;

    let deadline = Instant::now() + Duration::from_millis(movetime_ms) + SEARCH_GRACE;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let line = match lines.recv_timeout(remaining) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => return Err(AiError::Timeout("go")),
            Err(RecvTimeoutError::Disconnected) => return Err(AiError::ProcessGone),
        };
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("bestmove") {
            continue;
        }
        return match tokens.next() {
            Some("(none)") | None => Err(AiError::NoLegalMove),
            Some(text) => parse_uci_move(text)
                .ok_or_else(|| AiError::Protocol(format!("unparseable bestmove '{text}'"))),
        };
    }
}

impl MoveSearch for UciEngine {
    fn name(&self) -> &'static str {
        "uci"
    }

    fn request_best_move(&mut self, request: AiRequest) {
        if self.task.is_some() {
            self.stop();
        }
        let stdin = Arc::clone(&self.stdin);
        let lines = Arc::clone(&self.lines);
        let movetime = self.difficulty.movetime_ms();
        let AiRequest { epoch, board } = request;

        debug!("[AI] UCI search #{} for {} ms", epoch, movetime);
        let pool = AsyncComputeTaskPool::get_or_init(TaskPool::new);
        self.task = Some(pool.spawn(async move {
            AiReply {
                epoch,
                result: run_search(&stdin, &lines, &board, movetime),
            }
        }));
    }

    fn poll_reply(&mut self) -> Option<AiReply> {
        let task = self.task.as_mut()?;
        if !task.is_finished() {
            return None;
        }
        let reply = block_on(future::poll_once(task));
        self.task = None;
        if reply.is_none() {
            warn!("[AI] Task reported finished but result not available");
        }
        reply
    }

    fn stop(&mut self) {
        if self.task.take().is_some() {
            debug!("[AI] Stopping UCI search");
            if let Err(e) = send(&self.stdin, "stop") {
                warn!("[AI] Failed to send stop: {}", e);
            }
        }
    }

    fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        self.difficulty = difficulty;
        let command = format!(
            "setoption name Skill Level value {}",
            difficulty.skill_level()
        );
        if let Err(e) = send(&self.stdin, &command) {
            warn!("[AI] Failed to set difficulty: {}", e);
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = send(&self.stdin, "quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const FAKE_ENGINE: &str = r#"
while read line; do
  case "$line" in
    uci) echo "id name fake"; echo "uciok";;
    isready) echo "readyok";;
    go*) echo "info depth 1"; echo "bestmove g1f3";;
    quit) exit 0;;
  esac
done
"#;

    fn fake_engine() -> (tempfile::TempDir, UciEngine) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("engine.sh");
        std::fs::write(&script, FAKE_ENGINE).unwrap();
        let engine = UciEngine::spawn_with_args("sh", [&script], AiDifficulty::Easy).unwrap();
        (dir, engine)
    }

    fn wait_reply(engine: &mut UciEngine) -> AiReply {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(reply) = engine.poll_reply() {
                return reply;
            }
            assert!(Instant::now() < deadline, "engine never answered");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_missing_binary_fails_to_spawn() {
        let result = UciEngine::spawn("/definitely/not/an/engine", AiDifficulty::Easy);
        assert!(matches!(result, Err(AiError::Spawn { .. })));
    }

    #[test]
    fn test_search_round_trip() {
        let (_dir, mut engine) = fake_engine();
        engine.request_best_move(AiRequest {
            epoch: 9,
            board: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string(),
        });
        assert!(engine.is_searching());
        let reply = wait_reply(&mut engine);
        assert_eq!(reply.epoch, 9);
        let m = reply.result.unwrap();
        assert_eq!(m.from.to_string(), "g1");
        assert_eq!(m.to.to_string(), "f3");
        assert!(!engine.is_searching());
    }

    #[test]
    fn test_stop_then_search_again() {
        let (_dir, mut engine) = fake_engine();
        let board = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string();
        engine.request_best_move(AiRequest {
            epoch: 1,
            board: board.clone(),
        });
        engine.stop();
        assert!(engine.poll_reply().is_none());

        engine.request_best_move(AiRequest { epoch: 2, board });
        assert_eq!(wait_reply(&mut engine).epoch, 2);
    }
}
