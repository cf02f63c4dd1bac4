use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::scheduler::Scheduler;
use super::session::{
    FinishedGame, GameEvent, GameSession, PendingPair, Rejection, Selection, Settled, Snapshot,
};
use super::state::Difficulty;
use super::timing::{TICK, Timings};
use crate::error::SessionError;
use crate::records::{KeyValueStore, LeaderboardStore, ScoreEntry};

type Listener = Box<dyn FnMut(&GameEvent)>;

#[derive(Default)]
struct Slot {
    game_id: u64,
    session: Option<GameSession>,
    last_result: Option<ScoreEntry>,
}

struct Shared<K> {
    leaderboard: Option<LeaderboardStore<K>>,
    listener: RefCell<Option<Listener>>,
    queue: RefCell<VecDeque<GameEvent>>,
    dispatching: Cell<bool>,
}

impl<K: KeyValueStore> Shared<K> {
    fn push(&self, events: Vec<GameEvent>) {
        self.queue.borrow_mut().extend(events);
    }

    /// Delivers queued events in order. Events raised by the listener itself
    /// are appended and delivered by the outermost call.
    fn flush(&self) {
        if self.dispatching.replace(true) {
            return;
        }
        let _dispatching = ResetOnDrop(&self.dispatching);
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            let taken = self.listener.borrow_mut().take();
            if let Some(listener) = taken {
                let mut running = RunningListener {
                    cell: &self.listener,
                    listener: Some(listener),
                };
                if let Some(listener) = running.listener.as_mut() {
                    listener(&event);
                }
            }
        }
    }

    fn record_win(&self, record: &FinishedGame) -> (ScoreEntry, bool) {
        let entry = ScoreEntry::from_finished(record, Utc::now());
        let saved = match &self.leaderboard {
            Some(board) => board.submit(entry.clone()),
            None => false,
        };
        info!(
            player = %entry.player_name,
            difficulty = %entry.difficulty,
            seconds = entry.elapsed_seconds,
            moves = entry.move_count,
            saved,
            "game won"
        );
        (entry, saved)
    }
}

/// Clears the dispatch flag even when a listener panics.
struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A listener taken out of its cell while it runs, so it can call
/// `subscribe`. Put back afterwards unless a replacement was installed.
struct RunningListener<'a> {
    cell: &'a RefCell<Option<Listener>>,
    listener: Option<Listener>,
}

impl Drop for RunningListener<'_> {
    fn drop(&mut self) {
        let mut slot = self.cell.borrow_mut();
        if slot.is_none() {
            *slot = self.listener.take();
        }
    }
}

/// Owns the current session on a single-threaded event loop: schedules settle
/// delays and the one-second timer, and forwards wins to the leaderboard.
pub struct GameHost<S, K> {
    scheduler: S,
    timings: Timings,
    rng: RefCell<StdRng>,
    slot: Rc<RefCell<Slot>>,
    shared: Rc<Shared<K>>,
}

impl<S, K> GameHost<S, K>
where
    S: Scheduler,
    K: KeyValueStore + 'static,
{
    pub fn new(scheduler: S, leaderboard: Option<LeaderboardStore<K>>) -> Self {
        GameHost {
            scheduler,
            timings: Timings::default(),
            rng: RefCell::new(StdRng::from_rng(&mut rand::rng())),
            slot: Rc::new(RefCell::new(Slot::default())),
            shared: Rc::new(Shared {
                leaderboard,
                listener: RefCell::new(None),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Reproducible deck shuffles.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.borrow_mut() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn leaderboard(&self) -> Option<&LeaderboardStore<K>> {
        self.shared.leaderboard.as_ref()
    }

    pub fn subscribe(&self, listener: impl FnMut(&GameEvent) + 'static) {
        *self.shared.listener.borrow_mut() = Some(Box::new(listener));
    }

    pub fn new_session(
        &self,
        difficulty: Difficulty,
        player_name: &str,
    ) -> Result<(), SessionError> {
        let session = {
            let mut rng = self.rng.borrow_mut();
            GameSession::new(player_name, difficulty, &mut *rng)?
        };
        self.install(session);
        Ok(())
    }

    /// Replaces the current session with a fresh deck for the same player and difficulty.
    pub fn new_game(&self) -> Result<(), SessionError> {
        let (player_name, difficulty) = {
            let slot = self.slot.borrow();
            let session = slot.session.as_ref().ok_or(SessionError::NoActiveSession)?;
            (session.player_name().to_string(), session.difficulty())
        };
        self.new_session(difficulty, &player_name)
    }

    /// Installs a prepared session, discarding the current one.
    pub fn install(&self, session: GameSession) {
        let game_id = {
            let mut slot = self.slot.borrow_mut();
            // Dropping the old session cancels its timer and pending settle.
            slot.session = None;
            slot.game_id = slot.game_id.wrapping_add(1);
            slot.session = Some(session);
            slot.game_id
        };
        debug!(game_id, "session installed");

        let slot = self.slot.clone();
        let shared = self.shared.clone();
        let timer = self.scheduler.schedule_repeating(
            TICK,
            Box::new(move || {
                {
                    let mut st = slot.borrow_mut();
                    if st.game_id != game_id {
                        return;
                    }
                    let Some(session) = st.session.as_mut() else {
                        return;
                    };
                    if session.tick() {
                        shared.push(session.take_events());
                    }
                }
                shared.flush();
            }),
        );

        let mut slot = self.slot.borrow_mut();
        let current = slot.game_id;
        match slot.session.as_mut() {
            Some(session) if current == game_id => session.attach_timer(timer),
            _ => timer.cancel(),
        }
    }

    pub fn select(&self, index: usize) -> Selection {
        let (selection, game_id) = {
            let mut slot = self.slot.borrow_mut();
            let game_id = slot.game_id;
            let Some(session) = slot.session.as_mut() else {
                return Selection::Rejected(Rejection::NoSession);
            };
            let selection = session.select(index);
            self.shared.push(session.take_events());
            (selection, game_id)
        };

        if let Selection::PairRevealed(pending) = selection {
            self.schedule_settle(game_id, pending);
        }
        self.shared.flush();
        selection
    }

    fn schedule_settle(&self, game_id: u64, pending: PendingPair) {
        let delay = self.timings.settle_delay(pending.resolution);
        let slot = self.slot.clone();
        let shared = self.shared.clone();
        let handle = self.scheduler.schedule_once(
            delay,
            Box::new(move || {
                let won = {
                    let mut st = slot.borrow_mut();
                    if st.game_id != game_id {
                        return;
                    }
                    let Some(session) = st.session.as_mut() else {
                        return;
                    };
                    let settled = session.settle();
                    shared.push(session.take_events());
                    match settled {
                        Some(Settled::Won(_, record)) => Some(record),
                        _ => None,
                    }
                };

                if let Some(record) = won {
                    let (entry, saved) = shared.record_win(&record);
                    slot.borrow_mut().last_result = Some(entry.clone());
                    shared.push(vec![GameEvent::ScoreRecorded { entry, saved }]);
                }
                shared.flush();
            }),
        );

        let mut slot = self.slot.borrow_mut();
        let current = slot.game_id;
        match slot.session.as_mut() {
            Some(session) if current == game_id => session.attach_settle_task(handle),
            _ => handle.cancel(),
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.slot.borrow().session.as_ref().map(GameSession::snapshot)
    }

    pub fn has_session(&self) -> bool {
        self.slot.borrow().session.is_some()
    }

    pub fn game_id(&self) -> u64 {
        self.slot.borrow().game_id
    }

    /// Latest won game, kept even when storing it failed.
    pub fn last_result(&self) -> Option<ScoreEntry> {
        self.slot.borrow().last_result.clone()
    }
}
