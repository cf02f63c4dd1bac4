//! Event-loop host tests, driven on virtual time.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use memory_match::game::{
    CardStatus, Deck, Difficulty, GameEvent, GameHost, GameSession, ManualScheduler, Phase,
    Rejection, Selection, Timings,
};
use memory_match::records::{KeyValueStore, LeaderboardStore, MemoryStore};
use memory_match::{SessionError, StoreError};

const A: &str = "🍎";
const B: &str = "🍌";
const C: &str = "🍇";
const D: &str = "🍒";

type Host = GameHost<ManualScheduler, Rc<MemoryStore>>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn host_with_store() -> (Host, Rc<MemoryStore>) {
    let store = Rc::new(MemoryStore::new());
    let host = GameHost::new(
        ManualScheduler::new(),
        Some(LeaderboardStore::new(store.clone())),
    )
    .with_seed(5);
    (host, store)
}

fn install_easy(host: &Host) {
    let deck = Deck::from_faces([A, B, A, B, C, D, C, D]);
    host.install(GameSession::with_deck("ada", Difficulty::Easy, deck).unwrap());
}

fn record_events(host: &Host) -> Rc<RefCell<Vec<GameEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    host.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    log
}

fn pairs(host: &Host) -> Vec<(usize, usize)> {
    let snapshot = host.snapshot().unwrap();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::new();
    for (index, card) in snapshot.cards.iter().enumerate() {
        match seen.remove(card.face) {
            Some(first) => out.push((first, index)),
            None => {
                seen.insert(card.face, index);
            }
        }
    }
    out
}

fn status(host: &Host, index: usize) -> CardStatus {
    host.snapshot().unwrap().cards[index].status
}

// =============================================================================
// Settle delays
// =============================================================================

#[test]
fn mismatch_hides_after_the_longer_delay() {
    let (host, _) = host_with_store();
    install_easy(&host);

    host.select(0);
    assert!(matches!(host.select(1), Selection::PairRevealed(_)));
    assert_eq!(host.snapshot().unwrap().move_count, 1);

    host.scheduler().advance(ms(999));
    assert_eq!(status(&host, 0), CardStatus::Revealed);
    assert_eq!(host.select(4), Selection::Rejected(Rejection::BufferFull));

    host.scheduler().advance(ms(1));
    assert_eq!(status(&host, 0), CardStatus::Hidden);
    assert_eq!(status(&host, 1), CardStatus::Hidden);
    assert_eq!(host.snapshot().unwrap().phase, Phase::Playing);
}

#[test]
fn match_settles_after_the_short_delay() {
    let (host, _) = host_with_store();
    install_easy(&host);

    host.select(0);
    host.select(2);
    host.scheduler().advance(ms(499));
    assert_eq!(status(&host, 0), CardStatus::Revealed);
    host.scheduler().advance(ms(1));

    let snapshot = host.snapshot().unwrap();
    assert_eq!(snapshot.cards[0].status, CardStatus::Matched);
    assert_eq!(snapshot.cards[2].status, CardStatus::Matched);
    assert_eq!(snapshot.match_count, 1);
    assert_eq!(snapshot.move_count, 1);
}

#[test]
fn custom_timings_drive_the_delays() {
    let (host, _) = host_with_store();
    let host = host.with_timings(Timings {
        match_settle_ms: 50,
        mismatch_settle_ms: 80,
    });
    install_easy(&host);

    host.select(0);
    host.select(1);
    host.scheduler().advance(ms(80));
    assert_eq!(status(&host, 0), CardStatus::Hidden);
}

#[test]
fn selections_without_a_session_are_ignored() {
    let (host, _) = host_with_store();
    assert_eq!(host.select(0), Selection::Rejected(Rejection::NoSession));
    assert_eq!(host.new_game(), Err(SessionError::NoActiveSession));
    assert!(host.snapshot().is_none());
}

// =============================================================================
// Timer
// =============================================================================

#[test]
fn timer_counts_whole_seconds() {
    let (host, _) = host_with_store();
    host.new_session(Difficulty::Medium, "ada").unwrap();
    host.scheduler().advance(ms(3_900));
    assert_eq!(host.snapshot().unwrap().elapsed_seconds, 3);
}

#[test]
fn timer_freezes_on_win_and_score_is_recorded() {
    let (host, store) = host_with_store();
    let events = record_events(&host);
    host.new_session(Difficulty::Easy, "ada").unwrap();

    host.scheduler().advance(ms(2_000));
    for (a, b) in pairs(&host) {
        host.select(a);
        host.select(b);
        host.scheduler().advance(ms(500));
    }

    let snapshot = host.snapshot().unwrap();
    assert!(snapshot.ended);
    assert_eq!(snapshot.phase, Phase::Won);
    assert_eq!(snapshot.move_count, 4);
    assert_eq!(snapshot.elapsed_seconds, 4);

    host.scheduler().advance(ms(60_000));
    assert_eq!(host.snapshot().unwrap().elapsed_seconds, 4);
    assert_eq!(host.scheduler().pending(), 0);

    let events = events.borrow();
    let wins: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Won(record) => Some(record.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0].elapsed_seconds, 4);
    assert!(matches!(
        events.last(),
        Some(GameEvent::ScoreRecorded { saved: true, .. })
    ));

    let board = LeaderboardStore::new(store);
    let top = board.query(Difficulty::Easy, 50);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].player_name, "ada");
    assert_eq!(top[0].elapsed_seconds, 4);
    assert_eq!(top[0].move_count, 4);
    assert_eq!(host.last_result(), Some(top[0].clone()));
}

// =============================================================================
// Session replacement
// =============================================================================

#[test]
fn superseded_continuations_do_not_touch_the_new_session() {
    let (host, _) = host_with_store();
    install_easy(&host);
    host.scheduler().advance(ms(1_500));
    host.select(0);
    host.select(1);
    host.scheduler().advance(ms(500));

    // Old mismatch settle is due at 2.5s; the new game starts at 2.0s.
    host.new_game().unwrap();
    let fresh = host.snapshot().unwrap();
    assert_eq!(fresh.player_name, "ada");
    assert_eq!(fresh.difficulty, Difficulty::Easy);
    assert_eq!(fresh.move_count, 0);
    assert_eq!(fresh.elapsed_seconds, 0);

    let (a, b) = pairs(&host)[0];
    host.select(a);
    let other = (0..8).find(|&i| i != a && i != b).unwrap();
    host.select(other);

    host.scheduler().advance(ms(999));
    let snapshot = host.snapshot().unwrap();
    assert_eq!(snapshot.cards[a].status, CardStatus::Revealed);
    assert_eq!(snapshot.cards[other].status, CardStatus::Revealed);
    assert_eq!(snapshot.elapsed_seconds, 0);
    assert_eq!(snapshot.move_count, 1);

    host.scheduler().advance(ms(1));
    let snapshot = host.snapshot().unwrap();
    assert_eq!(snapshot.cards[a].status, CardStatus::Hidden);
    assert_eq!(snapshot.elapsed_seconds, 1);
    assert_eq!(host.scheduler().pending(), 1);
}

#[test]
fn invalid_name_keeps_the_current_session() {
    let (host, _) = host_with_store();
    host.new_session(Difficulty::Hard, "ada").unwrap();
    let id = host.game_id();
    assert_eq!(
        host.new_session(Difficulty::Easy, ""),
        Err(SessionError::NameRequired)
    );
    assert_eq!(host.game_id(), id);
    assert_eq!(host.snapshot().unwrap().difficulty, Difficulty::Hard);
}

#[test]
fn listener_may_restart_from_inside_a_notification() {
    let (host, _) = host_with_store();
    let host = Rc::new(host);
    install_easy(&host);

    let restarted = Rc::new(RefCell::new(false));
    let weak = Rc::downgrade(&host);
    let flag = restarted.clone();
    host.subscribe(move |event| {
        if let GameEvent::TimerTicked(2) = event
            && let Some(host) = weak.upgrade()
        {
            host.new_game().unwrap();
            *flag.borrow_mut() = true;
        }
    });

    host.scheduler().advance(ms(2_000));
    assert!(*restarted.borrow());
    assert_eq!(host.snapshot().unwrap().elapsed_seconds, 0);
    host.scheduler().advance(ms(1_000));
    assert_eq!(host.snapshot().unwrap().elapsed_seconds, 1);
}

#[test]
fn listener_may_replace_itself() {
    let (host, _) = host_with_store();
    let host = Rc::new(host);
    install_easy(&host);

    let first_seen = Rc::new(RefCell::new(Vec::new()));
    let second_seen = Rc::new(RefCell::new(Vec::new()));
    let weak = Rc::downgrade(&host);
    let first_sink = first_seen.clone();
    let second_sink = second_seen.clone();
    host.subscribe(move |event| {
        first_sink.borrow_mut().push(event.clone());
        if let Some(host) = weak.upgrade() {
            let sink = second_sink.clone();
            host.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        }
    });

    host.scheduler().advance(ms(3_000));
    assert_eq!(*first_seen.borrow(), vec![GameEvent::TimerTicked(1)]);
    assert_eq!(
        *second_seen.borrow(),
        vec![GameEvent::TimerTicked(2), GameEvent::TimerTicked(3)]
    );
}

#[test]
fn panicking_listener_does_not_silence_later_events() {
    let (host, _) = host_with_store();
    install_easy(&host);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let armed = Rc::new(Cell::new(true));
    let trigger = armed.clone();
    host.subscribe(move |event| {
        if trigger.replace(false) {
            panic!("listener failed");
        }
        sink.borrow_mut().push(event.clone());
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| host.select(0)));
    assert!(outcome.is_err());
    assert!(!armed.get());
    assert_eq!(status(&host, 0), CardStatus::Revealed);

    host.select(1);
    assert_eq!(
        *seen.borrow(),
        vec![GameEvent::CardRevealed { index: 1 }, GameEvent::MovesChanged(1)]
    );
}

// =============================================================================
// Store failures
// =============================================================================

struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Io {
            key: key.to_string(),
            source: std::io::Error::other("quota exceeded"),
        })
    }
}

#[test]
fn failed_write_keeps_the_result_in_memory() {
    let host = GameHost::new(
        ManualScheduler::new(),
        Some(LeaderboardStore::new(BrokenStore)),
    );
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    host.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let deck = Deck::from_faces([A, B, A, B, C, D, C, D]);
    host.install(GameSession::with_deck("ada", Difficulty::Easy, deck).unwrap());
    for (a, b) in [(0, 2), (1, 3), (4, 6), (5, 7)] {
        host.select(a);
        host.select(b);
        host.scheduler().advance(ms(500));
    }

    let result = host.last_result().unwrap();
    assert_eq!(result.move_count, 4);
    assert!(matches!(
        events.borrow().last(),
        Some(GameEvent::ScoreRecorded { saved: false, .. })
    ));
}
