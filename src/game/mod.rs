pub mod deck;
#[cfg(feature = "glib")]
pub mod glib_scheduler;
pub mod host;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod timing;

pub use deck::{Deck, FACE_CATALOG};
#[cfg(feature = "glib")]
pub use glib_scheduler::GlibScheduler;
pub use host::GameHost;
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle};
pub use session::{
    FinishedGame, GameEvent, GameSession, PendingPair, Rejection, Resolution, Selection, Settled,
    Snapshot,
};
pub use state::{Card, CardStatus, CardView, Difficulty, Phase};
pub use timing::Timings;
