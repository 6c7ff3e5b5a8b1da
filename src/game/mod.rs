pub mod clock;
pub mod draw;
pub mod penalty;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use draw::{draw_player, draw_rarity, Draw, RarityDrawer};
pub use penalty::{
    Direction, PenaltyPhase, PenaltyState, PenaltyStatus, RewardEvent, ShotResult, START_STEPS,
};
