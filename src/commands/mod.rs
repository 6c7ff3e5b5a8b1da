pub mod collection;
pub mod contract;
pub mod general;
pub mod news;
pub mod penalty;

pub use collection::remove_player;
pub use contract::{contract, contract_info};
pub use general::{balance, help, ping};
pub use news::{managenews, news};
pub use penalty::penalty;
