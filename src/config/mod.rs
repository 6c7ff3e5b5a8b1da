pub mod catalog;
pub mod packs;
pub mod rarity;
pub mod settings;

pub use catalog::{Player, PlayerCatalog};
pub use packs::{Currency, Pack, PacksConfig, RarityChances};
pub use rarity::Rarity;
pub use settings::Settings;
