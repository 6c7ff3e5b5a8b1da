pub mod news;
pub mod pack_limits;
pub mod user_data;
pub mod user_store;

pub use news::{NewsItem, NewsPage, NewsStore, NewsType, SharedNewsStore};
pub use pack_limits::{PackLimits, PackStock};
pub use user_data::{
    Balances, ClaimTotals, Mail, MailPayload, RewardBundle, Squad, UserData,
};
pub use user_store::{create_shared_user_store, SharedUserStore, UserStore};
