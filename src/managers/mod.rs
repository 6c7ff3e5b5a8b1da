pub mod collection_manager;
pub mod config_manager;
pub mod contract_manager;
pub mod mail_manager;
pub mod penalty_manager;

pub use collection_manager::{
    create_shared_collection_manager, CollectionManager, SharedCollectionManager, SquadView,
};
pub use config_manager::{create_shared_config_manager, ConfigManager, SharedConfigManager};
pub use contract_manager::{
    create_shared_contract_manager, ContractManager, PackInfo, PullOutcome,
    SharedContractManager,
};
pub use mail_manager::{create_shared_mail_manager, ClaimOutcome, MailManager, SharedMailManager};
pub use penalty_manager::{
    create_shared_penalty_manager, PenaltyManager, PenaltyOutcome, SharedPenaltyManager,
};
