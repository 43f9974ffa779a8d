pub mod credentials;
pub mod finalize;
pub mod identity;
pub mod intake;
pub mod listing;
