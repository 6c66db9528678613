pub mod bet;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod draw;
pub mod error;
pub mod session;
pub mod store;
pub mod supervisor;

pub use bet::Bet;
pub use config::Config;
pub use coordinator::NotificationSet;
pub use error::ServerError;
pub use store::FileBetStore;
pub use supervisor::Supervisor;
