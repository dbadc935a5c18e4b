pub mod chain;
pub mod client;
pub mod error;
pub mod indexer_client;
pub mod poller;
pub mod presenter;
pub mod tokens;
pub mod ui;
pub mod units;
pub mod wallets;

pub use error::{
    Error,
    Result,
};
pub use generated_abi::flip_game_types;
