use fuels::{
    accounts::wallet::Wallet,
    macros::abigen,
    types::ContractId,
};

pub mod flip_game_types {
    use super::*;

    abigen!(Contract(
        name = "FlipGame",
        abi = "sway-projects/flip-game/out/release/flip-game-abi.json"
    ));
}

/// Path of the ABI artifact the bindings above were generated from, relative
/// to the repository root. The deployments crate hashes this file so a client
/// refuses to talk to a contract deployed from a different interface.
pub const FLIP_GAME_ABI_PATH: &str =
    "sway-projects/flip-game/out/release/flip-game-abi.json";

/// Bind an already-deployed flip game contract to a wallet.
pub fn flip_game_instance(
    id: ContractId,
    wallet: Wallet,
) -> flip_game_types::FlipGame<Wallet> {
    flip_game_types::FlipGame::new(id, wallet)
}
