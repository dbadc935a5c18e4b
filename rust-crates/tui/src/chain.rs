use crate::error::{
    Error,
    Result,
};
use fuels::{
    accounts::wallet::Wallet,
    prelude::{
        Execution,
        TxPolicies,
    },
    types::{
        Address,
        AssetId,
    },
};
use generated_abi::flip_game_types::{
    FlipGame,
    Game,
};
use std::fmt;

/// The side a creator backs. On the wire it is a bool; `true` is heads,
/// matching the web front end this contract originally shipped with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn as_bool(self) -> bool {
        matches!(self, CoinSide::Heads)
    }

    pub fn from_bool(raw: bool) -> Self {
        if raw { CoinSide::Heads } else { CoinSide::Tails }
    }

    pub fn toggled(self) -> Self {
        match self {
            CoinSide::Heads => CoinSide::Tails,
            CoinSide::Tails => CoinSide::Heads,
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoinSide::Heads => "Heads",
            CoinSide::Tails => "Tails",
        };
        write!(f, "{name}")
    }
}

/// One game as the contract reports it. The contract encodes "not set" as a
/// zeroed address / zero payout; those become `None` here so downstream code
/// never compares against sentinels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    pub id: u64,
    pub player_one: Address,
    pub player_two: Option<Address>,
    pub asset: AssetId,
    pub stake: u64,
    pub side: CoinSide,
    pub winner: Option<Address>,
    pub payout: Option<u64>,
}

impl GameRecord {
    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.player_two.is_none() && self.winner.is_none()
    }
}

impl From<Game> for GameRecord {
    fn from(game: Game) -> Self {
        let nonzero = |address: Address| {
            if address == Address::zeroed() {
                None
            } else {
                Some(address)
            }
        };
        GameRecord {
            id: game.id,
            player_one: game.player_one,
            player_two: nonzero(game.player_two),
            asset: game.asset,
            stake: game.stake,
            side: CoinSide::from_bool(game.side),
            winner: nonzero(game.winner),
            payout: (game.payout > 0).then_some(game.payout),
        }
    }
}

/// Read-only view of the contract's game state.
pub trait GameReader {
    fn game_counter(&self) -> impl Future<Output = Result<u64>> + Send;
    fn game(&self, id: u64) -> impl Future<Output = Result<GameRecord>> + Send;
    /// Seconds until the game can be expired. `None` when the contract has
    /// no deadline recorded for the game.
    fn time_left(&self, id: u64) -> impl Future<Output = Result<Option<u64>>> + Send;
}

/// Production reader: read-only `simulate` calls against the deployed
/// contract, never consuming gas or a signature.
#[derive(Clone)]
pub struct ContractGameReader {
    instance: FlipGame<Wallet>,
    script_gas_limit: u64,
}

impl ContractGameReader {
    pub fn new(instance: FlipGame<Wallet>, script_gas_limit: u64) -> Self {
        Self {
            instance,
            script_gas_limit,
        }
    }

    fn policies(&self) -> TxPolicies {
        TxPolicies::default().with_script_gas_limit(self.script_gas_limit)
    }
}

impl GameReader for ContractGameReader {
    async fn game_counter(&self) -> Result<u64> {
        self.instance
            .methods()
            .game_counter()
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await
            .map(|response| response.value)
            .map_err(|e| Error::fetch(format!("game_counter call failed: {e}")))
    }

    async fn game(&self, id: u64) -> Result<GameRecord> {
        self.instance
            .methods()
            .game(id)
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await
            .map(|response| response.value.into())
            .map_err(|e| Error::fetch(format!("game({id}) call failed: {e}")))
    }

    async fn time_left(&self, id: u64) -> Result<Option<u64>> {
        self.instance
            .methods()
            .time_left(id)
            .with_tx_policies(self.policies())
            .simulate(Execution::realistic())
            .await
            .map(|response| response.value)
            .map_err(|e| Error::fetch(format!("time_left({id}) call failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn raw_game(player_two: Address, winner: Address, payout: u64) -> Game {
        Game {
            id: 3,
            player_one: Address::from([1u8; 32]),
            player_two,
            asset: AssetId::from([9u8; 32]),
            stake: 500,
            side: true,
            winner,
            payout,
        }
    }

    #[test]
    fn game_record__zeroed_fields_become_none() {
        // given
        let raw = raw_game(Address::zeroed(), Address::zeroed(), 0);

        // when
        let record = GameRecord::from(raw);

        // then
        assert_eq!(record.player_two, None);
        assert_eq!(record.winner, None);
        assert_eq!(record.payout, None);
        assert!(record.is_open());
        assert!(!record.is_resolved());
    }

    #[test]
    fn game_record__set_fields_survive_conversion() {
        // given
        let joiner = Address::from([2u8; 32]);
        let raw = raw_game(joiner, joiner, 990);

        // when
        let record = GameRecord::from(raw);

        // then
        assert_eq!(record.player_two, Some(joiner));
        assert_eq!(record.winner, Some(joiner));
        assert_eq!(record.payout, Some(990));
        assert_eq!(record.side, CoinSide::Heads);
        assert!(record.is_resolved());
    }
}
