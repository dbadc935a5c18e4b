use crate::{
    chain::{
        GameReader,
        GameRecord,
    },
    error::Result,
};
use color_eyre::eyre::eyre;
use futures::future::{
    try_join,
    try_join_all,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};
use tracing::warn;

/// Message shown when a refresh cycle fails. One generic line; the specific
/// cause goes to the log.
pub const REFRESH_FAILED: &str = "Failed to fetch game states";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalStatus {
    Resolved,
    Expired,
}

/// A finished game: resolved, or past its deadline with nobody resolving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    pub record: GameRecord,
    pub remaining_secs: u64,
    pub status: TerminalStatus,
}

/// Classify one game. Returns `None` for games that are still active.
///
/// A game with no recorded deadline is treated as already expired with zero
/// remaining time, matching the contract's current reporting.
pub fn classify(record: GameRecord, remaining: Option<u64>) -> Option<GameSnapshot> {
    if record.is_resolved() {
        return Some(GameSnapshot {
            record,
            remaining_secs: remaining.unwrap_or(0),
            status: TerminalStatus::Resolved,
        });
    }
    match remaining {
        None | Some(0) => Some(GameSnapshot {
            record,
            remaining_secs: 0,
            status: TerminalStatus::Expired,
        }),
        Some(_) => None,
    }
}

/// One refresh cycle: walk the whole id space, fetch record and remaining
/// time concurrently per game, keep the terminal ones. Any single fetch
/// failure fails the cycle; partial results are discarded, not merged.
pub async fn fetch_terminal_games<R: GameReader>(
    reader: &R,
) -> Result<Vec<GameSnapshot>> {
    let counter = reader.game_counter().await?;
    let fetches = (0..counter)
        .map(|id| async move { try_join(reader.game(id), reader.time_left(id)).await });
    let games = try_join_all(fetches).await?;
    Ok(games
        .into_iter()
        .filter_map(|(record, remaining)| classify(record, remaining))
        .collect())
}

pub enum PollerCommand {
    RefreshNow,
    Shutdown,
}

pub enum PollerEvent {
    Games(Vec<GameSnapshot>),
    Failed(String),
}

/// Background refresh task. Fetches once immediately, then on every interval
/// tick, then on demand for `RefreshNow`. Ends on `Shutdown` or when either
/// channel closes, so a departing consumer cannot leave an orphaned timer.
pub async fn poller_worker<R: GameReader>(
    poll_interval: Duration,
    reader: R,
    mut cmd_rx: mpsc::UnboundedReceiver<PollerCommand>,
    event_tx: mpsc::UnboundedSender<PollerEvent>,
) -> color_eyre::Result<()> {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&reader, &event_tx).await?;
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(PollerCommand::RefreshNow) => {
                        run_cycle(&reader, &event_tx).await?;
                    }
                    Some(PollerCommand::Shutdown) | None => break,
                }
            }
        }
    }
    Ok(())
}

async fn run_cycle<R: GameReader>(
    reader: &R,
    event_tx: &mpsc::UnboundedSender<PollerEvent>,
) -> color_eyre::Result<()> {
    let event = match fetch_terminal_games(reader).await {
        Ok(games) => PollerEvent::Games(games),
        Err(err) => {
            warn!(%err, "game state refresh failed");
            PollerEvent::Failed(REFRESH_FAILED.to_string())
        }
    };
    event_tx
        .send(event)
        .map_err(|_| eyre!("poller event receiver dropped"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        chain::CoinSide,
        error::Error,
    };
    use fuels::types::{
        Address,
        AssetId,
    };
    use std::collections::HashMap;

    #[derive(Clone, Default)]
    struct FakeChain {
        games: HashMap<u64, (GameRecord, Option<u64>)>,
        fail_on: Option<u64>,
    }

    impl FakeChain {
        fn with_game(mut self, record: GameRecord, remaining: Option<u64>) -> Self {
            self.games.insert(record.id, (record, remaining));
            self
        }
    }

    impl GameReader for FakeChain {
        async fn game_counter(&self) -> Result<u64> {
            Ok(self.games.keys().max().map(|id| id + 1).unwrap_or(0))
        }

        async fn game(&self, id: u64) -> Result<GameRecord> {
            if self.fail_on == Some(id) {
                return Err(Error::fetch(format!("game({id}) exploded")));
            }
            self.games
                .get(&id)
                .map(|(record, _)| record.clone())
                .ok_or_else(|| Error::fetch(format!("unknown game {id}")))
        }

        async fn time_left(&self, id: u64) -> Result<Option<u64>> {
            self.games
                .get(&id)
                .map(|(_, remaining)| *remaining)
                .ok_or_else(|| Error::fetch(format!("unknown game {id}")))
        }
    }

    fn game(id: u64, winner: Option<Address>) -> GameRecord {
        GameRecord {
            id,
            player_one: Address::from([1u8; 32]),
            player_two: winner,
            asset: AssetId::from([7u8; 32]),
            stake: 100,
            side: CoinSide::Tails,
            winner,
            payout: winner.map(|_| 190),
        }
    }

    fn winner() -> Option<Address> {
        Some(Address::from([2u8; 32]))
    }

    #[tokio::test]
    async fn fetch_terminal_games__emits_exactly_the_terminal_ids() {
        // given: games 0, 2, 4 terminal; 1 and 3 active
        let chain = FakeChain::default()
            .with_game(game(0, winner()), Some(120))
            .with_game(game(1, None), Some(500))
            .with_game(game(2, None), Some(0))
            .with_game(game(3, None), Some(42))
            .with_game(game(4, winner()), Some(0));

        // when
        let snapshots = fetch_terminal_games(&chain).await.unwrap();

        // then
        let mut ids: Vec<u64> = snapshots.iter().map(|s| s.record.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2, 4]);
        let by_id = |wanted: u64| {
            snapshots
                .iter()
                .find(|s| s.record.id == wanted)
                .unwrap()
                .clone()
        };
        assert_eq!(by_id(0).remaining_secs, 120);
        assert_eq!(by_id(0).status, TerminalStatus::Resolved);
        assert_eq!(by_id(2).status, TerminalStatus::Expired);
        assert_eq!(by_id(4).status, TerminalStatus::Resolved);
    }

    #[tokio::test]
    async fn fetch_terminal_games__missing_deadline_counts_as_expired_now() {
        // given
        let chain = FakeChain::default().with_game(game(0, None), None);

        // when
        let snapshots = fetch_terminal_games(&chain).await.unwrap();

        // then
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].remaining_secs, 0);
        assert_eq!(snapshots[0].status, TerminalStatus::Expired);
    }

    #[tokio::test]
    async fn fetch_terminal_games__one_failure_discards_the_whole_cycle() {
        // given
        let chain = FakeChain::default()
            .with_game(game(0, winner()), Some(0))
            .with_game(game(1, None), Some(10))
            .with_game(game(2, winner()), Some(0));
        let chain = FakeChain {
            fail_on: Some(1),
            ..chain
        };

        // when
        let result = fetch_terminal_games(&chain).await;

        // then
        assert!(result.unwrap_err().is_fetch());
    }

    #[tokio::test]
    async fn fetch_terminal_games__empty_counter_yields_no_games() {
        let chain = FakeChain::default();
        assert!(fetch_terminal_games(&chain).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poller_worker__fetches_on_start_and_stops_on_shutdown() {
        // given
        let chain = FakeChain::default().with_game(game(0, winner()), Some(0));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(poller_worker(
            Duration::from_secs(10),
            chain,
            cmd_rx,
            event_tx,
        ));

        // when
        let first = event_rx.recv().await.unwrap();
        cmd_tx.send(PollerCommand::Shutdown).unwrap();

        // then
        assert!(matches!(first, PollerEvent::Games(games) if games.len() == 1));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poller_worker__surfaces_one_generic_error_per_failed_cycle() {
        // given
        let chain = FakeChain::default().with_game(game(0, winner()), Some(0));
        let chain = FakeChain {
            fail_on: Some(0),
            ..chain
        };
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(poller_worker(
            Duration::from_secs(10),
            chain,
            cmd_rx,
            event_tx,
        ));

        // when
        let first = event_rx.recv().await.unwrap();
        cmd_tx.send(PollerCommand::Shutdown).unwrap();
        handle.await.unwrap().unwrap();

        // then
        assert!(matches!(first, PollerEvent::Failed(msg) if msg == REFRESH_FAILED));
    }
}
