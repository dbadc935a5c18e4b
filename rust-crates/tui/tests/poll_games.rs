#![allow(non_snake_case)]

use flip_client::{
    chain::{
        CoinSide,
        GameReader,
        GameRecord,
    },
    error::{
        Error,
        Result,
    },
    poller::{
        PollerCommand,
        PollerEvent,
        TerminalStatus,
        fetch_terminal_games,
        poller_worker,
    },
};
use fuels::types::{
    Address,
    AssetId,
};
use std::{
    collections::HashMap,
    time::Duration,
};
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct ScriptedChain {
    games: HashMap<u64, (GameRecord, Option<u64>)>,
}

impl ScriptedChain {
    fn with(mut self, record: GameRecord, remaining: Option<u64>) -> Self {
        self.games.insert(record.id, (record, remaining));
        self
    }
}

impl GameReader for ScriptedChain {
    async fn game_counter(&self) -> Result<u64> {
        Ok(self.games.keys().max().map(|id| id + 1).unwrap_or(0))
    }

    async fn game(&self, id: u64) -> Result<GameRecord> {
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

fn open_game(id: u64) -> GameRecord {
    GameRecord {
        id,
        player_one: Address::from([1u8; 32]),
        player_two: None,
        asset: AssetId::from([3u8; 32]),
        stake: 1_000_000_000,
        side: CoinSide::Heads,
        winner: None,
        payout: None,
    }
}

fn resolved_game(id: u64) -> GameRecord {
    let winner = Address::from([2u8; 32]);
    GameRecord {
        player_two: Some(winner),
        winner: Some(winner),
        payout: Some(1_900_000_000),
        ..open_game(id)
    }
}

#[tokio::test]
async fn a_full_refresh_cycle_keeps_only_terminal_games() {
    // given: five games where 0, 2 and 4 are terminal
    let chain = ScriptedChain::default()
        .with(resolved_game(0), Some(60))
        .with(open_game(1), Some(3_000))
        .with(open_game(2), Some(0))
        .with(open_game(3), Some(120))
        .with(resolved_game(4), None);

    // when
    let snapshots = fetch_terminal_games(&chain).await.unwrap();

    // then
    let mut ids: Vec<u64> = snapshots.iter().map(|s| s.record.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 2, 4]);
    for snapshot in &snapshots {
        match snapshot.record.id {
            0 => {
                assert_eq!(snapshot.status, TerminalStatus::Resolved);
                assert_eq!(snapshot.remaining_secs, 60);
            }
            2 => {
                assert_eq!(snapshot.status, TerminalStatus::Expired);
                assert_eq!(snapshot.remaining_secs, 0);
            }
            4 => {
                // a missing deadline reads as zero remaining time
                assert_eq!(snapshot.status, TerminalStatus::Resolved);
                assert_eq!(snapshot.remaining_secs, 0);
            }
            other => panic!("unexpected terminal game {other}"),
        }
    }
}

#[tokio::test]
async fn an_expired_game_with_no_deadline_is_still_terminal() {
    // given
    let chain = ScriptedChain::default().with(open_game(0), None);

    // when
    let snapshots = fetch_terminal_games(&chain).await.unwrap();

    // then
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].status, TerminalStatus::Expired);
    assert_eq!(snapshots[0].remaining_secs, 0);
}

#[tokio::test(start_paused = true)]
async fn the_worker_emits_refreshes_until_shut_down() {
    // given
    let chain = ScriptedChain::default()
        .with(resolved_game(0), Some(0))
        .with(open_game(1), Some(99));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(poller_worker(
        Duration::from_secs(10),
        chain,
        cmd_rx,
        event_tx,
    ));

    // when: the startup fetch, one on-demand fetch, then shutdown
    let startup = event_rx.recv().await.unwrap();
    cmd_tx.send(PollerCommand::RefreshNow).unwrap();
    let on_demand = event_rx.recv().await.unwrap();
    cmd_tx.send(PollerCommand::Shutdown).unwrap();
    handle.await.unwrap().unwrap();

    // then: both cycles saw exactly the single terminal game
    for event in [startup, on_demand] {
        match event {
            PollerEvent::Games(games) => {
                assert_eq!(games.len(), 1);
                assert_eq!(games[0].record.id, 0);
            }
            PollerEvent::Failed(message) => panic!("unexpected failure: {message}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_the_command_channel_also_stops_the_worker() {
    // given
    let chain = ScriptedChain::default();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<PollerCommand>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(poller_worker(
        Duration::from_secs(10),
        chain,
        cmd_rx,
        event_tx,
    ));
    let _ = event_rx.recv().await;

    // when
    drop(cmd_tx);

    // then
    handle.await.unwrap().unwrap();
}
