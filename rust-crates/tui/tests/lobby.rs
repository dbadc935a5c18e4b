#![allow(non_snake_case)]

use flip_client::{
    client::{
        GameAction,
        InFlightTracker,
        MIN_TIMEOUT_SECS,
        validate_stake,
        validate_timeout,
    },
    presenter::{
        GAMES_PAGE_SIZE,
        LEADERBOARD_LIMIT,
        PlayerRanking,
        paginate,
        rank_players,
        sort_games_desc,
    },
    tokens,
};

fn game_ids(count: u64) -> Vec<u64> {
    // deliberately shuffled: the indexer's order is not our contract
    let mut ids: Vec<u64> = (0..count).collect();
    ids.reverse();
    ids.swap(0, count as usize / 2);
    ids
}

#[test]
fn the_lobby_pages_through_twelve_games_five_at_a_time() {
    // given
    let mut games = game_ids(12);
    sort_games_desc(&mut games, |id| *id);

    // when
    let page_one = paginate(&games, 1, GAMES_PAGE_SIZE);
    let page_two = paginate(&games, 2, GAMES_PAGE_SIZE);
    let page_three = paginate(&games, 3, GAMES_PAGE_SIZE);

    // then
    assert_eq!(page_one.items, vec![11, 10, 9, 8, 7]);
    assert_eq!(page_two.items, vec![6, 5, 4, 3, 2]);
    assert_eq!(page_three.items, vec![1, 0]);
    assert!(page_one.has_next());
    assert!(!page_three.has_next());
    assert!(!page_one.has_prev());

    // and navigation past the end clamps instead of blanking the table
    let beyond = paginate(&games, 9, GAMES_PAGE_SIZE);
    assert_eq!(beyond.page, 3);
    assert_eq!(beyond.items, vec![1, 0]);
}

#[test]
fn the_leaderboard_reorders_whatever_the_service_sent() {
    // given: service order is ascending and has a duplicate player
    let entries = vec![
        PlayerRanking {
            player: "0xaaa".into(),
            amount: "100".into(),
        },
        PlayerRanking {
            player: "0xbbb".into(),
            amount: "2000".into(),
        },
        PlayerRanking {
            player: "0xaaa".into(),
            amount: "999999".into(),
        },
        PlayerRanking {
            player: "0xccc".into(),
            amount: "30".into(),
        },
    ];

    // when
    let ranked = rank_players(entries, LEADERBOARD_LIMIT);

    // then: descending, one row per player, first occurrence wins
    let players: Vec<&str> = ranked.iter().map(|e| e.player.as_str()).collect();
    assert_eq!(players, vec!["0xbbb", "0xaaa", "0xccc"]);
}

#[test]
fn create_preconditions_fail_before_any_network_use() {
    // given
    let token = tokens::token_by_ticker("STABLEAI").unwrap();

    // when / then: these checks run on plain values, no wallet, no provider
    assert!(validate_stake("0", token).unwrap_err().is_validation());
    assert!(validate_stake("-3", token).unwrap_err().is_validation());
    assert!(validate_timeout(MIN_TIMEOUT_SECS - 1).unwrap_err().is_validation());
    assert!(validate_stake("1.5", token).is_ok());
    assert!(validate_timeout(3_600).is_ok());
}

#[test]
fn the_in_flight_guard_blocks_double_submits_per_game_only() {
    // given
    let mut tracker = InFlightTracker::default();

    // when: a join for game 3 is pending
    tracker.begin(3, GameAction::Join).unwrap();

    // then: the same control is locked, everything else still works
    assert!(tracker.is_busy(3, GameAction::Join));
    assert!(tracker.begin(3, GameAction::Join).unwrap_err().is_validation());
    assert!(tracker.begin(4, GameAction::Join).is_ok());
    assert!(tracker.begin(3, GameAction::Claim).is_ok());

    // and settling releases the control
    tracker.finish(3, GameAction::Join);
    assert!(!tracker.is_busy(3, GameAction::Join));
    assert!(tracker.begin(3, GameAction::Join).is_ok());
}
