use crate::units;
use itertools::Itertools;
use std::fmt;

/// Rows shown per page of the available-games table.
pub const GAMES_PAGE_SIZE: usize = 5;

/// Entries shown on the leaderboard.
pub const LEADERBOARD_LIMIT: usize = 10;

/// One page of a collection, with the navigation facts the UI needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Slice out one page. The requested page is clamped into
/// `[1, ceil(len / page_size)]`; an empty collection still reports one
/// (empty) page so the UI always has a current page to show.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    let items = if start < items.len() {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Page {
        items,
        page,
        total_pages,
    }
}

/// Stable descending sort by game id. Callers hand us whatever order the
/// indexer returned; newest game first is the table contract.
pub fn sort_games_desc<T, F>(games: &mut [T], id_of: F)
where
    F: Fn(&T) -> u64,
{
    games.sort_by(|a, b| id_of(b).cmp(&id_of(a)));
}

/// The three mutually exclusive leaderboard rankings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankMetric {
    Bet,
    Win,
    Payout,
}

impl RankMetric {
    pub const ALL: [RankMetric; 3] = [RankMetric::Bet, RankMetric::Win, RankMetric::Payout];

    pub fn next(self) -> Self {
        match self {
            RankMetric::Bet => RankMetric::Win,
            RankMetric::Win => RankMetric::Payout,
            RankMetric::Payout => RankMetric::Bet,
        }
    }

    /// Path segment the query service uses for this ranking.
    pub fn as_path(self) -> &'static str {
        match self {
            RankMetric::Bet => "bets",
            RankMetric::Win => "wins",
            RankMetric::Payout => "payouts",
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RankMetric::Bet => "Bet",
            RankMetric::Win => "Win",
            RankMetric::Payout => "Payout",
        };
        write!(f, "{name}")
    }
}

/// One leaderboard row: a player and their total for the selected metric,
/// as a smallest-unit decimal string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRanking {
    pub player: String,
    pub amount: String,
}

/// Order rankings for display: one row per player, largest amount first,
/// top ten only. The query service already limits and sorts, but that is its
/// contract, not ours, so the ordering is reapplied here.
pub fn rank_players(entries: Vec<PlayerRanking>, limit: usize) -> Vec<PlayerRanking> {
    entries
        .into_iter()
        .unique_by(|entry| entry.player.clone())
        .sorted_by(|a, b| units::cmp_amounts(&b.amount, &a.amount))
        .take(limit)
        .collect()
}

/// Shorten an address for table cells: `0x1234...abcd`.
pub fn short_address(address: &str) -> String {
    let len = address.chars().count();
    if len <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(6).collect();
    let tail: String = address.chars().skip(len - 4).collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn ids(page: &Page<u64>) -> Vec<u64> {
        page.items.clone()
    }

    #[test]
    fn paginate__twelve_items_page_size_five() {
        // given: ids already sorted descending
        let mut games: Vec<u64> = (0..12).collect();
        sort_games_desc(&mut games, |id| *id);

        // when
        let first = paginate(&games, 1, 5);
        let third = paginate(&games, 3, 5);

        // then
        assert_eq!(ids(&first), vec![11, 10, 9, 8, 7]);
        assert!(first.has_next());
        assert!(!first.has_prev());
        assert_eq!(ids(&third), vec![1, 0]);
        assert_eq!(third.total_pages, 3);
        assert!(!third.has_next());
        assert!(third.has_prev());
    }

    #[test]
    fn paginate__out_of_range_pages_clamp() {
        // given
        let games: Vec<u64> = (0..12).collect();

        // when
        let below = paginate(&games, 0, 5);
        let above = paginate(&games, 99, 5);

        // then
        assert_eq!(below.page, 1);
        assert_eq!(above.page, 3);
        assert_eq!(above.items.len(), 2);
    }

    #[test]
    fn paginate__empty_collection_is_one_empty_page() {
        // given
        let games: Vec<u64> = Vec::new();

        // when
        let page = paginate(&games, 1, 5);

        // then
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn sort_games_desc__is_stable_for_equal_ids() {
        // given
        let mut games = vec![(5u64, "a"), (7, "b"), (5, "c")];

        // when
        sort_games_desc(&mut games, |(id, _)| *id);

        // then
        assert_eq!(games, vec![(7, "b"), (5, "a"), (5, "c")]);
    }

    fn entry(player: &str, amount: &str) -> PlayerRanking {
        PlayerRanking {
            player: player.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn rank_players__sorts_numerically_and_truncates() {
        // given: unsorted, with an amount that only numeric comparison orders
        let entries = vec![
            entry("p1", "900"),
            entry("p2", "10000"),
            entry("p3", "2000"),
        ];

        // when
        let ranked = rank_players(entries, 2);

        // then
        assert_eq!(
            ranked,
            vec![entry("p2", "10000"), entry("p3", "2000")]
        );
    }

    #[test]
    fn rank_players__deduplicates_players_keeping_first_row() {
        // given
        let entries = vec![
            entry("p1", "50"),
            entry("p1", "9999"),
            entry("p2", "100"),
        ];

        // when
        let ranked = rank_players(entries, LEADERBOARD_LIMIT);

        // then
        assert_eq!(ranked, vec![entry("p2", "100"), entry("p1", "50")]);
    }

    #[test]
    fn short_address__keeps_head_and_tail() {
        assert_eq!(
            short_address("0x07F41412697D14981e770b6E335051b1231A2bA8"),
            "0x07F4...2bA8"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }
}
