use crate::{
    chain::CoinSide,
    error::{
        Error,
        Result,
    },
    presenter::{
        PlayerRanking,
        RankMetric,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use fuels::types::AssetId;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

/// HTTP client for the query service that indexes the contract's events.
/// The service is the source of truth for historical and aggregate data;
/// nothing fetched here is cached beyond the caller's own view state.
#[derive(Clone)]
pub struct IndexerClient {
    base_url: String,
    http: reqwest::Client,
}

/// A game waiting for an opponent, as indexed from creation events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailableGame {
    pub game_id: u64,
    pub player_one: String,
    pub side: CoinSide,
    pub stake: String,
    pub token_name: String,
    pub token_symbol: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexedGameState {
    Open,
    Joined,
    Resolved,
    Expired,
}

/// Aggregate view of one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameStats {
    pub game_id: u64,
    pub stake: String,
    pub token_name: String,
    pub token_symbol: String,
    pub side: CoinSide,
    pub state: IndexedGameState,
    pub winner: Option<String>,
    pub payout: Option<String>,
}

/// A game the connected player created / joined / won.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerGame {
    pub game_id: u64,
    pub stake: String,
    pub side: Option<CoinSide>,
    pub asset: Option<String>,
    pub payout: Option<String>,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    pub async fn available_games(&self) -> Result<Vec<AvailableGame>> {
        let url = format!("{}/games/available", self.base_url);
        let dtos: Vec<AvailableGameDto> = self.get_json(&url).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    pub async fn game_stats(&self, game_id: u64) -> Result<Option<GameStats>> {
        let url = format!("{}/games/{}/stats", self.base_url, game_id);
        let dto: Option<GameStatsDto> = self.get_json_optional(&url).await?;
        Ok(dto.map(Into::into))
    }

    pub async fn top_players(
        &self,
        metric: RankMetric,
        asset: &AssetId,
    ) -> Result<Vec<PlayerRanking>> {
        let url = format!(
            "{}/players/top/{}/{}",
            self.base_url,
            metric.as_path(),
            asset
        );
        let dtos: Vec<PlayerRankingDto> = self.get_json(&url).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    pub async fn games_created(&self, player: &str) -> Result<Vec<PlayerGame>> {
        let url = format!("{}/players/{}/created", self.base_url, player);
        let dtos: Vec<CreatedGameDto> = self.get_json(&url).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    pub async fn games_joined(&self, player: &str) -> Result<Vec<PlayerGame>> {
        let url = format!("{}/players/{}/joined", self.base_url, player);
        let dtos: Vec<JoinedGameDto> = self.get_json(&url).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    pub async fn games_resolved(&self, player: &str) -> Result<Vec<PlayerGame>> {
        let url = format!("{}/players/{}/resolved", self.base_url, player);
        let dtos: Vec<ResolvedGameDto> = self.get_json(&url).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        match self.get_json_optional(url).await? {
            Some(value) => Ok(value),
            None => Err(Error::fetch(format!("{url} responded 404"))),
        }
    }

    async fn get_json_optional<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("query service request failed: {e}")))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(|e| {
            Error::fetch(format!("failed to read query service response: {e}"))
        })?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(Error::fetch(format!(
                "query service responded {status} for {url}: {body}"
            )));
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::fetch(format!("invalid query service payload: {e}")))?;
        Ok(Some(value))
    }
}

impl fmt::Display for IndexerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct AvailableGameDto {
    game_id: u64,
    player_one: String,
    side: bool,
    stake: String,
    token_name: String,
    token_symbol: String,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum IndexedGameStateDto {
    Open,
    Joined,
    Resolved,
    Expired,
}

#[derive(Deserialize)]
struct GameStatsDto {
    game_id: u64,
    stake: String,
    token_name: String,
    token_symbol: String,
    side: bool,
    state: IndexedGameStateDto,
    winner: Option<String>,
    payout: Option<String>,
}

#[derive(Deserialize)]
struct PlayerRankingDto {
    player: String,
    amount: String,
}

#[derive(Deserialize)]
struct CreatedGameDto {
    game_id: u64,
    stake: String,
    side: bool,
    asset: String,
}

#[derive(Deserialize)]
struct JoinedGameDto {
    game_id: u64,
    stake: String,
}

#[derive(Deserialize)]
struct ResolvedGameDto {
    game_id: u64,
    stake: String,
    payout: String,
}

impl From<AvailableGameDto> for AvailableGame {
    fn from(dto: AvailableGameDto) -> Self {
        AvailableGame {
            game_id: dto.game_id,
            player_one: dto.player_one,
            side: CoinSide::from_bool(dto.side),
            stake: dto.stake,
            token_name: dto.token_name,
            token_symbol: dto.token_symbol,
            created_at: dto.created_at,
        }
    }
}

impl From<IndexedGameStateDto> for IndexedGameState {
    fn from(dto: IndexedGameStateDto) -> Self {
        match dto {
            IndexedGameStateDto::Open => IndexedGameState::Open,
            IndexedGameStateDto::Joined => IndexedGameState::Joined,
            IndexedGameStateDto::Resolved => IndexedGameState::Resolved,
            IndexedGameStateDto::Expired => IndexedGameState::Expired,
        }
    }
}

impl From<GameStatsDto> for GameStats {
    fn from(dto: GameStatsDto) -> Self {
        GameStats {
            game_id: dto.game_id,
            stake: dto.stake,
            token_name: dto.token_name,
            token_symbol: dto.token_symbol,
            side: CoinSide::from_bool(dto.side),
            state: dto.state.into(),
            winner: dto.winner,
            payout: dto.payout,
        }
    }
}

impl From<PlayerRankingDto> for PlayerRanking {
    fn from(dto: PlayerRankingDto) -> Self {
        PlayerRanking {
            player: dto.player,
            amount: dto.amount,
        }
    }
}

impl From<CreatedGameDto> for PlayerGame {
    fn from(dto: CreatedGameDto) -> Self {
        PlayerGame {
            game_id: dto.game_id,
            stake: dto.stake,
            side: Some(CoinSide::from_bool(dto.side)),
            asset: Some(dto.asset),
            payout: None,
        }
    }
}

impl From<JoinedGameDto> for PlayerGame {
    fn from(dto: JoinedGameDto) -> Self {
        PlayerGame {
            game_id: dto.game_id,
            stake: dto.stake,
            side: None,
            asset: None,
            payout: None,
        }
    }
}

impl From<ResolvedGameDto> for PlayerGame {
    fn from(dto: ResolvedGameDto) -> Self {
        PlayerGame {
            game_id: dto.game_id,
            stake: dto.stake,
            side: None,
            asset: None,
            payout: Some(dto.payout),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn available_game__parses_indexer_payload() {
        // given
        let payload = r#"[
            {
                "game_id": 41,
                "player_one": "0x07F41412697D14981e770b6E335051b1231A2bA8",
                "side": true,
                "stake": "2500000000",
                "token_name": "Stable AI",
                "token_symbol": "STABLEAI",
                "created_at": "2025-11-02T09:30:00Z"
            }
        ]"#;

        // when
        let dtos: Vec<AvailableGameDto> = serde_json::from_str(payload).unwrap();
        let games: Vec<AvailableGame> = dtos.into_iter().map(Into::into).collect();

        // then
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, 41);
        assert_eq!(games[0].side, CoinSide::Heads);
        assert_eq!(games[0].stake, "2500000000");
        assert_eq!(games[0].token_symbol, "STABLEAI");
    }

    #[test]
    fn game_stats__optional_fields_and_state_parse() {
        // given
        let payload = r#"{
            "game_id": 7,
            "stake": "1000000000",
            "token_name": "Dig",
            "token_symbol": "DIG",
            "side": false,
            "state": "resolved",
            "winner": "0xabc",
            "payout": "1900000000"
        }"#;

        // when
        let stats: GameStats =
            serde_json::from_str::<GameStatsDto>(payload).unwrap().into();

        // then
        assert_eq!(stats.state, IndexedGameState::Resolved);
        assert_eq!(stats.side, CoinSide::Tails);
        assert_eq!(stats.winner.as_deref(), Some("0xabc"));
        assert_eq!(stats.payout.as_deref(), Some("1900000000"));
    }

    #[test]
    fn game_stats__open_game_has_no_winner() {
        // given
        let payload = r#"{
            "game_id": 8,
            "stake": "5",
            "token_name": "Fed",
            "token_symbol": "FED",
            "side": true,
            "state": "open",
            "winner": null,
            "payout": null
        }"#;

        // when
        let stats: GameStats =
            serde_json::from_str::<GameStatsDto>(payload).unwrap().into();

        // then
        assert_eq!(stats.state, IndexedGameState::Open);
        assert_eq!(stats.winner, None);
        assert_eq!(stats.payout, None);
    }

    #[test]
    fn player_games__conversions_tag_their_origin() {
        // given
        let created = r#"{"game_id": 1, "stake": "10", "side": true, "asset": "0xaa"}"#;
        let joined = r#"{"game_id": 2, "stake": "20"}"#;
        let resolved = r#"{"game_id": 3, "stake": "30", "payout": "57"}"#;

        // when
        let created: PlayerGame =
            serde_json::from_str::<CreatedGameDto>(created).unwrap().into();
        let joined: PlayerGame =
            serde_json::from_str::<JoinedGameDto>(joined).unwrap().into();
        let resolved: PlayerGame =
            serde_json::from_str::<ResolvedGameDto>(resolved).unwrap().into();

        // then
        assert_eq!(created.side, Some(CoinSide::Heads));
        assert_eq!(created.asset.as_deref(), Some("0xaa"));
        assert_eq!(joined.side, None);
        assert_eq!(resolved.payout.as_deref(), Some("57"));
    }

    #[test]
    fn new__trims_trailing_slash() {
        let client = IndexerClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.to_string(), "http://localhost:8080");
    }
}
