use crate::{
    chain::{
        CoinSide,
        ContractGameReader,
        GameReader,
    },
    error::{
        Error,
        Result as FlipResult,
    },
    indexer_client::{
        AvailableGame,
        IndexerClient,
        PlayerGame,
    },
    poller::{
        self,
        GameSnapshot,
        PollerCommand,
        PollerEvent,
    },
    presenter::{
        self,
        GAMES_PAGE_SIZE,
        LEADERBOARD_LIMIT,
        Page,
        PlayerRanking,
        RankMetric,
    },
    tokens::{
        self,
        ProviderBalanceReader,
        TokenDescriptor,
        TokenMetadata,
        TokenResolver,
    },
    ui,
    units,
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    DeploymentStore,
    compute_abi_hash,
};
use fuels::{
    accounts::{
        ViewOnlyAccount,
        wallet::Wallet,
    },
    crypto::SecretKey,
    prelude::{
        CallParameters,
        Provider,
        TxPolicies,
        VariableOutputPolicy,
        private_key::PrivateKeySigner,
    },
    types::{
        Address,
        AssetId,
        ContractId,
    },
};
use generated_abi::{
    FLIP_GAME_ABI_PATH,
    flip_game_instance,
    flip_game_types::FlipGame,
};
use rand::Rng;
use std::{
    collections::HashSet,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_TESTNET_FALLBACK_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_DEVNET_FALLBACK_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";
pub const DEFAULT_LOCAL_FALLBACK_RPC_URL: &str = "http://localhost:4000/";

const DEFAULT_SAFE_SCRIPT_GAS_LIMIT: u64 = 29_000_000;

/// Contract floor for game timeouts.
pub const MIN_TIMEOUT_SECS: u64 = 300;

/// Cap on how long one submission may stay pending before it is reported as
/// timed out. The chain call itself is not cancellable; the control is
/// released either way.
pub const SUBMISSION_DEADLINE: Duration = Duration::from_secs(60);

/// Cadence of the background game-state refresh.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

const ERROR_STATUS_TTL: Duration = Duration::from_secs(3);
const SUCCESS_STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Testnet { url: String, fallback_url: String },
    Devnet { url: String, fallback_url: String },
    LocalNode { url: String, fallback_url: String },
}

impl NetworkTarget {
    pub fn urls(&self) -> (&str, &str) {
        match self {
            NetworkTarget::Testnet { url, fallback_url }
            | NetworkTarget::Devnet { url, fallback_url }
            | NetworkTarget::LocalNode { url, fallback_url } => (url, fallback_url),
        }
    }

    pub fn env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Testnet { .. } => DeploymentEnv::Test,
            NetworkTarget::Devnet { .. } => DeploymentEnv::Dev,
            NetworkTarget::LocalNode { .. } => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    ForcKeystore { owner: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    /// `None` starts the client read-only; every write then fails its
    /// wallet-connection precondition.
    pub wallet: Option<WalletConfig>,
    pub indexer_url: Option<String>,
}

/// The four wallet-gated actions, keyed per game for in-flight tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameAction {
    Join,
    Resolve,
    Claim,
}

impl std::fmt::Display for GameAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameAction::Join => "join",
            GameAction::Resolve => "resolve",
            GameAction::Claim => "claim",
        };
        write!(f, "{name}")
    }
}

/// Tracks submissions that have not settled yet. Different games proceed
/// independently; a second submission of the same action on the same game is
/// rejected until the first settles.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    creating: bool,
    actions: HashSet<(u64, GameAction)>,
}

impl InFlightTracker {
    pub fn begin_create(&mut self) -> FlipResult<()> {
        if self.creating {
            return Err(Error::validation("A game creation is already in flight"));
        }
        self.creating = true;
        Ok(())
    }

    pub fn finish_create(&mut self) {
        self.creating = false;
    }

    pub fn begin(&mut self, game_id: u64, action: GameAction) -> FlipResult<()> {
        if !self.actions.insert((game_id, action)) {
            return Err(Error::validation(format!(
                "A {action} for game {game_id} is already in flight"
            )));
        }
        Ok(())
    }

    pub fn finish(&mut self, game_id: u64, action: GameAction) {
        self.actions.remove(&(game_id, action));
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn is_busy(&self, game_id: u64, action: GameAction) -> bool {
        self.actions.contains(&(game_id, action))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug)]
struct StatusLine {
    message: String,
    kind: StatusKind,
    expires_at: Option<Instant>,
}

#[derive(Clone, Debug)]
pub struct AvailableGameRow {
    pub game_id: u64,
    pub player: String,
    pub stake: String,
    pub token_name: String,
    pub side: CoinSide,
    pub busy: bool,
}

#[derive(Clone, Debug)]
pub struct MyGameRow {
    pub game_id: u64,
    pub stake: String,
    pub side: Option<CoinSide>,
    pub token_name: String,
    pub payout: Option<String>,
    pub resolving: bool,
    pub claiming: bool,
}

#[derive(Clone, Debug)]
pub struct TerminalGameRow {
    pub game_id: u64,
    pub player_one: String,
    pub player_two: Option<String>,
    pub stake: String,
    pub winner: Option<String>,
    pub payout: Option<String>,
    pub remaining_secs: u64,
    pub resolved: bool,
}

#[derive(Clone, Debug)]
pub struct LeaderboardRow {
    pub player: String,
    pub amount: String,
}

/// Everything the UI renders. Built fresh from controller state; the UI
/// never reaches back into the controller.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub wallet: Option<String>,
    pub selected_token: TokenDescriptor,
    pub token_metadata: Option<TokenMetadata>,
    pub available: Page<AvailableGameRow>,
    pub my_created: Vec<MyGameRow>,
    pub my_joined: Vec<MyGameRow>,
    pub my_resolved: Vec<MyGameRow>,
    pub leaderboard_metric: RankMetric,
    pub leaderboard: Vec<LeaderboardRow>,
    pub terminal_games: Vec<TerminalGameRow>,
    pub creating: bool,
    pub status: Option<(String, StatusKind)>,
}

pub struct AppController {
    wallet_address: Option<Address>,
    instance: FlipGame<Wallet>,
    reader: ContractGameReader,
    resolver: TokenResolver<ProviderBalanceReader>,
    indexer: IndexerClient,
    safe_script_gas_limit: u64,
    selected_token: usize,
    leaderboard_metric: RankMetric,
    in_flight: InFlightTracker,
    status: Option<StatusLine>,
    available_games: Vec<AvailableGame>,
    available_page: usize,
    my_created: Vec<PlayerGame>,
    my_joined: Vec<PlayerGame>,
    my_resolved: Vec<PlayerGame>,
    leaderboard: Vec<PlayerRanking>,
    terminal_games: Vec<GameSnapshot>,
    token_metadata: Option<TokenMetadata>,
}

impl AppController {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let AppConfig {
            network,
            wallet,
            indexer_url,
        } = config;
        let (primary_url, fallback_url) = network.urls();
        info!("Connecting to {} (fallback {})", primary_url, fallback_url);

        let provider = Provider::connect(primary_url)
            .await
            .wrap_err_with(|| format!("Failed to connect to provider at {primary_url}"))?;
        let fallback_provider = Provider::connect(fallback_url)
            .await
            .wrap_err_with(|| {
                format!("Failed to connect to fallback provider at {fallback_url}")
            })?;

        let wallet = match wallet {
            Some(WalletConfig::ForcKeystore { owner, dir }) => {
                let descriptor = wallets::find_wallet(&dir, &owner)
                    .wrap_err("Unable to locate owner wallet")?;
                Some(wallets::unlock_wallet(&descriptor, &provider)?)
            }
            None => None,
        };
        let wallet_address = wallet.as_ref().map(|w| (*w.address()).into());

        let record = load_compatible_deployment(network.env(), primary_url)?;
        let contract_id = ContractId::from_str(&record.contract_id).map_err(|e| {
            eyre!("Deployment record contains an invalid contract id: {e:?}")
        })?;

        let indexer_url = indexer_url
            .or_else(|| record.indexer_url.clone())
            .ok_or_else(|| {
                eyre!("No indexer URL configured; pass --indexer-url or record one")
            })?;
        let indexer = IndexerClient::new(indexer_url).map_err(|e| eyre!(e))?;

        let consensus_parameters = provider.consensus_parameters().await?;
        let max_gas_per_tx = consensus_parameters.tx_params().max_gas_per_tx();
        let safe_script_gas_limit = max_gas_per_tx
            .saturating_sub(1)
            .clamp(1, DEFAULT_SAFE_SCRIPT_GAS_LIMIT);
        info!(
            "Using safe script gas limit {} (max_gas_per_tx={})",
            safe_script_gas_limit, max_gas_per_tx
        );

        let account = match &wallet {
            Some(wallet) => wallet.clone(),
            None => read_only_wallet(&provider)?,
        };
        let instance = flip_game_instance(contract_id, account);
        let reader = ContractGameReader::new(instance.clone(), safe_script_gas_limit);
        let resolver = TokenResolver::new(
            ProviderBalanceReader::new(provider, primary_url),
            ProviderBalanceReader::new(fallback_provider, fallback_url),
        );

        Ok(Self {
            wallet_address,
            instance,
            reader,
            resolver,
            indexer,
            safe_script_gas_limit,
            selected_token: 0,
            leaderboard_metric: RankMetric::Bet,
            in_flight: InFlightTracker::default(),
            status: None,
            available_games: Vec::new(),
            available_page: 1,
            my_created: Vec::new(),
            my_joined: Vec::new(),
            my_resolved: Vec::new(),
            leaderboard: Vec::new(),
            terminal_games: Vec::new(),
            token_metadata: None,
        })
    }

    pub fn reader(&self) -> ContractGameReader {
        self.reader.clone()
    }

    fn script_policies(&self) -> TxPolicies {
        TxPolicies::default().with_script_gas_limit(self.safe_script_gas_limit)
    }

    fn require_wallet(&self) -> FlipResult<Address> {
        self.wallet_address
            .ok_or_else(|| Error::validation("Please connect your wallet"))
    }

    pub fn selected_token(&self) -> &'static TokenDescriptor {
        let supported = tokens::supported_tokens();
        &supported[self.selected_token % supported.len()]
    }

    pub fn cycle_token(&mut self) {
        self.selected_token = (self.selected_token + 1) % tokens::supported_tokens().len();
        self.token_metadata = None;
    }

    pub fn cycle_metric(&mut self) {
        self.leaderboard_metric = self.leaderboard_metric.next();
    }

    pub fn next_page(&mut self) {
        self.available_page += 1;
    }

    pub fn prev_page(&mut self) {
        self.available_page = self.available_page.saturating_sub(1).max(1);
    }

    // --- status line -----------------------------------------------------

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some(StatusLine {
            message: message.into(),
            kind: StatusKind::Info,
            expires_at: None,
        });
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.status = Some(StatusLine {
            message: message.into(),
            kind: StatusKind::Success,
            expires_at: Some(Instant::now() + SUCCESS_STATUS_TTL),
        });
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.status = Some(StatusLine {
            message,
            kind: StatusKind::Error,
            expires_at: Some(Instant::now() + ERROR_STATUS_TTL),
        });
    }

    fn current_status(&self) -> Option<(String, StatusKind)> {
        let line = self.status.as_ref()?;
        if let Some(expires_at) = line.expires_at
            && Instant::now() >= expires_at
        {
            return None;
        }
        Some((line.message.clone(), line.kind))
    }

    // --- writes ----------------------------------------------------------

    /// Create a game wagering `amount` (display units) of `ticker` on `side`.
    /// All preconditions are checked locally before anything touches the
    /// network.
    pub async fn create_game(
        &mut self,
        ticker: &str,
        amount: &str,
        side: CoinSide,
        timeout_secs: u64,
    ) -> FlipResult<u64> {
        let owner = self.require_wallet()?;
        let token = tokens::token_by_ticker(ticker).ok_or_else(|| {
            Error::validation(format!("Token '{ticker}' is not supported"))
        })?;
        let (stake, raw) = validate_stake(amount, token)?;
        validate_timeout(timeout_secs)?;

        let metadata = self.resolver.resolve(&owner, token).await?;
        if !units::covers(&metadata.raw_balance, &raw) {
            return Err(Error::validation(format!(
                "Insufficient {} balance",
                token.ticker
            )));
        }

        self.in_flight.begin_create()?;
        let result = self
            .submit_create(token.asset_id, stake, side, timeout_secs)
            .await;
        self.in_flight.finish_create();

        let game_id = result?;
        self.set_success(format!("Game {game_id} created"));
        Ok(game_id)
    }

    async fn submit_create(
        &self,
        asset: AssetId,
        stake: u64,
        side: CoinSide,
        timeout_secs: u64,
    ) -> FlipResult<u64> {
        let call = CallParameters::new(stake, asset, self.safe_script_gas_limit);
        let pending = self
            .instance
            .methods()
            .create_game(asset, side.as_bool(), timeout_secs)
            .call_params(call)
            .map_err(|e| Error::transaction(format!("create_game setup failed: {e}")))?
            .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
            .with_tx_policies(self.script_policies())
            .call();
        let response = time::timeout(SUBMISSION_DEADLINE, pending)
            .await
            .map_err(|_| Error::Timeout(SUBMISSION_DEADLINE))?
            .map_err(|e| Error::transaction(format!("create_game rejected: {e}")))?;
        Ok(response.value)
    }

    /// Join an open game, forwarding its stake with the call.
    pub async fn join_game(&mut self, game_id: u64) -> FlipResult<()> {
        self.require_wallet()?;
        self.in_flight.begin(game_id, GameAction::Join)?;
        let result = self.submit_join(game_id).await;
        self.in_flight.finish(game_id, GameAction::Join);
        result?;
        self.set_success(format!("Joined game {game_id}"));
        Ok(())
    }

    async fn submit_join(&self, game_id: u64) -> FlipResult<()> {
        let record = self.reader.game(game_id).await?;
        let call =
            CallParameters::new(record.stake, record.asset, self.safe_script_gas_limit);
        let pending = self
            .instance
            .methods()
            .join_game(game_id)
            .call_params(call)
            .map_err(|e| Error::transaction(format!("join_game setup failed: {e}")))?
            .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
            .with_tx_policies(self.script_policies())
            .call();
        time::timeout(SUBMISSION_DEADLINE, pending)
            .await
            .map_err(|_| Error::Timeout(SUBMISSION_DEADLINE))?
            .map_err(|e| Error::transaction(format!("join_game rejected: {e}")))?;
        Ok(())
    }

    /// Ask the contract to settle a joined game. The outcome is never
    /// derived locally; the settled record is re-read from the indexer.
    pub async fn resolve_game(&mut self, game_id: u64) -> FlipResult<()> {
        self.require_wallet()?;
        self.in_flight.begin(game_id, GameAction::Resolve)?;
        let result = self.submit_plain(game_id, GameAction::Resolve).await;
        self.in_flight.finish(game_id, GameAction::Resolve);
        result?;
        match self.indexer.game_stats(game_id).await {
            Ok(Some(stats)) if stats.winner.is_some() => {
                let winner = presenter::short_address(&stats.winner.unwrap_or_default());
                self.set_success(format!("Game {game_id} resolved - {winner} won"));
            }
            Ok(_) => self.set_success(format!("Game {game_id} resolved")),
            Err(err) => {
                warn!(%err, "resolved game stats lookup failed");
                self.set_success(format!("Game {game_id} resolved"));
            }
        }
        Ok(())
    }

    /// Pay out a resolved game to its winner.
    pub async fn claim_reward(&mut self, game_id: u64) -> FlipResult<()> {
        self.require_wallet()?;
        self.in_flight.begin(game_id, GameAction::Claim)?;
        let result = self.submit_plain(game_id, GameAction::Claim).await;
        self.in_flight.finish(game_id, GameAction::Claim);
        result?;
        self.set_success(format!("Reward for game {game_id} claimed"));
        Ok(())
    }

    async fn submit_plain(&self, game_id: u64, action: GameAction) -> FlipResult<()> {
        let methods = self.instance.methods();
        let call = match action {
            GameAction::Resolve => methods.resolve_game(game_id),
            GameAction::Claim => methods.claim_reward(game_id),
            GameAction::Join => {
                return Err(Error::transaction("join requires call parameters"));
            }
        };
        let pending = call
            .with_variable_output_policy(VariableOutputPolicy::EstimateMinimum)
            .with_tx_policies(self.script_policies())
            .call();
        time::timeout(SUBMISSION_DEADLINE, pending)
            .await
            .map_err(|_| Error::Timeout(SUBMISSION_DEADLINE))?
            .map_err(|e| Error::transaction(format!("{action} rejected: {e}")))?;
        Ok(())
    }

    // --- reads -----------------------------------------------------------

    pub async fn refresh_available(&mut self) -> FlipResult<()> {
        let mut games = self.indexer.available_games().await?;
        presenter::sort_games_desc(&mut games, |g| g.game_id);
        self.available_games = games;
        let total_pages = self
            .available_games
            .len()
            .div_ceil(GAMES_PAGE_SIZE)
            .max(1);
        self.available_page = self.available_page.min(total_pages);
        Ok(())
    }

    pub async fn refresh_my_games(&mut self) -> FlipResult<()> {
        let Some(owner) = self.wallet_address else {
            return Ok(());
        };
        let player = owner.to_string();
        let (created, joined, resolved) = futures::future::try_join3(
            self.indexer.games_created(&player),
            self.indexer.games_joined(&player),
            self.indexer.games_resolved(&player),
        )
        .await?;
        self.my_created = created;
        self.my_joined = joined;
        self.my_resolved = resolved;
        Ok(())
    }

    pub async fn refresh_leaderboard(&mut self) -> FlipResult<()> {
        let asset = self.selected_token().asset_id;
        let entries = self
            .indexer
            .top_players(self.leaderboard_metric, &asset)
            .await?;
        self.leaderboard = presenter::rank_players(entries, LEADERBOARD_LIMIT);
        Ok(())
    }

    pub async fn refresh_balance(&mut self) -> FlipResult<()> {
        let Some(owner) = self.wallet_address else {
            self.token_metadata = None;
            return Ok(());
        };
        let token = self.selected_token();
        self.token_metadata = Some(self.resolver.resolve(&owner, token).await?);
        Ok(())
    }

    pub fn apply_poller_event(&mut self, event: PollerEvent) {
        match event {
            PollerEvent::Games(mut games) => {
                games.sort_by(|a, b| b.record.id.cmp(&a.record.id));
                self.terminal_games = games;
            }
            PollerEvent::Failed(message) => self.set_error(message),
        }
    }

    // --- snapshot --------------------------------------------------------

    pub fn build_snapshot(&self) -> AppSnapshot {
        let available_rows: Vec<AvailableGameRow> = self
            .available_games
            .iter()
            .map(|game| AvailableGameRow {
                game_id: game.game_id,
                player: presenter::short_address(&game.player_one),
                stake: display_stake(&game.stake, &game.token_symbol),
                token_name: game.token_name.clone(),
                side: game.side,
                busy: self.in_flight.is_busy(game.game_id, GameAction::Join),
            })
            .collect();
        let available =
            presenter::paginate(&available_rows, self.available_page, GAMES_PAGE_SIZE);

        let my_row = |game: &PlayerGame| {
            let asset = game
                .asset
                .as_deref()
                .and_then(|raw| AssetId::from_str(raw).ok());
            let ticker = asset
                .and_then(|asset| tokens::token_by_asset(&asset))
                .map(|token| token.ticker)
                .unwrap_or(self.selected_token().ticker);
            MyGameRow {
                game_id: game.game_id,
                stake: display_stake(&game.stake, ticker),
                side: game.side,
                token_name: asset
                    .map(|asset| tokens::token_name(&asset).to_string())
                    .unwrap_or_else(|| "-".to_string()),
                payout: game.payout.clone(),
                resolving: self.in_flight.is_busy(game.game_id, GameAction::Resolve),
                claiming: self.in_flight.is_busy(game.game_id, GameAction::Claim),
            }
        };

        let terminal_games = self
            .terminal_games
            .iter()
            .map(|snapshot| TerminalGameRow {
                game_id: snapshot.record.id,
                player_one: presenter::short_address(
                    &snapshot.record.player_one.to_string(),
                ),
                player_two: snapshot
                    .record
                    .player_two
                    .map(|p| presenter::short_address(&p.to_string())),
                stake: snapshot.record.stake.to_string(),
                winner: snapshot
                    .record
                    .winner
                    .map(|w| presenter::short_address(&w.to_string())),
                payout: snapshot.record.payout.map(|p| p.to_string()),
                remaining_secs: snapshot.remaining_secs,
                resolved: snapshot.status == poller::TerminalStatus::Resolved,
            })
            .collect();

        let leaderboard = self
            .leaderboard
            .iter()
            .map(|entry| LeaderboardRow {
                player: presenter::short_address(&entry.player),
                amount: display_stake(&entry.amount, self.selected_token().ticker),
            })
            .collect();

        AppSnapshot {
            wallet: self
                .wallet_address
                .map(|address| presenter::short_address(&address.to_string())),
            selected_token: self.selected_token().clone(),
            token_metadata: self.token_metadata.clone(),
            available,
            my_created: self.my_created.iter().map(my_row).collect(),
            my_joined: self.my_joined.iter().map(my_row).collect(),
            my_resolved: self.my_resolved.iter().map(my_row).collect(),
            leaderboard_metric: self.leaderboard_metric,
            leaderboard,
            terminal_games,
            creating: self.in_flight.is_creating(),
            status: self.current_status(),
        }
    }
}

/// Amount + timeout validation shared by the submitter and its tests. Pure:
/// callable without a wallet, a provider, or a network.
pub fn validate_stake(
    amount: &str,
    token: &TokenDescriptor,
) -> FlipResult<(u64, String)> {
    let raw = units::parse_units(amount, token.decimals)?;
    if raw == "0" {
        return Err(Error::validation("Bet amount must be positive"));
    }
    let stake: u64 = raw.parse().map_err(|_| {
        Error::validation(format!("Amount {amount} exceeds the wagerable range"))
    })?;
    Ok((stake, raw))
}

pub fn validate_timeout(timeout_secs: u64) -> FlipResult<()> {
    if timeout_secs < MIN_TIMEOUT_SECS {
        return Err(Error::validation("Timeout must be at least 5 minutes"));
    }
    Ok(())
}

fn display_stake(raw: &str, symbol: &str) -> String {
    let decimals = tokens::token_by_ticker(symbol)
        .map(|token| token.decimals)
        .unwrap_or(units::DEFAULT_DECIMALS);
    match units::format_units(raw, decimals, units::DEFAULT_DISPLAY_DP) {
        Ok(display) => format!("{display} {symbol}"),
        Err(_) => format!("{raw} {symbol}"),
    }
}

/// An account for read-only `simulate` calls when no wallet was unlocked.
/// Nothing is ever signed or funded with this key.
fn read_only_wallet(provider: &Provider) -> Result<Wallet> {
    let secret = SecretKey::try_from([0x01u8; 32].as_slice())
        .wrap_err("constructing read-only key failed")?;
    Ok(Wallet::new(PrivateKeySigner::new(secret), provider.clone()))
}

fn load_compatible_deployment(
    env: DeploymentEnv,
    url: &str,
) -> Result<DeploymentRecord> {
    let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
    let record = store.load().map_err(|e| eyre!(e))?;
    if !Path::new(FLIP_GAME_ABI_PATH).exists() {
        return Err(eyre!("ABI artifact not found at {FLIP_GAME_ABI_PATH}"));
    }
    let abi_hash = compute_abi_hash(FLIP_GAME_ABI_PATH).map_err(|e| eyre!(e))?;
    match record {
        Some(record) if record.is_compatible_with_hash(&abi_hash) => Ok(record),
        other => Err(eyre!(format_deployment_summary(
            env, url, &store, other.as_ref(), &abi_hash
        ))),
    }
}

fn format_deployment_summary(
    env: DeploymentEnv,
    url: &str,
    store: &DeploymentStore,
    record: Option<&DeploymentRecord>,
    current_hash: &str,
) -> String {
    let mut message = format!(
        "No compatible deployment recorded for {env} at {url}.\n\nRecorded deployment for {env}:"
    );
    if let Some(record) = record {
        message.push_str(&format!(
            "\n  {} - {} @ {} (abi hash {})",
            record.deployed_at,
            record.contract_id,
            record.network_url,
            hash_preview(&record.abi_hash),
        ));
    } else {
        message.push_str("\n  (none recorded)");
    }
    message.push_str(&format!(
        "\n\nCurrent local ABI hash: {}",
        hash_preview(current_hash)
    ));
    message.push_str(&format!(
        "\nDeployment records file: {}",
        store.path().display()
    ));
    message
}

fn hash_preview(hash: &str) -> String {
    let preview_len = hash.len().min(16);
    let mut preview = hash[..preview_len].to_string();
    if hash.len() > preview_len {
        preview.push_str("...");
    }
    preview
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let mut controller = AppController::new(config).await?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn refresh_all(controller: &mut AppController) {
    if let Err(err) = controller.refresh_available().await {
        controller.set_error(err.to_string());
    }
    if let Err(err) = controller.refresh_leaderboard().await {
        controller.set_error(err.to_string());
    }
    if let Err(err) = controller.refresh_my_games().await {
        controller.set_error(err.to_string());
    }
    if let Err(err) = controller.refresh_balance().await {
        controller.set_error(err.to_string());
    }
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");

    let (poller_cmd_tx, poller_cmd_rx) = mpsc::unbounded_channel();
    let (poller_event_tx, mut poller_event_rx) = mpsc::unbounded_channel();
    let poller_handle = tokio::spawn(poller::poller_worker(
        POLL_INTERVAL,
        controller.reader(),
        poller_cmd_rx,
        poller_event_tx,
    ));

    refresh_all(controller).await;
    let mut snapshot = controller.build_snapshot();
    ui::draw(ui_state, &snapshot)?;

    loop {
        tokio::select! {
            maybe_event = poller_event_rx.recv() => {
                let Some(event) = maybe_event else {
                    warn!("poller channel closed");
                    break;
                };
                controller.apply_poller_event(event);
                snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot)
                    .wrap_err("draw after poll refresh failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = poller_cmd_tx.send(PollerCommand::Shutdown);
                break;
            }
            raw_event = ui::next_raw_event(input_events) => {
                let raw_event = raw_event?;
                let Some(event) = ui::interpret_event(ui_state, raw_event, &snapshot)
                else {
                    continue;
                };
                let mut refresh_lists = false;
                let mut refresh_balance = false;
                let mut poke_poller = false;
                match event {
                    ui::UserEvent::Quit => {
                        let _ = poller_cmd_tx.send(PollerCommand::Shutdown);
                        break;
                    }
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Refresh => {
                        controller.set_info("Refreshing...");
                        refresh_lists = true;
                        refresh_balance = true;
                        poke_poller = true;
                    }
                    ui::UserEvent::NextPage => controller.next_page(),
                    ui::UserEvent::PrevPage => controller.prev_page(),
                    ui::UserEvent::CycleToken => {
                        controller.cycle_token();
                        refresh_balance = true;
                        if let Err(err) = controller.refresh_leaderboard().await {
                            controller.set_error(err.to_string());
                        }
                    }
                    ui::UserEvent::CycleMetric => {
                        controller.cycle_metric();
                        if let Err(err) = controller.refresh_leaderboard().await {
                            controller.set_error(err.to_string());
                        }
                    }
                    ui::UserEvent::Join(game_id) => {
                        controller.set_info(format!("Joining game {game_id}..."));
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw while joining failed")?;
                        if let Err(err) = controller.join_game(game_id).await {
                            controller.set_error(format!("Failed to join game: {err}"));
                        } else {
                            refresh_lists = true;
                            refresh_balance = true;
                            poke_poller = true;
                        }
                    }
                    ui::UserEvent::Resolve(game_id) => {
                        controller.set_info(format!("Resolving game {game_id}..."));
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw while resolving failed")?;
                        if let Err(err) = controller.resolve_game(game_id).await {
                            controller
                                .set_error(format!("Failed to resolve game: {err}"));
                        } else {
                            refresh_lists = true;
                            poke_poller = true;
                        }
                    }
                    ui::UserEvent::Claim(game_id) => {
                        controller.set_info(format!("Claiming reward for {game_id}..."));
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw while claiming failed")?;
                        if let Err(err) = controller.claim_reward(game_id).await {
                            controller
                                .set_error(format!("Failed to claim reward: {err}"));
                        } else {
                            refresh_lists = true;
                            refresh_balance = true;
                        }
                    }
                    ui::UserEvent::ConfirmCreate {
                        ticker,
                        amount,
                        side,
                        timeout_secs,
                    } => {
                        controller.set_info(format!(
                            "Creating a {side} game for {amount} {ticker}..."
                        ));
                        ui::draw(ui_state, &controller.build_snapshot())
                            .wrap_err("draw while creating failed")?;
                        match controller
                            .create_game(&ticker, &amount, side, timeout_secs)
                            .await
                        {
                            Ok(_) => {
                                refresh_lists = true;
                                refresh_balance = true;
                            }
                            Err(err) => controller.set_error(err.to_string()),
                        }
                    }
                    ui::UserEvent::PracticeFlip(guess) => {
                        let outcome =
                            CoinSide::from_bool(rand::rng().random_bool(0.5));
                        ui::record_practice_flip(ui_state, guess, outcome);
                        if guess == outcome {
                            controller.set_success(format!(
                                "The coin came up {outcome} - you called it!"
                            ));
                        } else {
                            controller
                                .set_info(format!("The coin came up {outcome}"));
                        }
                    }
                }

                if refresh_lists {
                    if let Err(err) = controller.refresh_available().await {
                        controller.set_error(err.to_string());
                    }
                    if let Err(err) = controller.refresh_my_games().await {
                        controller.set_error(err.to_string());
                    }
                }
                if refresh_balance
                    && let Err(err) = controller.refresh_balance().await
                {
                    controller.set_error(err.to_string());
                }
                if poke_poller {
                    let _ = poller_cmd_tx.send(PollerCommand::RefreshNow);
                }
                snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot).wrap_err("draw after input failed")?;
            }
        }
    }

    let _ = poller_cmd_tx.send(PollerCommand::Shutdown);
    match poller_handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err).wrap_err("poller worker failed"),
        Err(err) => Err(eyre!(err)).wrap_err("poller worker panicked"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn stableai() -> &'static TokenDescriptor {
        tokens::token_by_ticker("STABLEAI").unwrap()
    }

    #[test]
    fn validate_stake__accepts_positive_amounts_in_range() {
        // given / when
        let (stake, raw) = validate_stake("2.5", stableai()).unwrap();

        // then
        assert_eq!(stake, 2_500_000_000);
        assert_eq!(raw, "2500000000");
    }

    #[test]
    fn validate_stake__rejects_zero_and_garbage() {
        assert!(validate_stake("0", stableai()).unwrap_err().is_validation());
        assert!(
            validate_stake("0.0", stableai())
                .unwrap_err()
                .is_validation()
        );
        assert!(
            validate_stake("nope", stableai())
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn validate_stake__rejects_amounts_beyond_the_wire_type() {
        // given: 10^21 smallest units cannot ride a u64
        let err = validate_stake("1000000000000", stableai()).unwrap_err();

        // then
        assert!(err.is_validation());
    }

    #[test]
    fn validate_timeout__enforces_contract_floor() {
        assert!(validate_timeout(299).unwrap_err().is_validation());
        assert!(validate_timeout(MIN_TIMEOUT_SECS).is_ok());
        assert!(validate_timeout(86_400).is_ok());
    }

    #[test]
    fn in_flight_tracker__same_game_same_action_is_rejected() {
        // given
        let mut tracker = InFlightTracker::default();
        tracker.begin(7, GameAction::Join).unwrap();

        // when / then
        assert!(
            tracker
                .begin(7, GameAction::Join)
                .unwrap_err()
                .is_validation()
        );
        assert!(tracker.begin(8, GameAction::Join).is_ok());
        assert!(tracker.begin(7, GameAction::Resolve).is_ok());

        // and once settled the slot reopens
        tracker.finish(7, GameAction::Join);
        assert!(tracker.begin(7, GameAction::Join).is_ok());
    }

    #[test]
    fn in_flight_tracker__create_slot_is_exclusive() {
        let mut tracker = InFlightTracker::default();
        tracker.begin_create().unwrap();
        assert!(tracker.begin_create().unwrap_err().is_validation());
        tracker.finish_create();
        assert!(tracker.begin_create().is_ok());
    }

    #[test]
    fn display_stake__uses_registry_decimals() {
        assert_eq!(display_stake("2500000000", "STABLEAI"), "2 STABLEAI");
        // unknown symbols fall back to the 18-decimal default
        assert_eq!(
            display_stake("3000000000000000000", "WETH"),
            "3 WETH"
        );
    }
}
