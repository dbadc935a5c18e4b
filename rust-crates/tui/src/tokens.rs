use crate::{
    error::{
        Error,
        Result,
    },
    units,
};
use fuels::types::{
    Address,
    AssetId,
};
use std::{
    str::FromStr,
    sync::LazyLock,
};
use tracing::warn;

/// Name shown for assets the registry does not know.
pub const UNKNOWN_TOKEN: &str = "Unknown Token";

/// Fractional digits shown for wallet balances.
pub const BALANCE_DISPLAY_DP: usize = 4;

/// One wagerable asset. The set is fixed configuration: listing a new token
/// means adding a row here, there is no on-chain discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub ticker: &'static str,
    pub name: &'static str,
    pub asset_id: AssetId,
    pub decimals: u32,
}

static SUPPORTED: LazyLock<Vec<TokenDescriptor>> = LazyLock::new(|| {
    vec![
        token(
            "STABLEAI",
            "Stable AI",
            "9642e4546520b6b4f7fe8b442acc3f0d1314e138011d121a862f3ef09cb3bac1",
        ),
        token(
            "DIG",
            "Dig",
            "29fa1817c2a1b2fa4ea6d659cd3375f80b797589e9a79ac1fe81c36d02ce6d33",
        ),
        token(
            "WEB9",
            "Web Nine",
            "6eb965ff347dff1ea96b0e5125432c9d5f0237b15a594baa5fbe9f60facb4d90",
        ),
        token(
            "BNKR",
            "Banker",
            "76792ed233481b31d73ed258bf8d961f646c347a94aa574b0eb678455d40618c",
        ),
        token(
            "FED",
            "Fed",
            "9b63988c55fd713f755e918ef3210d803b1087562202ba0e2c686f1f6e83df1e",
        ),
        token(
            "RATCHET",
            "Ratchet",
            "544868eb80f7f5d415900ff192e0548871fa23801e7e66cac946ef9ea938bfc9",
        ),
        token(
            "GIRTH",
            "Girth",
            "d41eb92e48c2f1702e99d3f8414f9370239a3ab9a799fe8b7590945f04c1f5b6",
        ),
    ]
});

fn token(ticker: &'static str, name: &'static str, hex: &str) -> TokenDescriptor {
    TokenDescriptor {
        ticker,
        name,
        asset_id: AssetId::from_str(hex).expect("registry asset id literals are valid"),
        decimals: 9,
    }
}

pub fn supported_tokens() -> &'static [TokenDescriptor] {
    &SUPPORTED
}

pub fn token_by_ticker(ticker: &str) -> Option<&'static TokenDescriptor> {
    SUPPORTED
        .iter()
        .find(|t| t.ticker.eq_ignore_ascii_case(ticker))
}

pub fn token_by_asset(asset: &AssetId) -> Option<&'static TokenDescriptor> {
    SUPPORTED.iter().find(|t| &t.asset_id == asset)
}

/// Display name for an asset, falling back to a sentinel for strangers.
pub fn token_name(asset: &AssetId) -> &'static str {
    token_by_asset(asset).map(|t| t.name).unwrap_or(UNKNOWN_TOKEN)
}

/// Balance and symbol of one token for one owner, normalized for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    /// Display units, `BALANCE_DISPLAY_DP` fractional digits.
    pub balance: String,
    /// Smallest units, for precondition checks.
    pub raw_balance: String,
}

/// A read-only source of asset balances.
pub trait BalanceReader {
    fn balance(
        &self,
        owner: &Address,
        asset: &AssetId,
    ) -> impl Future<Output = Result<u128>> + Send;
}

/// Production reader backed by a fuels provider.
#[derive(Clone)]
pub struct ProviderBalanceReader {
    provider: fuels::prelude::Provider,
    label: String,
}

impl ProviderBalanceReader {
    pub fn new(provider: fuels::prelude::Provider, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl BalanceReader for ProviderBalanceReader {
    async fn balance(&self, owner: &Address, asset: &AssetId) -> Result<u128> {
        self.provider
            .get_asset_balance(owner, asset)
            .await
            .map_err(|e| Error::fetch(format!("{}: {e}", self.label)))
    }
}

/// Resolves `{balance, symbol}` for a token, trying the primary connection
/// first and the fallback once on any failure. Two failures surface as one
/// classified error naming both endpoints.
pub struct TokenResolver<R> {
    primary: R,
    fallback: R,
}

impl<R: BalanceReader> TokenResolver<R> {
    pub fn new(primary: R, fallback: R) -> Self {
        Self { primary, fallback }
    }

    pub async fn resolve(
        &self,
        owner: &Address,
        token: &TokenDescriptor,
    ) -> Result<TokenMetadata> {
        let raw = self.balance(owner, &token.asset_id).await?;
        let raw_balance = raw.to_string();
        let balance =
            units::format_units(&raw_balance, token.decimals, BALANCE_DISPLAY_DP)?;
        Ok(TokenMetadata {
            symbol: token.ticker.to_string(),
            balance,
            raw_balance,
        })
    }

    pub async fn balance(&self, owner: &Address, asset: &AssetId) -> Result<u128> {
        let primary_err = match self.primary.balance(owner, asset).await {
            Ok(raw) => return Ok(raw),
            Err(e) => e,
        };
        warn!(%primary_err, "primary balance read failed; retrying on fallback");
        match self.fallback.balance(owner, asset).await {
            Ok(raw) => Ok(raw),
            Err(fallback_err) => Err(Error::fetch(format!(
                "both token connections failed: {primary_err}; {fallback_err}"
            ))),
        }
    }
}
