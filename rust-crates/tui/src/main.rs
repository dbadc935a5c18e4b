use color_eyre::eyre::{
    Result,
    eyre,
};
use flip_client::{
    client,
    wallets,
};
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: flip-client [--devnet | --testnet | --local] [--rpc-url <url>]\n\
         [--fallback-rpc-url <url>] [--wallet <name>] [--wallet-dir <path>]\n\
         [--indexer-url <url>]\n\
         \n\
         Flags:\n\
           --devnet                 Connect to Fuel devnet (default RPC {})\n\
           --testnet                Connect to Fuel testnet (default RPC {})\n\
           --local                  Connect to a local Fuel node (default RPC {})\n\
           --rpc-url <url>          Override the RPC URL for the selected network\n\
           --fallback-rpc-url <url> Override the fallback read-only RPC URL\n\
           --wallet <name>          forc-wallet profile to play with (omit for read-only)\n\
           --wallet-dir <path>      Override forc-wallet directory (defaults to ~/.fuel/wallets)\n\
           --indexer-url <url>      Point the client at the query service HTTP endpoint",
        client::DEFAULT_DEVNET_RPC_URL,
        client::DEFAULT_TESTNET_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Devnet,
        Testnet,
        Local,
    }

    let mut args = std::env::args().skip(1);
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut custom_fallback_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut indexer_url: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--devnet" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Devnet);
            }
            "--testnet" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Testnet);
            }
            "--local" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                network_flag = Some(NetworkFlag::Local);
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--devnet/--testnet/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--fallback-rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--fallback-rpc-url requires a URL argument"))?;
                if custom_fallback_url.is_some() {
                    return Err(eyre!("--fallback-rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--fallback-rpc-url must follow a network flag (--devnet/--testnet/--local)"
                    ));
                }
                custom_fallback_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--indexer-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--indexer-url requires a URL argument"))?;
                if indexer_url.is_some() {
                    return Err(eyre!("--indexer-url may only be specified once"));
                }
                indexer_url = Some(url);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let urls = |default_url: &str, default_fallback: &str| {
        (
            custom_url.clone().unwrap_or_else(|| default_url.to_string()),
            custom_fallback_url
                .clone()
                .unwrap_or_else(|| default_fallback.to_string()),
        )
    };
    let network = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --devnet, --testnet, or --local"
            ));
        }
        Some(NetworkFlag::Devnet) => {
            let (url, fallback_url) = urls(
                client::DEFAULT_DEVNET_RPC_URL,
                client::DEFAULT_DEVNET_FALLBACK_RPC_URL,
            );
            client::NetworkTarget::Devnet { url, fallback_url }
        }
        Some(NetworkFlag::Testnet) => {
            let (url, fallback_url) = urls(
                client::DEFAULT_TESTNET_RPC_URL,
                client::DEFAULT_TESTNET_FALLBACK_RPC_URL,
            );
            client::NetworkTarget::Testnet { url, fallback_url }
        }
        Some(NetworkFlag::Local) => {
            let (url, fallback_url) = urls(
                client::DEFAULT_LOCAL_RPC_URL,
                client::DEFAULT_LOCAL_FALLBACK_RPC_URL,
            );
            client::NetworkTarget::LocalNode { url, fallback_url }
        }
    };

    let wallet = match wallet_name {
        Some(owner) => {
            let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
            Some(client::WalletConfig::ForcKeystore { owner, dir })
        }
        None => None,
    };

    Ok(client::AppConfig {
        network,
        wallet,
        indexer_url,
    })
}

/// Log to files rather than the terminal the UI draws on. The guard must
/// outlive the app so buffered lines are flushed on exit.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily("logs", "flip-client.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _guard = init_tracing();
    tracing::info!("starting flip-client");
    deployments::ensure_structure().map_err(|e| eyre!(e))?;
    let app_config = parse_cli_args()?;
    client::run_app(app_config).await
}
