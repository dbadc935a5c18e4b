use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    crypto::SecretKey,
    prelude::{
        Provider,
        Wallet,
        derivation::DEFAULT_DERIVATION_PATH,
        private_key::PrivateKeySigner,
    },
};
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

/// Password source for non-interactive runs.
pub const PASSWORD_ENV_VAR: &str = "FLIP_WALLET_PASSWORD";

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fuel").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

/// Keystore files in `dir`, sorted by name. A missing directory is an empty
/// list, not an error; a wallet may not have been created yet.
pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let path = entry.wrap_err("Failed to read wallet entry")?.path();
        let is_keystore = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("wallet");
        if !is_keystore {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor { name, path });
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    list_wallets(dir)?
        .into_iter()
        .find(|wallet| wallet.name == name)
        .ok_or_else(|| {
            eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy())
        })
}

/// Decrypt a keystore and bind it to a provider. The password comes from
/// `FLIP_WALLET_PASSWORD` when set, otherwise from an interactive prompt.
/// Keystores may hold a raw secret key or a mnemonic phrase.
pub fn unlock_wallet(
    descriptor: &WalletDescriptor,
    provider: &Provider,
) -> Result<Wallet> {
    let password = match std::env::var(PASSWORD_ENV_VAR) {
        Ok(password) => password,
        Err(_) => {
            let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
            prompt_password(prompt).wrap_err("Failed to read wallet password")?
        }
    };

    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;

    if let Ok(secret_key) = SecretKey::try_from(secret.as_slice()) {
        let signer = PrivateKeySigner::new(secret_key);
        return Ok(Wallet::new(signer, provider.clone()));
    }

    if let Ok(mnemonic) = std::str::from_utf8(&secret)
        && mnemonic.split_whitespace().count() >= 12
    {
        let private_key = SecretKey::new_from_mnemonic_phrase_with_path(
            mnemonic,
            DEFAULT_DERIVATION_PATH,
        )?;
        return Ok(Wallet::new(
            PrivateKeySigner::new(private_key),
            provider.clone(),
        ));
    }

    Err(eyre!(
        "Wallet '{}' contained unsupported key material",
        descriptor.name
    ))
}
