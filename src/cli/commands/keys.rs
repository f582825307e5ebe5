use colored::Colorize;

use pgpmate::adapters::loaders::uid_loader::UidKeyDetailsLoader;
use pgpmate::config::app_config::AppConfig;
use pgpmate::core::models::key::Key;
use pgpmate::core::services::key_resolver::KeyResolver;
use pgpmate::core::traits::key_details_loader::KeyDetailsLoader;
use pgpmate::{KeyDetails, Result};

use crate::cli::context;
use crate::cli::output;

/// Execute the `pgpmate keys` command.
///
/// Lists the keys matching `pattern` in backend order. Each key is numbered
/// by its position among all keys on the host, which is the number
/// `--key-index` takes. With `mail`, keys preferred for that address are
/// marked.
pub fn execute(
    config: &AppConfig,
    pattern: Option<&str>,
    mail: Option<&str>,
    secret: bool,
    json: bool,
) -> Result<()> {
    let service = context::build_service(config)?;
    let pattern = pattern.unwrap_or("");

    let keys: Vec<KeyDetails> = if secret {
        load_details(&service.list_secret_keys(pattern)?)
    } else if pattern.is_empty() {
        service.keys().to_vec()
    } else {
        load_details(&service.registry().try_list_keys(pattern)?)
    };

    if json {
        let rendered = serde_json::to_string_pretty(&keys).map_err(std::io::Error::other)?;
        println!("{rendered}");
        return Ok(());
    }

    if keys.is_empty() {
        match service.registry().last_load_error() {
            Some(err) if pattern.is_empty() && !secret => output::warning(&err.to_string()),
            _ => output::warning(&format!("No keys found matching '{pattern}'.")),
        }
        return Ok(());
    }

    let preferred: Vec<&str> = mail
        .map(|m| {
            KeyResolver::preferred_keys(&keys, m)
                .map(KeyDetails::fingerprint)
                .collect()
        })
        .unwrap_or_default();

    output::header(&format!("OpenPGP keys ({})", keys.len()));
    for details in &keys {
        let index = service
            .keys()
            .iter()
            .position(|d| d.fingerprint() == details.fingerprint());
        let marked = mail.map(|_| preferred.contains(&details.fingerprint()));
        print_key(index, details, marked);
    }

    Ok(())
}

fn load_details(keys: &[Key]) -> Vec<KeyDetails> {
    keys.iter().map(|k| UidKeyDetailsLoader.load(k)).collect()
}

/// Short algorithm label in GnuPG's style, such as `rsa3072`.
fn algorithm_label(details: &KeyDetails) -> Option<String> {
    let name = match details.algorithm()? {
        1..=3 => "rsa",
        16 | 20 => "elg",
        17 => "dsa",
        18 => "ecdh",
        19 => "ecdsa",
        22 => "eddsa",
        _ => "unknown",
    };
    Some(match details.length() {
        Some(bits) => format!("{name}{bits}"),
        None => name.to_string(),
    })
}

fn print_key(index: Option<usize>, details: &KeyDetails, preferred: Option<bool>) {
    let marker = match preferred {
        Some(true) => format!(" {}", "★ preferred".green()),
        _ => String::new(),
    };
    // Keys missing from the host-wide list cannot be picked by index.
    let index = index.map_or_else(|| "-".to_string(), |i| i.to_string());
    println!("  [{index}] {}{marker}", details.fingerprint().cyan());

    let mut facts = vec![format!(
        "created {}",
        details
            .created()
            .map(|c| c.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".into())
    )];
    if let Some(expires) = details.expires() {
        facts.push(format!("expires {}", expires.format("%Y-%m-%d")));
    }
    if let Some(label) = algorithm_label(details) {
        facts.push(label);
    }
    facts.push(format!("validity {:?}", details.validity()));
    if details.has_secret() {
        facts.push("secret".into());
    }
    println!("      {}", facts.join(", "));

    for uid in details.user_ids() {
        println!("      {uid}");
    }
}
