use std::path::Path;

use pgpmate::config::app_config::AppConfig;
use pgpmate::{PgpError, Result};

use crate::cli::context;
use crate::cli::output;
use crate::cli::KeySelection;

/// Execute the `pgpmate encrypt` command.
///
/// Prints the armored ciphertext to stdout. Without `--symmetric`, the key
/// is found by listing keys for the recipient address and matching the
/// fingerprint exactly.
pub fn execute(
    config: &AppConfig,
    selection: &KeySelection,
    recipient: Option<&str>,
    symmetric: bool,
    input: Option<&Path>,
) -> Result<()> {
    let symmetric = symmetric || config.defaults.symmetric;
    let text = context::read_input(input)?;
    let mut service = context::build_service(config)?;

    if symmetric {
        let result = service.encrypt(&text, "", "", true);
        return context::emit(result, "Encrypted with passphrase");
    }

    let (fingerprint, details) = context::resolve_key(&mut service, selection, config)?
        .ok_or_else(|| PgpError::InvalidConfig {
            detail: "No key selected. Use --fingerprint, --key-index or --symmetric.".into(),
        })?;

    let recipient = recipient
        .map(str::to_string)
        .or_else(|| config.defaults.recipient.clone())
        .or_else(|| {
            details
                .as_ref()
                .and_then(|d| d.mail_addresses().first().cloned())
        })
        .unwrap_or_default();

    if let Some(details) = &details {
        if !details.validity().is_usable() {
            output::warning(&format!(
                "Key {} is {:?}; gpg will likely refuse it",
                details.key_id(),
                details.validity()
            ));
        }
        if !recipient.is_empty() && !service.is_preferred_key(details, &recipient) {
            output::warning(&format!(
                "Key {} has no address matching '{recipient}'",
                details.key_id()
            ));
        }
    }

    tracing::debug!(%fingerprint, %recipient, "encrypting");
    let result = service.encrypt(&text, &fingerprint, &recipient, false);
    context::emit(result, &format!("Encrypted for {fingerprint}"))
}
