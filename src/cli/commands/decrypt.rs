use std::path::Path;

use pgpmate::config::app_config::AppConfig;
use pgpmate::{PgpError, Result};

use crate::cli::context;
use crate::cli::KeySelection;

/// Execute the `pgpmate decrypt` command.
///
/// Prints the plaintext to stdout. gpg-agent may prompt for the key's
/// passphrase; the call blocks until it is answered.
pub fn execute(config: &AppConfig, selection: &KeySelection, input: Option<&Path>) -> Result<()> {
    let text = context::read_input(input)?;
    let mut service = context::build_service(config)?;

    let (fingerprint, _) = context::resolve_key(&mut service, selection, config)?.ok_or_else(
        || PgpError::InvalidConfig {
            detail: "No key selected. Use --fingerprint or --key-index.".into(),
        },
    )?;

    let result = service.decrypt(&text, &fingerprint);
    context::emit(result, &format!("Decrypted with {fingerprint}"))
}
