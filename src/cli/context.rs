use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use pgpmate::adapters::cipher::gpg_backend::GpgBackend;
use pgpmate::adapters::loaders::uid_loader::UidKeyDetailsLoader;
use pgpmate::config::app_config::AppConfig;
use pgpmate::{KeyDetails, PgpError, PgpService, Result};

use crate::cli::{Cli, KeySelection, output};

pub type Service = PgpService<GpgBackend, UidKeyDetailsLoader>;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Record global output settings.
pub fn init(quiet: bool) {
    let _ = QUIET.set(quiet);
}

pub fn quiet() -> bool {
    QUIET.get().copied().unwrap_or(false)
}

/// Load the config file and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(gpg) = &cli.gpg {
        config.gpg.binary = gpg.clone();
    }
    if let Some(homedir) = &cli.homedir {
        config.gpg.homedir = Some(homedir.clone());
    }
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Check that gpg runs, then build the service. Blocks while every key on
/// the host is listed.
pub fn build_service(config: &AppConfig) -> Result<Service> {
    let backend = config.gpg_backend();
    if !backend.is_available() {
        return Err(PgpError::BackendUnavailable {
            detail: format!("'{}' could not be run", backend.gpg_path().display()),
        });
    }

    let sp = output::spinner("Loading keys...");
    let service = PgpService::new(backend, UidKeyDetailsLoader);
    sp.finish_and_clear();

    if let Some(err) = service.registry().last_load_error() {
        tracing::debug!("initial key load: {err}");
    }
    Ok(service)
}

/// Read the whole input, from `path` or stdin.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(PgpError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("input file not found: {}", path.display()),
                )));
            }
            Ok(std::fs::read_to_string(path)?)
        }
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Resolve the key a command should use.
///
/// A key index into the loaded keys or an explicit fingerprint (clap keeps
/// them exclusive), else the configured default fingerprint. Returns the
/// fingerprint and the loaded details for it, when known.
pub fn resolve_key(
    service: &mut Service,
    selection: &KeySelection,
    config: &AppConfig,
) -> Result<Option<(String, Option<KeyDetails>)>> {
    if let Some(index) = selection.key_index {
        service.set_selected_key_index(index)?;
        let details = service
            .selected_key()
            .cloned()
            .ok_or(PgpError::InvalidSelection {
                index,
                available: service.num_keys(),
            })?;
        return Ok(Some((details.fingerprint().to_string(), Some(details))));
    }

    let fingerprint = selection
        .fingerprint
        .clone()
        .or_else(|| config.defaults.fingerprint.clone());

    Ok(fingerprint.map(|fp| {
        let details = service.registry().find_by_fingerprint(&fp).cloned();
        (fp, details)
    }))
}

/// Print a successful payload to stdout, or turn a failed report into an error.
pub fn emit(result: pgpmate::OperationResult, done: &str) -> Result<()> {
    let payload = result.into_result()?;
    print!("{payload}");
    output::success(done);
    Ok(())
}
