use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::adapters::cipher::colon_listing::ColonKeyReader;
use crate::core::errors::BackendError;
use crate::core::models::key::Key;
use crate::core::traits::backend::{
    BackendSession, CryptoBackend, KeyListing, Protocol, TrustPolicy,
};

/// Exit code reported when the gpg binary could not be run at all.
pub const SPAWN_FAILED: i32 = 127;

/// GnuPG's `GPG_ERR_NO_PUBKEY`.
pub const NO_PUBKEY: i32 = 9;

/// OpenPGP backend that shells out to the system `gpg` binary.
///
/// Every session runs its own `gpg` processes; nothing is cached between
/// sessions. Passphrase prompts go through gpg-agent and block the calling
/// thread until answered.
#[derive(Debug, Clone)]
pub struct GpgBackend {
    /// Path to the gpg binary (defaults to "gpg").
    gpg_path: PathBuf,
    /// Alternative keyring directory (`--homedir`).
    homedir: Option<PathBuf>,
}

impl GpgBackend {
    /// Create a new backend using the default `gpg` binary.
    pub fn new() -> Self {
        Self {
            gpg_path: PathBuf::from("gpg"),
            homedir: None,
        }
    }

    /// Create a new backend with a custom gpg binary path.
    pub fn with_path(gpg_path: PathBuf) -> Self {
        Self {
            gpg_path,
            homedir: None,
        }
    }

    /// Use `homedir` instead of the default keyring location.
    pub fn with_homedir(mut self, homedir: PathBuf) -> Self {
        self.homedir = Some(homedir);
        self
    }

    pub fn gpg_path(&self) -> &Path {
        &self.gpg_path
    }

    /// Check if GPG is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .is_ok_and(|o| o.status.success())
    }
}

impl Default for GpgBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoBackend for GpgBackend {
    type Session = GpgSession;

    fn open_session(&self, protocol: Protocol) -> Result<Self::Session, BackendError> {
        match protocol {
            Protocol::OpenPgp => {
                tracing::debug!(gpg = %self.gpg_path.display(), "opening gpg session");
                Ok(GpgSession {
                    gpg_path: self.gpg_path.clone(),
                    homedir: self.homedir.clone(),
                    armor: false,
                    text_mode: false,
                })
            }
        }
    }

    fn name(&self) -> &str {
        "gpg"
    }
}

/// One gpg session: the binary, keyring and output flags for a single call.
pub struct GpgSession {
    gpg_path: PathBuf,
    homedir: Option<PathBuf>,
    armor: bool,
    text_mode: bool,
}

impl GpgSession {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.gpg_path);
        if let Some(homedir) = &self.homedir {
            cmd.arg("--homedir").arg(homedir);
        }
        cmd.args(["--batch", "--yes"]);
        cmd
    }

    /// Output flags shared by the encrypt operations.
    fn output_args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if self.armor {
            args.push("--armor");
        }
        if self.text_mode {
            args.push("--textmode");
        }
        args
    }

    /// Run gpg with `input` on stdin and return stdout on success.
    fn run_gpg(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.gpg_path, e))?;
        let stdin = child.stdin.take();

        // gpg writes output while still reading input, so stdin is fed from
        // its own thread and closed there once everything is written.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output =
            output.map_err(|e| BackendError::new(-1, format!("gpg process failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::new(
                output.status.code().unwrap_or(-1),
                stderr.trim().to_string(),
            ));
        }

        written
            .map_err(|e| BackendError::new(-1, format!("Failed to write to gpg stdin: {e}")))?;
        Ok(output.stdout)
    }
}

fn spawn_error(gpg_path: &Path, e: std::io::Error) -> BackendError {
    BackendError::new(
        SPAWN_FAILED,
        format!("Failed to run {}: {e}", gpg_path.display()),
    )
}

/// Arguments for an asymmetric encryption to `recipients`.
fn encrypt_args<'a>(
    output_args: Vec<&'a str>,
    recipients: &'a [Key],
    trust: TrustPolicy,
) -> Vec<&'a str> {
    let mut args = vec!["--encrypt"];
    args.extend(output_args);
    if trust == TrustPolicy::AlwaysTrust {
        args.extend(["--trust-model", "always"]);
    }
    for key in recipients {
        args.extend(["--recipient", key.fingerprint.as_str()]);
    }
    args
}

impl BackendSession for GpgSession {
    fn set_armor(&mut self, armor: bool) {
        self.armor = armor;
    }

    fn set_text_mode(&mut self, text_mode: bool) {
        self.text_mode = text_mode;
    }

    fn start_key_listing(
        &mut self,
        pattern: &str,
        secret_only: bool,
    ) -> Result<KeyListing<'_>, BackendError> {
        let mut cmd = self.command();
        cmd.args(["--with-colons", "--fixed-list-mode"]);
        cmd.arg(if secret_only {
            "--list-secret-keys"
        } else {
            "--list-keys"
        });
        if !pattern.is_empty() {
            cmd.arg("--").arg(pattern);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.gpg_path, e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::new(-1, "gpg stdout was not captured"))?;

        Ok(Box::new(GpgKeyListing {
            reader: Some(ColonKeyReader::new(BufReader::new(stdout))),
            child: Some(child),
        }))
    }

    fn key(&mut self, fingerprint: &str) -> Result<Key, BackendError> {
        if fingerprint.is_empty() {
            return Err(BackendError::new(NO_PUBKEY, "No public key"));
        }
        let listing = self.start_key_listing(fingerprint, false)?;
        for item in listing {
            match item {
                Ok(key) if key.fingerprint == fingerprint => return Ok(key),
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        Err(BackendError::new(NO_PUBKEY, "No public key"))
    }

    fn encrypt_symmetric(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut args = vec!["--symmetric"];
        args.extend(self.output_args());
        self.run_gpg(&args, plaintext)
    }

    fn encrypt(
        &mut self,
        recipients: &[Key],
        plaintext: &[u8],
        trust: TrustPolicy,
    ) -> Result<Vec<u8>, BackendError> {
        if recipients.is_empty() {
            return Err(BackendError::new(-1, "No recipients provided"));
        }
        let args = encrypt_args(self.output_args(), recipients, trust);
        self.run_gpg(&args, plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, BackendError> {
        self.run_gpg(&["--decrypt"], ciphertext)
    }
}

/// Keys streamed from a running `gpg --list-keys`. A non-zero exit is
/// reported as a final error item after the parsed keys.
struct GpgKeyListing {
    reader: Option<ColonKeyReader<BufReader<ChildStdout>>>,
    child: Option<Child>,
}

impl GpgKeyListing {
    /// Close stdout and reap gpg. Dropping the reader first means a gpg
    /// still writing gets a broken pipe instead of blocking the wait.
    fn finish(&mut self) -> Option<BackendError> {
        self.reader = None;
        let child = self.child.take()?;
        match child.wait_with_output() {
            Ok(output) if output.status.success() => None,
            Ok(output) => Some(BackendError::new(
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Err(e) => Some(BackendError::new(-1, format!("gpg process failed: {e}"))),
        }
    }
}

impl Iterator for GpgKeyListing {
    type Item = Result<Key, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.reader.as_mut()?.next();
        match item {
            Some(Ok(key)) => Some(Ok(key)),
            Some(Err(e)) => {
                self.finish();
                Some(Err(e))
            }
            None => self.finish().map(Err),
        }
    }
}

impl Drop for GpgKeyListing {
    fn drop(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_gpg() -> GpgBackend {
        GpgBackend::with_path(PathBuf::from("/nonexistent/bin/gpg-missing"))
    }

    #[test]
    fn gpg_backend_has_correct_name() {
        let backend = GpgBackend::new();
        assert_eq!(backend.name(), "gpg");
    }

    #[test]
    fn missing_binary_is_not_available() {
        assert!(!missing_gpg().is_available());
    }

    #[test]
    fn listing_with_missing_binary_fails_to_start() {
        let mut session = missing_gpg().open_session(Protocol::OpenPgp).unwrap();
        let err = session.start_key_listing("", false).err().unwrap();
        assert_eq!(err.code, SPAWN_FAILED);
    }

    #[test]
    fn lookup_of_empty_fingerprint_is_no_pubkey() {
        let mut session = missing_gpg().open_session(Protocol::OpenPgp).unwrap();
        let err = session.key("").unwrap_err();
        assert_eq!(err.code, NO_PUBKEY);
    }

    #[test]
    fn lookup_with_missing_binary_fails() {
        let mut session = missing_gpg().open_session(Protocol::OpenPgp).unwrap();
        assert!(session.key("ABCDEF").is_err());
    }

    #[test]
    fn encrypt_no_recipients_fails() {
        let mut session = GpgBackend::new().open_session(Protocol::OpenPgp).unwrap();
        let result = session.encrypt(&[], b"data", TrustPolicy::AlwaysTrust);
        assert!(result.is_err());
    }

    #[test]
    fn encrypt_args_include_trust_model_and_recipients() {
        let keys = [Key::new("FP1", &[]), Key::new("FP2", &[])];
        let args = encrypt_args(vec!["--armor", "--textmode"], &keys, TrustPolicy::AlwaysTrust);
        assert_eq!(
            args,
            [
                "--encrypt",
                "--armor",
                "--textmode",
                "--trust-model",
                "always",
                "--recipient",
                "FP1",
                "--recipient",
                "FP2",
            ]
        );
    }

    #[test]
    fn default_trust_omits_trust_model() {
        let keys = [Key::new("FP1", &[])];
        let args = encrypt_args(Vec::new(), &keys, TrustPolicy::Default);
        assert_eq!(args, ["--encrypt", "--recipient", "FP1"]);
    }

    #[test]
    fn session_flags_drive_output_args() {
        let mut session = GpgBackend::new().open_session(Protocol::OpenPgp).unwrap();
        assert!(session.output_args().is_empty());
        session.set_armor(true);
        session.set_text_mode(true);
        assert_eq!(session.output_args(), ["--armor", "--textmode"]);
    }

    /// Install a shell script as the gpg binary.
    #[cfg(unix)]
    fn scripted_gpg(dir: &tempfile::TempDir, body: &str) -> GpgBackend {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("gpg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        GpgBackend::with_path(path)
    }

    #[cfg(unix)]
    #[test]
    fn large_input_streams_through_gpg() {
        let dir = tempfile::tempdir().unwrap();
        let backend = scripted_gpg(&dir, "exec cat");
        let mut session = backend.open_session(Protocol::OpenPgp).unwrap();

        let input = vec![b'a'; 2 << 20];
        let output = session.encrypt_symmetric(&input).unwrap();
        assert_eq!(output.len(), input.len());

        let output = session.decrypt(&input).unwrap();
        assert_eq!(output, input);
    }

    #[cfg(unix)]
    #[test]
    fn failing_gpg_reports_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let backend = scripted_gpg(&dir, "echo 'gpg: decryption failed: No secret key' >&2\nexit 2");
        let mut session = backend.open_session(Protocol::OpenPgp).unwrap();

        let err = session.decrypt(b"whatever").unwrap_err();
        assert_eq!(err.code, 2);
        assert_eq!(err.message, "gpg: decryption failed: No secret key");
    }

    #[cfg(unix)]
    #[test]
    fn listing_keeps_keys_with_latin1_user_ids() {
        let dir = tempfile::tempdir().unwrap();
        let backend = scripted_gpg(
            &dir,
            "printf 'pub:u:255:22:1111111111111111:1700000000:::u:::scESC::::::::0:\\n'\n\
             printf 'fpr:::::::::FP1:\\n'\n\
             printf 'uid:u::::1700000000::H1::M\\374ller <m@x.org>::::::::::0:\\n'\n\
             printf 'pub:u:255:22:2222222222222222:1700000000:::u:::scESC::::::::0:\\n'\n\
             printf 'fpr:::::::::FP2:\\n'",
        );
        let mut session = backend.open_session(Protocol::OpenPgp).unwrap();

        let keys: Vec<Key> = session
            .start_key_listing("", false)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let fingerprints: Vec<_> = keys.iter().map(|k| k.fingerprint.as_str()).collect();
        assert_eq!(fingerprints, ["FP1", "FP2"]);

        assert_eq!(session.key("FP1").unwrap().fingerprint, "FP1");
        assert_eq!(session.key("FP3").unwrap_err().code, NO_PUBKEY);
    }

    #[cfg(unix)]
    #[test]
    fn listing_that_exits_non_zero_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = scripted_gpg(
            &dir,
            "printf 'pub:u:255:22:1111111111111111:1700000000:::u:::scESC::::::::0:\\n'\n\
             printf 'fpr:::::::::FP1:\\n'\n\
             echo 'gpg: keydb_search failed' >&2\n\
             exit 2",
        );
        let mut session = backend.open_session(Protocol::OpenPgp).unwrap();

        let items: Vec<_> = session.start_key_listing("", false).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().fingerprint, "FP1");
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.code, 2);
        assert!(err.message.contains("keydb_search failed"));
    }

    #[test]
    fn homedir_is_passed_first() {
        let backend = GpgBackend::new().with_homedir(PathBuf::from("/tmp/keyring"));
        let session = backend.open_session(Protocol::OpenPgp).unwrap();
        let cmd = session.command();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["--homedir", "/tmp/keyring", "--batch", "--yes"]);
    }
}
