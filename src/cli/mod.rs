pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Discover OpenPGP keys and encrypt or decrypt text with them.
#[derive(Parser, Debug)]
#[command(name = "pgpmate", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path or name of the gpg binary (overrides the config file)
    #[arg(long, global = true, env = "PGPMATE_GPG")]
    pub gpg: Option<PathBuf>,

    /// GnuPG home directory to use instead of the default keyring
    #[arg(long, global = true, env = "GNUPGHOME")]
    pub homedir: Option<PathBuf>,

    /// Path to alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the OpenPGP keys available on this host
    Keys {
        /// Only keys matching this pattern (name, mail or fingerprint)
        pattern: Option<String>,
        /// Mark keys preferred for this mail address
        #[arg(long)]
        mail: Option<String>,
        /// Only keys whose secret part is available
        #[arg(long)]
        secret: bool,
        /// Print the key details as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt text read from a file or stdin
    Encrypt {
        #[command(flatten)]
        selection: KeySelection,
        /// Recipient mail address used to look up the key
        #[arg(long, short)]
        recipient: Option<String>,
        /// Encrypt with a passphrase instead of a key
        #[arg(long, short)]
        symmetric: bool,
        /// Read input from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Decrypt armored text read from a file or stdin
    Decrypt {
        #[command(flatten)]
        selection: KeySelection,
        /// Read input from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
}

/// Which key to use: an explicit fingerprint or a position in `pgpmate keys`.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct KeySelection {
    /// Fingerprint of the key to use
    #[arg(long, short)]
    pub fingerprint: Option<String>,
    /// Index of the key as listed by `pgpmate keys`
    #[arg(long, short = 'k')]
    pub key_index: Option<usize>,
}
