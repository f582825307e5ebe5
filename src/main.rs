mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    if args.verbose {
        init_logging();
    }
    cli::context::init(args.quiet);

    let result = cli::context::load_config(&args).and_then(|config| match &args.command {
        Commands::Keys {
            pattern,
            mail,
            secret,
            json,
        } => cli::commands::keys::execute(
            &config,
            pattern.as_deref(),
            mail.as_deref(),
            *secret,
            *json,
        ),
        Commands::Encrypt {
            selection,
            recipient,
            symmetric,
            input,
        } => cli::commands::encrypt::execute(
            &config,
            selection,
            recipient.as_deref(),
            *symmetric,
            input.as_deref(),
        ),
        Commands::Decrypt { selection, input } => {
            cli::commands::decrypt::execute(&config, selection, input.as_deref())
        }
    });

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Route `tracing` events to stderr. `RUST_LOG` overrides the default filter.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgpmate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
