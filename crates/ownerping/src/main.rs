use clap::Parser;
use tokio::runtime::Runtime;

use ownerping::cli::{Cli, Commands};
use ownerping::config::{encryption_key_from_env, Config, Settings};
use ownerping::credentials::CredentialStore;
use ownerping::fernet::FernetKey;
use ownerping::logging;
use ownerping::orchestrator::{run_notify, Outcome};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let rt = Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Notify { dry_run } => {
                let config = Config::load(cli.config.clone())?;

                match run_notify(&config, dry_run).await? {
                    Outcome::DryRun { message, .. } => {
                        println!("{}", message.text);
                    }
                    Outcome::Delivered(delivery) if delivery.is_success() => {
                        println!("Successfully sent notification");
                    }
                    // Exit code: 0 = notified, 1 = anything else
                    Outcome::Delivered(delivery) => {
                        println!(
                            "Failed to send notification, status code: {}",
                            delivery.status
                        );
                        std::process::exit(1);
                    }
                    Outcome::Unreachable(err) => {
                        println!("Failed to send notification: {:#}", anyhow::Error::from(err));
                        std::process::exit(1);
                    }
                }
            }
            Commands::Encrypt { input, output } => {
                let settings = Settings::load(cli.config.clone())?;
                let key = encryption_key_from_env()?;

                let mut paths = settings.paths.clone();
                if let Some(out) = output {
                    paths.encrypted_table = out;
                }
                let store = CredentialStore::new(&paths, &settings.table);
                let rows = store.seal(&key, &input)?;
                println!(
                    "Encrypted {rows} user mapping(s) into {}",
                    store.encrypted_path().display()
                );
            }
            Commands::Keygen => {
                println!("{}", FernetKey::generate().to_base64());
            }
            Commands::Version { json } => {
                if json {
                    let info = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "commit": option_env!("GIT_SHA").unwrap_or("unknown"),
                        "build_date": option_env!("BUILD_DATE").unwrap_or("unknown"),
                    });
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    println!(
                        "ownerping {} (commit: {}, built: {})",
                        env!("CARGO_PKG_VERSION"),
                        option_env!("GIT_SHA").unwrap_or("unknown"),
                        option_env!("BUILD_DATE").unwrap_or("unknown"),
                    );
                }
            }
        }
        Ok(())
    })
}
