use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{arg, Command};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use latigo::browser::cdp::CdpBrowser;
use latigo::core::Account;
use latigo::display;
use latigo::provider::{Banregio, Hsbc, Provider};
use latigo::settings::Settings;
use latigo::CLIENT_NAME;

async fn run() -> Result<()> {
    let app = Command::new(CLIENT_NAME)
        .about(
            "The latigo utility logs in to a bank's online banking site with \
             a real browser, expands each account's transaction history to its \
             full extent, and prints the normalized records.",
        )
        .version("0.1.0")
        .subcommand_required(true)
        .allow_external_subcommands(false)
        .arg(arg!(CONFIG: -c --config [FILE] "Sets a custom config file"))
        .arg(arg!(verbose: -v --verbose [Boolean] "Sets the level of verbosity"))
        .subcommand(
            Command::new("pull")
                .about("Logs in to one provider and prints every transaction it can reach.")
                .arg(arg!(provider: <PROVIDER> "The provider to scrape, one of: hsbc, banregio")),
        );

    let matches = app.get_matches();

    if matches.value_of("verbose") == Some("true") {
        tracing_subscriber::registry()
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match matches.subcommand() {
        Some(("pull", pull_matches)) => {
            let settings = Settings::new(matches.value_of("CONFIG"))?;
            let provider = pull_matches
                .value_of("provider")
                .expect("provider is a required argument");

            pull(provider, settings).await?;
        }
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }

    Ok(())
}

async fn pull(name: &str, settings: Settings) -> Result<()> {
    let browser = CdpBrowser::launch(&settings.browser).await?;

    // Tear the browser process down on every exit path; a scrape failure
    // takes precedence over a teardown failure.
    let outcome = scrape(name, &settings, &browser).await;
    let closed = browser.close().await;
    let accounts = outcome?;
    closed?;

    display::print_accounts(std::io::stdout(), &accounts)?;

    Ok(())
}

async fn scrape(name: &str, settings: &Settings, browser: &CdpBrowser) -> Result<Vec<Account>> {
    let timeout = Duration::from_secs(settings.wait_secs);

    match name {
        "hsbc" => {
            let entry = settings
                .providers
                .hsbc
                .clone()
                .ok_or_else(|| anyhow!("no hsbc credentials configured"))?;
            let mut provider = Hsbc::new(entry.into(), browser).with_timeout(timeout);

            provider.login_to_account_home().await?;
            Ok(provider.get_transactions().await?)
        }
        "banregio" => {
            let entry = settings
                .providers
                .banregio
                .clone()
                .ok_or_else(|| anyhow!("no banregio credentials configured"))?;
            let mut provider = Banregio::new(entry.into(), browser).with_timeout(timeout);

            provider.login_to_account_home().await?;
            Ok(provider.get_transactions().await?)
        }
        other => bail!("unknown provider: {}", other),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        println!("{}", err);
        std::process::exit(1);
    }
}
