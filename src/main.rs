use postbox::logging;
use postbox::mailer::display;
use postbox::mailer::encryption::CredentialStore;
use postbox::settings::{self, SETTINGS_PATH};
use postbox::{Mailer, ReadOutcome, ReadRequest};
use log::{info, LevelFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::setup_logger(LevelFilter::Info)?;

    let settings = settings::load_settings(SETTINGS_PATH)?;
    let password = CredentialStore::default().password(&settings.email_address)?;

    let mut mailer = Mailer::connect(settings, &password).await?;
    match mailer.read(ReadRequest::default().amount(10)).await? {
        ReadOutcome::Messages(messages) => display::display_messages(&messages),
        ReadOutcome::NoMessages => info!("No emails found."),
    }

    mailer.disconnect().await?;
    Ok(())
}
