use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{info, warn};

use crate::error::MailError;
use crate::mailer::session::Outbound;

const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP submission session. Port 465 uses implicit TLS, any other port
/// upgrades with STARTTLS.
///
/// Each send opens, authenticates and QUITs its own connection, so there is
/// no socket to release and `close` keeps the trait's no-op default.
pub struct SmtpOutbound {
    server: String,
    port: u16,
    credentials: Credentials,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

// Build a transport and prove it by opening a connection, which runs the
// TLS handshake and AUTH
async fn open_transport(
    server: &str,
    port: u16,
    credentials: &Credentials,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let connection_error = |reason: String| MailError::Connection {
        server: format!("{}:{}", server, port),
        reason,
    };

    let builder = if port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(server)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
    }
    .map_err(|e| connection_error(e.to_string()))?;

    let transport = builder
        .port(port)
        .credentials(credentials.clone())
        .build();

    match transport.test_connection().await {
        Ok(true) => {
            info!("-- connected to {}:{}", server, port);
            Ok(transport)
        }
        Ok(false) => Err(connection_error("server did not answer NOOP".to_string())),
        Err(e) if e.is_permanent() => Err(MailError::Authentication(format!(
            "SMTP login rejected: {}",
            e
        ))),
        Err(e) => Err(connection_error(e.to_string())),
    }
}

impl SmtpOutbound {
    pub async fn connect(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, MailError> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        let transport = open_transport(server, port, &credentials).await?;
        info!("-- logged in as {}", username);

        Ok(Self {
            server: server.to_string(),
            port,
            credentials,
            transport,
        })
    }
}

#[async_trait]
impl Outbound for SmtpOutbound {
    async fn transmit(&mut self, message: &Message) -> Result<(), MailError> {
        let response = self.transport.send(message.clone()).await?;
        info!("-- message accepted: {}", response.code());
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), MailError> {
        warn!("-- reconnecting to {}:{}", self.server, self.port);
        self.transport = open_transport(&self.server, self.port, &self.credentials).await?;
        Ok(())
    }
}
