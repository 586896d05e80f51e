use async_imap::{Client, Session};
use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use log::{debug, info, warn};

use crate::error::MailError;
use crate::mailer::session::Inbound;

type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

// Establish a TLS-encrypted connection to the IMAP server
async fn connect_to_server(server: &str, port: u16) -> Result<TlsStream<TcpStream>, MailError> {
    let connection_error = |reason: String| MailError::Connection {
        server: format!("{}:{}", server, port),
        reason,
    };

    let tcp_stream = TcpStream::connect((server, port))
        .await
        .map_err(|e| connection_error(e.to_string()))?;
    let tls = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
    let tls_stream = tls
        .connect(server, tcp_stream)
        .await
        .map_err(|e| connection_error(e.to_string()))?;

    info!("-- connected to {}:{}", server, port);
    Ok(tls_stream)
}

// Login to the IMAP server and return an authenticated session
async fn login_to_server(
    client: Client<Compat<TlsStream<TcpStream>>>,
    username: &str,
    password: &str,
) -> Result<ImapSession, MailError> {
    let imap_session = client
        .login(username, password)
        .await
        .map_err(|(e, _client)| MailError::Authentication(format!("IMAP login rejected: {}", e)))?;

    info!("-- logged in as {}", username);
    Ok(imap_session)
}

/// IMAP session over implicit TLS.
pub struct ImapInbound {
    session: ImapSession,
}

impl ImapInbound {
    pub async fn connect(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, MailError> {
        let tls_stream = connect_to_server(server, port).await?;
        let client = Client::new(tls_stream.compat());
        let session = login_to_server(client, username, password).await?;
        Ok(Self { session })
    }
}

#[async_trait]
impl Inbound for ImapInbound {
    async fn select(&mut self, mailbox: &str) -> Result<(), MailError> {
        let mailbox_data = self.session.select(mailbox).await?;
        info!("-- {} selected ({} messages)", mailbox, mailbox_data.exists);
        Ok(())
    }

    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError> {
        let ids = self.session.search(query).await?;
        debug!("-- search {} matched {} messages", query, ids.len());
        Ok(ids.into_iter().collect())
    }

    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>, MailError> {
        let messages_stream = self.session.fetch(id.to_string(), "RFC822").await?;
        let messages: Vec<_> = messages_stream.try_collect().await?;

        messages
            .iter()
            .find_map(|message| message.body().map(<[u8]>::to_vec))
            .ok_or_else(|| MailError::Fetch {
                id,
                reason: "server returned no message body".to_string(),
            })
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        // Be nice to the server and log out
        if let Err(e) = self.session.logout().await {
            warn!("IMAP logout failed: {}", e);
            return Err(e.into());
        }
        info!("-- logged out");
        Ok(())
    }
}
