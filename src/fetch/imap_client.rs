//! IMAP over implicit TLS, using the `imap` crate with `native-tls`.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info};

use crate::config::ImapConfig;
use crate::error::{MailcloudError, Result};

use super::MailSource;

/// An authenticated session on one server.
pub struct ImapSource {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl ImapSource {
    /// Open a TLS connection and log in with an account / app-password pair.
    pub fn connect(config: &ImapConfig, password: &str) -> Result<Self> {
        let host = config.host.as_str();
        let connect_err = |reason: String| MailcloudError::Connect {
            host: host.to_string(),
            port: config.port,
            reason,
        };

        info!(host, port = config.port, "Connecting");
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(e.to_string()))?;
        let client =
            imap::connect((host, config.port), host, &tls).map_err(|e| connect_err(e.to_string()))?;

        let session = client
            .login(&config.username, password)
            .map_err(|(e, _client)| MailcloudError::Auth {
                user: config.username.clone(),
                reason: e.to_string(),
            })?;

        info!(user = %config.username, "Authenticated");
        Ok(Self { session })
    }
}

impl MailSource for ImapSource {
    fn message_ids(&mut self, folder: &str) -> Result<Vec<u32>> {
        let mailbox = self.session.select(folder).map_err(|e| match e {
            imap::error::Error::No(_) | imap::error::Error::Bad(_) => {
                MailcloudError::FolderNotFound(folder.to_string())
            }
            other => other.into(),
        })?;
        debug!(folder, exists = mailbox.exists, "Selected folder");

        let ids: Vec<u32> = self.session.search("ALL")?.into_iter().collect();
        info!(folder, count = ids.len(), "Listed messages");
        Ok(ids)
    }

    fn fetch_header(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        // RFC822.HEADER does not set \Seen
        let fetches = self.session.fetch(id.to_string(), "RFC822.HEADER")?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.header())
            .map(|h| h.to_vec()))
    }

    fn logout(mut self) -> Result<()> {
        self.session.logout()?;
        info!("Logged out");
        Ok(())
    }
}
