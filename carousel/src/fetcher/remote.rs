//! Plain HTTPS GET access to the wallpaper server.

use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

/// Something that can hand out the body of a URL.
pub trait Remote {
    /// Requests `url` and returns a reader over the response body.
    ///
    /// # Errors
    /// Connection failures and non-2xx statuses are returned as a [`RemoteError`].
    fn get(&self, url: &str) -> Result<Box<dyn Read>, RemoteError>;

    /// Requests `url` and reads the whole body as text.
    ///
    /// # Errors
    /// See [`Remote::get`]. A body that is not valid UTF-8 is an [`RemoteError::Io`].
    fn get_text(&self, url: &str) -> Result<String, RemoteError> {
        let mut text = String::new();
        self.get(url)?.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl<R: Remote + ?Sized> Remote for &R {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, RemoteError> {
        (**self).get(url)
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// [`Remote`] backed by a blocking reqwest client.
///
/// Certificate validation is switched off: the wallpaper server has historically been reached
/// through hosts whose certificates do not verify, and existing installs rely on that. This is a
/// known security deviation, not an accident.
pub struct HttpRemote {
    client: Client,
}

impl HttpRemote {
    /// Builds the client.
    ///
    /// # Errors
    /// Returns the reqwest error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("carousel/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(true)
            .connect_timeout(Duration::from_secs(30))
            // Images can be large, only the connection phase is bounded
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client })
    }
}

impl Remote for HttpRemote {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, RemoteError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(Box::new(response))
    }
}
