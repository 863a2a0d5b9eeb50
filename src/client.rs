//! Connection manager.
//!
//! A [`Client`] owns at most one live session. A session is one reader task
//! that owns the read half of the socket and a [`LineBuffer`], and one writer
//! task that owns the write half behind a [`FramedWrite`]. Every outbound
//! line goes through the writer's channel, so concurrent sends never
//! interleave on the wire.
//!
//! Handlers and observers run synchronously on the reader task.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::SinkExt;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ClientConfig, ServerAddress};
use crate::error::{ClientError, ConnectionError, MessageParseError, Result};
use crate::event::Notifications;
use crate::handler::HandlerRegistry;
use crate::line::{self, LineBuffer, LineCodec};
use crate::message::Message;
use crate::nick::{NickRetry, NickRetryAction, NickRetryState};
use crate::transport;
use crate::user::User;

/// Lifecycle state of a [`Client`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session exists.
    #[default]
    Disconnected,
    /// `connect` is dialling or registering.
    Connecting,
    /// A session is live.
    Connected,
}

/// The live half of a connection.
struct Session {
    id: u64,
    outgoing: mpsc::UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Session {
    fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[derive(Default)]
struct Link {
    state: ConnectionState,
    session: Option<Session>,
    /// Why the session died while still connecting.
    failure: Option<ClientError>,
}

struct Inner {
    config: ClientConfig,
    link: Mutex<Link>,
    handlers: RwLock<HandlerRegistry>,
    events: Notifications,
    nick_retry: Mutex<NickRetry>,
    next_session: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let link = self.link.get_mut();
        let connected = link.state == ConnectionState::Connected;
        if let Some(session) = link.session.take() {
            debug!(session = session.id, "client dropped, stopping session");
            if connected {
                // The writer drains this before the channel closes.
                let _ = session.outgoing.send("QUIT".to_owned());
            }
            session.signal_shutdown();
        }
    }
}

/// Resets a `Connecting` link if `connect` fails or is cancelled.
struct ConnectingGuard<'a> {
    link: &'a Mutex<Link>,
    armed: bool,
}

impl ConnectingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let session = {
            let mut link = self.link.lock();
            if link.state != ConnectionState::Connecting {
                return;
            }
            link.state = ConnectionState::Disconnected;
            link.session.take()
        };

        if let Some(session) = session {
            session.signal_shutdown();
        }
    }
}

/// An IRC client connection.
///
/// `Client` is a cheap handle; clones share the same connection. When the
/// last handle is dropped the live session, if any, is shut down.
///
/// # Example
///
/// ```no_run
/// use irclink::{Client, User};
///
/// # async fn run() -> irclink::Result<()> {
/// let client = Client::new("irc.libera.chat:6697", User::new("irclink-bot"), true)?;
///
/// client.register_handler("001", |client, _msg| {
///     let _ = client.send_line("JOIN #irclink");
/// });
/// client.on_message(|msg| println!("{}", msg.raw()));
///
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", self.address())
            .field("tls", &self.inner.config.tls)
            .field("state", &self.state())
            .finish()
    }
}

impl Client {
    /// Create a client for `host[:port]`.
    ///
    /// The port defaults to 6667.
    pub fn new(address: &str, user: User, tls: bool) -> Result<Self> {
        Ok(Self::with_config(ClientConfig::new(address, user, tls)?))
    }

    /// Create a client from a full configuration.
    ///
    /// The built-in `PING` and `433` handlers are registered.
    pub fn with_config(config: ClientConfig) -> Self {
        Client {
            inner: Arc::new(Inner {
                config,
                link: Mutex::new(Link::default()),
                handlers: RwLock::new(HandlerRegistry::with_builtins()),
                events: Notifications::default(),
                nick_retry: Mutex::new(NickRetry::new()),
                next_session: AtomicU64::new(0),
            }),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Server address.
    pub fn address(&self) -> &ServerAddress {
        &self.inner.config.address
    }

    /// Registration identity.
    pub fn user(&self) -> &User {
        &self.inner.config.user
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.link.lock().state
    }

    /// Whether a session is live.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// State of the nickname retry sequence.
    pub fn nick_retry_state(&self) -> NickRetryState {
        self.inner.nick_retry.lock().state()
    }

    /// Bind `handler` to `command`, replacing any existing binding.
    ///
    /// The command is matched case-insensitively. Registering `PING` or
    /// `433` replaces the built-in behavior.
    pub fn register_handler<F>(&self, command: &str, handler: F)
    where
        F: Fn(&Client, &Message) + Send + Sync + 'static,
    {
        self.inner.handlers.write().register(command, handler);
    }

    /// Observe every line written, without its terminator.
    pub fn on_raw_sent<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.events.raw_sent.subscribe(callback);
    }

    /// Observe every line received, before parsing.
    pub fn on_raw_received<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.events.raw_received.subscribe(callback);
    }

    /// Observe every parsed message after its handler ran.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.inner.events.message.subscribe(callback);
    }

    /// Observe successful connects.
    pub fn on_connected<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.events.connected.subscribe(move |_: &()| callback());
    }

    /// Observe connection-level failures.
    pub fn on_connection_error<F>(&self, callback: F)
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.inner.events.connection_error.subscribe(callback);
    }

    /// Connect, upgrade to TLS when configured, and register.
    ///
    /// Fails with [`ClientError::AlreadyConnected`] unless the client is
    /// disconnected. Any other failure is also reported to the
    /// connection-error observers, and the client stays disconnected.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut link = self.inner.link.lock();
            if link.state != ConnectionState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            link.state = ConnectionState::Connecting;
            link.failure = None;
        }
        self.inner.nick_retry.lock().reset();

        let guard = ConnectingGuard {
            link: &self.inner.link,
            armed: true,
        };

        match self.establish().await {
            Ok(()) => {
                guard.disarm();
                Ok(())
            }
            Err(err) => {
                drop(guard);
                error!(address = %self.address(), error = %err, "connection failed");
                self.inner.events.connection_error.emit(&err);
                Err(err)
            }
        }
    }

    async fn establish(&self) -> Result<()> {
        let config = &self.inner.config;
        debug!(address = %config.address, tls = config.tls, "connecting");

        let stream = transport::connect_tcp(&config.address).await?;
        if config.tls {
            let stream = transport::upgrade_tls(stream, &config.address.host).await?;
            self.start(stream)
        } else {
            self.start(stream)
        }
    }

    /// Spawn the session tasks over `stream` and send the registration.
    fn start<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let weak = Arc::downgrade(&self.inner);

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let sink = FramedWrite::new(write_half, LineCodec::new());
        let writer = tokio::spawn(write_loop(weak.clone(), id, sink, outgoing_rx));

        self.inner.link.lock().session = Some(Session {
            id,
            outgoing,
            shutdown,
            reader: None,
            writer: Some(writer),
        });

        for line in self.inner.config.user.registration_lines() {
            if self.send_line(&line).is_err() {
                return Err(self.take_failure());
            }
        }

        let reader = read_loop(
            weak,
            id,
            read_half,
            shutdown_rx,
            self.inner.config.read_timeout,
        );

        {
            let mut link = self.inner.link.lock();
            if link.session.as_ref().map(|s| s.id) != Some(id) {
                let cause = link.failure.take();
                return Err(cause.unwrap_or_else(|| ConnectionError::Closed.into()));
            }
            link.state = ConnectionState::Connected;
        }

        info!(address = %self.address(), session = id, "connected");
        self.inner.events.connected.emit(&());

        let reader = tokio::spawn(reader);
        if let Some(session) = self.inner.link.lock().session.as_mut() {
            if session.id == id {
                session.reader = Some(reader);
            }
        }

        Ok(())
    }

    /// Send `QUIT`, flush queued lines and close the connection.
    ///
    /// Does nothing unless the client is connected. Lines queued before the
    /// call are written; sends after it fail with
    /// [`ClientError::NotConnected`].
    pub async fn disconnect(&self, reason: Option<&str>) {
        let session = {
            let mut link = self.inner.link.lock();
            if link.state != ConnectionState::Connected {
                debug!(state = ?link.state, "disconnect ignored");
                return;
            }
            link.state = ConnectionState::Disconnected;
            let session = link.session.take();
            if let Some(session) = &session {
                session.signal_shutdown();
            }
            session
        };
        let Some(session) = session else {
            return;
        };

        let quit = match reason {
            Some(reason) => format!("QUIT :{}", reason),
            None => "QUIT".to_owned(),
        };
        let quit = line::sanitize(&quit);
        if session.outgoing.send(quit.to_owned()).is_ok() {
            self.inner.events.raw_sent.emit(quit);
        }

        let Session {
            id,
            outgoing,
            reader,
            writer,
            ..
        } = session;
        drop(outgoing);

        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(session = id, error = %e, "writer task failed");
            }
        }
        if let Some(reader) = reader {
            if let Err(e) = reader.await {
                warn!(session = id, error = %e, "reader task failed");
            }
        }

        info!(address = %self.address(), session = id, "disconnected");
    }

    /// Queue one line for sending.
    ///
    /// The line is cut at its first CR or LF and written with a CRLF
    /// terminator. The raw-sent observers see it without the terminator.
    pub fn send_line(&self, line: &str) -> Result<()> {
        let line = line::sanitize(line);
        {
            let link = self.inner.link.lock();
            let session = link.session.as_ref().ok_or(ClientError::NotConnected)?;
            session
                .outgoing
                .send(line.to_owned())
                .map_err(|_| ClientError::NotConnected)?;
        }

        trace!(line, "sent");
        self.inner.events.raw_sent.emit(line);
        Ok(())
    }

    /// Queue a formatted line, e.g. `client.send_fmt(format_args!("JOIN {}", chan))`.
    pub fn send_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.send_line(&args.to_string())
    }

    /// Queue a message in its wire form.
    pub fn send(&self, msg: &Message) -> Result<()> {
        self.send_line(&msg.to_string())
    }

    /// Report one received line, parse it and dispatch it.
    fn process_line(&self, line: &str) {
        trace!(line, "received");
        self.inner.events.raw_received.emit(line);

        let msg = match Message::parse(line) {
            Ok(msg) => msg,
            Err(MessageParseError::EmptyMessage) => {
                trace!("skipping empty line");
                return;
            }
            Err(cause) => {
                warn!(line, error = %cause, "skipping unparsable line");
                return;
            }
        };

        self.dispatch(&msg);
    }

    fn dispatch(&self, msg: &Message) {
        let handler = self.inner.handlers.read().get(msg.command());
        match handler {
            Some(handler) => handler(self, msg),
            None => debug!(command = msg.command(), "no handler registered"),
        }

        self.inner.events.message.emit(msg);
    }

    pub(crate) fn handle_nick_collision(&self) {
        let nickname = &self.inner.config.user.nickname;
        let action = self.inner.nick_retry.lock().on_collision(nickname);

        match action {
            NickRetryAction::Send(alternative) => {
                if let Err(e) = self.send_fmt(format_args!("NICK {}", alternative)) {
                    debug!(error = %e, "could not send alternative nickname");
                }
            }
            NickRetryAction::Exhausted { tries, name } => {
                let err = ClientError::NicknameExhausted { tries, name };
                warn!(error = %err, "giving up on nickname");
                self.inner.events.connection_error.emit(&err);
            }
            NickRetryAction::Ignore => {}
        }
    }

    /// The recorded cause of a session that died while connecting.
    fn take_failure(&self) -> ClientError {
        self.inner
            .link
            .lock()
            .failure
            .take()
            .unwrap_or_else(|| ConnectionError::Closed.into())
    }

    /// Tear down session `id` after a connection-level failure.
    ///
    /// Errors from a session that is no longer current are only logged.
    /// While connecting, the error is kept for `connect` to return.
    fn fail_session(&self, id: u64, err: ClientError) {
        let (session, err) = {
            let mut link = self.inner.link.lock();
            if link.session.as_ref().map(|s| s.id) != Some(id) {
                debug!(session = id, error = %err, "ignoring error from stale session");
                return;
            }
            let session = link.session.take();
            if link.state == ConnectionState::Connected {
                link.state = ConnectionState::Disconnected;
                (session, Some(err))
            } else {
                debug!(session = id, error = %err, "session failed while connecting");
                link.failure = Some(err);
                (session, None)
            }
        };

        if let Some(session) = session {
            session.signal_shutdown();
        }

        if let Some(err) = err {
            error!(address = %self.address(), session = id, error = %err, "connection lost");
            self.inner.events.connection_error.emit(&err);
        }
    }
}

async fn read_chunk<R>(
    reader: &mut R,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let read = reader.read(buf);
    let n = match timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| ConnectionError::ReadTimeout(limit))?,
        None => read.await,
    };
    Ok(n.map_err(ConnectionError::Io)?)
}

async fn read_loop<R>(
    inner: Weak<Inner>,
    id: u64,
    mut reader: R,
    mut shutdown: watch::Receiver<bool>,
    timeout: Option<Duration>,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; buffer.capacity()];

    let result: Result<()> = 'read: loop {
        if *shutdown.borrow() {
            break 'read Ok(());
        }

        let limit = buffer.remaining();
        let n = tokio::select! {
            biased;
            _ = shutdown.changed() => break 'read Ok(()),
            read = read_chunk(&mut reader, &mut chunk[..limit], timeout) => match read {
                Ok(0) => break 'read Err(ConnectionError::Closed.into()),
                Ok(n) => n,
                Err(e) => break 'read Err(e),
            },
        };

        let (lines, overflow) = match buffer.feed(&chunk[..n]) {
            Ok(lines) => (lines, None),
            Err(mut e) => (std::mem::take(&mut e.completed), Some(e)),
        };

        for line in lines {
            if *shutdown.borrow() {
                break 'read Ok(());
            }
            let Some(inner) = inner.upgrade() else {
                break 'read Ok(());
            };
            Client { inner }.process_line(&line);
        }

        if let Some(e) = overflow {
            break 'read Err(e.into());
        }
    };

    match result {
        Ok(()) => debug!(session = id, "reader stopped"),
        Err(err) => {
            if let Some(inner) = inner.upgrade() {
                Client { inner }.fail_session(id, err);
            }
        }
    }
}

async fn write_loop<W>(
    inner: Weak<Inner>,
    id: u64,
    mut sink: FramedWrite<W, LineCodec>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outgoing.recv().await {
        if let Err(e) = sink.send(line).await {
            if let Some(inner) = inner.upgrade() {
                Client { inner }.fail_session(id, ConnectionError::Io(e).into());
            }
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(session = id, error = %e, "failed to shut down write side");
    }
    debug!(session = id, "writer stopped");
}
