//! End-to-end client tests against a scripted local server.
//!
//! Each test binds a `TcpListener` on localhost, connects a `Client` to it
//! and plays the server side line by line.
//!
//! Run with: `cargo test --test client_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irclink::{Client, ClientError, ConnectionError, ConnectionState, Message, User};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// The server end of one accepted connection.
struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn recv(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read failed")
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(line));
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\r\n").await.unwrap();
    }

    async fn expect_registration(&mut self, nick: &str) {
        self.expect(&format!("NICK {nick}")).await;
        self.expect(&format!("USER {nick} 0 * :{nick}")).await;
    }
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    (listener, address)
}

async fn accept(listener: &TcpListener) -> Peer {
    let (stream, _) = timeout(WAIT, listener.accept())
        .await
        .expect("timed out waiting for the client")
        .unwrap();
    let (read, writer) = stream.into_split();
    Peer {
        lines: BufReader::new(read).lines(),
        writer,
    }
}

async fn connected(user: User) -> (Client, Peer, TcpListener) {
    let (listener, address) = listen().await;
    let client = Client::new(&address, user, false).unwrap();
    client.connect().await.unwrap();
    let peer = accept(&listener).await;
    (client, peer, listener)
}

fn error_channel(client: &Client) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on_connection_error(move |err| {
        let _ = tx.send(format!("{err:?}"));
    });
    rx
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("channel closed")
}

#[tokio::test]
async fn test_registration_without_password() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;

    peer.expect_registration("alice").await;
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_registration_with_password() {
    let user = User::new("bob")
        .with_username("b")
        .with_realname("Bob Builder")
        .with_password("secret");
    let (_client, mut peer, _listener) = connected(user).await;

    peer.expect("PASS secret").await;
    peer.expect("NICK bob").await;
    peer.expect("USER b 0 * :Bob Builder").await;
}

#[tokio::test]
async fn test_ping_is_answered() {
    let (_client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    peer.send("PING :tag123").await;
    peer.expect("PONG :tag123").await;

    peer.send(":irc.example.com PING irc.example.com").await;
    peer.expect("PONG :irc.example.com").await;
}

#[tokio::test]
async fn test_partial_reads_are_reassembled() {
    let (_client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    peer.writer.write_all(b"PI").await.unwrap();
    peer.writer.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    peer.writer.write_all(b"NG :split\r\nPING :second\r\n").await.unwrap();

    peer.expect("PONG :split").await;
    peer.expect("PONG :second").await;
}

#[tokio::test]
async fn test_nickname_retry_sequence() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    let mut errors = error_channel(&client);
    peer.expect_registration("alice").await;

    for expected in ["alice-1", "alice-2", "alice-3", "alice-1", "alice-2"] {
        peer.send(":srv 433 * alice :Nickname is already in use").await;
        peer.expect(&format!("NICK {expected}")).await;
    }

    peer.send(":srv 433 * alice :Nickname is already in use").await;
    let err = next(&mut errors).await;
    assert_eq!(
        err,
        format!(
            "{:?}",
            ClientError::NicknameExhausted {
                tries: 6,
                name: "alice".to_string()
            }
        )
    );

    // Further collisions send nothing, and the connection stays up.
    peer.send(":srv 433 * alice :Nickname is already in use").await;
    peer.send("PING :still-here").await;
    peer.expect("PONG :still-here").await;
    assert!(client.is_connected());
    assert!(errors.try_recv().is_err());
}

#[tokio::test]
async fn test_long_nickname_retry_is_truncated() {
    let (_client, mut peer, _listener) = connected(User::new("verylongnick")).await;
    peer.expect_registration("verylongnick").await;

    for expected in [
        "verylongnick-1",
        "verylongnick-2",
        "verylongnick-3",
        "verylon-1",
        "verylon-2",
    ] {
        peer.send(":srv 433 * verylongnick :Nickname is already in use").await;
        peer.expect(&format!("NICK {expected}")).await;
    }
}

#[tokio::test]
async fn test_notification_order() {
    let (listener, address) = listen().await;
    let client = Client::new(&address, User::new("alice"), false).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let events = tx.clone();
    client.on_raw_received(move |line| {
        let _ = events.send(format!("raw:{line}"));
    });
    let events = tx.clone();
    client.register_handler("privmsg", move |_client, msg| {
        let _ = events.send(format!("handler:{}", msg.param(1).unwrap_or_default()));
    });
    let events = tx.clone();
    client.on_message(move |msg| {
        let _ = events.send(format!("message:{}", msg.command()));
    });
    let events = tx;
    client.on_connected(move || {
        let _ = events.send("connected".to_string());
    });

    client.connect().await.unwrap();
    let mut peer = accept(&listener).await;
    peer.expect_registration("alice").await;
    assert_eq!(next(&mut rx).await, "connected");

    peer.send(":bob!b@host PRIVMSG #chan :hello there").await;
    assert_eq!(next(&mut rx).await, "raw::bob!b@host PRIVMSG #chan :hello there");
    assert_eq!(next(&mut rx).await, "handler:hello there");
    assert_eq!(next(&mut rx).await, "message:PRIVMSG");

    // Unhandled commands still reach the message observers.
    peer.send("NOTICE alice :hi").await;
    assert_eq!(next(&mut rx).await, "raw:NOTICE alice :hi");
    assert_eq!(next(&mut rx).await, "message:NOTICE");
}

#[tokio::test]
async fn test_unparsable_line_is_skipped() {
    let (listener, address) = listen().await;
    let client = Client::new(&address, User::new("alice"), false).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let events = tx.clone();
    client.on_raw_received(move |line| {
        let _ = events.send(format!("raw:{line}"));
    });
    client.on_message(move |msg: &Message| {
        let _ = tx.send(format!("message:{}", msg.command()));
    });
    let mut errors = error_channel(&client);

    client.connect().await.unwrap();
    let mut peer = accept(&listener).await;
    peer.expect_registration("alice").await;

    peer.send("@unterminated").await;
    peer.send("PING :after").await;
    peer.expect("PONG :after").await;

    assert_eq!(next(&mut rx).await, "raw:@unterminated");
    assert_eq!(next(&mut rx).await, "raw:PING :after");
    assert_eq!(next(&mut rx).await, "message:PING");
    assert!(errors.try_recv().is_err());
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_raw_sent_notifications() {
    let (listener, address) = listen().await;
    let client = Client::new(&address, User::new("alice"), false).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    client.on_raw_sent(move |line| {
        let _ = tx.send(line.to_string());
    });

    client.connect().await.unwrap();
    let mut peer = accept(&listener).await;
    peer.expect_registration("alice").await;

    assert_eq!(next(&mut rx).await, "NICK alice");
    assert_eq!(next(&mut rx).await, "USER alice 0 * :alice");

    client.send_line("JOIN #rust\r\n").unwrap();
    client
        .send_fmt(format_args!("PRIVMSG {} :{}", "#rust", "hi all"))
        .unwrap();
    client.send(&Message::new("PART", ["#rust", "bye now"])).unwrap();

    assert_eq!(next(&mut rx).await, "JOIN #rust");
    assert_eq!(next(&mut rx).await, "PRIVMSG #rust :hi all");
    assert_eq!(next(&mut rx).await, "PART #rust :bye now");

    peer.expect("JOIN #rust").await;
    peer.expect("PRIVMSG #rust :hi all").await;
    peer.expect("PART #rust :bye now").await;
}

#[tokio::test]
async fn test_disconnect_flushes_and_quits() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    client.send_line("PRIVMSG #a :last words").unwrap();
    client.disconnect(Some("gone fishing")).await;

    peer.expect("PRIVMSG #a :last words").await;
    peer.expect("QUIT :gone fishing").await;
    assert_eq!(peer.recv().await, None);

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(matches!(
        client.send_line("PRIVMSG #a :too late"),
        Err(ClientError::NotConnected)
    ));

    // Disconnecting again does nothing.
    client.disconnect(None).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_never_interleave() {
    const TASKS: usize = 8;
    const LINES: usize = 200;

    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    let padding = "x".repeat(64);
    let senders: Vec<_> = (0..TASKS)
        .map(|task| {
            let client = client.clone();
            let padding = padding.clone();
            tokio::spawn(async move {
                for n in 0..LINES {
                    client
                        .send_fmt(format_args!("PRIVMSG #load :{task} {n} {padding}"))
                        .unwrap();
                    if n % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await.unwrap();
    }

    let mut next_line = [0usize; TASKS];
    for _ in 0..TASKS * LINES {
        let line = peer.recv().await.expect("connection closed early");
        let rest = line
            .strip_prefix("PRIVMSG #load :")
            .unwrap_or_else(|| panic!("mangled line {line:?}"));
        let words: Vec<&str> = rest.split(' ').collect();
        assert_eq!(words.len(), 3, "mangled line {line:?}");
        assert_eq!(words[2], padding);

        // Lines from one task keep their order.
        let task: usize = words[0].parse().unwrap();
        let n: usize = words[1].parse().unwrap();
        assert_eq!(n, next_line[task]);
        next_line[task] += 1;
    }
    assert!(next_line.iter().all(|&n| n == LINES));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_handler_runs_after_disconnect() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    let seen = Arc::new(AtomicUsize::new(0));
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);

    let counter = seen.clone();
    client.register_handler("PRIVMSG", move |_client, _msg| {
        // Hold the reader inside the first handler until disconnect starts.
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = entered_tx.send(());
            let _ = release_rx.lock().unwrap().recv_timeout(WAIT);
        }
    });

    let burst: String = (0..30).map(|n| format!("PRIVMSG alice :{n}\r\n")).collect();
    peer.writer.write_all(burst.as_bytes()).await.unwrap();
    next(&mut entered_rx).await;

    let disconnecting = tokio::spawn({
        let client = client.clone();
        async move { client.disconnect(None).await }
    });
    timeout(WAIT, async {
        while client.state() != ConnectionState::Disconnected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("disconnect never started");

    release_tx.send(()).unwrap();
    timeout(WAIT, disconnecting).await.unwrap().unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    peer.expect("QUIT").await;
    assert_eq!(peer.recv().await, None);
}

#[tokio::test]
async fn test_disconnect_without_reason() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    client.disconnect(None).await;
    peer.expect("QUIT").await;
    assert_eq!(peer.recv().await, None);
}

#[tokio::test]
async fn test_connection_refused() {
    let (listener, address) = listen().await;
    drop(listener);

    let client = Client::new(&address, User::new("alice"), false).unwrap();
    let mut errors = error_channel(&client);

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Connection(ConnectionError::Connect { .. })
    ));
    assert!(next(&mut errors).await.starts_with("Connection(Connect"));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_server_close_and_reconnect() {
    let (listener, address) = listen().await;
    let client = Client::new(&address, User::new("alice"), false).unwrap();
    let mut errors = error_channel(&client);

    client.connect().await.unwrap();
    let mut peer = accept(&listener).await;
    peer.expect_registration("alice").await;

    peer.send(":srv 433 * alice :Nickname is already in use").await;
    peer.expect("NICK alice-1").await;
    drop(peer);

    assert_eq!(next(&mut errors).await, "Connection(Closed)");
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // A fresh connection starts the retry sequence over.
    client.connect().await.unwrap();
    let mut peer = accept(&listener).await;
    peer.expect_registration("alice").await;
    peer.send(":srv 433 * alice :Nickname is already in use").await;
    peer.expect("NICK alice-1").await;
}

#[tokio::test]
async fn test_handler_can_register_handlers() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    client.register_handler("001", |client, _msg| {
        client.register_handler("PRIVMSG", |client, msg| {
            if let Some(target) = msg.source_nickname() {
                let _ = client.send_fmt(format_args!("NOTICE {} :welcome back", target));
            }
        });
        let _ = client.send_line("JOIN #rust");
    });

    peer.send(":srv 001 alice :Welcome").await;
    peer.expect("JOIN #rust").await;

    peer.send(":bob!b@h PRIVMSG alice :hi").await;
    peer.expect("NOTICE bob :welcome back").await;
}

#[tokio::test]
async fn test_custom_ping_handler_replaces_builtin() {
    let (client, mut peer, _listener) = connected(User::new("alice")).await;
    peer.expect_registration("alice").await;

    client.register_handler("ping", |client, msg| {
        let _ = client.send_fmt(format_args!("PONG custom {}", msg.param(0).unwrap_or("")));
    });

    peer.send("PING :x").await;
    peer.expect("PONG custom x").await;
}
