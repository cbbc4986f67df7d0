/*
 * smtp_session.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the SMTP client against a scripted in-process
 * server: handshake, authentication, pooling and reuse, recipient errors,
 * pipelining, and bulk sends.
 *
 * Run with:
 *   cargo test -p postino_core --test smtp_session
 */

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use postino_core::mime::EncodedPart;
use postino_core::protocol::smtp::ConnectionPool;
use postino_core::{ErrorKind, LoginOption, MailClient, MailConfig, MailMessage};

/// What the scripted server should advertise and accept.
#[derive(Clone)]
struct Behavior {
    greeting: String,
    ehlo_extra: Vec<String>,
    /// Mechanisms advertised via AUTH; empty = no AUTH line.
    auth: Vec<String>,
    /// Expected username/password for any mechanism.
    credentials: Option<(String, String)>,
    /// Recipients answered with 550.
    reject_rcpt: HashSet<String>,
    /// Reply code after the terminating dot.
    data_final: u16,
    /// Assert that RCPT commands do NOT arrive pipelined.
    expect_serial_rcpt: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            greeting: "220 mock.example.com ESMTP ready".into(),
            ehlo_extra: vec!["PIPELINING".into(), "8BITMIME".into()],
            auth: Vec::new(),
            credentials: None,
            reject_rcpt: HashSet::new(),
            data_final: 250,
            expect_serial_rcpt: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ReceivedMessage {
    mail_from: String,
    /// The MAIL FROM command verbatim, including SIZE/BODY parameters.
    mail_from_line: String,
    recipients: Vec<String>,
    /// DATA payload, dot-unstuffed, terminator removed.
    body: Vec<u8>,
}

struct MockServer {
    port: u16,
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
    connections: Arc<AtomicUsize>,
}

impl MockServer {
    async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let server = Self {
            port,
            received: Arc::clone(&received),
            connections: Arc::clone(&connections),
        };
        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                connections.fetch_add(1, Ordering::SeqCst);
                let behavior = behavior.clone();
                let received = Arc::clone(&received);
                tokio::spawn(async move {
                    let _ = serve(socket, behavior, received).await;
                });
            }
        });
        server
    }

    fn config(&self) -> MailConfig {
        let mut config = MailConfig::new("127.0.0.1", self.port).with_own_hostname("client.test");
        config.pool_acquire_timeout_ms = 2000;
        config
    }

    async fn received(&self) -> Vec<ReceivedMessage> {
        self.received.lock().await.clone()
    }

    fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}

async fn read_line(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn serve(
    socket: TcpStream,
    behavior: Behavior,
    received: Arc<Mutex<Vec<ReceivedMessage>>>,
) -> std::io::Result<()> {
    let (read_half, mut writer) = socket.into_split();
    let mut reader = BufReader::new(read_half);
    write_line(&mut writer, &behavior.greeting).await?;

    let mut mail_from = String::new();
    let mut mail_from_line = String::new();
    let mut recipients: Vec<String> = Vec::new();

    while let Some(line) = read_line(&mut reader).await? {
        let upper = line.to_uppercase();
        if upper.starts_with("EHLO") {
            write_line(&mut writer, "250-mock.example.com greets you").await?;
            for extra in &behavior.ehlo_extra {
                write_line(&mut writer, &format!("250-{}", extra)).await?;
            }
            if !behavior.auth.is_empty() {
                write_line(&mut writer, &format!("250-AUTH {}", behavior.auth.join(" "))).await?;
            }
            write_line(&mut writer, "250 OK").await?;
        } else if upper.starts_with("AUTH ") {
            handle_auth(&line, &behavior, &mut reader, &mut writer).await?;
        } else if upper.starts_with("MAIL FROM:") {
            mail_from = address_of(&line);
            mail_from_line = line.clone();
            recipients.clear();
            write_line(&mut writer, "250 sender ok").await?;
        } else if upper.starts_with("RCPT TO:") {
            if behavior.expect_serial_rcpt {
                // The client must be awaiting this reply; nothing further
                // may already be buffered.
                let buffered = reader.buffer();
                assert!(
                    buffered.is_empty(),
                    "pipelined data arrived without PIPELINING: {:?}",
                    String::from_utf8_lossy(buffered)
                );
            }
            let addr = address_of(&line);
            if behavior.reject_rcpt.contains(&addr) {
                write_line(&mut writer, "550 mailbox unavailable").await?;
            } else {
                recipients.push(addr);
                write_line(&mut writer, "250 recipient ok").await?;
            }
        } else if upper == "DATA" {
            write_line(&mut writer, "354 end with <CRLF>.<CRLF>").await?;
            let mut body: Vec<u8> = Vec::new();
            loop {
                let data_line = match read_line(&mut reader).await? {
                    Some(l) => l,
                    None => return Ok(()),
                };
                if data_line == "." {
                    break;
                }
                let unstuffed = data_line.strip_prefix('.').unwrap_or(&data_line);
                body.extend_from_slice(unstuffed.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            received.lock().await.push(ReceivedMessage {
                mail_from: mail_from.clone(),
                mail_from_line: mail_from_line.clone(),
                recipients: recipients.clone(),
                body,
            });
            write_line(&mut writer, &format!("{} message accepted", behavior.data_final)).await?;
        } else if upper == "RSET" {
            mail_from.clear();
            recipients.clear();
            write_line(&mut writer, "250 flushed").await?;
        } else if upper == "QUIT" {
            write_line(&mut writer, "221 bye").await?;
            return Ok(());
        } else {
            write_line(&mut writer, "500 unrecognized").await?;
        }
    }
    Ok(())
}

async fn handle_auth(
    line: &str,
    behavior: &Behavior,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
) -> std::io::Result<()> {
    let (expect_user, expect_pass) = match &behavior.credentials {
        Some((u, p)) => (u.clone(), p.clone()),
        None => {
            write_line(writer, "503 AUTH not enabled").await?;
            return Ok(());
        }
    };
    let mut words = line.split_whitespace();
    let _auth = words.next();
    let mechanism = words.next().unwrap_or("").to_uppercase();
    let initial = words.next().map(str::to_string);

    if !behavior.auth.iter().any(|m| m.eq_ignore_ascii_case(&mechanism)) {
        write_line(writer, "504 mechanism not supported").await?;
        return Ok(());
    }

    match mechanism.as_str() {
        "PLAIN" => {
            let decoded = initial
                .and_then(|b| BASE64.decode(b).ok())
                .unwrap_or_default();
            let expected = format!("\0{}\0{}", expect_user, expect_pass).into_bytes();
            if decoded == expected {
                write_line(writer, "235 authenticated").await?;
            } else {
                write_line(writer, "535 authentication failed").await?;
            }
        }
        "LOGIN" => {
            write_line(writer, &format!("334 {}", BASE64.encode("Username:"))).await?;
            let user = read_line(reader).await?.unwrap_or_default();
            write_line(writer, &format!("334 {}", BASE64.encode("Password:"))).await?;
            let pass = read_line(reader).await?.unwrap_or_default();
            let user_ok = BASE64.decode(user.trim()).ok() == Some(expect_user.into_bytes());
            let pass_ok = BASE64.decode(pass.trim()).ok() == Some(expect_pass.into_bytes());
            if user_ok && pass_ok {
                write_line(writer, "235 authenticated").await?;
            } else {
                write_line(writer, "535 authentication failed").await?;
            }
        }
        "CRAM-MD5" => {
            use hmac::{Hmac, Mac};
            let challenge = "<1896.697170952@mock.example.com>";
            write_line(writer, &format!("334 {}", BASE64.encode(challenge))).await?;
            let response = read_line(reader).await?.unwrap_or_default();
            let decoded = BASE64.decode(response.trim()).unwrap_or_default();
            let mut mac = Hmac::<md5::Md5>::new_from_slice(expect_pass.as_bytes()).unwrap();
            mac.update(challenge.as_bytes());
            let digest = mac.finalize().into_bytes();
            let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
            let expected = format!("{} {}", expect_user, hex).into_bytes();
            if decoded == expected {
                write_line(writer, "235 authenticated").await?;
            } else {
                write_line(writer, "535 authentication failed").await?;
            }
        }
        _ => {
            write_line(writer, "535 mechanism not implemented").await?;
        }
    }
    Ok(())
}

fn address_of(line: &str) -> String {
    let start = line.find('<').map(|i| i + 1).unwrap_or(0);
    let end = line.find('>').unwrap_or(line.len());
    line[start..end].to_string()
}

fn plain_message(index: usize) -> MailMessage {
    let part = EncodedPart::leaf_text(
        vec![
            ("From".into(), "from@example.com".into()),
            ("To".into(), "to@example.com".into()),
            ("Subject".into(), format!("test message {}", index)),
            ("Message-ID".into(), format!("<msg-{}@example.com>", index)),
            ("X-Index".into(), index.to_string()),
        ],
        format!("Body of message {}\r\n", index),
    );
    MailMessage::new("from@example.com", vec!["to@example.com".into()], part)
}

#[tokio::test]
async fn plain_send_delivers_exact_body() {
    let server = MockServer::start(Behavior::default()).await;
    let client = MailClient::new(server.config()).unwrap();

    let result = client.send(plain_message(1)).await.unwrap();
    assert_eq!(result.message_id.as_deref(), Some("<msg-1@example.com>"));
    assert_eq!(result.accepted_recipients, vec!["to@example.com"]);

    let received = server.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].mail_from, "from@example.com");
    let body = String::from_utf8(received[0].body.clone()).unwrap();
    assert!(body.starts_with("From: from@example.com\r\n"));
    assert!(body.ends_with("Body of message 1\r\n"));
    client.close().await;
}

#[tokio::test]
async fn dot_stuffed_lines_are_reconstructed() {
    let server = MockServer::start(Behavior::default()).await;
    let client = MailClient::new(server.config()).unwrap();

    let body = "This is a Multiple Lines Text\r\n\r\n.Some lines start with one dot\r\n..Some lines start with 2 dots.\r\n.\t..Some lines start with dot and HT.\r\n";
    let part = EncodedPart::leaf_text(
        vec![
            ("From".into(), "from@example.com".into()),
            ("To".into(), "to@example.com".into()),
        ],
        body,
    );
    let message = MailMessage::new("from@example.com", vec!["to@example.com".into()], part);
    client.send(message).await.unwrap();

    let received = server.received().await;
    let text = String::from_utf8(received[0].body.clone()).unwrap();
    // Dot-unstuffed payload reconstructs the message exactly.
    let (_, received_body) = text.split_once("\r\n\r\n").unwrap();
    assert_eq!(received_body, body);
    client.close().await;
}

#[tokio::test]
async fn mail_from_carries_size_and_body_parameters() {
    let behavior = Behavior {
        ehlo_extra: vec!["SIZE 10485760".into(), "8BITMIME".into()],
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config()).unwrap();

    client.send(plain_message(1)).await.unwrap();
    let received = server.received().await;
    let line = &received[0].mail_from_line;
    assert!(line.starts_with("MAIL FROM:<from@example.com> SIZE="), "got {}", line);
    assert!(line.ends_with(" BODY=8BITMIME"), "got {}", line);
    client.close().await;
}

#[tokio::test]
async fn mail_from_is_bare_without_capabilities() {
    let behavior = Behavior {
        ehlo_extra: Vec::new(),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config()).unwrap();

    client.send(plain_message(1)).await.unwrap();
    let received = server.received().await;
    assert_eq!(received[0].mail_from_line, "MAIL FROM:<from@example.com>");
    client.close().await;
}

#[tokio::test]
async fn pool_reuses_single_connection() {
    let server = MockServer::start(Behavior::default()).await;
    let mut config = server.config();
    config.max_pool_size = 1;
    let client = MailClient::new(config).unwrap();

    client.send(plain_message(1)).await.unwrap();
    assert_eq!(client.conn_count(), 1);
    client.send(plain_message(2)).await.unwrap();
    assert_eq!(client.conn_count(), 1);
    // One TCP connection served both sends.
    assert_eq!(server.connection_count(), 1);
    assert_eq!(server.received().await.len(), 2);

    client.close().await;
    assert_eq!(client.conn_count(), 0);
}

#[tokio::test]
async fn rcpt_errors_skipped_when_allowed() {
    let mut behavior = Behavior::default();
    behavior.reject_rcpt.insert("bad@example.com".into());
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config().with_allow_rcpt_errors(true)).unwrap();

    let message = MailMessage::new(
        "from@example.com",
        vec!["bad@example.com".into(), "to@example.com".into()],
        plain_message(1).part,
    );
    let result = client.send(message).await.unwrap();
    assert_eq!(result.accepted_recipients, vec!["to@example.com"]);
    assert_eq!(result.rejected_recipients.len(), 1);
    assert_eq!(result.rejected_recipients[0].0, "bad@example.com");
    client.close().await;
}

#[tokio::test]
async fn rcpt_error_fails_send_by_default() {
    let mut behavior = Behavior::default();
    behavior.reject_rcpt.insert("bad@example.com".into());
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config()).unwrap();

    let message = MailMessage::new(
        "from@example.com",
        vec!["bad@example.com".into(), "to@example.com".into()],
        plain_message(1).part,
    );
    let err = client.send(message).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecipientRejected);
    client.close().await;
}

#[tokio::test]
async fn all_recipients_rejected_fails_even_when_allowed() {
    let mut behavior = Behavior::default();
    behavior.reject_rcpt.insert("bad@example.com".into());
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config().with_allow_rcpt_errors(true)).unwrap();

    let message = MailMessage::new(
        "from@example.com",
        vec!["bad@example.com".into()],
        plain_message(1).part,
    );
    let err = client.send(message).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecipientRejected);
    client.close().await;
}

#[tokio::test]
async fn rcpt_commands_stay_serial_without_pipelining() {
    let behavior = Behavior {
        ehlo_extra: vec!["8BITMIME".into()],
        expect_serial_rcpt: true,
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config()).unwrap();

    let message = MailMessage::new(
        "from@example.com",
        vec!["a@example.com".into(), "b@example.com".into(), "c@example.com".into()],
        plain_message(1).part,
    );
    let result = client.send(message).await.unwrap();
    assert_eq!(result.accepted_recipients.len(), 3);
    client.close().await;
}

#[tokio::test]
async fn message_too_large_keeps_connection() {
    let behavior = Behavior {
        ehlo_extra: vec!["SIZE 64".into()],
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let mut config = server.config();
    config.max_pool_size = 1;
    let client = MailClient::new(config).unwrap();

    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MessageTooLarge);
    // The connection never saw the message; it must have been recycled, and
    // a small message still goes through on it.
    let part = EncodedPart::leaf_text(vec![("A".into(), "b".into())], "x");
    let small = MailMessage::new("f@x.com", vec!["t@x.com".into()], part);
    client.send(small).await.unwrap();
    assert_eq!(server.connection_count(), 1);
    client.close().await;
}

#[tokio::test]
async fn data_rejection_after_dot_keeps_connection_valid() {
    let behavior = Behavior {
        data_final: 554,
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let mut config = server.config();
    config.max_pool_size = 1;
    let client = MailClient::new(config).unwrap();

    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataRejected);
    // Connection recycled, next transaction runs over the same socket.
    let err = client.send(plain_message(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataRejected);
    assert_eq!(server.connection_count(), 1);
    client.close().await;
}

#[tokio::test]
async fn greeting_failure_is_reported() {
    let behavior = Behavior {
        greeting: "554 go away".into(),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(server.config()).unwrap();
    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GreetingFailed);
    client.close().await;
}

#[tokio::test]
async fn starttls_required_but_absent_fails() {
    let server = MockServer::start(Behavior::default()).await;
    let client = MailClient::new(
        server
            .config()
            .with_starttls(postino_core::StartTlsOption::Required),
    )
    .unwrap();
    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TlsRequired);
    client.close().await;
}

#[tokio::test]
async fn auth_plain_succeeds() {
    let behavior = Behavior {
        auth: vec!["PLAIN".into()],
        credentials: Some(("user@example.com".into(), "secret".into())),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(
        server
            .config()
            .with_login(LoginOption::Required)
            .with_credentials("user@example.com", "secret"),
    )
    .unwrap();
    client.send(plain_message(1)).await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn auth_login_succeeds() {
    let behavior = Behavior {
        auth: vec!["LOGIN".into()],
        credentials: Some(("user".into(), "pass".into())),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(
        server
            .config()
            .with_login(LoginOption::Required)
            .with_credentials("user", "pass"),
    )
    .unwrap();
    client.send(plain_message(1)).await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn auth_cram_md5_succeeds() {
    let behavior = Behavior {
        auth: vec!["CRAM-MD5".into()],
        credentials: Some(("tim".into(), "tanstaaftanstaaf".into())),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(
        server
            .config()
            .with_login(LoginOption::Required)
            .with_credentials("tim", "tanstaaftanstaaf"),
    )
    .unwrap();
    client.send(plain_message(1)).await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn wrong_password_is_auth_failed() {
    let behavior = Behavior {
        auth: vec!["PLAIN".into(), "LOGIN".into()],
        credentials: Some(("user".into(), "right".into())),
        ..Behavior::default()
    };
    let server = MockServer::start(behavior).await;
    let client = MailClient::new(
        server
            .config()
            .with_login(LoginOption::Required)
            .with_credentials("user", "wrong"),
    )
    .unwrap();
    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailed);
    client.close().await;
}

#[tokio::test]
async fn required_auth_without_server_support_fails() {
    let server = MockServer::start(Behavior::default()).await;
    let client = MailClient::new(
        server
            .config()
            .with_login(LoginOption::Required)
            .with_credentials("user", "pass"),
    )
    .unwrap();
    let err = client.send(plain_message(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailed);
    client.close().await;
}

#[tokio::test]
async fn pool_acquire_times_out_when_exhausted() {
    let server = MockServer::start(Behavior::default()).await;
    let mut config = server.config();
    config.max_pool_size = 1;
    config.pool_acquire_timeout_ms = 200;
    let pool = ConnectionPool::new(config);

    let held = pool.acquire().await.unwrap();
    let err = pool.acquire().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolAcquireTimeout);
    drop(held);
    pool.close().await;
}

#[tokio::test]
async fn waiter_gets_connection_when_recycled() {
    let server = MockServer::start(Behavior::default()).await;
    let mut config = server.config();
    config.max_pool_size = 1;
    config.pool_acquire_timeout_ms = 5000;
    let pool = ConnectionPool::new(config);

    let held = pool.acquire().await.unwrap();
    let pool2 = pool.clone();
    let waiter = tokio::spawn(async move { pool2.acquire().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.recycle(held).await;
    let conn = waiter.await.unwrap().unwrap();
    assert_eq!(pool.conn_count(), 1);
    pool.recycle(conn).await;
    pool.close().await;
    assert_eq!(pool.conn_count(), 0);
}

#[tokio::test]
async fn closed_pool_rejects_sends() {
    let server = MockServer::start(Behavior::default()).await;
    let client = MailClient::new(server.config()).unwrap();
    client.send(plain_message(1)).await.unwrap();
    client.close().await;
    let err = client.send(plain_message(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn massive_send_preserves_every_payload() {
    const COUNT: usize = 1000;
    let server = MockServer::start(Behavior::default()).await;
    let mut config = server.config();
    config.max_pool_size = 8;
    let client = Arc::new(MailClient::new(config).unwrap());

    let mut tasks = Vec::with_capacity(COUNT);
    for index in 0..COUNT {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            client.send(plain_message(index)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let received = server.received().await;
    assert_eq!(received.len(), COUNT);
    // Key each delivery by its X-Index header and check the body matches the
    // payload dispatched under that key.
    let mut seen = HashSet::new();
    for message in &received {
        let text = String::from_utf8(message.body.clone()).unwrap();
        let index_line = text
            .lines()
            .find(|l| l.starts_with("X-Index: "))
            .expect("X-Index header present");
        let index: usize = index_line["X-Index: ".len()..].trim().parse().unwrap();
        assert!(seen.insert(index), "duplicate delivery of {}", index);
        assert!(text.contains(&format!("Subject: test message {}", index)));
        assert!(text.ends_with(&format!("Body of message {}\r\n", index)));
    }
    assert_eq!(seen.len(), COUNT);
    client.close().await;
}
