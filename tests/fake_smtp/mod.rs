// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

//! An in-process fake SMTP server for integration testing.
//!
//! The server accepts a single connection and speaks just enough of
//! the protocol for a plain text submission:
//!
//! ```text
//!   S: 220 greeting
//!   C: EHLO ...          S: 250 (advertising AUTH PLAIN LOGIN)
//!   C: AUTH PLAIN ...    S: 235 or 535, depending on configuration
//!   C: MAIL FROM:<...>   S: 250
//!   C: RCPT TO:<...>     S: 250 (once per recipient)
//!   C: DATA              S: 354, then the message up to "."
//!                        S: 250
//!   C: QUIT              S: 221
//! ```
//!
//! A server started via [`FakeSmtpServer::start_with_starttls`]
//! additionally advertises `STARTTLS`. It acknowledges the command but
//! then hangs up instead of negotiating TLS.

#![allow(dead_code)]

use tokio::io::AsyncBufReadExt as _;
use tokio::io::AsyncWriteExt as _;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;


/// What the fake server observed during a session.
#[derive(Debug, Default)]
pub struct Session {
  /// All commands received, excluding message data.
  pub commands: Vec<String>,
  /// The message data, with lines joined by CRLF.
  pub data: String,
}

impl Session {
  /// The addresses passed to `RCPT TO` commands.
  pub fn recipients(&self) -> Vec<String> {
    self
      .commands
      .iter()
      .filter_map(|command| command.strip_prefix("RCPT TO:"))
      .map(|address| address.trim_matches(|c| c == '<' || c == '>').to_string())
      .collect()
  }
}


/// A fake SMTP server listening on an OS assigned port.
pub struct FakeSmtpServer {
  port: u16,
  handle: JoinHandle<Session>,
}

impl FakeSmtpServer {
  /// Start a server that accepts any credentials.
  pub async fn start() -> Self {
    Self::start_with(true, false).await
  }

  /// Start a server that rejects all authentication attempts.
  pub async fn start_rejecting_auth() -> Self {
    Self::start_with(false, false).await
  }

  /// Start a server that offers the `STARTTLS` extension.
  pub async fn start_with_starttls() -> Self {
    Self::start_with(true, true).await
  }

  async fn start_with(accept_auth: bool, starttls: bool) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
      let (stream, _addr) = listener.accept().await.unwrap();
      let (reader, mut writer) = stream.into_split();
      let mut lines = BufReader::new(reader).lines();
      let mut session = Session::default();

      writer
        .write_all(b"220 fake.test ESMTP ready\r\n")
        .await
        .unwrap();

      while let Ok(Some(line)) = lines.next_line().await {
        let command = line.to_ascii_uppercase();
        let () = session.commands.push(line.clone());

        let reply: &[u8] = if command.starts_with("EHLO") {
          if starttls {
            b"250-fake.test\r\n250-STARTTLS\r\n250 AUTH PLAIN LOGIN\r\n"
          } else {
            b"250-fake.test\r\n250 AUTH PLAIN LOGIN\r\n"
          }
        } else if command.starts_with("STARTTLS") {
          let _result = writer.write_all(b"220 2.0.0 Ready to start TLS\r\n").await;
          break
        } else if command.starts_with("HELO") {
          b"250 fake.test\r\n"
        } else if command.starts_with("AUTH") {
          if accept_auth {
            b"235 2.7.0 Authentication successful\r\n"
          } else {
            b"535 5.7.8 Authentication credentials invalid\r\n"
          }
        } else if command.starts_with("MAIL") || command.starts_with("RCPT") {
          b"250 2.1.0 OK\r\n"
        } else if command.starts_with("DATA") {
          writer
            .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
            .await
            .unwrap();

          let mut data = Vec::new();
          while let Ok(Some(line)) = lines.next_line().await {
            if line == "." {
              break
            }
            let () = data.push(line);
          }
          session.data = data.join("\r\n");
          b"250 2.0.0 OK queued\r\n"
        } else if command.starts_with("QUIT") {
          let _result = writer.write_all(b"221 2.0.0 Bye\r\n").await;
          break
        } else if command.starts_with("RSET") || command.starts_with("NOOP") {
          b"250 2.0.0 OK\r\n"
        } else {
          b"502 5.5.2 Command not recognized\r\n"
        };

        if writer.write_all(reply).await.is_err() {
          break
        }
      }
      session
    });

    Self { port, handle }
  }

  /// The port the server listens on.
  pub fn port(&self) -> u16 {
    self.port
  }

  /// The `host:port` address of the server.
  pub fn address(&self) -> String {
    format!("127.0.0.1:{}", self.port)
  }

  /// Wait for the client session to end and report what was observed.
  pub async fn finish(self) -> Session {
    self.handle.await.unwrap()
  }
}
