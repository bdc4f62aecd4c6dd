// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(
  clippy::collapsible_else_if,
  clippy::collapsible_if,
  clippy::let_and_return,
  clippy::let_unit_value
)]

//! A library for composing an email and submitting it to an SMTP
//! server.
//!
//! Configuration is assembled from up to three [`Layer`]s (program
//! arguments, a configuration file, and built-in defaults) by
//! [`resolve`]. The resulting [`Options`] are handed to
//! [`send_email`], which picks the connection security via
//! [`Security::resolve`] and delivers the message.

mod config;
mod error;
mod file;
mod policy;

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::Attachment;
use lettre::message::Mailbox;
use lettre::message::MultiPart;
use lettre::message::SinglePart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::Tls;
use lettre::transport::smtp::client::TlsParameters;
use lettre::transport::smtp::Error as SmtpError;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport as _;
use lettre::Message;
use lettre::Tokio1Executor;

use tokio::fs::read;
use tokio::fs::read_to_string;

use tracing::debug;
use tracing::info;

pub use crate::config::non_empty;
pub use crate::config::non_empty_vec;
pub use crate::config::parse_flag;
pub use crate::config::resolve;
pub use crate::config::Layer;
pub use crate::config::LogLevel;
pub use crate::config::Options;
pub use crate::config::Server;
pub use crate::config::Toggle;
pub use crate::error::DeliveryError;
pub use crate::error::ParseLogLevelError;
pub use crate::error::ParseServerError;
pub use crate::error::ResolveError;
pub use crate::policy::port_policy;
pub use crate::policy::PortPolicy;
pub use crate::policy::Security;
pub use crate::policy::SmtpMode;


/// SMTP reply codes indicating that the server rejected our
/// credentials.
const AUTH_FAILURE_CODES: [&str; 5] = ["454", "530", "534", "535", "538"];


/// Retrieve the message body.
///
/// If `body` names an existing file, the file's contents are the body.
/// Otherwise `body` is used as is.
pub async fn load_body(body: &str) -> Result<String, DeliveryError> {
  let path = Path::new(body);
  if path.is_file() {
    debug!("reading message body from `{}`", path.display());
    read_to_string(path)
      .await
      .map_err(|source| DeliveryError::Body {
        path: path.to_path_buf(),
        source,
      })
  } else {
    Ok(body.to_string())
  }
}


fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
  address.parse().map_err(|source| DeliveryError::Address {
    address: address.to_string(),
    source,
  })
}

fn parse_content_type(value: &str) -> Result<ContentType, DeliveryError> {
  ContentType::parse(value).map_err(|err| DeliveryError::ContentType {
    value: value.to_string(),
    reason: err.to_string(),
  })
}


async fn attachment(path: &Path) -> Result<SinglePart, DeliveryError> {
  debug!("attaching file `{}`", path.display());

  let content = read(path)
    .await
    .map_err(|source| DeliveryError::Attachment {
      path: path.to_path_buf(),
      source,
    })?;
  let name = path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string());
  let content_type = parse_content_type("application/octet-stream")?;

  Ok(Attachment::new(name).body(content, content_type))
}


/// Assemble the email described by `options`.
pub async fn build_message(options: &Options) -> Result<Message, DeliveryError> {
  let Options {
    sender,
    recipients,
    cc,
    bcc,
    subject,
    body,
    attachments,
    content_type,
    charset,
    ..
  } = options;

  debug!("composing email with the following parameters:");
  debug!("    - From: {sender}");
  debug!("    - To: {}", recipients.join(", "));
  debug!("    - Cc: {}", cc.join(", "));
  debug!("    - Bcc: {}", bcc.join(", "));
  debug!("    - Subject: {subject}");
  debug!("    - content type: {content_type}; charset: {charset}");

  let mut email = Message::builder()
    .from(parse_mailbox(sender)?)
    .subject(subject)
    .date_now();

  for recipient in recipients {
    email = email.to(parse_mailbox(recipient)?);
  }
  for recipient in cc {
    email = email.cc(parse_mailbox(recipient)?);
  }
  for recipient in bcc {
    email = email.bcc(parse_mailbox(recipient)?);
  }

  let text = if let Some(body) = body {
    load_body(body).await?
  } else {
    String::new()
  };
  let subtype = content_type
    .strip_prefix("text/")
    .unwrap_or(content_type);
  let text = SinglePart::builder()
    .header(parse_content_type(&format!(
      "text/{subtype}; charset={charset}"
    ))?)
    .body(text);

  let mut parts = MultiPart::mixed().singlepart(text);
  for path in attachments {
    parts = parts.singlepart(attachment(path).await?);
  }

  email.multipart(parts).map_err(DeliveryError::Message)
}


fn tls_parameters(options: &Options) -> Result<TlsParameters, DeliveryError> {
  TlsParameters::new(options.server.host.clone()).map_err(|source| DeliveryError::Connection {
    server: options.server.to_string(),
    source,
  })
}


/// Create a transport for the server described by `options`.
fn mailer(
  options: &Options,
  security: &Security,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
  let Server { host, port } = &options.server;
  let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host.as_str()).port(*port);

  let builder = match security.mode() {
    SmtpMode::Unencrypted => builder,
    SmtpMode::StartTls => builder.tls(Tls::Required(tls_parameters(options)?)),
    SmtpMode::Tls => builder.tls(Tls::Wrapper(tls_parameters(options)?)),
  };

  let builder = if options.smtp_user.is_empty() {
    builder
  } else {
    debug!("authenticating as `{}`", options.smtp_user);
    builder.credentials(Credentials::new(
      options.smtp_user.clone(),
      options.smtp_password.clone(),
    ))
  };

  Ok(builder.build())
}


/// Map an error reported by the SMTP transport to the stage it
/// occurred in.
fn classify(err: SmtpError, server: &Server, authenticating: bool) -> DeliveryError {
  let server = server.to_string();
  match err.status() {
    Some(code) if authenticating && AUTH_FAILURE_CODES.contains(&code.to_string().as_str()) => {
      DeliveryError::Authentication {
        server,
        source: err,
      }
    },
    Some(_code) => DeliveryError::Submission {
      server,
      source: err,
    },
    None => DeliveryError::Connection {
      server,
      source: err,
    },
  }
}


/// Compose the email described by `options` and submit it to the
/// configured SMTP server.
///
/// The message is delivered to the union of `recipients`, `cc`, and
/// `bcc`. The connection is closed before this function returns,
/// irrespective of the outcome.
pub async fn send_email(options: &Options) -> Result<(), DeliveryError> {
  let email = build_message(options).await?;

  let security = Security::resolve(options.tls, options.ssl, options.server.port);
  debug!(
    "connecting to SMTP server: HOST: {} | PORT: {} | TLS: {} | SSL: {}",
    options.server.host, options.server.port, security.use_tls, security.use_ssl
  );

  let mailer = mailer(options, &security)?;
  let authenticating = !options.smtp_user.is_empty();

  let _response = mailer
    .send(email)
    .await
    .map_err(|err| classify(err, &options.server, authenticating))?;

  info!("email sent to: {}", options.recipients.join(", "));
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;

  use std::io::Write as _;
  use std::path::PathBuf;

  use tempfile::NamedTempFile;
  use tokio::test;


  fn options() -> Options {
    let layer = Layer {
      sender: Some("Alice <alice@example.com>".to_string()),
      recipients: Some(vec!["bob@example.com".to_string()]),
      body: Some("<p>hello</p>".to_string()),
      ..Default::default()
    };
    resolve(layer).unwrap()
  }

  fn formatted(message: &Message) -> String {
    String::from_utf8(message.formatted()).unwrap()
  }


  /// Check that a body that names a file gets substituted by the file's
  /// contents, while anything else is used as is.
  #[test]
  async fn body_from_file_or_literal() {
    let mut file = NamedTempFile::new().unwrap();
    let () = file.write_all(b"line one\nline two\n").unwrap();

    let path = file.path().to_str().unwrap();
    let body = load_body(path).await.unwrap();
    assert_eq!(body, "line one\nline two\n");

    let body = load_body("/no/such/file/here just text").await.unwrap();
    assert_eq!(body, "/no/such/file/here just text");
  }

  /// Check that the message carries the expected headers and parts.
  #[test]
  async fn message_structure() {
    let mut attachment = NamedTempFile::new().unwrap();
    let () = attachment.write_all(b"attached data").unwrap();

    let options = Options {
      cc: vec!["carol@example.com".to_string()],
      bcc: vec!["dave@example.com".to_string()],
      subject: "Status".to_string(),
      attachments: vec![attachment.path().to_path_buf()],
      ..options()
    };
    let message = build_message(&options).await.unwrap();

    let mut recipients = message
      .envelope()
      .to()
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>();
    let () = recipients.sort();
    assert_eq!(
      recipients,
      ["bob@example.com", "carol@example.com", "dave@example.com"]
    );

    let text = formatted(&message);
    assert!(text.contains("From: Alice <alice@example.com>"), "{text}");
    assert!(text.contains("To: bob@example.com"), "{text}");
    assert!(text.contains("Cc: carol@example.com"), "{text}");
    assert!(!text.contains("dave@example.com"), "{text}");
    assert!(text.contains("Subject: Status"), "{text}");
    assert!(text.contains("Date: "), "{text}");
    assert!(text.contains("Content-Type: text/html; charset=utf-8"), "{text}");
    assert!(text.contains("<p>hello</p>"), "{text}");

    let name = attachment.path().file_name().unwrap().to_str().unwrap();
    assert!(text.contains("Content-Type: application/octet-stream"), "{text}");
    assert!(text.contains(name), "{text}");
  }

  /// Check that a `text/` prefix on the content type is accepted.
  #[test]
  async fn content_type_prefix() {
    let options = Options {
      content_type: "text/plain".to_string(),
      charset: "us-ascii".to_string(),
      ..options()
    };
    let message = build_message(&options).await.unwrap();
    let text = formatted(&message);
    assert!(text.contains("Content-Type: text/plain; charset=us-ascii"), "{text}");
  }

  /// Check that malformed addresses are reported as such.
  #[test]
  async fn invalid_address() {
    let options = Options {
      recipients: vec!["not an address".to_string()],
      ..options()
    };
    let err = build_message(&options).await.unwrap_err();
    assert!(
      matches!(&err, DeliveryError::Address { address, .. } if address == "not an address"),
      "{err:?}"
    );
    assert!(!err.is_retryable());
  }

  /// Check that an unreadable attachment fails delivery before any
  /// connection is attempted.
  #[test]
  async fn missing_attachment() {
    let options = Options {
      attachments: vec![PathBuf::from("/no/such/attachment.pdf")],
      // Nothing listens here; we must fail before connecting.
      server: "127.0.0.1:9".parse().unwrap(),
      ..options()
    };
    let err = send_email(&options).await.unwrap_err();
    assert!(
      matches!(&err, DeliveryError::Attachment { path, .. } if path == Path::new("/no/such/attachment.pdf")),
      "{err:?}"
    );
  }
}
