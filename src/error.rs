// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;
use std::path::PathBuf;

use lettre::address::AddressError;
use lettre::transport::smtp::Error as SmtpError;


/// An error indicating that a `host[:port]` specification is invalid.
#[derive(Debug, thiserror::Error)]
#[error("invalid SMTP server specification `{0}`")]
pub struct ParseServerError(pub(crate) String);


/// An error indicating an unrecognized log level name.
#[derive(Debug, thiserror::Error)]
#[error("invalid log level `{0}`; expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL")]
pub struct ParseLogLevelError(pub(crate) String);


/// An error reported while resolving the effective [`Options`][crate::Options].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
  /// A field that must be provided was not set by any layer.
  #[error("missing required value for `{0}`")]
  Missing(&'static str),
  /// Neither a message body nor an attachment was provided.
  #[error("must specify message body as argument or file")]
  MissingContent,
  /// The SMTP server specification could not be parsed.
  #[error(transparent)]
  Server(#[from] ParseServerError),
  /// The configuration file could not be read or parsed.
  #[error("failed to load configuration file `{}`", path.display())]
  Load {
    path: PathBuf,
    #[source]
    source: ini::Error,
  },
  /// The configuration file lacks a required section.
  #[error("configuration file `{}` is missing required section `{section}`", path.display())]
  MissingSection {
    path: PathBuf,
    section: &'static str,
  },
  /// The configuration file lacks a required key.
  #[error(
    "configuration file `{}` is missing required key `{key}` in section `{section}`",
    path.display()
  )]
  MissingKey {
    path: PathBuf,
    section: &'static str,
    key: &'static str,
  },
  /// The configuration file contains a value that could not be
  /// interpreted.
  #[error(
    "configuration file `{}` contains invalid value `{value}` for `{section}.{key}`",
    path.display()
  )]
  InvalidValue {
    path: PathBuf,
    section: &'static str,
    key: &'static str,
    value: String,
  },
}

impl ResolveError {
  /// Check whether the error is the result of incorrect usage (as
  /// opposed to a problem with the configuration file).
  pub fn is_usage(&self) -> bool {
    matches!(
      self,
      Self::Missing(..) | Self::MissingContent | Self::Server(..)
    )
  }
}


/// An error reported while building or submitting an email.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DeliveryError {
  /// A mail address could not be parsed.
  #[error("failed to parse mail address `{address}`")]
  Address {
    address: String,
    #[source]
    source: AddressError,
  },
  /// The content type of the message body is not valid.
  #[error("failed to parse content type specification `{value}`: {reason}")]
  ContentType { value: String, reason: String },
  /// The file providing the message body could not be read.
  #[error("failed to read message body from `{}`", path.display())]
  Body {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  /// An attachment could not be read.
  #[error("failed to read attachment `{}`", path.display())]
  Attachment {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  /// The message could not be assembled.
  #[error("failed to create email message")]
  Message(#[source] lettre::error::Error),
  /// Connecting to the server (or negotiating TLS) failed.
  #[error("failed to connect to {server}")]
  Connection {
    server: String,
    #[source]
    source: SmtpError,
  },
  /// The server rejected the provided credentials.
  #[error("failed to authenticate with {server}")]
  Authentication {
    server: String,
    #[source]
    source: SmtpError,
  },
  /// The server rejected the envelope or the message.
  #[error("failed to submit email via {server}")]
  Submission {
    server: String,
    #[source]
    source: SmtpError,
  },
}

impl DeliveryError {
  /// Check whether retrying the delivery at a later point may succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Connection { source, .. } => !source.is_permanent(),
      Self::Authentication { source, .. } | Self::Submission { source, .. } => {
        source.is_transient() || source.is_timeout()
      },
      Self::Address { .. }
      | Self::ContentType { .. }
      | Self::Body { .. }
      | Self::Attachment { .. }
      | Self::Message(..) => false,
    }
  }
}
