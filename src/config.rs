// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::convert::Infallible;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ParseLogLevelError;
use crate::error::ParseServerError;
use crate::error::ResolveError;


/// The subject used when none was provided.
pub const DEFAULT_SUBJECT: &str = "(no subject)";
/// The SMTP server contacted when none was provided.
pub const DEFAULT_SERVER: &str = "localhost:25";
/// The SMTP port used when a server specification lacks one.
pub const DEFAULT_PORT: u16 = 25;
/// The MIME subtype of the message body when none was provided.
pub const DEFAULT_CONTENT_TYPE: &str = "html";
/// The character set of the message body when none was provided.
pub const DEFAULT_CHARSET: &str = "utf-8";


/// A `true`/`false`/`auto` preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Toggle {
  True,
  False,
  /// Let the target port decide.
  #[default]
  Auto,
}

impl Toggle {
  /// Interpret a textual preference.
  ///
  /// The comparison is case-insensitive. Anything that is neither
  /// `true` nor `auto` is treated as `false`.
  pub fn from_value(value: &str) -> Self {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
      Self::True
    } else if value.eq_ignore_ascii_case("auto") {
      Self::Auto
    } else {
      Self::False
    }
  }
}

impl FromStr for Toggle {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from_value(s))
  }
}


/// Interpret a textual boolean, with everything but `true` being
/// `false`.
pub fn parse_flag(value: &str) -> bool {
  value.trim().eq_ignore_ascii_case("true")
}


/// The severity threshold for log output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
  Debug,
  #[default]
  Info,
  Warning,
  Error,
  Critical,
}

impl FromStr for LogLevel {
  type Err = ParseLogLevelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let level = match s.trim().to_ascii_uppercase().as_str() {
      "DEBUG" => Self::Debug,
      "INFO" => Self::Info,
      "WARNING" => Self::Warning,
      "ERROR" => Self::Error,
      "CRITICAL" => Self::Critical,
      _ => return Err(ParseLogLevelError(s.to_string())),
    };
    Ok(level)
  }
}


/// The address of an SMTP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Server {
  /// The host name or IP address.
  pub host: String,
  /// The TCP port.
  pub port: u16,
}

impl FromStr for Server {
  type Err = ParseServerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (host, port) = match s.split_once(':') {
      Some((host, port)) => {
        let port = port
          .parse::<u16>()
          .map_err(|_err| ParseServerError(s.to_string()))?;
        (host, port)
      },
      None => (s, DEFAULT_PORT),
    };

    if host.is_empty() {
      return Err(ParseServerError(s.to_string()))
    }

    Ok(Self {
      host: host.to_string(),
      port,
    })
  }
}

impl Display for Server {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{}:{}", self.host, self.port)
  }
}


/// A partial configuration, as provided by a single source.
///
/// A `None` field means that the source does not specify a value.
/// Layers are combined with [`Layer::or`] and finally turned into
/// [`Options`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
  pub sender: Option<String>,
  pub recipients: Option<Vec<String>>,
  pub cc: Option<Vec<String>>,
  pub bcc: Option<Vec<String>>,
  pub subject: Option<String>,
  /// Either literal text or the path to a file containing it.
  pub body: Option<String>,
  pub attachments: Option<Vec<PathBuf>>,
  /// The server in `host[:port]` form.
  pub server: Option<String>,
  pub tls: Option<Toggle>,
  pub ssl: Option<Toggle>,
  pub content_type: Option<String>,
  pub charset: Option<String>,
  pub smtp_user: Option<String>,
  pub smtp_password: Option<String>,
  pub smtp_debug: Option<bool>,
  pub log_level: Option<LogLevel>,
  pub log_file: Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl Layer {
  /// The built-in defaults.
  pub fn defaults() -> Self {
    Self {
      subject: Some(DEFAULT_SUBJECT.to_string()),
      server: Some(DEFAULT_SERVER.to_string()),
      tls: Some(Toggle::Auto),
      ssl: Some(Toggle::Auto),
      content_type: Some(DEFAULT_CONTENT_TYPE.to_string()),
      charset: Some(DEFAULT_CHARSET.to_string()),
      smtp_user: Some(String::new()),
      smtp_password: Some(String::new()),
      smtp_debug: Some(false),
      log_level: Some(LogLevel::Info),
      ..Default::default()
    }
  }

  /// Combine `self` with a lower precedence layer, using the latter's
  /// values only for fields that `self` leaves unset.
  pub fn or(self, fallback: Self) -> Self {
    Self {
      sender: self.sender.or(fallback.sender),
      recipients: self.recipients.or(fallback.recipients),
      cc: self.cc.or(fallback.cc),
      bcc: self.bcc.or(fallback.bcc),
      subject: self.subject.or(fallback.subject),
      body: self.body.or(fallback.body),
      attachments: self.attachments.or(fallback.attachments),
      server: self.server.or(fallback.server),
      tls: self.tls.or(fallback.tls),
      ssl: self.ssl.or(fallback.ssl),
      content_type: self.content_type.or(fallback.content_type),
      charset: self.charset.or(fallback.charset),
      smtp_user: self.smtp_user.or(fallback.smtp_user),
      smtp_password: self.smtp_password.or(fallback.smtp_password),
      smtp_debug: self.smtp_debug.or(fallback.smtp_debug),
      log_level: self.log_level.or(fallback.log_level),
      log_file: self.log_file.or(fallback.log_file),
      config_file: self.config_file.or(fallback.config_file),
    }
  }
}


/// Treat an empty string as an absent value.
pub fn non_empty(value: String) -> Option<String> {
  (!value.is_empty()).then_some(value)
}

/// Treat an empty list as an absent value.
pub fn non_empty_vec<T>(values: Vec<T>) -> Option<Vec<T>> {
  (!values.is_empty()).then_some(values)
}


/// The fully resolved configuration for sending a single email.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
  /// The "From" address.
  pub sender: String,
  /// The "To" addresses; never empty.
  pub recipients: Vec<String>,
  pub cc: Vec<String>,
  pub bcc: Vec<String>,
  pub subject: String,
  /// Either literal text or the path to a file containing it. Always
  /// set unless `attachments` is non-empty.
  pub body: Option<String>,
  pub attachments: Vec<PathBuf>,
  pub server: Server,
  pub tls: Toggle,
  pub ssl: Toggle,
  /// The MIME subtype of the body, e.g., `html` or `plain`.
  pub content_type: String,
  pub charset: String,
  /// The user to log in as; no authentication happens if empty.
  pub smtp_user: String,
  pub smtp_password: String,
  /// Whether to trace the SMTP conversation.
  pub smtp_debug: bool,
  pub log_level: LogLevel,
  pub log_file: Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl TryFrom<Layer> for Options {
  type Error = ResolveError;

  fn try_from(layer: Layer) -> Result<Self, Self::Error> {
    fn required<T>(value: Option<T>, name: &'static str) -> Result<T, ResolveError> {
      value.ok_or(ResolveError::Missing(name))
    }

    let Layer {
      sender,
      recipients,
      cc,
      bcc,
      subject,
      body,
      attachments,
      server,
      tls,
      ssl,
      content_type,
      charset,
      smtp_user,
      smtp_password,
      smtp_debug,
      log_level,
      log_file,
      config_file,
    } = layer;

    let sender = required(sender.and_then(non_empty), "sender")?;
    let recipients = required(recipients.and_then(non_empty_vec), "to")?;
    let attachments = attachments.unwrap_or_default();
    let body = body.and_then(non_empty);
    if body.is_none() && attachments.is_empty() {
      return Err(ResolveError::MissingContent)
    }

    let options = Self {
      sender,
      recipients,
      cc: cc.unwrap_or_default(),
      bcc: bcc.unwrap_or_default(),
      subject: required(subject, "subject")?,
      body,
      attachments,
      server: required(server, "server")?.parse()?,
      tls: required(tls, "tls")?,
      ssl: required(ssl, "ssl")?,
      content_type: required(content_type, "content-type")?,
      charset: required(charset, "charset")?,
      smtp_user: required(smtp_user, "smtp_user")?,
      smtp_password: required(smtp_password, "smtp_password")?,
      smtp_debug: required(smtp_debug, "smtp-debug")?,
      log_level: required(log_level, "log-level")?,
      log_file,
      config_file,
    };
    Ok(options)
  }
}


/// Resolve the final [`Options`] from the layer provided by program
/// arguments.
///
/// If `args` references a configuration file, it is loaded and its
/// values are used for everything `args` does not set. Built-in
/// defaults fill in what remains.
pub fn resolve(args: Layer) -> Result<Options, ResolveError> {
  let file = if let Some(path) = &args.config_file {
    Layer::from_file(path)?
  } else {
    Layer::default()
  };

  let layer = args.or(file).or(Layer::defaults());
  Options::try_from(layer)
}
