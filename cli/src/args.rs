// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;

use mailsend::non_empty;
use mailsend::non_empty_vec;
use mailsend::parse_flag;
use mailsend::Layer;
use mailsend::LogLevel;
use mailsend::Toggle;


/// A program for sending an email using an SMTP server.
#[derive(Debug, Parser)]
#[clap(version)]
pub(crate) struct Args {
  /// The sender email address.
  #[clap(short = 'f', long, value_name = "MAIL_ADDRESS", required = true)]
  pub sender: String,
  /// The recipient email address(es).
  #[clap(short, long, value_name = "MAIL_ADDRESS", num_args = 1.., required = true)]
  pub to: Vec<String>,
  /// The message body.
  ///
  /// If the (space joined) value is the path of a file, the file's
  /// contents are used instead.
  #[clap(short, long, value_name = "MESSAGE", num_args = 0..)]
  pub message: Vec<String>,
  /// The cc email address(es).
  #[clap(long, value_name = "MAIL_ADDRESS", num_args = 0..)]
  pub cc: Vec<String>,
  /// The bcc email address(es).
  #[clap(long, value_name = "MAIL_ADDRESS", num_args = 0..)]
  pub bcc: Vec<String>,
  /// The message subject; defaults to "(no subject)".
  #[clap(short = 'u', long)]
  pub subject: Option<String>,
  /// The SMTP server in the format "host:port"; defaults to
  /// localhost:25.
  #[clap(short, long, value_name = "SERVER[:PORT]")]
  pub server: Option<String>,
  /// File attachment(s).
  #[clap(short, long, value_name = "FILE", num_args = 0..)]
  pub attachments: Vec<PathBuf>,
  /// Whether to use STARTTLS; defaults to auto.
  #[clap(long, value_name = "true|false|auto")]
  pub tls: Option<Toggle>,
  /// Whether to use implicit TLS (SSL); defaults to auto.
  #[clap(long, value_name = "true|false|auto")]
  pub ssl: Option<Toggle>,
  /// The message body type; defaults to "html", i.e., text/html.
  #[clap(long, value_name = "TYPE")]
  pub content_type: Option<String>,
  /// The message body character encoding; defaults to "utf-8".
  #[clap(long)]
  pub charset: Option<String>,
  /// The log level; defaults to INFO.
  #[clap(long, value_name = "DEBUG|INFO|WARNING|ERROR|CRITICAL")]
  pub log_level: Option<LogLevel>,
  /// Append log output to the given file instead of writing it to
  /// stdout.
  #[clap(long, value_name = "FILE")]
  pub log_file: Option<PathBuf>,
  /// Whether to trace the SMTP conversation; defaults to false.
  #[clap(long, value_name = "true|false")]
  pub smtp_debug: Option<String>,
  /// The username for SMTP authentication.
  #[clap(long = "smtp_user", value_name = "USERNAME")]
  pub smtp_user: Option<String>,
  /// The password for SMTP authentication.
  #[clap(long = "smtp_password", value_name = "PASSWORD")]
  pub smtp_password: Option<String>,
  /// The path to a configuration file providing values for everything
  /// not specified on the command line.
  #[clap(short = 'c', long, value_name = "FILE")]
  pub config_file: Option<PathBuf>,
}


impl From<Args> for Layer {
  fn from(args: Args) -> Self {
    let Args {
      sender,
      to,
      message,
      cc,
      bcc,
      subject,
      server,
      attachments,
      tls,
      ssl,
      content_type,
      charset,
      log_level,
      log_file,
      smtp_debug,
      smtp_user,
      smtp_password,
      config_file,
    } = args;

    Self {
      sender: non_empty(sender),
      recipients: non_empty_vec(to),
      cc: non_empty_vec(cc),
      bcc: non_empty_vec(bcc),
      subject: subject.and_then(non_empty),
      body: non_empty(message.join(" ")),
      attachments: non_empty_vec(attachments),
      server: server.and_then(non_empty),
      tls,
      ssl,
      content_type: content_type.and_then(non_empty),
      charset: charset.and_then(non_empty),
      smtp_user: smtp_user.and_then(non_empty),
      smtp_password: smtp_password.and_then(non_empty),
      smtp_debug: smtp_debug.and_then(non_empty).map(|value| parse_flag(&value)),
      log_level,
      log_file,
      config_file,
    }
  }
}
