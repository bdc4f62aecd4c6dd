// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(
  clippy::collapsible_if,
  clippy::let_and_return,
  clippy::let_unit_value
)]

mod args;
mod util;

use std::env::args_os;
use std::error::Error as _;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::CommandFactory as _;
use clap::Parser as _;

use anyhow::Context as _;
use anyhow::Error;
use anyhow::Result;

use mailsend::resolve;
use mailsend::send_email;
use mailsend::Layer;
use mailsend::LogLevel;
use mailsend::Options;
use mailsend::ResolveError;

use tracing::debug;
use tracing::error;
use tracing::subscriber::set_global_default as set_global_subscriber;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::FmtSubscriber;

use crate::args::Args;
use crate::util::expand_legacy_flags;


async fn run_impl(options: Options) -> ExitCode {
  if let Some(path) = &options.config_file {
    debug!("using configuration file `{}`", path.display());
  }

  match send_email(&options).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      let retryable = err.is_retryable();
      // `lettre` errors include their own cause when displayed, so we
      // only go one level deep.
      let message = match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
      };
      error!("failed to process the email request: {message}");
      if retryable {
        debug!("the failure may be transient");
      }
      ExitCode::FAILURE
    },
  }
}


fn setup_tracing(level: LogLevel, smtp_debug: bool, log_file: Option<&Path>) -> Result<()> {
  let level = match level {
    LogLevel::Debug => "debug",
    LogLevel::Info => "info",
    LogLevel::Warning => "warn",
    LogLevel::Error | LogLevel::Critical => "error",
  };
  let lettre = if smtp_debug { "trace" } else { "warn" };
  let directive = format!("{level},lettre={lettre}");

  let builder = FmtSubscriber::builder()
    .with_timer(ChronoLocal::new("%Y-%m-%dT%H:%M:%S%.3f%:z".to_string()))
    .with_env_filter(EnvFilter::new(directive));

  if let Some(path) = log_file {
    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .with_context(|| format!("failed to open log file `{}`", path.display()))?;
    let subscriber = builder
      .with_ansi(false)
      .with_writer(Mutex::new(file))
      .finish();
    let () =
      set_global_subscriber(subscriber).with_context(|| "failed to set tracing subscriber")?;
  } else {
    let subscriber = builder.finish();
    let () =
      set_global_subscriber(subscriber).with_context(|| "failed to set tracing subscriber")?;
  }
  Ok(())
}


/// Convert a resolution error caused by incorrect usage into a `clap`
/// error, so that it is reported like any other usage error.
fn usage_error(err: &ResolveError) -> clap::Error {
  let kind = match err {
    ResolveError::Server(..) => ErrorKind::ValueValidation,
    _ => ErrorKind::MissingRequiredArgument,
  };
  Args::command().error(kind, err)
}


/// Run the program and report errors, if any.
async fn run<A, T>(args: A) -> Result<ExitCode>
where
  A: IntoIterator<Item = T>,
  T: Into<OsString>,
{
  let args = match Args::try_parse_from(expand_legacy_flags(args)) {
    Ok(args) => args,
    Err(err) => match err.kind() {
      ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
        print!("{}", err);
        return Ok(ExitCode::SUCCESS)
      },
      _ => return Err(err.into()),
    },
  };

  let options = resolve(Layer::from(args)).map_err(|err| {
    if err.is_usage() {
      Error::from(usage_error(&err))
    } else {
      Error::from(err)
    }
  })?;

  let () = setup_tracing(
    options.log_level,
    options.smtp_debug,
    options.log_file.as_deref(),
  )?;

  Ok(run_impl(options).await)
}


#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  match run(args_os()).await {
    Ok(code) => code,
    Err(err) => match err.downcast::<clap::Error>() {
      Ok(err) => {
        let _result = err.print();
        ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2))
      },
      Err(err) => {
        eprintln!("Error: {err:?}");
        ExitCode::FAILURE
      },
    },
  }
}
