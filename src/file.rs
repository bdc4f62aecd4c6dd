// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use ini::Ini;
use ini::ParseOption;

use tracing::debug;

use crate::config::non_empty;
use crate::config::parse_flag;
use crate::config::Layer;
use crate::config::LogLevel;
use crate::config::Toggle;
use crate::error::ResolveError;


/// The sections of a configuration file, with section and key names
/// folded to lower case.
#[derive(Debug)]
struct Sections {
  path: PathBuf,
  sections: HashMap<String, HashMap<String, String>>,
}

impl Sections {
  fn load(path: &Path) -> Result<Self, ResolveError> {
    // Values are taken verbatim; a backslash is not an escape.
    let option = ParseOption {
      enabled_escape: false,
      ..Default::default()
    };
    let ini = Ini::load_from_file_opt(path, option).map_err(|source| ResolveError::Load {
      path: path.to_path_buf(),
      source,
    })?;

    let mut sections = HashMap::<String, HashMap<String, String>>::new();
    for (name, properties) in ini.iter() {
      let Some(name) = name else { continue };
      let keys = sections.entry(name.to_ascii_lowercase()).or_default();
      for (key, value) in properties.iter() {
        let _prev = keys.insert(key.to_ascii_lowercase(), value.to_string());
      }
    }

    Ok(Self {
      path: path.to_path_buf(),
      sections,
    })
  }

  fn has(&self, section: &str) -> bool {
    self.sections.contains_key(&section.to_ascii_lowercase())
  }

  /// Retrieve a value, with surrounding quotes removed. Empty values
  /// are reported as absent.
  fn get(&self, section: &str, key: &str) -> Option<String> {
    let value = self
      .sections
      .get(&section.to_ascii_lowercase())?
      .get(&key.to_ascii_lowercase())?;
    non_empty(unquote(value).to_string())
  }

  fn require(&self, section: &'static str, key: &'static str) -> Result<String, ResolveError> {
    self
      .get(section, key)
      .ok_or_else(|| ResolveError::MissingKey {
        path: self.path.clone(),
        section,
        key,
      })
  }

  fn invalid(&self, section: &'static str, key: &'static str, value: String) -> ResolveError {
    ResolveError::InvalidValue {
      path: self.path.clone(),
      section,
      key,
      value,
    }
  }
}


fn unquote(value: &str) -> &str {
  value.trim().trim_matches(|c| c == '"' || c == '\'')
}


impl Layer {
  /// Load a layer from an INI style configuration file.
  ///
  /// The file must contain an `SMTP` section with at least `Host` and
  /// `Port`. `MESSAGE` and `LOGGING` sections are optional.
  pub fn from_file(path: &Path) -> Result<Self, ResolveError> {
    debug!("loading configuration file `{}`", path.display());

    let sections = Sections::load(path)?;
    if !sections.has("SMTP") {
      return Err(ResolveError::MissingSection {
        path: path.to_path_buf(),
        section: "SMTP",
      })
    }

    let host = sections.require("SMTP", "Host")?;
    let port = sections.require("SMTP", "Port")?;
    let port = port
      .parse::<u16>()
      .map_err(|_err| sections.invalid("SMTP", "Port", port.clone()))?;

    let log_level = sections
      .get("LOGGING", "LogLevel")
      .map(|level| {
        level
          .parse::<LogLevel>()
          .map_err(|_err| sections.invalid("LOGGING", "LogLevel", level))
      })
      .transpose()?;

    let layer = Self {
      server: Some(format!("{host}:{port}")),
      smtp_user: sections.get("SMTP", "Username"),
      smtp_password: sections.get("SMTP", "Password"),
      ssl: sections
        .get("SMTP", "UseSSL")
        .map(|value| Toggle::from_value(&value)),
      tls: sections
        .get("SMTP", "UseTLS")
        .map(|value| Toggle::from_value(&value)),
      body: sections.get("MESSAGE", "Content"),
      subject: sections.get("MESSAGE", "Subject"),
      content_type: sections.get("MESSAGE", "ContentType"),
      charset: sections.get("MESSAGE", "Charset"),
      log_level,
      log_file: sections.get("LOGGING", "LogFile").map(PathBuf::from),
      smtp_debug: sections
        .get("LOGGING", "SmtpDebug")
        .map(|value| parse_flag(&value)),
      ..Default::default()
    };
    Ok(layer)
  }
}
