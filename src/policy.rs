// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use tracing::warn;

use crate::config::Toggle;


/// The connection security a well known submission port implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortPolicy {
  /// Whether to upgrade the connection via STARTTLS.
  pub tls: bool,
  /// Whether to use implicit TLS right from the start.
  pub ssl: bool,
}


const PORT_POLICIES: [(u16, PortPolicy); 4] = [
  (
    25,
    PortPolicy {
      tls: false,
      ssl: false,
    },
  ),
  (
    465,
    PortPolicy {
      tls: false,
      ssl: true,
    },
  ),
  (
    587,
    PortPolicy {
      tls: true,
      ssl: false,
    },
  ),
  (
    2525,
    PortPolicy {
      tls: true,
      ssl: false,
    },
  ),
];


/// Look up the security policy associated with the given port, if any.
pub fn port_policy(port: u16) -> Option<PortPolicy> {
  PORT_POLICIES
    .iter()
    .find_map(|(p, policy)| (*p == port).then_some(*policy))
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SmtpMode {
  /// Use unencrypted SMTP (typically on port 25).
  Unencrypted,
  /// Use StartTLS mode (often on port 587).
  StartTls,
  /// Use full TLS mode (often on port 465).
  Tls,
}


/// The effective security flags for a connection.
///
/// Both flags are resolved independently of each other and may both be
/// set. In that case implicit TLS takes precedence, see
/// [`Security::mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Security {
  /// Upgrade a plain text connection via STARTTLS before
  /// authenticating.
  pub use_tls: bool,
  /// Negotiate TLS as part of establishing the connection.
  pub use_ssl: bool,
}

impl Security {
  /// Resolve the user's TLS and SSL preferences for a connection to
  /// `port`.
  pub fn resolve(tls: Toggle, ssl: Toggle, port: u16) -> Self {
    let policy = port_policy(port);
    if policy.is_none() && (tls == Toggle::Auto || ssl == Toggle::Auto) {
      warn!("could not determine the SSL/TLS behavior for port {port}: not mapped");
    }

    let resolve = |toggle: Toggle, select: fn(&PortPolicy) -> bool| match toggle {
      Toggle::True => true,
      Toggle::False => false,
      Toggle::Auto => policy.as_ref().is_some_and(select),
    };

    Self {
      use_tls: resolve(tls, |policy| policy.tls),
      use_ssl: resolve(ssl, |policy| policy.ssl),
    }
  }

  /// Pick the connection strategy implied by the flags.
  pub fn mode(&self) -> SmtpMode {
    if self.use_ssl {
      SmtpMode::Tls
    } else if self.use_tls {
      SmtpMode::StartTls
    } else {
      SmtpMode::Unencrypted
    }
  }
}
