// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::OsString;


/// Multi-character short flags that we accept for compatibility, along
/// with the long flag each stands for.
const LEGACY_FLAGS: [(&str, &str); 4] = [
  ("-xu", "--smtp_user"),
  ("-xp", "--smtp_password"),
  ("-cc", "--cc"),
  ("-bcc", "--bcc"),
];


/// Rewrite legacy multi-character short flags into their long form.
///
/// `clap` only supports single character short flags and would, for
/// example, interpret `-cc` as `-c c`.
pub(crate) fn expand_legacy_flags<A, T>(args: A) -> impl Iterator<Item = OsString>
where
  A: IntoIterator<Item = T>,
  T: Into<OsString>,
{
  let mut verbatim = false;

  args.into_iter().map(move |arg| {
    let arg: OsString = arg.into();
    if verbatim {
      return arg
    }
    if arg == "--" {
      verbatim = true;
      return arg
    }

    LEGACY_FLAGS
      .iter()
      .find(|(legacy, _long)| arg == *legacy)
      .map(|(_legacy, long)| OsString::from(*long))
      .unwrap_or(arg)
  })
}
