use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Observed result of a probe.
///
/// Network failures are data, not errors: a refused connection or a timeout is `Unreachable`,
/// which compares equal to the sentinel `-1` so that assertions read the same for every outcome.
pub enum ProbeOutcome {
  /// Connection failed or the exchange did not finish in time
  Unreachable,
  /// Response status code
  Status(u16),
  /// Response body text
  Body(String),
}

impl ProbeOutcome {
  /// Sentinel code of an unreachable target
  pub const UNREACHABLE: i32 = -1;

  pub fn is_unreachable(&self) -> bool {
    matches!(self, ProbeOutcome::Unreachable)
  }

  /// Status code, or the sentinel when unreachable. None for a body outcome.
  pub fn code(&self) -> Option<i32> {
    match self {
      ProbeOutcome::Unreachable => Some(Self::UNREACHABLE),
      ProbeOutcome::Status(s) => Some(*s as i32),
      ProbeOutcome::Body(_) => None,
    }
  }

  pub fn body(&self) -> Option<&str> {
    match self {
      ProbeOutcome::Body(b) => Some(b.as_str()),
      _ => None,
    }
  }
}

impl PartialEq<i32> for ProbeOutcome {
  fn eq(&self, other: &i32) -> bool {
    self.code() == Some(*other)
  }
}

impl PartialEq<&str> for ProbeOutcome {
  fn eq(&self, other: &&str) -> bool {
    self.body() == Some(*other)
  }
}

impl fmt::Display for ProbeOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ProbeOutcome::Unreachable => write!(f, "{}", Self::UNREACHABLE),
      ProbeOutcome::Status(s) => write!(f, "{s}"),
      ProbeOutcome::Body(b) => f.write_str(b),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sentinel_comparisons() {
    assert_eq!(ProbeOutcome::Unreachable, -1);
    assert_eq!(ProbeOutcome::Status(502), 502);
    assert_ne!(ProbeOutcome::Status(200), -1);
    assert_ne!(ProbeOutcome::Body("-1".to_string()), -1);
    assert_eq!(ProbeOutcome::Body("ok".to_string()), "ok");
    assert_eq!(ProbeOutcome::Unreachable.to_string(), "-1");
  }
}
