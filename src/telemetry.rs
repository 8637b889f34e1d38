// src/telemetry.rs

//! Optional operation counters, compiled in by the `telemetry` feature.
//!
//! The disabled build reduces every entry point to an empty inline
//! function, so instrumented call sites cost nothing in normal builds.

#[cfg(feature = "telemetry")]
mod enabled {
  use once_cell::sync::Lazy;
  use std::collections::HashMap;
  use std::sync::Mutex;

  static COUNTERS: Lazy<Mutex<HashMap<&'static str, u64>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

  /// Adds one to the named counter.
  pub fn increment_counter(name: &'static str) {
    if let Ok(mut counters) = COUNTERS.lock() {
      *counters.entry(name).or_insert(0) += 1;
    }
  }

  /// Current value of the named counter; 0 if it was never incremented.
  pub fn counter_value(name: &'static str) -> u64 {
    COUNTERS
      .lock()
      .ok()
      .and_then(|counters| counters.get(name).copied())
      .unwrap_or(0)
  }

  /// Zeroes all counters.
  pub fn reset_counters() {
    if let Ok(mut counters) = COUNTERS.lock() {
      counters.clear();
    }
  }

  /// Snapshot of every counter, sorted by name.
  pub fn report() -> Vec<(&'static str, u64)> {
    let mut entries: Vec<_> = COUNTERS
      .lock()
      .map(|counters| counters.iter().map(|(k, v)| (*k, *v)).collect())
      .unwrap_or_default();
    entries.sort_by_key(|(name, _)| *name);
    entries
  }
}

#[cfg(feature = "telemetry")]
pub use enabled::{counter_value, increment_counter, report, reset_counters};

#[cfg(not(feature = "telemetry"))]
mod disabled {
  /// Adds one to the named counter. No-op without the `telemetry` feature.
  #[inline(always)]
  pub fn increment_counter(_name: &'static str) {}

  /// Current value of the named counter. Always 0 without the `telemetry`
  /// feature.
  #[inline(always)]
  pub fn counter_value(_name: &'static str) -> u64 {
    0
  }

  /// Zeroes all counters. No-op without the `telemetry` feature.
  #[inline(always)]
  pub fn reset_counters() {}

  /// Snapshot of every counter. Always empty without the `telemetry`
  /// feature.
  #[inline(always)]
  pub fn report() -> Vec<(&'static str, u64)> {
    Vec::new()
  }
}

#[cfg(not(feature = "telemetry"))]
pub use disabled::{counter_value, increment_counter, report, reset_counters};
