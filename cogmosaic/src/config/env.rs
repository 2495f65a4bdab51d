//! Environment variable access that can be replaced in tests.
//!
//! - [`OsEnv`]: reads the process environment
//! - [`FauxEnv`]: a fixed set of variables

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;

use subst::VariableMap;
use tracing::warn;

/// Environment variable access, usable for `${VAR}` substitution in config files.
pub trait Env<'a>: VariableMap<'a> {
    /// Get an environment variable without Unicode validation.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Get a non-empty environment variable as a UTF-8 [`String`].
    ///
    /// Logs a warning and returns `None` if the variable contains invalid Unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        match self.var_os(key)?.into_string() {
            Ok(v) if v.is_empty() => None,
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }

    /// Whether a variable is set but was never used while substituting the config file.
    #[must_use]
    fn has_unused_var(&self, key: &str) -> bool;
}

/// The process environment. Remembers which variables were substituted.
#[derive(Debug, Default)]
pub struct OsEnv(RefCell<HashSet<String>>);

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn has_unused_var(&self, key: &str) -> bool {
        !self.0.borrow().contains(key) && std::env::var_os(key).is_some()
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.borrow_mut().insert(key.to_string());
        std::env::var(key).ok()
    }
}

/// A fixed environment for tests.
#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.get(key).map(|s| s.to_string_lossy().to_string())
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }

    fn has_unused_var(&self, key: &str) -> bool {
        self.var_os(key).is_some()
    }
}
