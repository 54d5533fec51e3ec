//! Shared execution environment and compatibility shims
//!
//! Assets execute inside one shared global context so that earlier assets
//! can install globals later assets consume (framework core before framework
//! adapter before test files). Browser-expecting assets additionally need a
//! few globals shimmed in around their execution; the shim table below is
//! data-driven and can grow without touching the orchestration.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::common::Result;

/// A value installed in the shared global context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Global {
    /// Alias of the environment's own global object (`window = global`)
    SelfAlias,
    /// A plain value
    Value(Value),
}

/// The global context shared by all assets of a run
///
/// Mutations are explicit rather than ambient process-wide state, so tests
/// can observe exactly what a shim installed and removed.
#[derive(Debug, Default)]
pub struct SharedExecutionEnvironment {
    globals: HashMap<String, Global>,
}

impl SharedExecutionEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a plain global value
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), Global::Value(value));
    }

    /// Install a global aliasing the environment's own global object
    pub fn set_self_alias(&mut self, name: impl Into<String>) {
        self.globals.insert(name.into(), Global::SelfAlias);
    }

    /// Look up a global
    pub fn get(&self, name: &str) -> Option<&Global> {
        self.globals.get(name)
    }

    /// Remove a global
    pub fn remove(&mut self, name: &str) -> Option<Global> {
        self.globals.remove(name)
    }

    /// Whether a global is installed
    pub fn contains(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// Run `f` with the shims for `asset_url` applied
    ///
    /// The first matching rule is installed before `f` and its listed
    /// globals are removed afterwards, on both success and error paths, so
    /// shim state cannot leak into later assets through an early return.
    pub fn with_shims<F, T>(&mut self, asset_url: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let rule = SHIM_RULES
            .iter()
            .find(|rule| asset_url.contains(rule.url_substring));

        if let Some(rule) = rule {
            (rule.install)(self);
        }

        let result = f(self);

        if let Some(rule) = rule {
            for name in rule.remove_after {
                self.globals.remove(*name);
            }
        }

        result
    }
}

/// One compatibility shim, keyed by a substring of the asset URL
struct ShimRule {
    url_substring: &'static str,
    install: fn(&mut SharedExecutionEnvironment),
    /// Globals removed after the asset executed
    remove_after: &'static [&'static str],
}

// jasmine leaves `window` installed; the next shim cycle overwrites it.
static SHIM_RULES: &[ShimRule] = &[
    ShimRule {
        url_substring: "mocha",
        install: install_mocha_globals,
        remove_after: &["window"],
    },
    ShimRule {
        url_substring: "jasmine",
        install: install_jasmine_globals,
        remove_after: &[],
    },
];

fn install_mocha_globals(env: &mut SharedExecutionEnvironment) {
    env.set_self_alias("window");
    env.set_value("location", json!({"pathname": "/"}));
}

fn install_jasmine_globals(env: &mut SharedExecutionEnvironment) {
    env.set_self_alias("window");
    env.set_value("location", json!({"origin": "null"}));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;

    #[test]
    fn mocha_shim_installs_window_and_location() {
        let mut env = SharedExecutionEnvironment::new();
        env.with_shims("/base/node_modules/mocha/mocha.js", |env| {
            assert_eq!(env.get("window"), Some(&Global::SelfAlias));
            assert_eq!(
                env.get("location"),
                Some(&Global::Value(json!({"pathname": "/"})))
            );
            Ok(())
        })
        .unwrap();

        // window is reverted, location is left behind.
        assert!(!env.contains("window"));
        assert!(env.contains("location"));
    }

    #[test]
    fn jasmine_shim_leaves_window_installed() {
        let mut env = SharedExecutionEnvironment::new();
        env.with_shims("/base/jasmine-core/jasmine.js", |env| {
            assert_eq!(
                env.get("location"),
                Some(&Global::Value(json!({"origin": "null"})))
            );
            Ok(())
        })
        .unwrap();

        assert_eq!(env.get("window"), Some(&Global::SelfAlias));
    }

    #[test]
    fn next_shim_cycle_overwrites_leftover_window() {
        let mut env = SharedExecutionEnvironment::new();
        env.with_shims("/jasmine.js", |_| Ok(())).unwrap();
        assert!(env.contains("window"));

        env.with_shims("/mocha.js", |env| {
            assert_eq!(env.get("window"), Some(&Global::SelfAlias));
            Ok(())
        })
        .unwrap();
        assert!(!env.contains("window"));
    }

    #[test]
    fn unmatched_urls_get_no_shims() {
        let mut env = SharedExecutionEnvironment::new();
        env.with_shims("/base/spec/test.js", |env| {
            assert!(!env.contains("window"));
            assert!(!env.contains("location"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn shims_are_reverted_when_execution_fails() {
        let mut env = SharedExecutionEnvironment::new();
        let result: Result<()> = env.with_shims("/mocha.js", |_| {
            Err(Error::Internal("asset blew up".to_string()))
        });
        assert!(result.is_err());
        assert!(!env.contains("window"));
    }

    #[test]
    fn globals_persist_across_assets() {
        let mut env = SharedExecutionEnvironment::new();
        env.with_shims("/framework.js", |env| {
            env.set_value("__coverage__", json!({}));
            Ok(())
        })
        .unwrap();
        assert!(env.contains("__coverage__"));
    }
}
