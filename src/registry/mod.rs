//! Process-wide registry of named functions
//!
//! Registered functions serve as custom dtypes, as validation checks and as
//! targets of `${?name}` / `${!name}` interpolation. Every invocation goes
//! through [`call`], which turns both returned errors and panics into an
//! error string so a broken function never aborts a tree walk.

mod call;
mod outcome;

pub use call::{Call, NodeRef, Subject};
pub use outcome::CheckOutcome;

use crate::builtins;
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub use crate::builtins::reset_hash;

/// A registered function.
pub type Func = Arc<dyn Fn(&Call<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Name to function mapping.
#[derive(Default)]
pub struct Registry {
    funcs: IndexMap<String, Func>,
}

impl Registry {
    /// A registry holding the builtin functions.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::default();
        builtins::register_all(&mut registry);
        registry
    }

    pub fn insert<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&Call<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if self.funcs.contains_key(name) {
            warn!("Function {name:?} is already registered, replacing it");
        }
        self.funcs.insert(name.to_string(), Arc::new(func));
    }

    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Option<Func> {
        self.funcs.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.funcs.keys().cloned().collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("funcs", &self.names()).finish()
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_builtins()));

/// Registers `func` under `name`, replacing any previous registration.
pub fn register<F>(name: &str, func: F)
where
    F: Fn(&Call<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    REGISTRY.write().insert(name, func);
}

pub fn unregister(name: &str) -> bool {
    REGISTRY.write().remove(name).is_some()
}

pub fn lookup(name: &str) -> Option<Func> {
    REGISTRY.read().get(name)
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.read().contains(name)
}

pub fn names() -> Vec<String> {
    REGISTRY.read().names()
}

/// Invokes a registered function.
///
/// The function is cloned out of the registry before it runs, so functions
/// may themselves call into the registry.
pub fn call(name: &str, call: &Call<'_>) -> Result<Value, String> {
    let Some(func) = lookup(name) else {
        warn!("Function {name:?} is not registered");
        return Err(format!("Function {name:?} is not registered"));
    };
    debug!("Calling {name}(args={:?}, kwargs={:?})", call.args, call.kwargs);
    match catch_unwind(AssertUnwindSafe(|| func(call))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!("Function {name:?} returned an error: {err:#}");
            Err(err.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Function {name:?} panicked: {message}");
            Err(message)
        }
    }
}

/// Invokes a registered function as a check.
pub fn check(name: &str, call: &Call<'_>) -> CheckOutcome {
    CheckOutcome::from(self::call(name, call))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "function panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn builtins_are_registered_on_first_use() {
        for name in ["get_env", "oneof", "compare", "between", "isdir", "isfile", "gen_hash"] {
            assert!(is_registered(name), "{name} missing");
        }
    }

    #[test]
    fn unknown_functions_yield_an_error_string() {
        let result = call("registry_test_nope", &Call::default());
        assert_eq!(result, Err("Function \"registry_test_nope\" is not registered".to_string()));
    }

    #[test]
    fn errors_are_converted_to_strings() {
        register("registry_test_err", |_| Err(anyhow::anyhow!("it broke")));
        assert_eq!(call("registry_test_err", &Call::default()), Err("it broke".to_string()));
        assert!(!check("registry_test_err", &Call::default()).passed());
    }

    #[test]
    fn panics_are_converted_to_strings() {
        register("registry_test_panic", |_| panic!("kaboom"));
        assert_eq!(call("registry_test_panic", &Call::default()), Err("kaboom".to_string()));
    }

    #[test]
    fn replacement_wins() {
        register("registry_test_replace", |_| Ok(Value::Int(1)));
        register("registry_test_replace", |_| Ok(Value::Int(2)));
        assert_eq!(call("registry_test_replace", &Call::default()), Ok(Value::Int(2)));
        assert!(unregister("registry_test_replace"));
        assert!(lookup("registry_test_replace").is_none());
    }

    #[test]
    fn functions_receive_arguments() {
        register("registry_test_sum", |call| {
            let total: i64 = call.args.iter().filter_map(Value::as_i64).sum();
            Ok(Value::Int(total))
        });
        let args = Call::default().with_args(vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(call("registry_test_sum", &args), Ok(Value::Int(5)));
    }
}
