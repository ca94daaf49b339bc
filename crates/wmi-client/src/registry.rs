//! Call registry: named handlers the server may invoke over the push channel
//!
//! Handlers are registered by name with a typed argument tuple. Dispatching
//! a [`PendingCall`] looks the name up, converts the positional JSON
//! arguments and runs the handler against the page context. Unknown names
//! and bad arguments are reported as errors, never panics.

use crate::result::{WmiError, WmiResult};
use crate::wire::{wire_bool, PendingCall};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Positional arguments a handler can be called with.
///
/// Missing trailing arguments are passed as `null`, so `Option<T>` slots
/// behave like optional JavaScript parameters. Extra arguments are ignored.
pub trait FromArgs: Sized {
    /// Convert the raw arguments of `method`
    fn from_args(method: &str, args: &[Value]) -> WmiResult<Self>;
}

fn arg<T: DeserializeOwned>(method: &str, args: &[Value], index: usize) -> WmiResult<T> {
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| WmiError::invalid_arguments(method, format!("argument {index}: {e}")))
}

impl FromArgs for () {
    fn from_args(_method: &str, _args: &[Value]) -> WmiResult<Self> {
        Ok(())
    }
}

impl FromArgs for Vec<Value> {
    fn from_args(_method: &str, args: &[Value]) -> WmiResult<Self> {
        Ok(args.to_vec())
    }
}

macro_rules! impl_from_args {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: DeserializeOwned),+> FromArgs for ($($name,)+) {
            fn from_args(method: &str, args: &[Value]) -> WmiResult<Self> {
                Ok(($(arg::<$name>(method, args, $idx)?,)+))
            }
        }
    };
}

impl_from_args!(A: 0);
impl_from_args!(A: 0, B: 1);
impl_from_args!(A: 0, B: 1, C: 2);
impl_from_args!(A: 0, B: 1, C: 2, D: 3);
impl_from_args!(A: 0, B: 1, C: 2, D: 3, E: 4);

/// A text argument that also accepts numbers and booleans.
///
/// Arguments are JSON-decoded on arrival, so an id the server sent as
/// `"1001"` reaches the handler as the number `1001`. Booleans become their
/// wire form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum TextRepr {
    Str(String),
    Num(serde_json::Number),
    Bool(bool),
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(match TextRepr::deserialize(deserializer)? {
            TextRepr::Str(s) => s,
            TextRepr::Num(n) => n.to_string(),
            TextRepr::Bool(b) => wire_bool(b).to_string(),
        }))
    }
}

impl std::fmt::Display for Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type Handler<C> = Box<dyn Fn(&mut C, &[Value]) -> WmiResult<()>>;

/// Outcome of running one batch of calls
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Methods that ran successfully, in order
    pub executed: Vec<String>,
    /// Calls that failed, with their error
    pub failed: Vec<(String, WmiError)>,
    /// Calls not run because the channel was inactive
    pub skipped: usize,
}

impl DispatchReport {
    /// Whether every call ran without error
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry of remote-callable handlers over a context `C`
pub struct CallRegistry<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for CallRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> std::fmt::Debug for CallRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods = self.methods();
        methods.sort_unstable();
        f.debug_struct("CallRegistry")
            .field("methods", &methods)
            .finish()
    }
}

fn validate_name(method: &str) -> WmiResult<()> {
    let valid = method
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(WmiError::Registration {
            method: method.to_string(),
            message: "method names are identifiers".to_string(),
        })
    }
}

impl<C> CallRegistry<C> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler over raw JSON arguments
    pub fn register_raw<F>(&mut self, method: &str, handler: F) -> WmiResult<()>
    where
        F: Fn(&mut C, &[Value]) -> WmiResult<()> + 'static,
    {
        validate_name(method)?;
        if self.handlers.contains_key(method) {
            return Err(WmiError::Registration {
                method: method.to_string(),
                message: "already registered".to_string(),
            });
        }
        self.handlers.insert(method.to_string(), Box::new(handler));
        Ok(())
    }

    /// Register a handler taking typed positional arguments
    pub fn register<A, F>(&mut self, method: &str, handler: F) -> WmiResult<()>
    where
        A: FromArgs + 'static,
        F: Fn(&mut C, A) -> WmiResult<()> + 'static,
    {
        let name = method.to_string();
        self.register_raw(method, move |ctx, args| {
            let typed = A::from_args(&name, args)?;
            handler(ctx, typed)
        })
    }

    /// Whether a handler exists for `method`
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Run one call
    pub fn invoke(&self, ctx: &mut C, call: &PendingCall) -> WmiResult<()> {
        let handler = self
            .handlers
            .get(&call.method)
            .ok_or_else(|| WmiError::UnknownMethod {
                method: call.method.clone(),
            })?;
        handler(ctx, &call.arguments)
    }

    /// Run a batch strictly in order. A failing call is logged and does not
    /// stop the calls after it. When `active` is false nothing runs.
    pub fn dispatch(&self, ctx: &mut C, calls: &[PendingCall], active: bool) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !active {
            report.skipped = calls.len();
            tracing::debug!(count = calls.len(), "push inactive, calls not executed");
            return report;
        }
        for call in calls {
            match self.invoke(ctx, call) {
                Ok(()) => report.executed.push(call.method.clone()),
                Err(err) => {
                    tracing::warn!(method = %call.method, error = %err, "remote call failed");
                    report.failed.push((call.method.clone(), err));
                }
            }
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    fn registry() -> CallRegistry<Recorder> {
        let mut registry = CallRegistry::new();
        for name in ["a", "b", "c"] {
            registry
                .register(name, move |r: &mut Recorder, (): ()| {
                    r.calls.push(name.to_string());
                    Ok(())
                })
                .unwrap();
        }
        registry
            .register("boom", |_r: &mut Recorder, (): ()| {
                Err(WmiError::validation("boom"))
            })
            .unwrap();
        registry
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn test_rejects_invalid_names() {
            let mut registry: CallRegistry<Recorder> = CallRegistry::new();
            for bad in ["", "1abc", "a b", "alert(1)", "x.y"] {
                let err = registry.register_raw(bad, |_, _| Ok(())).unwrap_err();
                assert!(matches!(err, WmiError::Registration { .. }), "{bad}");
            }
        }

        #[test]
        fn test_rejects_duplicates() {
            let mut registry = registry();
            let err = registry.register_raw("a", |_, _| Ok(())).unwrap_err();
            assert!(err.to_string().contains("already registered"));
        }

        #[test]
        fn test_methods_listed() {
            let registry = registry();
            assert!(registry.contains("boom"));
            assert_eq!(registry.methods().len(), 4);
        }
    }

    mod dispatch_tests {
        use super::*;

        #[test]
        fn test_batch_runs_in_array_order() {
            let registry = registry();
            let mut rec = Recorder::default();
            let calls = vec![
                PendingCall::new("a", vec![]),
                PendingCall::new("b", vec![]),
                PendingCall::new("c", vec![]),
            ];
            let report = registry.dispatch(&mut rec, &calls, true);
            assert_eq!(rec.calls, vec!["a", "b", "c"]);
            assert!(report.is_clean());
        }

        #[test]
        fn test_failures_do_not_stop_the_batch() {
            let registry = registry();
            let mut rec = Recorder::default();
            let calls = vec![
                PendingCall::new("a", vec![]),
                PendingCall::new("boom", vec![]),
                PendingCall::new("missing", vec![]),
                PendingCall::new("c", vec![]),
            ];
            let report = registry.dispatch(&mut rec, &calls, true);
            assert_eq!(rec.calls, vec!["a", "c"]);
            assert_eq!(report.executed, vec!["a", "c"]);
            assert_eq!(report.failed.len(), 2);
            assert!(matches!(report.failed[1].1, WmiError::UnknownMethod { .. }));
        }

        #[test]
        fn test_inactive_skips_everything() {
            let registry = registry();
            let mut rec = Recorder::default();
            let report = registry.dispatch(&mut rec, &[PendingCall::new("a", vec![])], false);
            assert!(rec.calls.is_empty());
            assert_eq!(report.skipped, 1);
        }
    }

    mod argument_tests {
        use super::*;

        #[test]
        fn test_typed_arguments() {
            let mut registry: CallRegistry<Vec<String>> = CallRegistry::new();
            registry
                .register(
                    "update_row_value",
                    |out: &mut Vec<String>, (list, id, col, classes): (String, String, String, Option<Vec<String>>)| {
                        out.push(format!("{list}/{id}/{col}/{}", classes.unwrap_or_default().len()));
                        Ok(())
                    },
                )
                .unwrap();

            let mut out = Vec::new();
            let call = PendingCall::new(
                "update_row_value",
                vec![json!("users"), json!("1001"), json!("gecos")],
            );
            registry.invoke(&mut out, &call).unwrap();
            assert_eq!(out, vec!["users/1001/gecos/0"]);
        }

        #[test]
        fn test_text_accepts_decoded_scalars() {
            let mut registry: CallRegistry<Vec<String>> = CallRegistry::new();
            registry
                .register("f", |out: &mut Vec<String>, (a, b, c): (Text, Text, Text)| {
                    out.extend([a.0, b.0, c.0]);
                    Ok(())
                })
                .unwrap();
            let mut out = Vec::new();
            let call = PendingCall::new("f", vec![json!(1001), json!("bob"), json!(false)]);
            registry.invoke(&mut out, &call).unwrap();
            assert_eq!(out, vec!["1001", "bob", ""]);
            let err = registry
                .invoke(&mut out, &PendingCall::new("f", vec![json!([1])]))
                .unwrap_err();
            assert!(matches!(err, WmiError::InvalidArguments { .. }));
        }

        #[test]
        fn test_bad_argument_type_is_reported() {
            let mut registry: CallRegistry<()> = CallRegistry::new();
            registry
                .register("f", |_ctx: &mut (), (_n,): (u32,)| Ok(()))
                .unwrap();
            let err = registry
                .invoke(&mut (), &PendingCall::new("f", vec![json!("x")]))
                .unwrap_err();
            assert!(matches!(err, WmiError::InvalidArguments { .. }));
            let err = registry
                .invoke(&mut (), &PendingCall::new("f", vec![]))
                .unwrap_err();
            assert!(err.to_string().contains("argument 0"));
        }
    }
}
