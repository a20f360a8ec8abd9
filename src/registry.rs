//! Remote validators.
//!
//! A `remote` call names a validator by identifier (in a web host, its URL).
//! On the trusted side the registry invokes the function in-process; the
//! interactive side reaches the same function over the wire, which is what
//! [`RemoteRegistry::dispatch_json`] serves.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::{debug, warn};

use crate::{
    value::Value,
    wire::{self, WireError},
};

/// A registered validator: arguments in, result out.
pub type RemoteFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Identifier to validator map. Immutable once built.
#[derive(Clone, Default)]
pub struct RemoteRegistry {
    validators: HashMap<String, RemoteFn>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    validators: HashMap<String, RemoteFn>,
}

impl RegistryBuilder {
    /// Register `f` under `id`, replacing any earlier registration.
    pub fn register<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        let id = id.into();
        debug!("Register remote validator: {}", id);
        self.validators.insert(id, Arc::new(f));
        self
    }

    pub fn build(self) -> RemoteRegistry {
        RemoteRegistry {
            validators: self.validators,
        }
    }
}

impl RemoteRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// An empty registry: every `remote` resolves to Null.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &str) -> Option<&RemoteFn> {
        self.validators.get(id)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Call the validator registered under `id`. A missing registration is
    /// not an error: the result is Null, which every comparison passes.
    pub fn invoke(&self, id: &str, args: &[Value]) -> Value {
        match self.lookup(id) {
            Some(validator) => validator(args),
            None => {
                warn!("No remote validator registered for '{}'", id);
                Value::Null
            }
        }
    }

    /// Serve one wire request: decode `{"args": [...]}`, run the validator,
    /// encode its result.
    pub fn dispatch_json(&self, id: &str, body: &str) -> Result<String, WireError> {
        let args = wire::decode_request(body)?;
        let result = self.invoke(id, &args);
        wire::encode_response(&result)
    }
}

impl fmt::Debug for RemoteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.validators.keys().collect();
        ids.sort();
        f.debug_struct("RemoteRegistry").field("validators", &ids).finish()
    }
}

/// A process-wide registry populated exactly once.
///
/// Hosts call [`SharedRegistry::get_or_init`] from every request; only the
/// first call runs the initializer.
///
/// ```
/// use validif_lang::{registry::SharedRegistry, RemoteRegistry, Value};
///
/// static VALIDATORS: SharedRegistry = SharedRegistry::new();
///
/// let registry = VALIDATORS.get_or_init(|| {
///     RemoteRegistry::builder()
///         .register("/names/free", |args| Value::Boolean(args.len() == 1))
///         .build()
/// });
/// assert_eq!(registry.invoke("/names/free", &[Value::from("x")]), Value::Boolean(true));
/// ```
pub struct SharedRegistry {
    cell: OnceLock<RemoteRegistry>,
}

impl SharedRegistry {
    pub const fn new() -> Self {
        SharedRegistry {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> RemoteRegistry) -> &RemoteRegistry {
        self.cell.get_or_init(init)
    }

    pub fn get(&self) -> Option<&RemoteRegistry> {
        self.cell.get()
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn registry() -> RemoteRegistry {
        RemoteRegistry::builder()
            .register("/even", |args| {
                Value::Boolean(args.first().and_then(Value::as_number).is_some_and(|n| n % 2.0 == 0.0))
            })
            .build()
    }

    #[test]
    fn invoke_registered_and_missing() {
        let registry = registry();
        assert_eq!(registry.invoke("/even", &[Value::Number(4.0)]), Value::Boolean(true));
        assert_eq!(registry.invoke("/odd", &[Value::Number(4.0)]), Value::Null);
    }

    #[test]
    fn dispatch_speaks_the_wire_format() {
        let registry = registry();
        assert_eq!(registry.dispatch_json("/even", r#"{"args":[3]}"#).unwrap(), "false");
        assert_eq!(registry.dispatch_json("/missing", r#"{"args":[]}"#).unwrap(), "null");
        assert!(registry.dispatch_json("/even", "[3]").is_err());
    }

    #[test]
    fn shared_registry_initializes_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let shared = SharedRegistry::new();
        for _ in 0..3 {
            shared.get_or_init(|| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                registry()
            });
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(shared.get().map(RemoteRegistry::len), Some(1));
    }
}
