//! Shared provider instances for stream routes.
//!
//! # Responsibilities
//! - Create at most one instance per provider type, on first reference
//! - Hand out handlers bound to that instance
//!
//! # Design Decisions
//! - Keyed store owned by the router, never global state
//! - Insertion happens under the map's shard lock, so concurrent first use
//!   still yields a single instance
//! - Instances live as long as the registry; nothing is evicted

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::HandlerError;
use crate::provider::{Environment, HandlerResult, Provider, ProviderContext, ProviderType};

/// A provider instance shared by every call through its stream handlers.
pub type SharedProvider = Arc<Mutex<Box<dyn Provider>>>;

#[derive(Default)]
pub struct ProviderInstanceRegistry {
    instances: DashMap<&'static str, SharedProvider>,
}

impl ProviderInstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the shared instance for `provider`, creating it if needed.
    pub fn get_or_create(&self, provider: &ProviderType, env: &Arc<Environment>) -> SharedProvider {
        self.instances
            .entry(provider.name())
            .or_insert_with(|| {
                tracing::debug!(provider = provider.name(), "Creating shared provider instance");
                let instance = provider.instantiate(ProviderContext::detached(env.clone()));
                Arc::new(Mutex::new(instance))
            })
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl std::fmt::Debug for ProviderInstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.instances.iter().map(|e| *e.key()).collect();
        f.debug_struct("ProviderInstanceRegistry")
            .field("instances", &names)
            .finish()
    }
}

/// A handler method bound to a shared provider instance.
#[derive(Clone)]
pub struct StreamHandler {
    provider: &'static str,
    handler: String,
    instance: SharedProvider,
}

impl StreamHandler {
    pub(crate) fn new(provider: &'static str, handler: impl Into<String>, instance: SharedProvider) -> Self {
        Self {
            provider,
            handler: handler.into(),
            instance,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider
    }

    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    /// Invoke the bound handler. Calls are serialized on the shared instance.
    pub fn call(&self, args: &[String]) -> HandlerResult {
        let mut instance = self
            .instance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        panic::catch_unwind(AssertUnwindSafe(|| instance.invoke(&self.handler, args)))
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
    }
}

impl std::fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandler")
            .field("provider", &self.provider)
            .field("handler", &self.handler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::http::response::Reply;
    use crate::provider::{Outcome, ProviderKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    struct Counter {
        calls: usize,
    }

    impl Provider for Counter {
        fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
            match handler {
                "Tick" => {
                    self.calls += 1;
                    Ok(Outcome::normal(format!("{} {}", self.calls, args.join(","))))
                }
                "Explode" => panic!("stream handler blew up"),
                other => Err(HandlerError::UnknownHandler(other.to_string())),
            }
        }
    }

    impl ProviderKind for Counter {
        const NAME: &'static str = "Counter";
        const HANDLERS: &'static [&'static str] = &["Tick", "Explode"];

        fn new(_ctx: ProviderContext) -> Self {
            Counter { calls: 0 }
        }
    }

    static SLOW_BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Slow;

    impl Provider for Slow {
        fn invoke(&mut self, handler: &str, _args: &[String]) -> HandlerResult {
            Err(HandlerError::UnknownHandler(handler.to_string()))
        }
    }

    impl ProviderKind for Slow {
        const NAME: &'static str = "Slow";
        const HANDLERS: &'static [&'static str] = &[];

        fn new(_ctx: ProviderContext) -> Self {
            SLOW_BUILDS.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Slow
        }
    }

    fn env() -> Arc<Environment> {
        Arc::new(Environment::new(Arc::new(AppConfig::default())))
    }

    fn text(result: HandlerResult) -> String {
        match result {
            Ok(Outcome::Normal(Reply::Content(c))) => c.into_text().unwrap_or_default(),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_single_instance_per_provider() {
        let registry = ProviderInstanceRegistry::new();
        let env = env();
        let ty = ProviderType::of::<Counter>();

        let a = registry.get_or_create(&ty, &env);
        let b = registry.get_or_create(&ty, &env);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Counter"));

        let tick = StreamHandler::new(ty.name(), "Tick", a);
        assert_eq!(text(tick.call(&["x".into()])), "1 x");
        let tick2 = StreamHandler::new(ty.name(), "Tick", b);
        assert_eq!(text(tick2.call(&[])), "2 ");
    }

    #[test]
    fn test_panicking_stream_handler_is_contained() {
        let registry = ProviderInstanceRegistry::new();
        let ty = ProviderType::of::<Counter>();
        let shared = registry.get_or_create(&ty, &env());
        let explode = StreamHandler::new(ty.name(), "Explode", shared.clone());

        assert!(matches!(explode.call(&[]), Err(HandlerError::Panicked(_))));

        // Instance stays usable after a panic
        let tick = StreamHandler::new(ty.name(), "Tick", shared);
        assert_eq!(text(tick.call(&[])), "1 ");
    }

    #[test]
    fn test_concurrent_first_use_builds_one_instance() {
        let registry = Arc::new(ProviderInstanceRegistry::new());
        let env = env();
        let start = Arc::new(Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let env = Arc::clone(&env);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    registry.get_or_create(&ProviderType::of::<Slow>(), &env)
                })
            })
            .collect();
        let handles: Vec<SharedProvider> =
            workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(SLOW_BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }
}
