//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Bind every declared route to the provider implementing its handler
//! - Bind stream routes to shared provider instances at build time
//! - Look up the first entry matching (url, method, host)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; no trie or specificity reordering
//! - Unknown handler names fail the build: the application must not start
//!   with an unroutable route
//! - Explicit `NoRoute` rather than a silent default

use std::sync::Arc;

use crate::error::RouteError;
use crate::provider::{
    Environment, ProviderInstanceRegistry, ProviderResolver, ProviderType, StreamHandler,
};
use crate::routing::matcher::RoutePattern;
use crate::routing::table::{HostPattern, MethodSet, RouteEntry, RouteTable};

/// Callback receiving the bound handler of a stream route.
pub type StreamBinder = Box<dyn FnOnce(StreamHandler) + Send>;

/// What a route is addressed by.
pub enum RouteTarget {
    /// A path pattern matched per request.
    Path(String),
    /// A registration callback for long-lived handlers, bound once at build time.
    Stream(StreamBinder),
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteTarget::Path(p) => f.debug_tuple("Path").field(p).finish(),
            RouteTarget::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A declared route.
#[derive(Debug)]
pub struct RouteSpec {
    target: RouteTarget,
    handler: String,
    methods: Option<Vec<String>>,
    host: Option<String>,
}

impl RouteSpec {
    pub fn path(pattern: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            target: RouteTarget::Path(pattern.into()),
            handler: handler.into(),
            methods: None,
            host: None,
        }
    }

    pub fn stream<F>(binder: F, handler: impl Into<String>) -> Self
    where
        F: FnOnce(StreamHandler) + Send + 'static,
    {
        Self {
            target: RouteTarget::Stream(Box::new(binder)),
            handler: handler.into(),
            methods: None,
            host: None,
        }
    }

    /// Restrict to one method. May be repeated.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.get_or_insert_with(Vec::new).push(method.into());
        self
    }

    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods
            .get_or_insert_with(Vec::new)
            .extend(methods.into_iter().map(Into::into));
        self
    }

    /// Restrict to hosts matching `pattern`; `"*"` matches any host.
    pub fn host(mut self, pattern: impl Into<String>) -> Self {
        self.host = Some(pattern.into());
        self
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handler: String,
    pub args: Vec<String>,
    pub host_args: Vec<String>,
    pub provider: Arc<ProviderType>,
}

/// Routes requests to handler names and providers.
#[derive(Debug)]
pub struct Router {
    table: RouteTable,
    resolver: ProviderResolver,
    registry: ProviderInstanceRegistry,
}

impl Router {
    /// Compile `routes` against `resolver`.
    ///
    /// Stream routes get their shared provider instance (built with `env`)
    /// and have their binder invoked here; they never enter the table.
    pub fn build(
        routes: Vec<RouteSpec>,
        resolver: ProviderResolver,
        env: &Arc<Environment>,
    ) -> Result<Self, RouteError> {
        let registry = ProviderInstanceRegistry::new();
        let mut entries = Vec::with_capacity(routes.len());

        for spec in routes {
            let provider = resolver
                .find(&spec.handler)
                .cloned()
                .ok_or_else(|| RouteError::UnknownHandler {
                    handler: spec.handler.clone(),
                })?;

            let pattern = match spec.target {
                RouteTarget::Stream(binder) => {
                    let instance = registry.get_or_create(&provider, env);
                    tracing::info!(
                        handler = %spec.handler,
                        provider = provider.name(),
                        "Binding stream route"
                    );
                    binder(StreamHandler::new(provider.name(), spec.handler, instance));
                    continue;
                }
                RouteTarget::Path(pattern) => pattern,
            };

            let methods = match spec.methods {
                Some(list) => MethodSet::from_list(&pattern, list)?,
                None => MethodSet::All,
            };
            let host = HostPattern::parse(spec.host.as_deref().unwrap_or("*"))?;
            let path = RoutePattern::compile(&pattern)?;

            tracing::debug!(
                pattern = %pattern,
                handler = %spec.handler,
                provider = provider.name(),
                "Compiled route"
            );
            entries.push(RouteEntry {
                path,
                handler: spec.handler,
                methods,
                host,
                provider,
            });
        }

        Ok(Self {
            table: RouteTable::new(entries),
            resolver,
            registry,
        })
    }

    /// First entry matching `url`, `method` and `host`, in declaration order.
    pub fn resolve(&self, url: &str, method: &str, host: &str) -> Result<Resolved, RouteError> {
        for entry in self.table.iter() {
            if !entry.methods.allows(method) {
                continue;
            }
            let Some(host_args) = entry.host.captures(host) else {
                continue;
            };
            if let Some(args) = entry.path.captures(url) {
                return Ok(Resolved {
                    handler: entry.handler.clone(),
                    args: non_empty(args),
                    host_args: non_empty(host_args),
                    provider: entry.provider.clone(),
                });
            }
        }
        Err(RouteError::NoRoute {
            url: url.to_string(),
        })
    }

    pub fn default_provider(&self) -> &Arc<ProviderType> {
        self.resolver.default_provider()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn registry(&self) -> &ProviderInstanceRegistry {
        &self.registry
    }
}

fn non_empty(captures: Vec<String>) -> Vec<String> {
    captures.into_iter().filter(|c| !c.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::provider::{
        BasePage, HandlerResult, Outcome, Provider, ProviderContext, ProviderKind,
    };
    use std::sync::Mutex;

    struct Pages;

    impl Provider for Pages {
        fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
            Ok(Outcome::normal(format!("{}:{}", handler, args.join(","))))
        }
    }

    impl ProviderKind for Pages {
        const NAME: &'static str = "Pages";
        const HANDLERS: &'static [&'static str] =
            &["Home", "HomePost", "ShowUser", "Catch", "Tenant", "List", "Chat"];

        fn new(_ctx: ProviderContext) -> Self {
            Pages
        }
    }

    fn env() -> Arc<Environment> {
        Arc::new(Environment::new(Arc::new(AppConfig::default())))
    }

    fn resolver() -> ProviderResolver {
        ProviderResolver::new(vec![ProviderType::of::<Pages>()], ProviderType::of::<BasePage>())
    }

    fn router(routes: Vec<RouteSpec>) -> Router {
        Router::build(routes, resolver(), &env()).unwrap()
    }

    #[test]
    fn test_method_dispatch_scenario() {
        let router = router(vec![
            RouteSpec::path("/home", "Home").method("GET"),
            RouteSpec::path("/home", "HomePost").method("POST"),
        ]);
        assert_eq!(router.resolve("/home", "GET", "h").unwrap().handler, "Home");
        assert_eq!(router.resolve("/home", "POST", "h").unwrap().handler, "HomePost");
        assert!(matches!(
            router.resolve("/home", "DELETE", "h"),
            Err(RouteError::NoRoute { ref url }) if url == "/home"
        ));
    }

    #[test]
    fn test_first_declared_wins_over_more_specific() {
        let router = router(vec![
            RouteSpec::path("/(.*)", "Catch"),
            RouteSpec::path(r"/user/(\d+)", "ShowUser"),
        ]);
        let resolved = router.resolve("/user/1", "GET", "h").unwrap();
        assert_eq!(resolved.handler, "Catch");
        assert_eq!(resolved.args, vec!["user/1".to_string()]);
    }

    #[test]
    fn test_captures_and_empty_filtering() {
        let router = router(vec![
            RouteSpec::path(r"/user/(\d+)", "ShowUser"),
            RouteSpec::path(r"/list(?:/(\d+))?", "List"),
        ]);
        assert_eq!(router.resolve("/user/42", "GET", "h").unwrap().args, vec!["42"]);
        assert!(router.resolve("/user/abc", "GET", "h").is_err());
        assert!(router.resolve("/list", "GET", "h").unwrap().args.is_empty());
        assert_eq!(router.resolve("/list/2", "GET", "h").unwrap().args, vec!["2"]);
    }

    #[test]
    fn test_host_constraints() {
        let router = router(vec![
            RouteSpec::path("/", "Tenant").host(r"(\w+)\.example\.com"),
            RouteSpec::path("/", "Home").host("*"),
        ]);
        let tenant = router.resolve("/", "GET", "acme.example.com").unwrap();
        assert_eq!(tenant.handler, "Tenant");
        assert_eq!(tenant.host_args, vec!["acme"]);
        assert!(tenant.args.is_empty());

        let fallback = router.resolve("/", "GET", "other.org").unwrap();
        assert_eq!(fallback.handler, "Home");
        assert!(fallback.host_args.is_empty());
    }

    #[test]
    fn test_default_provider_handlers_are_routable() {
        let router = router(vec![RouteSpec::path("/static/(.*)", "Static")]);
        let resolved = router.resolve("/static/app.js", "GET", "h").unwrap();
        assert_eq!(resolved.provider.name(), "BasePage");
        assert_eq!(router.default_provider().name(), "BasePage");
    }

    #[test]
    fn test_unknown_handler_fails_build() {
        let err = Router::build(vec![RouteSpec::path("/x", "Missing")], resolver(), &env())
            .unwrap_err();
        assert!(matches!(err, RouteError::UnknownHandler { ref handler } if handler == "Missing"));
    }

    #[test]
    fn test_bad_pattern_and_empty_methods_fail_build() {
        assert!(matches!(
            Router::build(vec![RouteSpec::path("/(", "Home")], resolver(), &env()),
            Err(RouteError::InvalidPattern { .. })
        ));
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            Router::build(vec![RouteSpec::path("/", "Home").methods(empty)], resolver(), &env()),
            Err(RouteError::EmptyMethodSet { .. })
        ));
    }

    #[test]
    fn test_stream_routes_bind_shared_instance() {
        let bound: Arc<Mutex<Vec<StreamHandler>>> = Arc::default();
        let sink_a = bound.clone();
        let sink_b = bound.clone();

        let router = router(vec![
            RouteSpec::stream(move |h| sink_a.lock().unwrap().push(h), "Chat"),
            RouteSpec::stream(move |h| sink_b.lock().unwrap().push(h), "Home"),
            RouteSpec::path("/home", "Home"),
        ]);

        // Stream routes are not part of the table
        assert_eq!(router.table().len(), 1);
        assert_eq!(router.registry().len(), 1);
        assert!(router.registry().contains("Pages"));

        let handlers = bound.lock().unwrap();
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].handler_name(), "Chat");
        match handlers[0].call(&["hi".into()]).unwrap() {
            Outcome::Normal(reply) => {
                let body = reply.into_response().content().clone().into_text();
                assert_eq!(body.as_deref(), Some("Chat:hi"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
