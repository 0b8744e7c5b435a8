//! Shared providers and helpers for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::TcpListener;

use page_dispatch::error::HandlerError;
use page_dispatch::http::{Content, CookieOptions, Response, StreamEndpoints};
use page_dispatch::observability::{AccessLogEntry, AccessLogger};
use page_dispatch::provider::{NOT_FOUND_HANDLER, STATIC_HANDLER};
use page_dispatch::{
    AppConfig, BasePage, Dispatcher, HandlerResult, HttpServer, Outcome, Provider,
    ProviderContext, ProviderKind, ProviderType, RouteSpec, Shutdown,
};

thread_local! {
    // Dispatcher::handle runs on the calling thread, and each test has its own.
    static JOURNAL: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Append a lifecycle event to this thread's journal.
pub fn record(event: impl Into<String>) {
    JOURNAL.with(|j| j.borrow_mut().push(event.into()));
}

/// Drain this thread's journal.
pub fn take_journal() -> Vec<String> {
    JOURNAL.with(|j| std::mem::take(&mut *j.borrow_mut()))
}

pub fn count(journal: &[String], event: &str) -> usize {
    journal.iter().filter(|e| *e == event).count()
}

/// Provider that journals every hook it goes through.
pub struct Hooked {
    ctx: ProviderContext,
    failing_rollback: bool,
    panicking_rollback: bool,
}

impl Provider for Hooked {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        record(format!("invoke:{}", handler));
        match handler {
            "Hello" => Ok(Outcome::normal("<b>hello</b>")),
            "Args" => Ok(Outcome::normal(args.join(","))),
            "HostArgs" => Ok(Outcome::normal(self.ctx.host_args().join(","))),
            "Json" => Ok(Outcome::normal(serde_json::json!({ "ok": true, "n": 3 }))),
            "PlainText" => Ok(Outcome::normal(Response::text("<raw>"))),
            "JsonText" => Ok(Outcome::normal(
                Response::new()
                    .with_content_type("application/json")
                    .with_content(Content::Text("say \"hi\"".into())),
            )),
            "Empty" => Ok(Outcome::normal("")),
            "Fail" => Err(HandlerError::Failed("boom".into())),
            "FailBadRollback" => {
                self.failing_rollback = true;
                Err(HandlerError::Failed("boom".into()))
            }
            "FailPanickingRollback" => {
                self.panicking_rollback = true;
                Err(HandlerError::Failed("boom".into()))
            }
            "Panic" => panic!("handler exploded"),
            "Immediate" => Ok(Outcome::ImmediateResponse(
                Response::text("stop right there").with_status(StatusCode::FORBIDDEN),
            )),
            "Reload" => Ok(Outcome::ReloadRequested("templates changed".into())),
            "Cookie" => {
                if let Some(request) = self.ctx.request() {
                    request.set_cookie("session", "abc", &CookieOptions::default());
                }
                Ok(Outcome::normal("cookie set"))
            }
            "Echo" => {
                let body = self
                    .ctx
                    .request()
                    .map(|r| String::from_utf8_lossy(r.body()).into_owned())
                    .unwrap_or_default();
                Ok(Outcome::normal(Response::text(body)))
            }
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }

    fn pre_request(self: Box<Self>) -> Box<dyn Provider> {
        record("pre_request");
        self
    }

    fn post_init(&mut self) -> Result<(), HandlerError> {
        record("post_init");
        Ok(())
    }

    fn static_post_init(&mut self) -> Result<(), HandlerError> {
        record("static_post_init");
        Ok(())
    }

    fn post_request(&mut self, response: Response) -> Response {
        record("post_request");
        response.with_header("X-Post-Request", "1")
    }

    fn rollback(&mut self) -> Result<(), HandlerError> {
        record("rollback");
        if self.panicking_rollback {
            panic!("rollback exploded");
        }
        if self.failing_rollback {
            Err(HandlerError::Failed("could not undo".into()))
        } else {
            Ok(())
        }
    }

    fn csp_headers(&mut self, response: &mut Response) {
        record("csp_headers");
        response.set_header("Content-Security-Policy", "default-src 'self'");
    }

    fn override_response(&mut self, response: Response) -> Response {
        record("override_response");
        response.with_header("X-Override", "1")
    }
}

impl ProviderKind for Hooked {
    const NAME: &'static str = "Hooked";
    const HANDLERS: &'static [&'static str] = &[
        "Hello",
        "Args",
        "HostArgs",
        "Json",
        "PlainText",
        "JsonText",
        "Empty",
        "Fail",
        "FailBadRollback",
        "FailPanickingRollback",
        "Panic",
        "Immediate",
        "Reload",
        "Cookie",
        "Echo",
    ];

    fn new(ctx: ProviderContext) -> Self {
        Self {
            ctx,
            failing_rollback: false,
            panicking_rollback: false,
        }
    }
}

/// Default provider that journals recovery and serves not-found and static.
pub struct Fallback {
    base: BasePage,
}

impl Provider for Fallback {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        record(format!("fallback:invoke:{}", handler));
        self.base.invoke(handler, args)
    }

    fn static_post_init(&mut self) -> Result<(), HandlerError> {
        record("fallback:static_post_init");
        Ok(())
    }

    fn post_init(&mut self) -> Result<(), HandlerError> {
        record("fallback:post_init");
        Ok(())
    }

    fn post_request(&mut self, response: Response) -> Response {
        record("fallback:post_request");
        response
    }

    fn csp_headers(&mut self, response: &mut Response) {
        record("fallback:csp_headers");
        response.set_header("X-Fallback-Csp", "1");
    }

    fn override_response(&mut self, response: Response) -> Response {
        record("fallback:override_response");
        response
    }

    fn internal_server_error(&mut self, error: &HandlerError) -> Response {
        record("fallback:internal_server_error");
        Response::text(format!("recovered: {}", error)).with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl ProviderKind for Fallback {
    const NAME: &'static str = "Fallback";
    const HANDLERS: &'static [&'static str] = &[NOT_FOUND_HANDLER, STATIC_HANDLER];

    fn new(ctx: ProviderContext) -> Self {
        Self {
            base: BasePage::new(ctx),
        }
    }
}

/// Default provider whose error page itself panics.
pub struct BrokenFallback;

impl Provider for BrokenFallback {
    fn invoke(&mut self, handler: &str, _args: &[String]) -> HandlerResult {
        Err(HandlerError::UnknownHandler(handler.to_string()))
    }

    fn internal_server_error(&mut self, _error: &HandlerError) -> Response {
        panic!("error page exploded")
    }
}

impl ProviderKind for BrokenFallback {
    const NAME: &'static str = "BrokenFallback";
    const HANDLERS: &'static [&'static str] = &[NOT_FOUND_HANDLER];

    fn new(_ctx: ProviderContext) -> Self {
        Self
    }
}

/// Provider that overrides no hook at all.
pub struct Bare;

impl Provider for Bare {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        match handler {
            "Show" => Ok(Outcome::normal(format!("<i>{}</i>", args.join("/")))),
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }
}

impl ProviderKind for Bare {
    const NAME: &'static str = "Bare";
    const HANDLERS: &'static [&'static str] = &["Show"];

    fn new(_ctx: ProviderContext) -> Self {
        Self
    }
}

/// Same handler as `Bare`, with every hook written out as the identity.
pub struct Identity;

impl Provider for Identity {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        match handler {
            "ShowIdentity" => Ok(Outcome::normal(format!("<i>{}</i>", args.join("/")))),
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }

    fn pre_request(self: Box<Self>) -> Box<dyn Provider> {
        self
    }

    fn post_init(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    fn post_request(&mut self, response: Response) -> Response {
        response
    }

    fn csp_headers(&mut self, _response: &mut Response) {}

    fn override_response(&mut self, response: Response) -> Response {
        response
    }
}

impl ProviderKind for Identity {
    const NAME: &'static str = "Identity";
    const HANDLERS: &'static [&'static str] = &["ShowIdentity"];

    fn new(_ctx: ProviderContext) -> Self {
        Self
    }
}

/// Provider whose `pre_request` swaps in a `Replacement`.
pub struct Swapping;

impl Provider for Swapping {
    fn invoke(&mut self, _handler: &str, _args: &[String]) -> HandlerResult {
        record("swapping:invoke");
        Ok(Outcome::normal("original"))
    }

    fn pre_request(self: Box<Self>) -> Box<dyn Provider> {
        record("swapping:pre_request");
        Box::new(Replacement)
    }

    fn csp_headers(&mut self, _response: &mut Response) {
        record("swapping:csp_headers");
    }
}

impl ProviderKind for Swapping {
    const NAME: &'static str = "Swapping";
    const HANDLERS: &'static [&'static str] = &["Who"];

    fn new(_ctx: ProviderContext) -> Self {
        Self
    }
}

pub struct Replacement;

impl Provider for Replacement {
    fn invoke(&mut self, handler: &str, _args: &[String]) -> HandlerResult {
        record(format!("replacement:invoke:{}", handler));
        Ok(Outcome::normal("replacement"))
    }

    fn post_init(&mut self) -> Result<(), HandlerError> {
        record("replacement:post_init");
        Ok(())
    }

    fn csp_headers(&mut self, _response: &mut Response) {
        record("replacement:csp_headers");
    }
}

/// Stream provider counting the messages its shared instance has seen.
pub struct Chat {
    seen: usize,
}

impl Provider for Chat {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        match handler {
            "Chat" => {
                self.seen += 1;
                let message = args.first().map(String::as_str).unwrap_or_default();
                Ok(Outcome::normal(format!("{}:{}", self.seen, message)))
            }
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }
}

impl ProviderKind for Chat {
    const NAME: &'static str = "Chat";
    const HANDLERS: &'static [&'static str] = &["Chat"];

    fn new(_ctx: ProviderContext) -> Self {
        Self { seen: 0 }
    }
}

/// Access logger that keeps every entry.
#[derive(Default, Clone)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<AccessLogEntry>>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<AccessLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AccessLogger for RecordingLogger {
    fn log(&self, entry: &AccessLogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

pub fn provider_types() -> Vec<ProviderType> {
    vec![
        ProviderType::of::<Hooked>(),
        ProviderType::of::<Bare>(),
        ProviderType::of::<Identity>(),
        ProviderType::of::<Swapping>(),
        ProviderType::of::<Chat>(),
    ]
}

/// Dispatcher over the test providers with `Fallback` as default.
pub fn dispatcher(routes: Vec<RouteSpec>) -> (Dispatcher, RecordingLogger) {
    dispatcher_with(routes, ProviderType::of::<Fallback>(), AppConfig::default())
}

pub fn dispatcher_with(
    routes: Vec<RouteSpec>,
    default: ProviderType,
    config: AppConfig,
) -> (Dispatcher, RecordingLogger) {
    let logger = RecordingLogger::default();
    let dispatcher = Dispatcher::build(routes, provider_types(), default, Arc::new(config))
        .unwrap()
        .with_logger(Arc::new(logger.clone()));
    (dispatcher, logger)
}

/// Serve `dispatcher` on an ephemeral local port.
pub async fn start_server(dispatcher: Dispatcher, streams: &StreamEndpoints) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(dispatcher, streams);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
