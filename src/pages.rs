//! Request handlers of the demo site.

use axum::http::StatusCode;
use serde_json::json;

use page_dispatch::http::{CookieOptions, Response, StreamEndpoints};
use page_dispatch::{HandlerError, HandlerResult, Outcome, Provider, ProviderContext, ProviderKind, RouteSpec};

const SESSION_COOKIE: &str = "login";

pub fn routes(streams: &StreamEndpoints) -> Vec<RouteSpec> {
    vec![
        RouteSpec::path("/", "Home").method("GET"),
        RouteSpec::path(r"/user/(\d+)", "ShowUser").method("GET"),
        RouteSpec::path("/login", "Login").method("POST"),
        RouteSpec::path("/logout", "Logout"),
        RouteSpec::path("/api/status", "Status").method("GET"),
        RouteSpec::path("/static/(.*)", "Static"),
        RouteSpec::stream(streams.at("/ws/echo"), "Echo"),
    ]
}

/// Holds all the request handlers for the demo application.
pub struct Site {
    ctx: ProviderContext,
    echoed: usize,
}

impl Site {
    fn user(&self) -> Option<String> {
        self.ctx.request()?.cookie(SESSION_COOKIE)
    }

    fn home(&self) -> HandlerResult {
        let greeting = match self.user() {
            Some(user) => format!("Welcome back, {}", user),
            None => "Hello, stranger".to_string(),
        };
        // Raw text: the HTML encoder escapes it.
        Ok(Outcome::normal(greeting))
    }

    fn show_user(&self, args: &[String]) -> HandlerResult {
        let id: u64 = args
            .first()
            .ok_or_else(|| HandlerError::BadRequest("missing user id".into()))?
            .parse()
            .map_err(|_| HandlerError::BadRequest("user id is not a number".into()))?;
        Ok(Outcome::normal(json!({ "id": id, "name": format!("user{}", id) })))
    }

    fn login(&self) -> HandlerResult {
        let request = self
            .ctx
            .request()
            .ok_or_else(|| HandlerError::Failed("no request bound".into()))?;
        let name = request
            .form_args()
            .into_iter()
            .find(|(k, _)| k == "name")
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty());
        let Some(name) = name else {
            return Ok(Outcome::ImmediateResponse(
                Response::text("name is required").with_status(StatusCode::BAD_REQUEST),
            ));
        };
        request.set_cookie(SESSION_COOKIE, &name, &CookieOptions::default());
        Ok(Outcome::normal(Response::redirect_with("/", StatusCode::SEE_OTHER)))
    }

    fn logout(&self) -> HandlerResult {
        if let Some(request) = self.ctx.request() {
            request.delete_cookie(SESSION_COOKIE);
        }
        Ok(Outcome::normal(Response::redirect_with("/", StatusCode::SEE_OTHER)))
    }

    fn status(&self) -> HandlerResult {
        Ok(Outcome::normal(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })))
    }

    fn echo(&mut self, args: &[String]) -> HandlerResult {
        self.echoed += 1;
        let message = args.first().map(String::as_str).unwrap_or_default();
        Ok(Outcome::normal(format!("#{} {}", self.echoed, message)))
    }
}

impl Provider for Site {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        match handler {
            "Home" => self.home(),
            "ShowUser" => self.show_user(args),
            "Login" => self.login(),
            "Logout" => self.logout(),
            "Status" => self.status(),
            "Echo" => self.echo(args),
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }

    fn csp_headers(&mut self, response: &mut Response) {
        response.set_header("Content-Security-Policy", "default-src 'self'");
        response.set_header("X-Content-Type-Options", "nosniff");
    }
}

impl ProviderKind for Site {
    const NAME: &'static str = "Site";
    const HANDLERS: &'static [&'static str] =
        &["Home", "ShowUser", "Login", "Logout", "Status", "Echo"];

    fn new(ctx: ProviderContext) -> Self {
        Self { ctx, echoed: 0 }
    }
}
