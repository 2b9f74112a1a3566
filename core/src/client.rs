//! Authenticating request pipeline for the todoable API.
//!
//! # Design
//! `TodoableClient` owns its credentials, its token cache, a `Transport` and
//! a `Clock`. Every `execute` call checks the cache, runs the
//! authentication handshake first if the token is missing or expired, sends
//! exactly one resource request, and classifies the response into an
//! `Outcome`. Nothing is retried: a token refresh happens before the call,
//! never after a failed one.
//!
//! The client is single-threaded-use (`execute` takes `&mut self`). Sharing
//! one across threads needs a lock around the whole call.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace, warn};

use crate::auth::{build_authenticate, parse_authenticate, AuthState, Token, TokenCache};
use crate::classify::{classify_response, Outcome};
use crate::clock::{Clock, SystemClock};
use crate::config::{Configuration, Credentials};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, Transport};

pub struct TodoableClient<T, C = SystemClock> {
    credentials: Credentials,
    tokens: TokenCache,
    transport: T,
    clock: C,
}

impl<T: Transport> TodoableClient<T, SystemClock> {
    /// Build a client that reads wall-clock time. Fails if the configuration
    /// has no username or password.
    pub fn new(config: &Configuration, transport: T) -> Result<Self, ApiError> {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> TodoableClient<T, C> {
    pub fn with_clock(config: &Configuration, transport: T, clock: C) -> Result<Self, ApiError> {
        Ok(Self {
            credentials: config.credentials()?,
            tokens: TokenCache::new(),
            transport,
            clock,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token(&self) -> Option<&Token> {
        self.tokens.token()
    }

    pub fn auth_state(&self) -> AuthState {
        self.tokens.state(self.clock.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run the handshake and replace the cached token.
    ///
    /// On failure the previous token, if any, is left in place.
    #[instrument(skip(self), fields(username = %self.credentials.username()))]
    pub fn authenticate(&mut self) -> Result<(), ApiError> {
        let request = build_authenticate(&self.credentials);
        debug!(url = %request.url, "authenticating");

        let token = match self.transport.send(&request).and_then(|response| parse_authenticate(&response)) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "authentication failed");
                self.tokens.mark_failed();
                return Err(e);
            }
        };

        debug!(expires_at = %token.expires_at(), "authenticated");
        self.tokens.store(token);
        Ok(())
    }

    /// Authorization header value for the next resource call, authenticating
    /// first when the cached token is missing or expired.
    fn authorization(&mut self) -> Result<String, ApiError> {
        let now = self.clock.now();
        if !self.tokens.is_valid(now) {
            debug!(state = ?self.tokens.state(now), "token not usable");
            self.authenticate()?;
        }
        // A token that arrives already expired is still used once; the next
        // call will refresh it.
        self.tokens
            .token()
            .map(Token::authorization)
            .ok_or_else(|| ApiError::ProtocolError("no token after authentication".to_string()))
    }

    fn build_request(&self, method: HttpMethod, path: &str, body: Option<Value>, authorization: String) -> HttpRequest {
        let body = body.unwrap_or_else(|| Value::Object(Map::new()));
        HttpRequest {
            method,
            url: self.credentials.url(path),
            headers: vec![
                ("authorization".to_string(), authorization),
                ("accept".to_string(), "application/json".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body.to_string()),
        }
    }

    /// Send one authenticated request to `path` (relative to the base URI).
    ///
    /// `body` defaults to `{}`. Authentication failures are returned without
    /// attempting the resource call.
    #[instrument(skip(self, body))]
    pub fn execute(&mut self, method: HttpMethod, path: &str, body: Option<Value>) -> Outcome {
        let authorization = match self.authorization() {
            Ok(value) => value,
            Err(e) => return Outcome::Failure(e),
        };

        let request = self.build_request(method, path, body, authorization);
        debug!(url = %request.url, "dispatching");

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "transport failed");
                return Outcome::Failure(e);
            }
        };
        trace!(status = response.status, "response received");

        classify_response(&response)
    }
}

impl<T, C> std::fmt::Debug for TodoableClient<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoableClient")
            .field("credentials", &self.credentials)
            .field("token", &self.tokens.token())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use crate::http::HttpResponse;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub responses: VecDeque<Result<HttpResponse, ApiError>>,
        pub requests: Vec<HttpRequest>,
    }

    impl ScriptedTransport {
        pub fn push(&mut self, status: u16, body: &str) -> &mut Self {
            self.responses.push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        pub fn auth_calls(&self) -> usize {
            self.requests.iter().filter(|r| r.url.ends_with("/authenticate")).count()
        }

        pub fn resource_calls(&self) -> usize {
            self.requests.len() - self.auth_calls()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.push(request.clone());
            self.responses
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted response for {} {}", request.method, request.url))
        }
    }

    #[derive(Clone)]
    pub(crate) struct ManualClock(pub Rc<Cell<DateTime<Utc>>>);

    impl ManualClock {
        pub fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    pub(crate) fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 12, 25, 12, 0, 0).unwrap()
    }

    pub(crate) const AUTH_OK: &str = r#"{"token":"abcdef","expires_at":"2017-12-25T12:20:00Z"}"#;

    pub(crate) fn client() -> (TodoableClient<ScriptedTransport, ManualClock>, ManualClock) {
        let clock = ManualClock(Rc::new(Cell::new(noon())));
        let config = Configuration::default()
            .with_base_uri("http://todoable.test/api")
            .with_credentials("username", "password");
        let client = TodoableClient::with_clock(&config, ScriptedTransport::default(), clock.clone()).unwrap();
        (client, clock)
    }

    #[test]
    fn construction_requires_credentials() {
        let err = TodoableClient::new(&Configuration::default(), ScriptedTransport::default()).unwrap_err();
        assert!(matches!(err, ApiError::ConfigError(_)));
    }

    #[test]
    fn first_request_authenticates_once_then_dispatches() {
        let (mut client, _) = client();
        client.transport_mut().push(200, AUTH_OK).push(200, r#"{"lists":[]}"#);

        let outcome = client.execute(HttpMethod::Get, "/lists", None);
        assert_eq!(outcome, Outcome::Decoded(json!({"lists": []})));

        let requests = &client.transport().requests;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://todoable.test/api/authenticate");
        assert_eq!(requests[1].url, "http://todoable.test/api/lists");
        assert_eq!(client.auth_state(), AuthState::Authenticated);
    }

    #[test]
    fn valid_token_skips_authentication() {
        let (mut client, _) = client();
        client
            .transport_mut()
            .push(200, AUTH_OK)
            .push(200, "{}")
            .push(200, "{}")
            .push(204, "");

        client.execute(HttpMethod::Get, "/lists", None);
        client.execute(HttpMethod::Get, "/lists/1", None);
        client.execute(HttpMethod::Delete, "/lists/1", None);

        assert_eq!(client.transport().auth_calls(), 1);
        assert_eq!(client.transport().resource_calls(), 3);
    }

    #[test]
    fn expired_token_triggers_exactly_one_refresh() {
        let (mut client, clock) = client();
        let later = r#"{"token":"ghijkl","expires_at":"2017-12-25T13:00:00Z"}"#;
        client
            .transport_mut()
            .push(200, AUTH_OK)
            .push(200, "{}")
            .push(200, later)
            .push(200, "{}")
            .push(200, "{}");

        client.execute(HttpMethod::Get, "/lists", None);
        // expires_at = 12:20; one second past it the token is stale.
        clock.advance(Duration::minutes(20) + Duration::seconds(1));
        assert_eq!(client.auth_state(), AuthState::Expired);
        client.execute(HttpMethod::Get, "/lists", None);
        clock.advance(Duration::minutes(30));
        client.execute(HttpMethod::Get, "/lists", None);

        let requests = &client.transport().requests;
        assert_eq!(client.transport().auth_calls(), 2);
        assert!(requests[2].url.ends_with("/authenticate"));
        assert_eq!(requests[3].header("authorization"), Some("Token token=\"ghijkl\""));
        assert_eq!(requests[4].header("authorization"), Some("Token token=\"ghijkl\""));
    }

    #[test]
    fn token_is_still_valid_at_its_expiry_instant() {
        let (mut client, clock) = client();
        client.transport_mut().push(200, AUTH_OK).push(200, "{}").push(200, "{}");
        client.execute(HttpMethod::Get, "/lists", None);
        clock.advance(Duration::minutes(20));
        client.execute(HttpMethod::Get, "/lists", None);
        assert_eq!(client.transport().auth_calls(), 1);
    }

    #[test]
    fn authentication_failure_skips_resource_call() {
        let (mut client, _) = client();
        client.transport_mut().push(401, "");

        let outcome = client.execute(HttpMethod::Get, "/lists", None);
        assert_eq!(outcome, Outcome::Failure(ApiError::Unauthorized));
        assert_eq!(client.transport().requests.len(), 1);
        assert_eq!(client.auth_state(), AuthState::Failed);
        assert!(client.token().is_none());
    }

    #[test]
    fn failed_refresh_keeps_previous_token() {
        let (mut client, clock) = client();
        client
            .transport_mut()
            .push(200, AUTH_OK)
            .push(200, "{}")
            .push(200, r#"{"token":"x"}"#);

        client.execute(HttpMethod::Get, "/lists", None);
        clock.advance(Duration::hours(1));
        let outcome = client.execute(HttpMethod::Get, "/lists", None);

        assert!(matches!(outcome, Outcome::Failure(ApiError::ProtocolError(_))));
        assert_eq!(client.token().map(Token::value), Some("abcdef"));
        assert_eq!(client.auth_state(), AuthState::Failed);
    }

    #[test]
    fn request_carries_token_and_json_headers() {
        let (mut client, _) = client();
        client.transport_mut().push(200, AUTH_OK).push(201, r#"{"id":"1","name":"x"}"#);

        client.execute(HttpMethod::Post, "lists", Some(json!({"list": {"name": "x"}})));

        let req = &client.transport().requests[1];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://todoable.test/api/lists");
        assert_eq!(req.header("authorization"), Some("Token token=\"abcdef\""));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"list": {"name": "x"}}));
    }

    #[test]
    fn absent_body_is_sent_as_empty_object() {
        let (mut client, _) = client();
        client.transport_mut().push(200, AUTH_OK).push(204, "");
        client.execute(HttpMethod::Delete, "/lists/1", None);
        assert_eq!(client.transport().requests[1].body.as_deref(), Some("{}"));
    }

    #[test]
    fn transport_error_is_a_failure() {
        let (mut client, _) = client();
        client.transport_mut().push(200, AUTH_OK);
        client
            .transport_mut()
            .responses
            .push_back(Err(ApiError::TransportError("connection refused".to_string())));

        let outcome = client.execute(HttpMethod::Get, "/lists", None);
        assert_eq!(
            outcome,
            Outcome::Failure(ApiError::TransportError("connection refused".to_string()))
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let (mut client, _) = client();
        client.transport_mut().push(200, AUTH_OK);
        client.authenticate().unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("abcdef"));
        assert!(!debug.contains("\"password\""));
    }
}
