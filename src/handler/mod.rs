//! Request handler trait and the failure boundary around it.
//!
//! Applications plug in by implementing [`Handler`], usually through
//! [`make_handler`] and a plain async function. The engine never calls a
//! handler directly: every dispatch goes through [`invoke`], which is total.
//! A handler error or panic becomes a plain-text 500 response and a log line,
//! and never reaches the connection manager or the accept loop.

use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use crate::protocol::{Request, Response};

/// An application-supplied function from request to response.
///
/// Handlers are invoked once per HTTP request, possibly interleaved in time
/// across connections but never in parallel on the same connection.
#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, request: Request) -> Result<Response, Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response, Err>> + Send,
{
    type Error = Err;

    async fn call(&self, request: Request) -> Result<Response, Self::Error> {
        (self.f)(request).await
    }
}

/// Wraps an async function into a [`Handler`].
pub fn make_handler<F, Err, Fut>(f: F) -> HandlerFn<F>
where
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response, Err>>,
    F: Fn(Request) -> Fut,
{
    HandlerFn { f }
}

/// Invokes the handler under a failure boundary.
///
/// Total function: a handler `Err` or panic yields a 500 response, logged
/// for diagnostics, so nothing raised by application code can escape to the
/// rest of the engine.
pub async fn invoke<H: Handler>(handler: &H, request: Request) -> Response {
    match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            let cause: Box<dyn Error + Send + Sync> = e.into();
            error!(cause = %cause, "handler returned error");
            internal_error_response()
        }
        Err(panic) => {
            error!(cause = panic_message(panic.as_ref()), "handler panicked");
            internal_error_response()
        }
    }
}

fn internal_error_response() -> Response {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body("Internal Server Error")
        .build()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::request_parser::parse;

    fn request() -> Request {
        parse(b"GET / HTTP/1.1\r\n\r\n").unwrap()
    }

    #[tokio::test]
    async fn ok_response_passes_through() {
        let handler = make_handler(|_req| async {
            Ok::<_, std::io::Error>(Response::builder().status(204).build())
        });

        let response = invoke(&handler, request()).await;
        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn erring_handler_yields_500() {
        let handler = make_handler(|_req| async {
            Err::<Response, _>(std::io::Error::other("database on fire"))
        });

        let response = invoke(&handler, request()).await;
        assert_eq!(response.status(), 500);
        assert_eq!(&response.body()[..], b"Internal Server Error");
        assert!(response.has_header("content-type"));
    }

    #[tokio::test]
    async fn panicking_handler_yields_500() {
        let handler = make_handler(|_req| async {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok::<Response, std::io::Error>(Response::default())
        });

        let response = invoke(&handler, request()).await;
        assert_eq!(response.status(), 500);
        assert_eq!(&response.body()[..], b"Internal Server Error");
    }
}
