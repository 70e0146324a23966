//! Handler isolation and panic safety
//!
//! Application callbacks run inside the receive loop. A panic in one of
//! them must not take the loop down, so every invocation goes through
//! [`call_handler_isolated`], which turns panics into
//! [`HandlerError::Panicked`].
//!
//! # Safety Considerations
//!
//! - `catch_unwind` only catches panics, not aborts
//! - The binary must not be built with `panic = "abort"`
//! - Panics in tasks spawned by a handler are not caught here

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use super::base::{HandlerError, HandlerResult};

/// Invoke a handler, catching panics raised while building or polling its future.
///
/// `invoke` calls the registered callback and returns its future. Panics in
/// the synchronous part of the callback are caught as well as panics raised
/// while the future is polled.
///
/// # Example
///
/// ```ignore
/// let outcome = call_handler_isolated(|| callback(event)).await;
/// ```
pub async fn call_handler_isolated<F, Fut>(invoke: F) -> Result<(), HandlerError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    let future = match catch_unwind(AssertUnwindSafe(invoke)) {
        Ok(fut) => fut,
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Handler panicked before returning a future");
            return Err(HandlerError::Panicked(msg));
        }
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::Failed(e)),
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Handler panicked");
            Err(HandlerError::Panicked(msg))
        }
    }
}

/// Extract a human-readable message from panic info
///
/// Handles the common payload types `&str` and `String`, and falls back
/// to a generic message.
fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::base::BoxError;

    #[tokio::test]
    async fn test_isolated_success() {
        let result = call_handler_isolated(|| async { Ok::<(), BoxError>(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_isolated_error() {
        let result = call_handler_isolated(|| async { Err::<(), BoxError>("handler error".into()) }).await;
        match result {
            Err(HandlerError::Failed(e)) => assert_eq!(e.to_string(), "handler error"),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_isolated_panic_while_polling() {
        let result = call_handler_isolated(|| async {
            panic!("poll panic");
            #[allow(unreachable_code)]
            Ok::<(), BoxError>(())
        })
        .await;
        match result {
            Err(HandlerError::Panicked(msg)) => assert!(msg.contains("poll panic")),
            other => panic!("Expected Panicked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_isolated_panic_before_future() {
        let result = call_handler_isolated(|| -> std::future::Ready<HandlerResult> {
            panic!("{}", "sync panic".to_string());
        })
        .await;
        match result {
            Err(HandlerError::Panicked(msg)) => assert_eq!(msg, "sync panic"),
            other => panic!("Expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_panic_message_non_string() {
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(
            extract_panic_message(&payload),
            "Unknown panic (non-string payload)"
        );
    }
}
