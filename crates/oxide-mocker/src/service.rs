//! `tower::Service` adapter, so the dispatcher can sit underneath any
//! tower-based HTTP client stack in place of a real connection.

use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;

use crate::dispatcher::MockDispatcher;
use crate::error::{BoxError, DispatchError};
use crate::registry::Controller;

impl<C, B> tower::Service<http::Request<B>> for MockDispatcher<C>
where
    C: Controller,
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.send(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::IntoReturnValue;
    use crate::registry::{Receiver, RouteDefinition};
    use crate::request::Method;
    use tower::ServiceExt;

    struct Health;

    impl Controller for Health {
        fn routes() -> Vec<RouteDefinition<Self>> {
            vec![RouteDefinition::new(
                "health",
                Method::Get,
                "/health",
                Receiver::Static,
                |_, _| Box::pin(async { "up".into_return_value() }),
            )]
        }
    }

    #[tokio::test]
    async fn test_oneshot() {
        let dispatcher = MockDispatcher::<Health>::new().unwrap();
        let request = http::Request::get("/health")
            .body(http_body_util::Empty::<Bytes>::new())
            .unwrap();

        let response = dispatcher.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dispatcher = MockDispatcher::<Health>::new().unwrap();
        let request = http::Request::delete("/health")
            .body(http_body_util::Empty::<Bytes>::new())
            .unwrap();

        let response = dispatcher.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }
}
