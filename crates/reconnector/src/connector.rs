//! The connection-establishment operation supervised by the controller.

use std::future::Future;
use tower::util::Oneshot;
use tower::{Service, ServiceExt};

/// An asynchronous operation that attempts to establish one connection.
///
/// The controller never inspects the connection; it hands it to the status
/// observer in the `connected` event. Each call to [`connect`](Self::connect)
/// is one attempt.
///
/// # Examples
///
/// Using a closure (via blanket impl):
///
/// ```rust
/// use reconnector::Connector;
///
/// let connector = || async { Ok::<_, std::io::Error>("session") };
/// # let _ = connector.connect();
/// ```
///
/// Implementing the trait:
///
/// ```rust
/// use reconnector::Connector;
/// use std::future::{ready, Ready};
///
/// struct StaticConnector {
///     addr: String,
/// }
///
/// impl Connector for StaticConnector {
///     type Connection = String;
///     type Error = std::io::Error;
///     type Future = Ready<std::io::Result<String>>;
///
///     fn connect(&self) -> Self::Future {
///         ready(Ok(format!("connected to {}", self.addr)))
///     }
/// }
/// ```
pub trait Connector: Send + Sync + 'static {
    /// The established connection.
    type Connection: Send + 'static;

    /// Why an attempt failed.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Future resolving to the outcome of one attempt.
    type Future: Future<Output = Result<Self::Connection, Self::Error>> + Send + 'static;

    /// Starts one connection attempt.
    fn connect(&self) -> Self::Future;
}

// Blanket implementation for closures - makes it easy to use
impl<F, Fut, T, E> Connector for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Connection = T;
    type Error = E;
    type Future = Fut;

    fn connect(&self) -> Self::Future {
        self()
    }
}

/// Adapts a Tower "make connection" service into a [`Connector`].
///
/// Every attempt clones the service and calls it once with a clone of the
/// target, waiting for readiness first.
///
/// ```rust
/// use reconnector::{Connector, ServiceConnector};
///
/// # #[tokio::main]
/// # async fn main() {
/// let make_conn = tower::service_fn(|addr: &'static str| async move {
///     Ok::<_, std::io::Error>(format!("conn to {addr}"))
/// });
///
/// let connector = ServiceConnector::new(make_conn, "db:5432");
/// assert_eq!(connector.connect().await.unwrap(), "conn to db:5432");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConnector<S, Target> {
    service: S,
    target: Target,
}

impl<S, Target> ServiceConnector<S, Target> {
    /// Creates a connector calling `service` with `target` on every attempt.
    pub fn new(service: S, target: Target) -> Self {
        Self { service, target }
    }

    /// Returns the target passed to the service.
    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl<S, Target> Connector for ServiceConnector<S, Target>
where
    S: Service<Target> + Clone + Send + Sync + 'static,
    S::Response: Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    S::Future: Send + 'static,
    Target: Clone + Send + Sync + 'static,
{
    type Connection = S::Response;
    type Error = S::Error;
    type Future = Oneshot<S, Target>;

    fn connect(&self) -> Self::Future {
        self.service.clone().oneshot(self.target.clone())
    }
}
