use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt};

use crate::error::RuntimeError;
use crate::types::{ContainerSnapshot, LifecycleEvent};

pub mod docker;
pub use docker::DockerRuntime;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers known to the host, stopped ones included.
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>, RuntimeError>;

    /// Subscribe to container create/remove events.
    fn subscribe(&self) -> EventSubscription;
}

/// A live feed of lifecycle events. The first error it yields is terminal.
pub struct EventSubscription {
    stream: BoxStream<'static, Result<LifecycleEvent, RuntimeError>>,
}

impl EventSubscription {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<LifecycleEvent, RuntimeError>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Waits for the next event. A closed feed is reported as an error.
    pub async fn next(&mut self) -> Result<LifecycleEvent, RuntimeError> {
        match self.stream.next().await {
            Some(item) => item,
            None => Err(RuntimeError::StreamEnded),
        }
    }
}
