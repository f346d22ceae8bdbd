use super::{ContainerRuntime, EventSubscription};
use crate::error::RuntimeError;
use crate::types::{ActionKind, ContainerSnapshot, LifecycleEvent};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerSummary, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::future;
use futures_util::stream::StreamExt;
use log::debug;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon (unix socket on Linux, or
    /// whatever `DOCKER_HOST` points at).
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>, RuntimeError> {
        let opts = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(opts)).await?;
        Ok(containers.into_iter().map(snapshot).collect())
    }

    fn subscribe(&self) -> EventSubscription {
        let opts = EventsOptions::<String> {
            filters: [
                ("type", ["container"].as_slice()),
                ("event", ["create", "destroy"].as_slice()),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect(),
            ..Default::default()
        };

        let stream = self.docker.events(Some(opts)).filter_map(|msg| {
            future::ready(match msg {
                Ok(event) => lifecycle_event(event).map(Ok),
                Err(e) => Some(Err(RuntimeError::from(e))),
            })
        });
        EventSubscription::new(stream)
    }
}

fn snapshot(summary: ContainerSummary) -> ContainerSnapshot {
    let name = summary
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .or(summary.id)
        .unwrap_or_default();
    ContainerSnapshot {
        name,
        labels: summary.labels.unwrap_or_default(),
    }
}

/// Narrows a raw Docker event to a create/remove event, or drops it.
fn lifecycle_event(event: EventMessage) -> Option<LifecycleEvent> {
    let action_str = event.action.unwrap_or_default();
    let Some(action) = ActionKind::from_action(&action_str) else {
        debug!("Ignoring container event: {}", action_str);
        return None;
    };

    let actor = event.actor.unwrap_or_default();
    let attributes = actor.attributes.unwrap_or_default();
    let container_name = attributes
        .get("name")
        .filter(|n| !n.is_empty())
        .cloned()
        .or(actor.id)
        .unwrap_or_default();

    Some(LifecycleEvent {
        action,
        container_name,
        attributes,
    })
}
