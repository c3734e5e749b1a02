//! Service and task builders.

use std::time::Duration;

use rollout_model::{ContainerSpec, Service, ServiceSpec, Task, TaskState, UpdateConfig};

/// A replicated service running `image` with the given parallelism and
/// no delay.
pub fn service(image: &str, parallelism: u64) -> Service {
    Service::new(ServiceSpec {
        name: image.split(':').next().unwrap_or(image).to_string(),
        container: Some(ContainerSpec::image(image)),
        update: Some(UpdateConfig::new(parallelism, Duration::ZERO)),
        ..ServiceSpec::default()
    })
}

/// A running task of `service` at `instance`, created from `image`.
///
/// An empty `image` gives a task that never had a container.
pub fn task(service: &Service, instance: u64, image: &str) -> Task {
    let mut task = Task::new_for_service(service, instance).with_state(TaskState::Running);
    task.spec = if image.is_empty() {
        ContainerSpec::default()
    } else {
        ContainerSpec::image(image)
    };
    task
}

/// `count` running tasks of `service`, instances `0..count`.
pub fn tasks(service: &Service, count: u64, image: &str) -> Vec<Task> {
    (0..count).map(|i| task(service, i, image)).collect()
}
