//! Worker pool management.
//!
//! # Responsibilities
//! - Own the configured worker set in configuration order
//! - Partition workers by their current switch state

use std::sync::Arc;

use url::Url;

use crate::config::validation::ValidationError;
use crate::config::WorkerConfig;
use crate::error::{CoordError, CoordResult};
use crate::load_balancer::worker::{Worker, WorkerView};

#[derive(Debug, Default)]
pub struct WorkerPool {
    workers: Vec<Arc<Worker>>,
}

impl WorkerPool {
    pub fn new(workers: Vec<Arc<Worker>>) -> Self {
        Self { workers }
    }

    /// Build the pool from configuration.
    pub fn from_config(configs: &[WorkerConfig]) -> CoordResult<Self> {
        let mut workers = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();
        for (i, config) in configs.iter().enumerate() {
            match Url::parse(&config.address) {
                Ok(url) => workers.push(Arc::new(Worker::new(config.name.clone(), url))),
                Err(e) => errors.push(ValidationError::new(
                    format!("balancer.workers[{}].address", i),
                    e.to_string(),
                )),
            }
        }
        if !errors.is_empty() {
            return Err(CoordError::InvalidConfiguration(errors));
        }
        Ok(Self { workers })
    }

    pub fn all(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn up(&self) -> Vec<Arc<Worker>> {
        self.workers.iter().filter(|w| w.is_up()).cloned().collect()
    }

    pub fn down(&self) -> Vec<Arc<Worker>> {
        self.workers.iter().filter(|w| !w.is_up()).cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Worker>> {
        self.workers.iter().find(|w| w.name == name)
    }

    pub fn views(&self) -> Vec<WorkerView> {
        self.workers.iter().map(|w| WorkerView::from(w.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::worker::WorkerState;

    #[test]
    fn test_partition_by_state() {
        let pool = WorkerPool::from_config(&[
            WorkerConfig {
                name: "a".into(),
                address: "http://127.0.0.1:9001".into(),
            },
            WorkerConfig {
                name: "b".into(),
                address: "http://127.0.0.1:9002".into(),
            },
        ])
        .unwrap();

        pool.get("b").unwrap().set_state(WorkerState::Down);
        assert_eq!(pool.up().len(), 1);
        assert_eq!(pool.down()[0].name, "b");
        assert_eq!(pool.views().len(), 2);
    }

    #[test]
    fn test_bad_worker_address_is_invalid_configuration() {
        let err = WorkerPool::from_config(&[WorkerConfig {
            name: "a".into(),
            address: "not a url".into(),
        }])
        .unwrap_err();
        assert!(matches!(err, CoordError::InvalidConfiguration(_)));
    }
}
