use crate::config::Config;
use crate::controllers::node_lister::NodeLister;
use crate::controllers::work_queue::WorkQueue;
use crate::reservation::{ParseError, ReservationCache, ReservationEntry, ReservationSource};
use crate::spec::node_helpers::node_annotations;
use k8s_openapi::api::core::v1::Node as K8sNode;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("failed to decode reservations of node {node}: {source}")]
    Decode {
        node: String,
        #[source]
        source: ParseError,
    },
}

enum Processed {
    Synced,
    Retrying,
    Dropped(String, SyncError),
}

#[derive(Debug, Clone)]
pub enum NodeEvent {
    Added(K8sNode),
    Updated { old: K8sNode, new: K8sNode },
    Deleted(K8sNode),
}

/// Keeps the reservation cache in line with the reservation annotations of
/// every node. Sole writer of the cache; keys are processed one at a time.
pub struct ReservationController {
    cache: Arc<ReservationCache>,
    nodes: Arc<dyn NodeLister>,
    queue: Arc<WorkQueue>,
    source: ReservationSource,
    max_retries: u32,
}

impl ReservationController {
    pub fn new(cache: Arc<ReservationCache>, nodes: Arc<dyn NodeLister>, config: &Config) -> Self {
        Self {
            cache,
            nodes,
            queue: WorkQueue::new(config.backoff_base(), config.backoff_max()),
            source: config.reservation_source(),
            max_retries: config.max_retries,
        }
    }

    pub fn cache(&self) -> &Arc<ReservationCache> {
        &self.cache
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    pub fn handle(&self, event: &NodeEvent) {
        match event {
            NodeEvent::Added(node) => self.on_node_added(node),
            NodeEvent::Updated { old, new } => self.on_node_updated(old, new),
            NodeEvent::Deleted(node) => self.on_node_deleted(node),
        }
    }

    pub fn on_node_added(&self, node: &K8sNode) {
        if self.source.relevant(node_annotations(node)).is_empty() {
            return;
        }
        self.enqueue(node);
    }

    pub fn on_node_updated(&self, old: &K8sNode, new: &K8sNode) {
        let before = self.source.relevant(node_annotations(old));
        let after = self.source.relevant(node_annotations(new));
        if !after.is_empty() && before == after {
            return;
        }
        self.enqueue(new);
    }

    pub fn on_node_deleted(&self, node: &K8sNode) {
        self.enqueue(node);
    }

    fn enqueue(&self, node: &K8sNode) {
        match node.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => self.queue.add(name),
            _ => debug!("ignoring node without a name"),
        }
    }

    /// Processes keys until the shutdown signal fires. The item being synced
    /// when the signal arrives is finished first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("starting reservation controller");
        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    processed = self.process_next_item() => {
                        if processed.is_none() {
                            break;
                        }
                    }
                }
            }
        }
        self.queue.shut_down();
        info!("reservation controller stopped");
    }

    /// Processes keys until every queued key has either synced or been dropped
    /// after running out of retries, waiting out backoffs as needed. Returns the
    /// dropped keys with their last error.
    pub async fn drain(&self) -> Vec<(String, SyncError)> {
        let mut dropped = vec![];
        while self.queue.has_pending() {
            match self.process_next_item().await {
                None => break,
                Some(Processed::Dropped(key, err)) => dropped.push((key, err)),
                Some(_) => {}
            }
        }
        dropped
    }

    async fn process_next_item(&self) -> Option<Processed> {
        let key = self.queue.get().await?;
        let result = self.sync_node(&key);
        let processed = self.handle_err(&key, result);
        self.queue.done(&key);
        Some(processed)
    }

    /// Brings the cache in line with the node's current annotations. A node that
    /// no longer exists, or carries no reservation annotation, is evicted.
    pub fn sync_node(&self, key: &str) -> Result<(), SyncError> {
        debug!("syncing reservations of node {}", key);

        let Some(node) = self.nodes.get(key) else {
            if self.cache.remove(key) {
                info!("node {} is gone, evicted its reservations", key);
            }
            return Ok(());
        };

        let declarations = self
            .source
            .decode(node_annotations(&node))
            .map_err(|source| SyncError::Decode {
                node: key.to_string(),
                source,
            })?;

        let Some(declarations) = declarations else {
            if self.cache.remove(key) {
                info!("node {} no longer reserves capacity, evicted its reservations", key);
            }
            return Ok(());
        };

        let entry = ReservationEntry::from_declarations(&declarations);
        let owners = declarations.into_iter().map(|d| d.owner_uid);
        if self.cache.apply(key, entry, owners) {
            info!("updated reservations of node {}: {:?}", key, entry);
        }

        debug!("synced reservations of node {}", key);
        Ok(())
    }

    fn handle_err(&self, key: &str, result: Result<(), SyncError>) -> Processed {
        let Err(err) = result else {
            self.queue.forget(key);
            return Processed::Synced;
        };

        let requeues = self.queue.num_requeues(key);
        if requeues < self.max_retries {
            warn!("error syncing node {} (retry {}/{}): {}", key, requeues + 1, self.max_retries, err);
            self.queue.add_rate_limited(key);
            return Processed::Retrying;
        }

        error!("dropping node {} out of the queue after {} retries: {}", key, requeues, err);
        self.queue.forget(key);
        Processed::Dropped(key.to_string(), err)
    }
}
