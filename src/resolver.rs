use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::CatalogApi;
use crate::error::{Error, Result};
use crate::models::MovieDetail;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Turns bare movie ids into detail records, one concurrent fetch per distinct id.
#[derive(Clone)]
pub struct DetailResolver {
    catalog: Arc<dyn CatalogApi>,
    fetch_timeout: Duration,
}

impl DetailResolver {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Resolve `ids` in input order, silently dropping ids that fail.
    ///
    /// Repeated ids are fetched once and repeated in the output. Fails with
    /// [`Error::ResolutionAborted`] only when the input is non-empty and
    /// nothing resolved.
    pub async fn resolve_all(&self, ids: &[i32]) -> Result<Vec<MovieDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut distinct: Vec<i32> = Vec::new();
        let mut slot_by_id: HashMap<i32, usize> = HashMap::new();
        let slots: Vec<usize> = ids
            .iter()
            .map(|&id| {
                *slot_by_id.entry(id).or_insert_with(|| {
                    distinct.push(id);
                    distinct.len() - 1
                })
            })
            .collect();

        // Every fetch is spawned before any is awaited.
        let tasks: Vec<_> = distinct
            .iter()
            .map(|&id| {
                let catalog = self.catalog.clone();
                let limit = self.fetch_timeout;
                tokio::spawn(async move {
                    match tokio::time::timeout(limit, catalog.fetch_detail(id)).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::CatalogUnavailable(format!(
                            "movie {id} timed out after {}ms",
                            limit.as_millis()
                        ))),
                    }
                })
            })
            .collect();
        debug!(
            requested = ids.len(),
            dispatched = tasks.len(),
            "Resolving movie details"
        );

        let outcomes: Vec<Option<MovieDetail>> = join_all(tasks)
            .await
            .into_iter()
            .zip(&distinct)
            .map(|(joined, &id)| match joined {
                Ok(Ok(detail)) => Some(detail),
                Ok(Err(e)) => {
                    warn!(id, "Dropping movie from results: {}", e);
                    None
                }
                Err(e) => {
                    warn!(id, "Detail fetch task did not complete: {}", e);
                    None
                }
            })
            .collect();

        let resolved: Vec<MovieDetail> = slots
            .iter()
            .filter_map(|&slot| outcomes[slot].clone())
            .collect();

        if resolved.is_empty() {
            warn!("All {} movie lookups failed", ids.len());
            return Err(Error::ResolutionAborted {
                attempted: ids.len(),
            });
        }
        info!("Resolved {} of {} movie(s)", resolved.len(), ids.len());
        Ok(resolved)
    }
}
