//! Dependency cycle detection
//!
//! The graph has an edge A -> B when some release of A declares a
//! requirement on B. A requirement counts from the moment it is declared,
//! whether or not B currently has a matching release.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::error::StoreError;
use crate::catalog::storer::CompatStorer;
use crate::catalog::types::ArtifactId;
use crate::resolve::error::CycleDetected;

pub struct CycleDetector<'s, S: CompatStorer> {
    store: &'s S,
}

impl<'s, S: CompatStorer> CycleDetector<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Find the chain a new requirement `source -> target` would close.
    ///
    /// Walks outward from `target` depth-first; each artifact is expanded at
    /// most once, so the walk terminates on any graph.
    pub fn find_cycle(
        &self,
        source: ArtifactId,
        target: ArtifactId,
    ) -> Result<Option<CycleDetected>, StoreError> {
        if source == target {
            return Ok(Some(CycleDetected {
                path: vec![source, source],
            }));
        }

        let mut visited = HashSet::from([target]);
        let mut path = vec![source, target];
        let mut frontier = vec![self.store.dependency_targets(target)?.into_iter()];

        while let Some(edges) = frontier.last_mut() {
            match edges.next() {
                Some(next) if next == source => {
                    path.push(source);
                    debug!("Cycle found: {:?}", path);
                    return Ok(Some(CycleDetected { path }));
                }
                Some(next) => {
                    if visited.insert(next) {
                        path.push(next);
                        frontier.push(self.store.dependency_targets(next)?.into_iter());
                    }
                }
                None => {
                    frontier.pop();
                    path.pop();
                }
            }
        }

        Ok(None)
    }

    pub fn would_create_cycle(
        &self,
        source: ArtifactId,
        target: ArtifactId,
    ) -> Result<bool, StoreError> {
        Ok(self.find_cycle(source, target)?.is_some())
    }
}
