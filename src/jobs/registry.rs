use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ClientError;

/// Project ids that currently have a poll loop.
#[derive(Debug, Clone, Default)]
pub struct PollRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl PollRegistry {
    /// Claim `project_id`; fails if another watch already holds it.
    pub fn claim(&self, project_id: &str) -> Result<PollGuard, ClientError> {
        let mut active = self.active.lock();
        if !active.insert(project_id.to_string()) {
            return Err(ClientError::AlreadyWatching(project_id.to_string()));
        }
        Ok(PollGuard {
            registry: self.clone(),
            project_id: project_id.to_string(),
        })
    }

    pub fn is_active(&self, project_id: &str) -> bool {
        self.active.lock().contains(project_id)
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the claim when dropped.
#[derive(Debug)]
pub struct PollGuard {
    registry: PollRegistry,
    project_id: String,
}

impl PollGuard {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.registry.active.lock().remove(&self.project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_rejected_until_release() {
        let registry = PollRegistry::default();
        let guard = registry.claim("p-1").unwrap();
        assert!(registry.is_active("p-1"));
        assert!(matches!(
            registry.claim("p-1"),
            Err(ClientError::AlreadyWatching(id)) if id == "p-1"
        ));

        drop(guard);
        assert!(!registry.is_active("p-1"));
        assert!(registry.claim("p-1").is_ok());
    }

    #[test]
    fn different_ids_are_independent() {
        let registry = PollRegistry::default();
        let _a = registry.claim("a").unwrap();
        let _b = registry.claim("b").unwrap();
        assert_eq!(registry.len(), 2);
    }
}
