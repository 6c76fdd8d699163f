//! Agent lookup and the acquaintance relation.
//!
//! Agents and who-knows-whom are owned by the contact-management side of
//! the application. The scheduler only reads them, through [`Directory`],
//! and re-reads on every decision so edits take effect immediately.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use moments_types::{Agent, AgentId};

/// Read-only view of agents and their acquaintances.
pub trait Directory: Send + Sync {
    /// Look up an agent.
    fn agent(&self, id: AgentId) -> Option<Agent>;

    /// Agents that `id` is acquainted with. Gates who may react to whose
    /// posts.
    fn acquaintances(&self, id: AgentId) -> BTreeSet<AgentId>;
}

#[derive(Debug, Default)]
struct Roster {
    agents: BTreeMap<AgentId, Agent>,
    acquaintances: BTreeMap<AgentId, BTreeSet<AgentId>>,
}

/// In-process directory, editable at runtime.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    roster: RwLock<Roster>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an agent.
    pub fn upsert_agent(&self, agent: Agent) {
        self.roster
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .agents
            .insert(agent.id, agent);
    }

    /// Remove an agent and every acquaintance edge touching it.
    pub fn remove_agent(&self, id: AgentId) -> Option<Agent> {
        let mut roster = self.roster.write().unwrap_or_else(PoisonError::into_inner);
        roster.acquaintances.remove(&id);
        for known in roster.acquaintances.values_mut() {
            known.remove(&id);
        }
        roster.agents.remove(&id)
    }

    /// Make `a` and `b` acquainted with each other.
    pub fn acquaint(&self, a: AgentId, b: AgentId) {
        if a == b {
            return;
        }
        let mut roster = self.roster.write().unwrap_or_else(PoisonError::into_inner);
        roster.acquaintances.entry(a).or_default().insert(b);
        roster.acquaintances.entry(b).or_default().insert(a);
    }

    /// Number of known agents.
    pub fn len(&self) -> usize {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .agents
            .len()
    }

    /// Whether the directory has no agents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for InMemoryDirectory {
    fn agent(&self, id: AgentId) -> Option<Agent> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .agents
            .get(&id)
            .cloned()
    }

    fn acquaintances(&self, id: AgentId) -> BTreeSet<AgentId> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .acquaintances
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquaint_is_symmetric_and_ignores_self() {
        let dir = InMemoryDirectory::new();
        let a = Agent::autonomous("A", "");
        let b = Agent::autonomous("B", "");
        let (a_id, b_id) = (a.id, b.id);
        dir.upsert_agent(a);
        dir.upsert_agent(b);

        dir.acquaint(a_id, b_id);
        dir.acquaint(a_id, a_id);

        assert!(dir.acquaintances(a_id).contains(&b_id));
        assert!(dir.acquaintances(b_id).contains(&a_id));
        assert!(!dir.acquaintances(a_id).contains(&a_id));
    }

    #[test]
    fn remove_agent_drops_edges() {
        let dir = InMemoryDirectory::new();
        let a = Agent::autonomous("A", "");
        let b = Agent::autonomous("B", "");
        let (a_id, b_id) = (a.id, b.id);
        dir.upsert_agent(a);
        dir.upsert_agent(b);
        dir.acquaint(a_id, b_id);

        assert!(dir.remove_agent(b_id).is_some());
        assert!(dir.agent(b_id).is_none());
        assert!(dir.acquaintances(a_id).is_empty());
        assert_eq!(dir.len(), 1);
    }
}
