use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ProposalDecision, ProposalStatus, RebalanceProposal};

/// Stores rebalance proposals per portfolio and owns their lifecycle:
/// Pending proposals expire after the TTL, and repeated propose calls with
/// unchanged trigger conditions return the existing pending proposal.
pub struct ProposalStore {
    proposals: DashMap<Uuid, Vec<RebalanceProposal>>,
    ttl: Duration,
}

impl ProposalStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            proposals: DashMap::new(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Flip pending proposals past their TTL to Expired.
    pub fn expire_stale(&self, portfolio_id: Uuid, now: DateTime<Utc>) {
        if let Some(mut entry) = self.proposals.get_mut(&portfolio_id) {
            for proposal in entry.iter_mut() {
                if proposal.status == ProposalStatus::Pending
                    && now - proposal.created_at >= self.ttl
                {
                    proposal.status = ProposalStatus::Expired;
                }
            }
        }
    }

    /// The pending proposal whose trigger conditions match, if one exists.
    /// Used to make propose idempotent within the TTL.
    pub fn find_pending(
        &self,
        portfolio_id: Uuid,
        trigger_reason: &str,
        now: DateTime<Utc>,
    ) -> Option<RebalanceProposal> {
        self.expire_stale(portfolio_id, now);
        self.proposals.get(&portfolio_id).and_then(|entry| {
            entry
                .iter()
                .rev()
                .find(|p| {
                    p.status == ProposalStatus::Pending && p.trigger_reason == trigger_reason
                })
                .cloned()
        })
    }

    pub fn latest_pending(&self, portfolio_id: Uuid, now: DateTime<Utc>) -> Option<RebalanceProposal> {
        self.expire_stale(portfolio_id, now);
        self.proposals.get(&portfolio_id).and_then(|entry| {
            entry
                .iter()
                .rev()
                .find(|p| p.status == ProposalStatus::Pending)
                .cloned()
        })
    }

    pub fn insert(&self, proposal: RebalanceProposal) {
        self.proposals
            .entry(proposal.portfolio_id)
            .or_default()
            .push(proposal);
    }

    /// Record the caller's accept/reject decision on a pending proposal.
    pub fn decide(
        &self,
        portfolio_id: Uuid,
        proposal_id: Uuid,
        decision: ProposalDecision,
        now: DateTime<Utc>,
    ) -> Result<RebalanceProposal, AppError> {
        self.expire_stale(portfolio_id, now);

        let mut entry = self
            .proposals
            .get_mut(&portfolio_id)
            .ok_or_else(|| AppError::NotFound(format!("portfolio {} has no proposals", portfolio_id)))?;

        let proposal = entry
            .iter_mut()
            .find(|p| p.id == proposal_id)
            .ok_or_else(|| AppError::NotFound(format!("proposal {} not found", proposal_id)))?;

        if proposal.status != ProposalStatus::Pending {
            return Err(AppError::Validation(format!(
                "proposal {} is {:?} and can no longer be decided",
                proposal_id, proposal.status
            )));
        }

        proposal.status = match decision {
            ProposalDecision::Accepted => ProposalStatus::Accepted,
            ProposalDecision::Rejected => ProposalStatus::Rejected,
        };
        if decision == ProposalDecision::Accepted {
            proposal.executed_at = Some(now);
        }

        Ok(proposal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProposalType;

    fn proposal(portfolio_id: Uuid, reason: &str, created_at: DateTime<Utc>) -> RebalanceProposal {
        RebalanceProposal {
            id: Uuid::new_v4(),
            portfolio_id,
            proposal_type: ProposalType::Drift,
            trigger_reason: reason.to_string(),
            current_risk_score: 50.0,
            target_risk_score: 40.0,
            current_diversification_score: 60.0,
            target_diversification_score: 70.0,
            actions: vec![],
            expected_return_change: 0.01,
            expected_risk_change: -10.0,
            status: ProposalStatus::Pending,
            created_at,
            executed_at: None,
        }
    }

    #[test]
    fn test_find_pending_matches_trigger_reason() {
        let store = ProposalStore::new(72);
        let id = Uuid::new_v4();
        let now = Utc::now();

        store.insert(proposal(id, "concentration", now));

        assert!(store.find_pending(id, "concentration", now).is_some());
        assert!(store.find_pending(id, "drift", now).is_none());
    }

    #[test]
    fn test_pending_expires_after_ttl() {
        let store = ProposalStore::new(72);
        let id = Uuid::new_v4();
        let created = Utc::now();

        store.insert(proposal(id, "concentration", created));

        let later = created + Duration::hours(73);
        assert!(store.find_pending(id, "concentration", later).is_none());
        assert!(store.latest_pending(id, later).is_none());
    }

    #[test]
    fn test_decide_rejects_non_pending() {
        let store = ProposalStore::new(72);
        let id = Uuid::new_v4();
        let now = Utc::now();
        let p = proposal(id, "concentration", now);
        let pid = p.id;
        store.insert(p);

        let accepted = store
            .decide(id, pid, ProposalDecision::Accepted, now)
            .unwrap();
        assert_eq!(accepted.status, ProposalStatus::Accepted);
        assert!(accepted.executed_at.is_some());

        let again = store.decide(id, pid, ProposalDecision::Rejected, now);
        assert!(matches!(again, Err(AppError::Validation(_))));
    }
}
