use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::enums::TaskStatus;
use crate::ids::{DealId, TaskId};

/// `keccak256(abi.encodePacked(bytes32 dealid, uint256 index))`.
pub fn compute_task_id(deal_id: DealId, index: u64) -> TaskId {
    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(deal_id.as_bytes());
    packed[32..].copy_from_slice(&U256::from(index).to_be_bytes::<32>());
    TaskId(keccak256(packed))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub pointer: Address,
    pub owner: Address,
    pub price: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub deal_id: DealId,
    pub app: Resource,
    pub dataset: Resource,
    pub workerpool: Resource,
    pub trust: u64,
    pub category: u64,
    pub tag: B256,
    pub requester: Address,
    pub beneficiary: Address,
    pub callback: Address,
    pub params: String,
    pub start_time: u64,
    pub bot_first: u64,
    pub bot_size: u64,
    pub worker_stake: U256,
    pub scheduler_reward_ratio: u64,
}

impl Deal {
    /// Number of tasks the deal spawned.
    pub fn volume(&self) -> u64 {
        self.bot_size
    }

    /// Task ids keyed by their absolute index within the deal's bag of tasks.
    pub fn task_ids(&self) -> BTreeMap<u64, TaskId> {
        (self.bot_first..self.bot_first + self.bot_size)
            .map(|idx| (idx, compute_task_id(self.deal_id, idx)))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub deal_id: DealId,
    pub idx: u64,
    pub timeref: u64,
    pub contribution_deadline: u64,
    pub reveal_deadline: u64,
    pub final_deadline: u64,
    pub consensus_value: B256,
    pub reveal_counter: u64,
    pub winner_counter: u64,
    pub contributors: Vec<Address>,
    pub result_digest: B256,
    pub results: Bytes,
    pub results_timestamp: u64,
    pub results_callback: Bytes,
}

impl Task {
    /// The final deadline passed without the task reaching a final status.
    /// Only an observation: the chain still has to be told via `claim`.
    pub fn is_timed_out(&self, now: u64) -> bool {
        !self.status.is_final() && self.final_deadline != 0 && now >= self.final_deadline
    }

    pub fn result_location(&self) -> Option<ResultLocation> {
        ResultLocation::decode(&self.results)
    }
}

/// Where a completed task's result archive lives, decoded from `Task::results`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultLocation {
    Storage { storage: String, location: String },
    Raw(String),
}

impl ResultLocation {
    pub fn decode(results: &[u8]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let text = std::str::from_utf8(results).ok()?;
        #[derive(Deserialize)]
        struct Stored {
            storage: String,
            location: String,
        }
        match serde_json::from_str::<Stored>(text) {
            Ok(stored) => Some(Self::Storage {
                storage: stored.storage,
                location: stored.location,
            }),
            Err(_) => Some(Self::Raw(text.to_string())),
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Self::Storage { location, .. } => location,
            Self::Raw(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_deal(bot_first: u64, bot_size: u64) -> Deal {
        let resource = Resource {
            pointer: Address::ZERO,
            owner: Address::ZERO,
            price: 0,
        };
        Deal {
            deal_id: DealId::new([0x11; 32]),
            app: resource.clone(),
            dataset: resource.clone(),
            workerpool: resource,
            trust: 1,
            category: 0,
            tag: B256::ZERO,
            requester: Address::ZERO,
            beneficiary: Address::ZERO,
            callback: Address::ZERO,
            params: String::new(),
            start_time: 0,
            bot_first,
            bot_size,
            worker_stake: U256::ZERO,
            scheduler_reward_ratio: 0,
        }
    }

    #[test]
    fn task_id_is_pure_and_index_sensitive() {
        let deal = DealId::new([0x42; 32]);
        assert_eq!(compute_task_id(deal, 0), compute_task_id(deal, 0));
        assert_ne!(compute_task_id(deal, 0), compute_task_id(deal, 1));
        assert_ne!(compute_task_id(deal, 0), compute_task_id(DealId::new([0x43; 32]), 0));
    }

    #[test]
    fn task_id_matches_packed_encoding() {
        let deal = DealId::new([0u8; 32]);
        // keccak256 of 64 zero bytes
        assert_eq!(
            compute_task_id(deal, 0).to_string(),
            "0xad3228b676f7d3cd4284a5443f17f1962b36e491b30a40b2405849e597ba5fb5"
        );
    }

    #[test]
    fn task_ids_cover_bag_of_tasks() {
        let deal = sample_deal(3, 2);
        let ids = deal.task_ids();
        assert_eq!(ids.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(ids[&4], compute_task_id(deal.deal_id, 4));
    }

    #[test]
    fn decodes_result_locations() {
        let stored = br#"{"storage":"ipfs","location":"/ipfs/QmResult"}"#;
        assert_eq!(
            ResultLocation::decode(stored),
            Some(ResultLocation::Storage {
                storage: "ipfs".to_string(),
                location: "/ipfs/QmResult".to_string(),
            })
        );
        assert_eq!(
            ResultLocation::decode(b"/ipfs/QmRaw").map(|l| l.location().to_string()),
            Some("/ipfs/QmRaw".to_string())
        );
        assert_eq!(ResultLocation::decode(b""), None);
    }
}
