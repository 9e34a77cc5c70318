//! Explicit decoding of hub return values into the domain model, and encoding of
//! signed orders into call arguments. Every field is mapped by name; nothing is
//! decoded positionally through a shared helper.

use alloy::primitives::{Bytes, U256};
use iexec_core::deal::Resource;
use iexec_core::{
    AppOrder, DatasetOrder, Deal, DealId, RequestOrder, SignedOrder, Task, TaskId, TaskStatus,
    WorkerpoolOrder,
};

use crate::account::Account;
use crate::category::Category;
use crate::error::ContractError;
use crate::IexecHub;

pub fn u256_to_u64(value: U256, field: &str) -> Result<u64, ContractError> {
    u64::try_from(value)
        .map_err(|_| ContractError::Decode(format!("{field}: {value} does not fit in 64 bits")))
}

fn decode_resource(raw: IexecHub::Resource, field: &str) -> Result<Resource, ContractError> {
    Ok(Resource {
        pointer: raw.pointer,
        owner: raw.owner,
        price: u256_to_u64(raw.price, field)?,
    })
}

pub fn decode_deal(deal_id: DealId, raw: IexecHub::Deal) -> Result<Deal, ContractError> {
    Ok(Deal {
        deal_id,
        app: decode_resource(raw.app, "app.price")?,
        dataset: decode_resource(raw.dataset, "dataset.price")?,
        workerpool: decode_resource(raw.workerpool, "workerpool.price")?,
        trust: u256_to_u64(raw.trust, "trust")?,
        category: u256_to_u64(raw.category, "category")?,
        tag: raw.tag,
        requester: raw.requester,
        beneficiary: raw.beneficiary,
        callback: raw.callback,
        params: raw.params,
        start_time: u256_to_u64(raw.startTime, "startTime")?,
        bot_first: u256_to_u64(raw.botFirst, "botFirst")?,
        bot_size: u256_to_u64(raw.botSize, "botSize")?,
        worker_stake: raw.workerStake,
        scheduler_reward_ratio: u256_to_u64(raw.schedulerRewardRatio, "schedulerRewardRatio")?,
    })
}

pub fn decode_task(task_id: TaskId, raw: IexecHub::Task) -> Result<Task, ContractError> {
    let status = TaskStatus::from_u8(raw.status)
        .ok_or_else(|| ContractError::Decode(format!("status: unknown task status {}", raw.status)))?;
    Ok(Task {
        task_id,
        status,
        deal_id: DealId(raw.dealid),
        idx: u256_to_u64(raw.idx, "idx")?,
        timeref: u256_to_u64(raw.timeref, "timeref")?,
        contribution_deadline: u256_to_u64(raw.contributionDeadline, "contributionDeadline")?,
        reveal_deadline: u256_to_u64(raw.revealDeadline, "revealDeadline")?,
        final_deadline: u256_to_u64(raw.finalDeadline, "finalDeadline")?,
        consensus_value: raw.consensusValue,
        reveal_counter: u256_to_u64(raw.revealCounter, "revealCounter")?,
        winner_counter: u256_to_u64(raw.winnerCounter, "winnerCounter")?,
        contributors: raw.contributors,
        result_digest: raw.resultDigest,
        results: raw.results,
        results_timestamp: u256_to_u64(raw.resultsTimestamp, "resultsTimestamp")?,
        results_callback: raw.resultsCallback,
    })
}

pub fn decode_category(raw: IexecHub::Category) -> Result<Category, ContractError> {
    Ok(Category {
        name: raw.name,
        description: raw.description,
        work_clock_time_ref: u256_to_u64(raw.workClockTimeRef, "workClockTimeRef")?,
    })
}

pub fn decode_account(raw: IexecHub::Account) -> Account {
    Account {
        stake: raw.stake,
        locked: raw.locked,
    }
}

/// Registries store multiaddrs as UTF-8 text; other bytes are shown as hex.
pub fn decode_multiaddr(raw: &Bytes) -> String {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .unwrap_or_else(|_| raw.to_string())
}

pub fn encode_multiaddr(multiaddr: &str) -> Bytes {
    Bytes::copy_from_slice(multiaddr.as_bytes())
}

pub fn decode_mrenclave(raw: &Bytes) -> Result<String, ContractError> {
    String::from_utf8(raw.to_vec()).map_err(|e| ContractError::Decode(format!("mrenclave: {e}")))
}

pub fn encode_app_order(signed: &SignedOrder<AppOrder>) -> IexecHub::AppOrder {
    let o = &signed.order;
    IexecHub::AppOrder {
        app: o.app,
        appprice: U256::from(o.appprice),
        volume: U256::from(o.volume),
        tag: o.tag,
        datasetrestrict: o.datasetrestrict,
        workerpoolrestrict: o.workerpoolrestrict,
        requesterrestrict: o.requesterrestrict,
        salt: o.salt,
        sign: signed.sign.clone(),
    }
}

pub fn encode_dataset_order(signed: &SignedOrder<DatasetOrder>) -> IexecHub::DatasetOrder {
    let o = &signed.order;
    IexecHub::DatasetOrder {
        dataset: o.dataset,
        datasetprice: U256::from(o.datasetprice),
        volume: U256::from(o.volume),
        tag: o.tag,
        apprestrict: o.apprestrict,
        workerpoolrestrict: o.workerpoolrestrict,
        requesterrestrict: o.requesterrestrict,
        salt: o.salt,
        sign: signed.sign.clone(),
    }
}

pub fn encode_workerpool_order(signed: &SignedOrder<WorkerpoolOrder>) -> IexecHub::WorkerpoolOrder {
    let o = &signed.order;
    IexecHub::WorkerpoolOrder {
        workerpool: o.workerpool,
        workerpoolprice: U256::from(o.workerpoolprice),
        volume: U256::from(o.volume),
        tag: o.tag,
        category: U256::from(o.category),
        trust: U256::from(o.trust),
        apprestrict: o.apprestrict,
        datasetrestrict: o.datasetrestrict,
        requesterrestrict: o.requesterrestrict,
        salt: o.salt,
        sign: signed.sign.clone(),
    }
}

pub fn encode_request_order(signed: &SignedOrder<RequestOrder>) -> IexecHub::RequestOrder {
    let o = &signed.order;
    IexecHub::RequestOrder {
        app: o.app,
        appmaxprice: U256::from(o.appmaxprice),
        dataset: o.dataset,
        datasetmaxprice: U256::from(o.datasetmaxprice),
        workerpool: o.workerpool,
        workerpoolmaxprice: U256::from(o.workerpoolmaxprice),
        requester: o.requester,
        volume: U256::from(o.volume),
        tag: o.tag,
        category: U256::from(o.category),
        trust: U256::from(o.trust),
        beneficiary: o.beneficiary,
        callback: o.callback,
        params: o.params.clone(),
        salt: o.salt,
        sign: signed.sign.clone(),
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, Bytes, B256};

    use super::*;

    fn raw_task(status: u8) -> IexecHub::Task {
        IexecHub::Task {
            status,
            dealid: B256::repeat_byte(0x11),
            idx: U256::from(2),
            timeref: U256::from(300),
            contributionDeadline: U256::from(1_000),
            revealDeadline: U256::from(1_100),
            finalDeadline: U256::from(3_000),
            consensusValue: B256::ZERO,
            revealCounter: U256::ZERO,
            winnerCounter: U256::ZERO,
            contributors: vec![Address::repeat_byte(0x22)],
            resultDigest: B256::ZERO,
            results: Bytes::new(),
            resultsTimestamp: U256::ZERO,
            resultsCallback: Bytes::new(),
        }
    }

    #[test]
    fn decodes_task_fields_by_name() {
        let task = decode_task(TaskId::new([9; 32]), raw_task(1)).unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.deal_id, DealId::new([0x11; 32]));
        assert_eq!(task.idx, 2);
        assert_eq!(task.final_deadline, 3_000);
        assert_eq!(task.contributors.len(), 1);
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        assert!(matches!(
            decode_task(TaskId::new([9; 32]), raw_task(7)),
            Err(ContractError::Decode(_))
        ));
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let err = u256_to_u64(U256::MAX, "botSize").unwrap_err();
        assert!(err.to_string().contains("botSize"));
    }

    #[test]
    fn multiaddr_is_text_when_it_can_be() {
        let docker = "registry.hub.docker.com/iexechub/vanityeth:1.1.1";
        assert_eq!(decode_multiaddr(&encode_multiaddr(docker)), docker);
        assert_eq!(decode_multiaddr(&Bytes::from(vec![0xa5, 0x03])), "0xa503");
        assert!(decode_mrenclave(&Bytes::from(vec![0xff])).is_err());
    }

    #[test]
    fn encodes_signature_alongside_fields() {
        let signed = SignedOrder {
            order: DatasetOrder::null(),
            sign: Bytes::from(vec![1u8; 65]),
        };
        let encoded = encode_dataset_order(&signed);
        assert_eq!(encoded.dataset, Address::ZERO);
        assert_eq!(encoded.sign.len(), 65);
    }
}
