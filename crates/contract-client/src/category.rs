use alloy::primitives::U256;
use iexec_core::TxHash;
use serde::{Deserialize, Serialize};

use crate::client::{call_error, ContractClient};
use crate::conversions::{decode_category, u256_to_u64};
use crate::error::ContractError;
use crate::IexecHub;

/// A computation category: the reference clock used to derive task deadlines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub description: String,
    pub work_clock_time_ref: u64,
}

impl Category {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::InvalidArgument {
                field: "name".to_string(),
                message: "is a required field".to_string(),
            });
        }
        if self.work_clock_time_ref == 0 {
            return Err(ContractError::InvalidArgument {
                field: "workClockTimeRef".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCategory {
    pub catid: u64,
    pub tx_hash: TxHash,
}

impl ContractClient {
    /// Only the hub owner may create categories; anyone else is refused before
    /// a transaction is sent.
    pub async fn create_category(
        &self,
        category: &Category,
    ) -> Result<CreatedCategory, ContractError> {
        category.validate()?;
        let user = self.signer()?.address();
        let hub = IexecHub::new(self.hub_address, self.write_provider()?);

        let owner = hub.owner().call().await.map_err(call_error)?;
        if owner != user {
            return Err(ContractError::Rejected(format!(
                "only category owner {owner} can create new categories"
            )));
        }

        let call = hub.createCategory(
            category.name.clone(),
            category.description.clone(),
            U256::from(category.work_clock_time_ref),
        );
        let receipt = self.send_and_confirm(call).await?;
        let tx_hash = TxHash(receipt.transaction_hash);

        let created = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<IexecHub::CreateCategory>().ok())
            .ok_or(ContractError::EventNotFound {
                event: "CreateCategory",
                tx_hash,
            })?
            .inner
            .data;
        let catid = u256_to_u64(created.catid, "catid")?;
        tracing::info!(catid, tx_hash = %tx_hash, "category created");
        Ok(CreatedCategory { catid, tx_hash })
    }

    pub async fn show_category(&self, index: u64) -> Result<Category, ContractError> {
        let count = self.count_category().await?;
        if index >= count {
            return Err(ContractError::NotFound(format!(
                "category {index} (only {count} categories)"
            )));
        }
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let raw = hub
            .viewCategory(U256::from(index))
            .call()
            .await
            .map_err(call_error)?;
        decode_category(raw)
    }

    pub async fn count_category(&self) -> Result<u64, ContractError> {
        let hub = IexecHub::new(self.hub_address, self.read_provider());
        let count = hub.countCategory().call().await.map_err(call_error)?;
        u256_to_u64(count, "count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_requires_name_and_clock() {
        let category = Category {
            name: "XS".to_string(),
            description: "{}".to_string(),
            work_clock_time_ref: 300,
        };
        assert!(category.validate().is_ok());

        let unnamed = Category {
            name: " ".to_string(),
            ..category.clone()
        };
        assert!(matches!(
            unnamed.validate(),
            Err(ContractError::InvalidArgument { field, .. }) if field == "name"
        ));

        let no_clock = Category {
            work_clock_time_ref: 0,
            ..category
        };
        assert!(no_clock.validate().is_err());
    }

    #[test]
    fn serializes_in_camel_case() {
        let json = serde_json::to_value(Category {
            name: "S".to_string(),
            description: String::new(),
            work_clock_time_ref: 1200,
        })
        .unwrap();
        assert_eq!(json["workClockTimeRef"], 1200);
    }
}
