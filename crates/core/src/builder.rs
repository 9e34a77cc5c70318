//! Turns a sparse field mapping into a fully populated, schema-valid unsigned order.

use std::collections::HashSet;

use alloy_primitives::{Address, B256};
use rand::Rng;
use serde_json::{Map, Value};

use crate::enums::OrderKind;
use crate::error::SdkError;
use crate::ids::parse_bytes32;
use crate::order::{AnyOrder, AppOrder, DatasetOrder, Order, RequestOrder, WorkerpoolOrder};
use crate::tag::{encode_tag, NULL_TAG};

pub type OrderFields = Map<String, Value>;

pub fn build_order(kind: OrderKind, fields: &OrderFields) -> Result<AnyOrder, SdkError> {
    Ok(match kind {
        OrderKind::App => AnyOrder::App(create_apporder(fields)?),
        OrderKind::Dataset => AnyOrder::Dataset(create_datasetorder(fields)?),
        OrderKind::Workerpool => AnyOrder::Workerpool(create_workerpoolorder(fields)?),
        OrderKind::Request => AnyOrder::Request(create_requestorder(fields)?),
    })
}

pub fn create_apporder(fields: &OrderFields) -> Result<AppOrder, SdkError> {
    let mut r = FieldReader::new(fields);
    let order = AppOrder {
        app: r.required_address("app")?,
        appprice: r.uint("appprice")?,
        volume: r.uint("volume")?,
        tag: r.tag("tag")?,
        datasetrestrict: r.address("datasetrestrict")?,
        workerpoolrestrict: r.address("workerpoolrestrict")?,
        requesterrestrict: r.address("requesterrestrict")?,
        salt: r.salt("salt")?,
    };
    r.finish()?;
    order.validate()?;
    Ok(order)
}

pub fn create_datasetorder(fields: &OrderFields) -> Result<DatasetOrder, SdkError> {
    let mut r = FieldReader::new(fields);
    let order = DatasetOrder {
        dataset: r.required_address("dataset")?,
        datasetprice: r.uint("datasetprice")?,
        volume: r.uint("volume")?,
        tag: r.tag("tag")?,
        apprestrict: r.address("apprestrict")?,
        workerpoolrestrict: r.address("workerpoolrestrict")?,
        requesterrestrict: r.address("requesterrestrict")?,
        salt: r.salt("salt")?,
    };
    r.finish()?;
    order.validate()?;
    Ok(order)
}

pub fn create_workerpoolorder(fields: &OrderFields) -> Result<WorkerpoolOrder, SdkError> {
    let mut r = FieldReader::new(fields);
    let order = WorkerpoolOrder {
        workerpool: r.required_address("workerpool")?,
        workerpoolprice: r.uint("workerpoolprice")?,
        volume: r.uint("volume")?,
        tag: r.tag("tag")?,
        category: r.uint("category")?,
        trust: r.uint("trust")?,
        apprestrict: r.address("apprestrict")?,
        datasetrestrict: r.address("datasetrestrict")?,
        requesterrestrict: r.address("requesterrestrict")?,
        salt: r.salt("salt")?,
    };
    r.finish()?;
    order.validate()?;
    Ok(order)
}

pub fn create_requestorder(fields: &OrderFields) -> Result<RequestOrder, SdkError> {
    let mut r = FieldReader::new(fields);
    let requester = r.required_address("requester")?;
    let order = RequestOrder {
        app: r.required_address("app")?,
        appmaxprice: r.uint("appmaxprice")?,
        dataset: r.address("dataset")?,
        datasetmaxprice: r.uint("datasetmaxprice")?,
        workerpool: r.address("workerpool")?,
        workerpoolmaxprice: r.uint("workerpoolmaxprice")?,
        requester,
        volume: r.uint("volume")?,
        tag: r.tag("tag")?,
        category: r.uint("category")?,
        trust: r.uint("trust")?,
        beneficiary: r.optional_address("beneficiary")?.unwrap_or(requester),
        callback: r.address("callback")?,
        params: r.params("params")?,
        salt: r.salt("salt")?,
    };
    r.finish()?;
    order.validate()?;
    Ok(order)
}

/// Parses an address the way the hub expects it: `0x` + 40 hex digits, checksum
/// enforced when the input is mixed-case.
pub fn parse_address(s: &str, field: &str) -> Result<Address, SdkError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| SdkError::validation(field, format!("{s} is not a 0x-prefixed address")))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SdkError::validation(field, format!("{s} is not a valid address")));
    }
    let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
        && digits.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case {
        return Address::parse_checksummed(s, None)
            .map_err(|_| SdkError::validation(field, format!("{s} has an invalid checksum")));
    }
    s.parse::<Address>()
        .map_err(|e| SdkError::validation(field, format!("{s} is not a valid address: {e}")))
}

pub fn random_salt() -> B256 {
    let salt: [u8; 32] = rand::thread_rng().gen();
    B256::new(salt)
}

struct FieldReader<'a> {
    fields: &'a OrderFields,
    seen: HashSet<&'static str>,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a OrderFields) -> Self {
        Self {
            fields,
            seen: HashSet::new(),
        }
    }

    fn get(&mut self, name: &'static str) -> Option<&'a Value> {
        self.seen.insert(name);
        self.fields.get(name).filter(|v| !v.is_null())
    }

    fn optional_address(&mut self, name: &'static str) -> Result<Option<Address>, SdkError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => parse_address(s, name).map(Some),
            Some(other) => Err(SdkError::validation(name, format!("{other} is not an address string"))),
        }
    }

    fn address(&mut self, name: &'static str) -> Result<Address, SdkError> {
        Ok(self.optional_address(name)?.unwrap_or(Address::ZERO))
    }

    fn required_address(&mut self, name: &'static str) -> Result<Address, SdkError> {
        self.optional_address(name)?
            .ok_or_else(|| SdkError::validation(name, "is a required field"))
    }

    fn uint(&mut self, name: &'static str) -> Result<u64, SdkError> {
        match self.get(name) {
            None => Ok(0),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| SdkError::validation(name, format!("{n} is not a non-negative integer"))),
            Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| {
                SdkError::validation(name, format!("{s} is not a non-negative integer in range"))
            }),
            Some(other) => Err(SdkError::validation(name, format!("{other} is not an integer"))),
        }
    }

    fn tag(&mut self, name: &'static str) -> Result<B256, SdkError> {
        match self.get(name) {
            None => Ok(NULL_TAG),
            Some(Value::String(s)) if s.starts_with("0x") => parse_bytes32(s, name),
            Some(Value::String(s)) => encode_tag(&s.split(',').collect::<Vec<_>>()),
            Some(Value::Array(items)) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| SdkError::validation(name, format!("{item} is not a tag name")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                encode_tag(&names)
            }
            Some(other) => Err(SdkError::validation(name, format!("{other} is not a tag"))),
        }
    }

    fn salt(&mut self, name: &'static str) -> Result<B256, SdkError> {
        match self.get(name) {
            None => Ok(random_salt()),
            Some(Value::String(s)) => parse_bytes32(s, name),
            Some(other) => Err(SdkError::validation(name, format!("{other} is not a bytes32 string"))),
        }
    }

    fn params(&mut self, name: &'static str) -> Result<String, SdkError> {
        match self.get(name) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(value @ Value::Object(_)) => serde_json::to_string(value)
                .map_err(|e| SdkError::validation(name, e.to_string())),
            Some(other) => Err(SdkError::validation(name, format!("{other} is not a string or object"))),
        }
    }

    fn finish(self) -> Result<(), SdkError> {
        match self.fields.keys().find(|k| !self.seen.contains(k.as_str())) {
            Some(unknown) => Err(SdkError::validation(unknown.as_str(), "unknown field")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> OrderFields {
        value.as_object().cloned().unwrap()
    }

    const APP: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";
    const REQUESTER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    #[test]
    fn apporder_defaults() {
        let order = create_apporder(&fields(json!({ "app": APP }))).unwrap();
        assert_eq!(order.appprice, 0);
        assert_eq!(order.volume, 0);
        assert_eq!(order.tag, NULL_TAG);
        assert_eq!(order.datasetrestrict, Address::ZERO);
        assert_ne!(order.salt, B256::ZERO);
    }

    #[test]
    fn salts_differ_between_builds() {
        let a = create_apporder(&fields(json!({ "app": APP }))).unwrap();
        let b = create_apporder(&fields(json!({ "app": APP }))).unwrap();
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn requestorder_beneficiary_defaults_to_requester() {
        let order = create_requestorder(&fields(json!({
            "app": APP,
            "requester": REQUESTER,
            "volume": 1,
            "category": 0,
            "trust": "1",
            "params": { "iexec_args": "--help" },
        })))
        .unwrap();
        assert_eq!(order.beneficiary, order.requester);
        assert_eq!(order.dataset, Address::ZERO);
        assert_eq!(order.trust, 1);
        assert_eq!(order.params, r#"{"iexec_args":"--help"}"#);
    }

    #[test]
    fn each_bad_field_is_named() {
        let cases = [
            (json!({ "app": APP, "volume": -1 }), "volume"),
            (json!({ "app": APP, "appprice": "1.5" }), "appprice"),
            (json!({ "app": "0x1234" }), "app"),
            (json!({ "app": APP, "tag": ["tee", "sgx"] }), "tag"),
            (json!({ "app": APP, "salt": "0xzz" }), "salt"),
            (json!({ "app": APP, "datasetrestrict": 12 }), "datasetrestrict"),
            (json!({ "app": APP, "color": "blue" }), "color"),
            (json!({ "appprice": 3 }), "app"),
        ];
        for (input, field) in cases {
            let err = create_apporder(&fields(input.clone())).unwrap_err();
            assert_eq!(err.field(), Some(field), "input {input}");
        }
    }

    #[test]
    fn rejects_bad_checksum() {
        let bad = "0x70997970c51812dc3A010C7d01b50e0d17dc79C8";
        assert_eq!(parse_address(bad, "requester").unwrap_err().field(), Some("requester"));
        assert!(parse_address(REQUESTER, "requester").is_ok());
    }

    #[test]
    fn tag_accepts_names_and_hex() {
        let by_name = create_apporder(&fields(json!({ "app": APP, "tag": "tee,scone" }))).unwrap();
        let by_hex = create_apporder(&fields(json!({
            "app": APP,
            "tag": "0x0000000000000000000000000000000000000000000000000000000000000003",
        })))
        .unwrap();
        assert_eq!(by_name.tag, by_hex.tag);
    }

    #[test]
    fn build_order_dispatches_on_kind() {
        let order = build_order(
            OrderKind::Workerpool,
            &fields(json!({ "workerpool": APP, "category": 2, "volume": 10 })),
        )
        .unwrap();
        assert_eq!(order.kind(), OrderKind::Workerpool);
    }
}
