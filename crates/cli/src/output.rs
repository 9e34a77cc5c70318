use std::fmt::Display;

use iexec_core::SdkError;
use serde::Serialize;
use serde_json::{json, Value};

/// Prints `value` as `{"ok": true, ...}` in raw mode, `text` otherwise.
pub fn emit<T: Serialize>(raw: bool, value: &T, text: impl Display) -> anyhow::Result<()> {
    if raw {
        println!("{}", serde_json::to_string(&raw_success(value)?)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

fn raw_success<T: Serialize>(value: &T) -> serde_json::Result<Value> {
    let mut out = json!({ "ok": true });
    match serde_json::to_value(value)? {
        Value::Object(fields) => {
            if let Value::Object(out) = &mut out {
                out.extend(fields);
            }
        }
        Value::Null => {}
        other => out["result"] = other,
    }
    Ok(out)
}

pub fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

pub fn raw_error(err: &anyhow::Error) -> Value {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SdkError>())
        .map(|sdk| format!("{:?}", sdk.kind()));
    json!({
        "ok": false,
        "error": {
            "kind": kind,
            "message": format!("{err:#}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_output_merges_objects() {
        let value = raw_success(&json!({ "dealid": "0x01", "volume": 2 })).unwrap();
        assert_eq!(value, json!({ "ok": true, "dealid": "0x01", "volume": 2 }));
        assert_eq!(raw_success(&5u64).unwrap(), json!({ "ok": true, "result": 5 }));
    }

    #[test]
    fn raw_error_reports_sdk_kind() {
        let err = anyhow::Error::new(SdkError::signer_required());
        let value = raw_error(&err);
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["error"]["kind"], json!("Signature"));
    }
}
