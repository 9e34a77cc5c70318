use alloy::primitives::{Address, Bytes};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use iexec_core::builder::{create_apporder, create_requestorder};
use iexec_core::typed::domain;
use iexec_core::{AppOrder, DatasetOrder, Order, SignedOrder};
use serde_json::json;

const ANVIL_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const HUB: &str = "0x3eca1B216A7DF1C7689aEb259fFB83ADFB894E7f";

fn app_order() -> AppOrder {
    create_apporder(
        json!({
            "app": "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1",
            "appprice": 5,
            "volume": 3,
            "salt": "0x0000000000000000000000000000000000000000000000000000000000000001",
        })
        .as_object()
        .unwrap(),
    )
    .unwrap()
}

#[test]
fn order_hash_is_stable_for_identical_fields() {
    let d = domain(134, HUB.parse().unwrap());
    let order = app_order();
    assert_eq!(order.order_hash(&d), order.clone().order_hash(&d));
    assert_eq!(order.order_hash(&d), app_order().order_hash(&d));
}

#[test]
fn order_hash_changes_with_any_single_field() {
    let d = domain(134, HUB.parse().unwrap());
    let base = app_order();
    let base_hash = base.order_hash(&d);

    let variants: Vec<AppOrder> = vec![
        AppOrder { appprice: 6, ..base.clone() },
        AppOrder { volume: 4, ..base.clone() },
        AppOrder { tag: iexec_core::tag::encode_tag(&["tee"]).unwrap(), ..base.clone() },
        AppOrder { datasetrestrict: Address::repeat_byte(1), ..base.clone() },
        AppOrder { workerpoolrestrict: Address::repeat_byte(2), ..base.clone() },
        AppOrder { requesterrestrict: Address::repeat_byte(3), ..base.clone() },
        AppOrder { app: Address::repeat_byte(4), ..base.clone() },
        AppOrder { salt: alloy::primitives::B256::repeat_byte(9), ..base.clone() },
    ];
    for variant in variants {
        assert_ne!(variant.order_hash(&d), base_hash, "{variant:?}");
    }
}

#[test]
fn order_hash_depends_on_domain() {
    let order = app_order();
    let hub: Address = HUB.parse().unwrap();
    assert_ne!(order.order_hash(&domain(134, hub)), order.order_hash(&domain(1, hub)));
}

#[tokio::test]
async fn signature_binds_the_exact_field_set() {
    let signer: PrivateKeySigner = ANVIL_KEY_0.parse().unwrap();
    let d = domain(134, HUB.parse().unwrap());
    let order = app_order();

    let hash = order.order_hash(&d);
    let signature = signer.sign_hash(&hash.0).await.unwrap();
    let signed = SignedOrder {
        order: order.clone(),
        sign: Bytes::from(signature.as_bytes().to_vec()),
    };
    signed.verify(&d, signer.address()).unwrap();

    let tampered = SignedOrder {
        order: AppOrder { volume: 100, ..order },
        sign: signed.sign.clone(),
    };
    assert!(tampered.verify(&d, signer.address()).is_err());
}

#[test]
fn signed_order_json_is_flat() {
    let signed = SignedOrder {
        order: app_order(),
        sign: Bytes::from(vec![0xaa; 65]),
    };
    let value = serde_json::to_value(&signed).unwrap();
    assert_eq!(value["appprice"], 5);
    assert!(value["sign"].as_str().unwrap().starts_with("0xaa"));

    let back: SignedOrder<AppOrder> = serde_json::from_value(value).unwrap();
    assert_eq!(back, signed);
}

#[test]
fn null_dataset_order_is_unsigned_sentinel() {
    let null = SignedOrder::<DatasetOrder>::null();
    assert!(null.order.is_null());
    assert!(!null.is_signed());
}

#[test]
fn request_order_example_builds() {
    let order = create_requestorder(
        json!({
            "app": "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1",
            "requester": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            "volume": 1,
            "category": 0,
            "trust": 1,
        })
        .as_object()
        .unwrap(),
    )
    .unwrap();
    assert_eq!((order.volume, order.category, order.trust), (1, 0, 1));
    order.validate().unwrap();
}
