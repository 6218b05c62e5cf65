//! 内存资料服务测试

use skipper::error::SkipperError;
use skipper::service::{Address, InmemService, Profile, ProfileService};
use tokio_test::{assert_err, assert_ok};

fn alice() -> Profile {
    Profile::new("1", "alice").with_address(Address::new("home", "Berlin"))
}

#[tokio::test]
async fn post_then_get_returns_same_profile() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(alice()).await);

    let got = svc.get_profile("1").await.unwrap();
    assert_eq!(got, alice());
    assert_eq!(svc.len().await, 1);
}

#[tokio::test]
async fn post_duplicate_is_rejected() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(alice()).await);

    let err = svc.post_profile(Profile::new("1", "bob")).await.unwrap_err();
    assert_eq!(err, SkipperError::AlreadyExists);
    assert_eq!(svc.get_profile("1").await.unwrap().name, "alice");
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let svc = InmemService::new();
    assert_eq!(svc.get_profile("nope").await.unwrap_err(), SkipperError::NotFound);
}

#[tokio::test]
async fn put_requires_matching_ids_and_upserts() {
    let svc = InmemService::new();

    let err = svc.put_profile("2", alice()).await.unwrap_err();
    assert_eq!(err, SkipperError::InconsistentIds);

    assert_ok!(svc.put_profile("1", alice()).await);
    assert_ok!(svc.put_profile("1", Profile::new("1", "alice v2")).await);

    let got = svc.get_profile("1").await.unwrap();
    assert_eq!(got.name, "alice v2");
    assert!(got.addresses.is_empty());
}

#[tokio::test]
async fn patch_only_overwrites_non_empty_fields() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(alice()).await);

    // 空 ID 视为与路径一致
    assert_ok!(svc.patch_profile("1", Profile::new("", "alicia")).await);
    let got = svc.get_profile("1").await.unwrap();
    assert_eq!(got.name, "alicia");
    assert_eq!(got.addresses, vec![Address::new("home", "Berlin")]);

    let moved = Profile::new("1", "").with_address(Address::new("work", "Paris"));
    assert_ok!(svc.patch_profile("1", moved).await);
    let got = svc.get_profile("1").await.unwrap();
    assert_eq!(got.name, "alicia");
    assert_eq!(got.addresses, vec![Address::new("work", "Paris")]);
}

#[tokio::test]
async fn patch_errors() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(alice()).await);

    assert_eq!(
        svc.patch_profile("1", Profile::new("9", "x")).await.unwrap_err(),
        SkipperError::InconsistentIds
    );
    assert_eq!(
        svc.patch_profile("9", Profile::new("", "x")).await.unwrap_err(),
        SkipperError::NotFound
    );
}

#[tokio::test]
async fn delete_profile_removes_it_once() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(alice()).await);

    assert_ok!(svc.delete_profile("1").await);
    assert!(svc.is_empty().await);
    assert_eq!(svc.delete_profile("1").await.unwrap_err(), SkipperError::NotFound);
}

#[tokio::test]
async fn address_lifecycle() {
    let svc = InmemService::new();
    assert_ok!(svc.post_profile(Profile::new("1", "alice")).await);

    assert!(svc.get_addresses("1").await.unwrap().is_empty());

    assert_ok!(svc.post_address("1", Address::new("home", "Berlin")).await);
    assert_ok!(svc.post_address("1", Address::new("work", "Paris")).await);
    assert_eq!(
        svc.post_address("1", Address::new("home", "Rome")).await.unwrap_err(),
        SkipperError::AlreadyExists
    );

    let addresses = svc.get_addresses("1").await.unwrap();
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0].location, "Berlin");

    assert_eq!(
        svc.get_address("1", "work").await.unwrap(),
        Address::new("work", "Paris")
    );

    assert_ok!(svc.delete_address("1", "home").await);
    assert_eq!(svc.get_address("1", "home").await.unwrap_err(), SkipperError::NotFound);
    assert_eq!(svc.delete_address("1", "home").await.unwrap_err(), SkipperError::NotFound);
}

#[tokio::test]
async fn address_operations_on_missing_profile() {
    let svc = InmemService::new();

    assert_err!(svc.get_addresses("x").await);
    assert_eq!(svc.get_address("x", "home").await.unwrap_err(), SkipperError::NotFound);
    assert_eq!(
        svc.post_address("x", Address::new("home", "Berlin")).await.unwrap_err(),
        SkipperError::NotFound
    );
    assert_eq!(svc.delete_address("x", "home").await.unwrap_err(), SkipperError::NotFound);
}

#[test]
fn profile_json_omits_empty_fields() {
    let json = serde_json::to_value(Profile::new("1", "")).unwrap();
    assert_eq!(json, serde_json::json!({"id": "1"}));

    let decoded: Profile = serde_json::from_str(r#"{"id":"2"}"#).unwrap();
    assert_eq!(decoded, Profile::new("2", ""));
}
