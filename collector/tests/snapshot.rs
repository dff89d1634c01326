/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod common;

use common::{object, page, vm, Call, FakeCollector};
use vim_collector::{
    snapshot, ContinuationToken, Error, ManagedObjectHandle, RetrieveOptions,
    Value, WatchSpec,
};

fn all_vms() -> WatchSpec {
    WatchSpec::new().container(
        ManagedObjectHandle::new("Folder", "group-d1"),
        "VirtualMachine",
        ["name", "runtime.powerState"],
    )
}

#[tokio::test]
async fn follows_continuation_tokens() {
    let fake = FakeCollector::new();
    fake.push_page(page(vec![object(&vm("vm-1"), vec![("name", Value::from("a"))])], Some("t1")));
    fake.push_page(page(vec![object(&vm("vm-2"), vec![("name", Value::from("b"))])], Some("t2")));
    fake.push_page(page(vec![object(&vm("vm-3"), vec![("name", Value::from("c"))])], None));

    let snapshot = snapshot::fetch(&*fake, &all_vms(), &RetrieveOptions::default())
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(
        fake.calls(),
        vec![
            Call::Retrieve(all_vms()),
            Call::Continue(ContinuationToken::new("t1")),
            Call::Continue(ContinuationToken::new("t2")),
        ]
    );
}

#[tokio::test]
async fn merges_objects_across_pages() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    fake.push_page(page(vec![object(&vm1, vec![("name", Value::from("web01"))])], Some("t1")));
    fake.push_page(page(vec![object(&vm("vm-2"), vec![("name", Value::from("db01"))])], Some("t2")));
    fake.push_page(page(
        vec![object(&vm1, vec![("runtime.powerState", Value::from("poweredOn"))])],
        Some("t3"),
    ));
    fake.push_page(page(vec![], None));

    let snapshot = snapshot::fetch(
        &*fake,
        &all_vms(),
        &RetrieveOptions {
            max_objects: Some(1),
        },
    )
    .await
    .unwrap();
    assert_eq!(fake.calls().len(), 4);
    assert_eq!(snapshot.len(), 2);
    let web01 = &snapshot[&vm1];
    assert_eq!(web01.get("name"), Some(&Value::from("web01")));
    assert_eq!(web01.get("runtime.powerState"), Some(&Value::from("poweredOn")));
}

#[tokio::test]
async fn fault_aborts_fetch() {
    let fake = FakeCollector::new();
    fake.push_page(page(vec![object(&vm("vm-1"), vec![("name", Value::from("a"))])], Some("t1")));
    fake.push_page_fault("InvalidCollectorVersion");

    match snapshot::fetch(&*fake, &all_vms(), &RetrieveOptions::default()).await {
        Err(Error::Fault(fault)) => assert!(fault.is("InvalidCollectorVersion")),
        r => panic!("expected a fault, got {:?}", r),
    }
}

#[tokio::test]
async fn empty_token_ends_fetch() {
    let fake = FakeCollector::new();
    fake.push_page(page(vec![object(&vm("vm-1"), vec![("name", Value::from("a"))])], Some("")));

    let snapshot = snapshot::fetch(&*fake, &all_vms(), &RetrieveOptions::default())
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn fetch_single_object() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    fake.push_page(page(vec![object(&vm1, vec![("name", Value::from("web01"))])], None));

    let props = snapshot::fetch_one(&*fake, &vm1, &["name"]).await.unwrap();
    assert_eq!(props.get("name"), Some(&Value::from("web01")));
    assert_eq!(
        fake.calls(),
        vec![Call::Retrieve(WatchSpec::new().object(vm1, ["name"]))]
    );
}
