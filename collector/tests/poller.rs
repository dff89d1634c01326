/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod common;

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;

use common::{filter, leave_set, set, update_set, vm, Call, FakeCollector};
use vim_collector::{
    with_watch, ChangeOp, Cursor, Error, ManagedObjectHandle,
    ObjectUpdateKind, Poll, PropertyCollector, State, Value, Watch, WatchSpec,
};

fn collector(fake: &Arc<FakeCollector>) -> Arc<dyn PropertyCollector> {
    fake.clone()
}

#[tokio::test]
async fn changes_since_initial_cursor() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    fake.push_update(update_set("v1", &filter(1), vec![set(&vm1, "a", "5")]));
    fake.push_no_update();
    fake.push_update(update_set("v2", &filter(1), vec![set(&vm1, "b", "true")]));

    let mut watch = Watch::create(
        collector(&fake),
        WatchSpec::new().object(vm1.clone(), ["a", "b"]),
    )
    .await
    .unwrap();
    assert_eq!(watch.filter(), &filter(1));
    assert!(watch.cursor().is_initial());

    let first = match watch.poll(&Cursor::initial(), Some(10)).await.unwrap() {
        Poll::Update(update) => update,
        Poll::NoUpdate => panic!("expected an update"),
    };
    assert_eq!(first.cursor, Cursor::new("v1"));
    assert_eq!(first.changes, vec![set(&vm1, "a", "5")]);
    assert_eq!(watch.state(), State::Idle);

    assert_eq!(
        watch.poll(&Cursor::new("v1"), Some(10)).await.unwrap(),
        Poll::NoUpdate
    );
    assert_eq!(watch.cursor(), &Cursor::new("v1"));

    let (_term_tx, mut term) = watch::channel(false);
    let second = watch.next_update(Some(10), &mut term).await.unwrap();
    assert_eq!(second.cursor, Cursor::new("v2"));
    assert_eq!(second.changes.len(), 1);
    assert_eq!(second.changes[0].op, ChangeOp::Set(Value::from("true")));

    watch.destroy().await.unwrap();
    assert_eq!(
        fake.calls(),
        vec![
            Call::CreateFilter(watch.spec().clone()),
            Call::WaitForUpdates(Cursor::initial()),
            Call::WaitForUpdates(Cursor::new("v1")),
            Call::WaitForUpdates(Cursor::new("v1")),
            Call::DestroyFilter(filter(1)),
        ]
    );
    assert!(fake.live_filters().is_empty());
}

#[tokio::test]
async fn unwatched_changes_are_dropped() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    fake.push_update(update_set(
        "1",
        &filter(1),
        vec![
            set(&vm1, "a", 1i64),
            set(&vm1, "c", 2i64),
            set(&vm("vm-2"), "a", 3i64),
        ],
    ));

    let mut watch = Watch::create(
        collector(&fake),
        WatchSpec::new().object(vm1.clone(), ["a", "b"]),
    )
    .await
    .unwrap();
    match watch.poll(&Cursor::initial(), None).await.unwrap() {
        Poll::Update(update) => {
            assert_eq!(update.changes, vec![set(&vm1, "a", 1i64)])
        }
        Poll::NoUpdate => panic!("expected an update"),
    }
    watch.destroy().await.unwrap();
}

#[tokio::test]
async fn foreign_filters_are_skipped() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    let mut update = update_set("7", &filter(1), vec![set(&vm1, "a", 1i64)]);
    update
        .filters
        .extend(update_set("7", &filter(9), vec![set(&vm1, "a", 2i64)]).filters);
    fake.push_update(update);

    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm1.clone(), ["a"]))
            .await
            .unwrap();
    match watch.poll(&Cursor::initial(), None).await.unwrap() {
        Poll::Update(update) => {
            assert_eq!(update.cursor, Cursor::new("7"));
            assert_eq!(update.changes, vec![set(&vm1, "a", 1i64)]);
        }
        Poll::NoUpdate => panic!("expected an update"),
    }
    watch.destroy().await.unwrap();
}

fn folder() -> ManagedObjectHandle {
    ManagedObjectHandle::new("Folder", "group-d1")
}

#[tokio::test]
async fn container_watch_reports_entering_objects() {
    let fake = FakeCollector::new();
    let vm7 = vm("vm-7");
    let mut entered = set(&vm7, "name", "web07");
    entered.kind = ObjectUpdateKind::Enter;
    fake.push_update(update_set(
        "1",
        &filter(1),
        vec![
            entered.clone(),
            set(&ManagedObjectHandle::new("HostSystem", "host-9"), "name", "esx01"),
        ],
    ));

    let spec = WatchSpec::new().container(folder(), "VirtualMachine", ["name"]);
    let mut watch = Watch::create(collector(&fake), spec.clone()).await.unwrap();
    match watch.poll(&Cursor::initial(), Some(10)).await.unwrap() {
        Poll::Update(update) => {
            assert_eq!(update.changes, vec![entered]);
            assert!(update.left.is_empty());
        }
        Poll::NoUpdate => panic!("expected an update"),
    }
    watch.destroy().await.unwrap();
    assert_eq!(fake.calls()[0], Call::CreateFilter(spec));
}

#[tokio::test]
async fn objects_leaving_the_container() {
    let fake = FakeCollector::new();
    fake.push_update(leave_set(
        "4",
        &filter(1),
        vec![vm("vm-17"), ManagedObjectHandle::new("HostSystem", "host-9")],
    ));

    let mut watch = Watch::create(
        collector(&fake),
        WatchSpec::new().container(folder(), "VirtualMachine", ["name"]),
    )
    .await
    .unwrap();
    match watch.poll(&Cursor::initial(), None).await.unwrap() {
        Poll::Update(update) => {
            assert_eq!(update.cursor, Cursor::new("4"));
            assert!(update.changes.is_empty());
            assert_eq!(update.left, vec![vm("vm-17")]);
        }
        Poll::NoUpdate => panic!("expected an update"),
    }
    watch.destroy().await.unwrap();
}

#[tokio::test]
async fn truncated_update_is_passed_through() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    let mut update = update_set("2", &filter(1), vec![set(&vm1, "a", 1i64)]);
    update.truncated = true;
    fake.push_update(update);
    fake.push_update(update_set("3", &filter(1), vec![set(&vm1, "a", 2i64)]));

    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm1.clone(), ["a"]))
            .await
            .unwrap();
    let (_term_tx, mut term) = watch::channel(false);
    let first = watch.next_update(None, &mut term).await.unwrap();
    assert!(first.truncated);
    assert_eq!(first.cursor, Cursor::new("2"));

    let second = watch.next_update(None, &mut term).await.unwrap();
    assert!(!second.truncated);
    assert_eq!(second.changes, vec![set(&vm1, "a", 2i64)]);
    watch.destroy().await.unwrap();
}

#[tokio::test]
async fn poll_after_destroy() {
    let fake = FakeCollector::new();
    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm("vm-1"), ["a"]))
            .await
            .unwrap();
    watch.destroy().await.unwrap();
    assert_eq!(watch.state(), State::Destroyed);

    assert!(matches!(
        watch.poll(&Cursor::initial(), None).await,
        Err(Error::FilterNotFound(f)) if f == filter(1)
    ));
    assert_eq!(
        fake.count(|call| matches!(call, Call::WaitForUpdates(_))),
        0
    );
}

#[tokio::test]
async fn destroy_twice() {
    let fake = FakeCollector::new();
    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm("vm-1"), ["a"]))
            .await
            .unwrap();
    watch.destroy().await.unwrap();
    watch.destroy().await.unwrap();
    assert_eq!(
        fake.count(|call| matches!(call, Call::DestroyFilter(_))),
        1
    );
}

#[tokio::test]
async fn stale_cursor() {
    let fake = FakeCollector::new();
    let vm1 = vm("vm-1");
    fake.push_update(update_set("1", &filter(1), vec![set(&vm1, "a", 1i64)]));

    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm1, ["a"]))
            .await
            .unwrap();
    watch.poll(&Cursor::initial(), None).await.unwrap();

    assert!(matches!(
        watch.poll(&Cursor::initial(), None).await,
        Err(Error::StaleCursor(c)) if c.is_initial()
    ));
    assert_eq!(
        fake.count(|call| matches!(call, Call::WaitForUpdates(_))),
        1
    );
    watch.destroy().await.unwrap();
}

#[tokio::test]
async fn cancelled_before_poll() {
    let fake = FakeCollector::new();
    fake.push_no_update();

    let mut watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm("vm-1"), ["a"]))
            .await
            .unwrap();
    let (term_tx, mut term) = watch::channel(false);
    term_tx.send(true).unwrap();

    assert!(matches!(
        watch.next_update(Some(1), &mut term).await,
        Err(Error::Cancelled)
    ));
    assert_eq!(
        fake.count(|call| matches!(call, Call::WaitForUpdates(_))),
        0
    );
    watch.destroy().await.unwrap();
}

#[tokio::test]
async fn with_watch_destroys_on_error() {
    let fake = FakeCollector::new();
    let result: vim_collector::Result<()> = with_watch(
        collector(&fake),
        WatchSpec::new().object(vm("vm-1"), ["a"]),
        |_watch| async { Err(Error::Cancelled) }.boxed(),
    )
    .await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(fake.live_filters().is_empty());
    assert_eq!(
        fake.count(|call| matches!(call, Call::DestroyFilter(_))),
        1
    );
}

#[tokio::test]
async fn with_watch_destroys_on_fault() {
    let fake = FakeCollector::new();
    fake.push_fault("NotAuthenticated");

    let result = with_watch(
        collector(&fake),
        WatchSpec::new().object(vm("vm-1"), ["a"]),
        |watch| {
            async move {
                let cursor = watch.cursor().clone();
                watch.poll(&cursor, Some(5)).await
            }
            .boxed()
        },
    )
    .await;
    match result {
        Err(Error::Fault(fault)) => assert!(fault.is("NotAuthenticated")),
        r => panic!("expected a fault, got {:?}", r),
    }
    assert!(fake.live_filters().is_empty());
}

#[tokio::test]
async fn dropped_watch_is_destroyed() {
    let fake = FakeCollector::new();
    let watch =
        Watch::create(collector(&fake), WatchSpec::new().object(vm("vm-1"), ["a"]))
            .await
            .unwrap();
    drop(watch);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(fake.live_filters().is_empty());
}
