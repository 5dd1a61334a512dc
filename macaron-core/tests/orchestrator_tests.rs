mod mock_implementations;

use macaron_core::executor::mock::MockStep;
use macaron_core::{
    EngineConfig, ErrorKind, InterfaceStatus, MacaronError, MockCommandExecutor,
};
use mock_implementations::{
    engine_with, eth0, mac, scenario_host, wlan0, GatedExecutor, ETH0_ADDRESS, WLAN0_ADDRESS,
};
use std::sync::Arc;

#[tokio::test]
async fn test_discovery_excludes_virtual_devices() {
    let engine = engine_with(Arc::new(scenario_host()), EngineConfig::default()).await;

    let names: Vec<_> = engine.interfaces().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["eth0".to_string(), "wlan0".to_string()]);
}

#[tokio::test]
async fn test_apply_many_scenario() {
    let engine = engine_with(Arc::new(scenario_host()), EngineConfig::default()).await;

    let outcomes = engine.apply_many(&["eth0", "wlan0"]).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));

    for (name, before) in [("eth0", ETH0_ADDRESS), ("wlan0", WLAN0_ADDRESS)] {
        let record = engine.interface(name).unwrap();
        let current = record.current_address.unwrap();
        assert_eq!(record.original_address, Some(mac(before)));
        assert!(current.is_locally_administered());
        assert!(!current.is_multicast());
        assert_ne!(current, mac(before));
        assert_eq!(record.status, InterfaceStatus::Applied);
    }

    let restored = engine.restore_one("eth0").await.unwrap();
    assert_eq!(restored.to_string(), "00:11:22:33:44:55");
    assert_eq!(
        engine.interface("eth0").unwrap().current_address,
        Some(mac(ETH0_ADDRESS))
    );
}

#[tokio::test]
async fn test_restore_ppp0_is_state_error() {
    let engine = engine_with(Arc::new(scenario_host()), EngineConfig::default()).await;

    let err = engine.restore_one("ppp0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(engine.interface("ppp0").is_none());
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let engine = engine_with(Arc::new(scenario_host()), EngineConfig::default()).await;

    engine.apply_one("wlan0").await.unwrap();
    let first = engine.restore_one("wlan0").await.unwrap();
    let second = engine.restore_one("wlan0").await.unwrap();

    assert_eq!(first, second);
    let record = engine.interface("wlan0").unwrap();
    assert_eq!(record.original_address, Some(mac(WLAN0_ADDRESS)));
    assert_eq!(record.current_address, Some(mac(WLAN0_ADDRESS)));
}

#[tokio::test]
async fn test_original_survives_refresh_after_apply() {
    let mock = Arc::new(scenario_host());
    let engine = engine_with(mock.clone(), EngineConfig::default()).await;

    let applied = engine.apply_one("eth0").await.unwrap();
    engine.refresh().await.unwrap();

    let record = engine.interface("eth0").unwrap();
    assert_eq!(record.current_address, Some(applied));
    assert_eq!(record.original_address, Some(mac(ETH0_ADDRESS)));
    assert_eq!(mock.address_of("eth0"), Some(applied));
}

#[tokio::test]
async fn test_concurrent_apply_single_winner() {
    let gated = Arc::new(GatedExecutor::new(
        MockCommandExecutor::new().with_interface(eth0()),
    ));
    let engine = Arc::new(engine_with(gated.clone(), EngineConfig::default()).await);

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.apply_one("eth0").await })
    };
    gated.wait_until_parked().await;

    assert_eq!(
        engine.interface("eth0").unwrap().status,
        InterfaceStatus::Applying
    );
    let second = engine.apply_one("eth0").await.unwrap_err();
    assert_eq!(second, MacaronError::OperationInProgress("eth0".into()));
    assert_eq!(second.kind(), ErrorKind::Concurrency);

    // A restore collides the same way
    let restore = engine.restore_one("eth0").await.unwrap_err();
    assert_eq!(restore.kind(), ErrorKind::Concurrency);

    gated.open(1);
    let applied = first.await.unwrap().unwrap();
    assert_eq!(engine.interface("eth0").unwrap().current_address, Some(applied));

    // One down/set/up sequence in total
    assert_eq!(gated.calls_for("eth0").len(), 3);
}

#[tokio::test]
async fn test_joined_applies_one_conflict() {
    let gated = Arc::new(GatedExecutor::new(
        MockCommandExecutor::new().with_interface(eth0()),
    ));
    let engine = engine_with(gated.clone(), EngineConfig::default()).await;
    gated.open(2);

    let (a, b) = tokio::join!(engine.apply_one("eth0"), engine.apply_one("eth0"));
    let conflicts = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(MacaronError::OperationInProgress(_))))
        .count();
    assert_eq!(conflicts, 1);
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_other_interfaces_not_blocked() {
    let gated = Arc::new(GatedExecutor::new(
        MockCommandExecutor::new()
            .with_interface(eth0())
            .with_interface(wlan0()),
    ));
    let engine = Arc::new(engine_with(gated.clone(), EngineConfig::default()).await);

    let held = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.apply_one("eth0").await })
    };
    gated.wait_until_parked().await;

    // wlan0 reaches its own address write while eth0 is still parked
    let other = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.apply_one("wlan0").await })
    };
    gated.wait_until_parked().await;
    assert!(engine.orchestrator().locks().is_locked("eth0"));
    assert!(engine.orchestrator().locks().is_locked("wlan0"));

    gated.open(2);
    assert!(held.await.unwrap().is_ok());
    assert!(other.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_dropped_caller_does_not_abort_sequence() {
    let gated = Arc::new(GatedExecutor::new(
        MockCommandExecutor::new().with_interface(eth0()),
    ));
    let engine = Arc::new(engine_with(gated.clone(), EngineConfig::default()).await);

    let caller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.apply_one("eth0").await })
    };
    gated.wait_until_parked().await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    gated.open(1);
    // The detached sequence still brings the link back up and records the result
    for _ in 0..100 {
        if engine.interface("eth0").unwrap().status == InterfaceStatus::Applied {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(
        engine.interface("eth0").unwrap().status,
        InterfaceStatus::Applied
    );
    assert_eq!(gated.inner.is_link_up("eth0"), Some(true));
    assert!(!engine.orchestrator().locks().is_locked("eth0"));
}

#[tokio::test]
async fn test_bulk_failure_does_not_abort_others() {
    let mock = Arc::new(
        scenario_host().failing_on("wlan0", MockStep::LinkDown, "Operation not permitted"),
    );
    let engine = engine_with(mock.clone(), EngineConfig::default()).await;

    let outcomes = engine.randomize_eligible().await;
    assert_eq!(outcomes.len(), 2);
    let eth = outcomes.iter().find(|o| o.interface == "eth0").unwrap();
    let wlan = outcomes.iter().find(|o| o.interface == "wlan0").unwrap();
    assert!(eth.is_success());
    let err = wlan.result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.to_string().contains("Operation not permitted"));

    let record = engine.interface("wlan0").unwrap();
    assert_eq!(record.status, InterfaceStatus::Failed);
    assert_eq!(record.current_address, Some(mac(WLAN0_ADDRESS)));
}
