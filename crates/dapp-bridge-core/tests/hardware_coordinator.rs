mod common;

use std::time::Duration;

use tokio::time::Instant;

use dapp_bridge_core::{
    create_hardware_wallet, AssetFamily, BridgeError, DerivationStandard, HardwareCoordinator,
    HardwareErrorKind, HardwareOptions, HardwareSession, HardwareState, HardwareWalletRequest,
    WalletAddressPlan, WalletAsset,
};

use common::{FakeSigner, MemoryPersistence, DISCONNECTED, WRONG_APP};

fn two_app_plan() -> WalletAddressPlan {
    WalletAddressPlan {
        primary: AssetFamily::tendermint("cro"),
        secondary: Some(AssetFamily::Evm),
        index: 0,
        standard: DerivationStandard::Bip44,
    }
}

#[tokio::test(start_paused = true)]
async fn secondary_wait_times_out_after_poll_budget() {
    let signer = FakeSigner::hardware().fail_eth_always(WRONG_APP);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    let started = Instant::now();
    let err = coordinator
        .collect_wallet_addresses(&mut session, &two_app_plan())
        .await
        .expect_err("must time out");

    assert_eq!(err, BridgeError::Hardware(HardwareErrorKind::DeviceTimeout));
    assert_eq!(signer.eth_calls(), 600);
    assert_eq!(session.attempts_used(), 600);
    assert!(started.elapsed() <= Duration::from_secs(60));
    assert_eq!(
        session.state(),
        HardwareState::Error(HardwareErrorKind::DeviceTimeout)
    );
    assert!(session.primary().is_some(), "primary result is kept");
}

#[tokio::test(start_paused = true)]
async fn secondary_address_is_collected_once_app_opens() {
    let signer = FakeSigner::hardware().fail_eth_times(WRONG_APP, 3);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    let addresses = coordinator
        .collect_wallet_addresses(&mut session, &two_app_plan())
        .await
        .expect("collect");

    assert_eq!(addresses.primary.address, "cro1fakeaddress0");
    assert_eq!(addresses.primary.derivation_path, "m/44'/394'/0'/0/0");
    let secondary = addresses.secondary.expect("secondary");
    assert_eq!(secondary.derivation_path, "m/44'/60'/0'/0/0");
    assert_eq!(session.attempts_used(), 4);
    assert_eq!(session.state(), HardwareState::Done);
}

#[tokio::test(start_paused = true)]
async fn disconnect_ends_the_wait_immediately() {
    let signer = FakeSigner::hardware()
        .fail_eth_times(WRONG_APP, 2)
        .then_fail_eth(DISCONNECTED);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    let err = coordinator
        .collect_wallet_addresses(&mut session, &two_app_plan())
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        BridgeError::Hardware(HardwareErrorKind::DeviceUnreachable)
    );
    assert_eq!(signer.eth_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn secondary_is_not_requested_until_primary_succeeds() {
    let signer = FakeSigner::hardware().fail_tendermint(WRONG_APP);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    let err = coordinator
        .collect_wallet_addresses(&mut session, &two_app_plan())
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        BridgeError::Hardware(HardwareErrorKind::DeviceConditionsNotMet)
    );
    assert_eq!(signer.eth_calls(), 0);
    assert!(session.primary().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_secondary_wait_keeps_the_primary_result() {
    let signer = FakeSigner::hardware().fail_eth_always(WRONG_APP);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();
    let handle = session.handle();
    let plan = two_app_plan();

    let (result, ()) = tokio::join!(
        coordinator.collect_wallet_addresses(&mut session, &plan),
        async {
            tokio::time::sleep(Duration::from_millis(350)).await;
            handle.cancel();
        }
    );

    assert_eq!(
        result.expect_err("cancelled"),
        BridgeError::Hardware(HardwareErrorKind::Cancelled)
    );
    assert_eq!(
        session.state(),
        HardwareState::Error(HardwareErrorKind::Cancelled)
    );
    assert_eq!(
        session.primary().expect("primary kept").address,
        "cro1fakeaddress0"
    );
    assert!(session.attempts_used() < 10);
    assert_eq!(signer.eth_calls() as u32, session.attempts_used());

    session.reset();
    assert_eq!(session.state(), HardwareState::Idle);
    assert!(session.primary().is_none());
}

#[tokio::test]
async fn ensure_app_classifies_wrong_app_as_conditions_not_met() {
    let signer = FakeSigner::hardware().fail_eth_always("Ledger device: wrong app open");
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    let err = coordinator
        .ensure_app(&mut session, &AssetFamily::Evm, 0, DerivationStandard::Bip44)
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        BridgeError::Hardware(HardwareErrorKind::DeviceConditionsNotMet)
    );
    assert_ne!(
        err,
        BridgeError::Hardware(HardwareErrorKind::DeviceUnreachable)
    );
    assert_eq!(signer.eth_calls(), 1, "no polling on a single-app check");
}

#[tokio::test]
async fn ensure_app_probes_tendermint_through_public_key() {
    let signer = FakeSigner::hardware();
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let mut session = HardwareSession::new();

    coordinator
        .ensure_app(
            &mut session,
            &AssetFamily::tendermint("cro"),
            0,
            DerivationStandard::Bip44,
        )
        .await
        .expect("app open");
    assert_eq!(session.state(), HardwareState::Done);
    assert_eq!(signer.tendermint_calls(), 1);
}

#[tokio::test]
async fn list_addresses_reports_paths_per_index() {
    let signer = FakeSigner::hardware();
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);

    let listed = coordinator
        .list_addresses(&AssetFamily::Evm, 5, 3, DerivationStandard::LedgerLive)
        .await
        .expect("list");
    let indexes: Vec<u32> = listed.iter().map(|a| a.index).collect();
    assert_eq!(indexes, vec![5, 6, 7]);
    assert_eq!(listed[2].derivation_path, "m/44'/60'/7'/0/0");
}

#[tokio::test(start_paused = true)]
async fn wallet_creation_saves_both_families() {
    let signer = FakeSigner::hardware().fail_eth_times(WRONG_APP, 2);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let persistence = MemoryPersistence::default();
    let mut session = HardwareSession::new();
    let request = HardwareWalletRequest {
        wallet_id: "wallet-1".to_owned(),
        plan: two_app_plan(),
    };

    let created = create_hardware_wallet(&coordinator, &persistence, &mut session, &request)
        .await
        .expect("create");

    assert!(created.complete);
    assert_eq!(created.assets.len(), 2);
    assert_eq!(persistence.saved(), created.assets);
    assert_eq!(session.state(), HardwareState::Idle);
}

#[tokio::test(start_paused = true)]
async fn wallet_creation_cancelled_on_secondary_saves_primary_only() {
    let signer = FakeSigner::hardware().fail_eth_always(WRONG_APP);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let persistence = MemoryPersistence::default();
    let mut session = HardwareSession::new();
    let handle = session.handle();
    let request = HardwareWalletRequest {
        wallet_id: "wallet-2".to_owned(),
        plan: two_app_plan(),
    };

    let (created, ()) = tokio::join!(
        create_hardware_wallet(&coordinator, &persistence, &mut session, &request),
        async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.cancel();
        }
    );

    let created = created.expect("partial wallet");
    assert!(!created.complete);
    assert!(matches!(
        persistence.saved().as_slice(),
        [WalletAsset::Account { family: AssetFamily::Tendermint { .. }, .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn wallet_creation_failure_resets_session_with_generic_wording() {
    let signer = FakeSigner::hardware().fail_tendermint(DISCONNECTED);
    let options = HardwareOptions::default();
    let coordinator = HardwareCoordinator::new(&signer, &options);
    let persistence = MemoryPersistence::default();
    let mut session = HardwareSession::new();
    let request = HardwareWalletRequest {
        wallet_id: "wallet-3".to_owned(),
        plan: two_app_plan(),
    };

    let err = create_hardware_wallet(&coordinator, &persistence, &mut session, &request)
        .await
        .expect_err("must fail");

    assert!(err.to_string().starts_with("Failed to create wallet."));
    assert_eq!(
        err.remediation,
        HardwareErrorKind::DeviceUnreachable.remediation()
    );
    assert_eq!(session.state(), HardwareState::Idle);
    assert!(persistence.saved().is_empty());
}
