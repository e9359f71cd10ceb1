use std::sync::Arc;

use instruments_core::{
    build_update, InstrumentDetails, InstrumentError, InstrumentForm, InstrumentRepository,
    InstrumentRepositoryTrait, InstrumentService, InstrumentServiceTrait, InstrumentType,
    LogFailureReporter, MemoryStore, RemoteInstrumentStore, RequiredFieldValidator,
    SearchController, SearchPhase,
};

mod common;

fn bond_form(symbol: &str) -> InstrumentForm {
    InstrumentForm {
        symbol: symbol.to_string(),
        full_name: "OFZ 26240".to_string(),
        instrument_type: "bond".to_string(),
        exchanges: vec!["moex".to_string()],
        min_price_increment: "0,01".to_string(),
        lot: "1".to_string(),
        currency: "RUB".to_string(),
        isin: "RU000A103BR0".to_string(),
        issue_kind: "non-documentary".to_string(),
        initial_nominal: "1000".to_string(),
        nominal: "1000".to_string(),
        maturity_date: "2036-07-30".to_string(),
        coupon_quantity_per_year: "2".to_string(),
        ..Default::default()
    }
}

fn service_over(
    remote: Arc<MemoryStore>,
    repository: Arc<InstrumentRepository>,
) -> InstrumentService {
    InstrumentService::new(
        remote,
        repository,
        Arc::new(RequiredFieldValidator),
        Arc::new(LogFailureReporter),
    )
}

#[tokio::test]
async fn search_edit_commit_round_trip() {
    let pool = common::test_pool();
    let remote = Arc::new(MemoryStore::new());
    let repository = Arc::new(InstrumentRepository::new(pool));
    let service = service_over(remote.clone(), repository.clone());

    let controller = SearchController::new(remote, Arc::new(LogFailureReporter));
    controller.set_search_text(" su26240 ").await;
    controller.search().await;
    assert_eq!(controller.state().await.phase(), SearchPhase::NotFound);

    let outcome = service.commit(&bond_form("su26240"), None).await.unwrap();
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.instrument.symbol, "SU26240");

    controller.search().await;
    let state = controller.state().await;
    assert_eq!(state.phase(), SearchPhase::Found);
    assert_eq!(state.document.unwrap(), outcome.instrument);

    // The cache mirrors the committed record exactly.
    let cached = service.get_cached("SU26240").unwrap();
    assert_eq!(cached, outcome.instrument);
}

#[tokio::test]
async fn recommit_keeps_creation_timestamp_and_overwrites_mirror() {
    let pool = common::test_pool();
    let remote = Arc::new(MemoryStore::new());
    let repository = Arc::new(InstrumentRepository::new(pool));
    let service = service_over(remote, repository.clone());

    let first = service.commit(&bond_form("SU26240"), None).await.unwrap();

    let mut form = bond_form("SU26240");
    form.full_name = "OFZ-PD 26240".to_string();
    let second = service
        .commit(&form, Some(InstrumentType::Bond))
        .await
        .unwrap();

    assert_eq!(second.instrument.created_at, first.instrument.created_at);

    let cached = repository.get_by_symbol("SU26240").unwrap();
    assert_eq!(cached.full_name, "OFZ-PD 26240");
}

#[tokio::test]
async fn type_change_leaves_no_bond_residue_in_either_store() {
    let pool = common::test_pool();
    let remote = Arc::new(MemoryStore::new());
    let repository = Arc::new(InstrumentRepository::new(pool));
    let service = service_over(remote.clone(), repository.clone());

    service.commit(&bond_form("SIH7"), None).await.unwrap();

    let mut form = bond_form("SIH7");
    form.instrument_type = "future".to_string();
    form.expiration_date = "2027-03-19".to_string();
    form.basic_asset = "Si".to_string();
    let outcome = service
        .commit(&form, Some(InstrumentType::Bond))
        .await
        .unwrap();

    // Both the remote record and its cache mirror are futures now, with
    // no bond fields and an erased isin.
    for record in [
        remote.find_by_symbol("SIH7").await.unwrap().unwrap(),
        repository.get_by_symbol("SIH7").unwrap(),
    ] {
        assert_eq!(record, outcome.instrument);
        match record.details {
            InstrumentDetails::Future { listed, .. } => assert!(listed.isin.is_none()),
            other => panic!("expected a future, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn remote_failure_writes_nothing_locally() {
    let pool = common::test_pool();
    let remote = Arc::new(MemoryStore::new().failing_writes());
    let repository = Arc::new(InstrumentRepository::new(pool));
    let service = service_over(remote, repository.clone());

    let err = service.commit(&bond_form("SU26240"), None).await.unwrap_err();
    assert!(matches!(err, InstrumentError::RemoteWrite(_)));

    // Schema may not even exist yet; either way there is no entry.
    repository.ensure_schema().unwrap();
    assert!(matches!(
        repository.get_by_symbol("SU26240"),
        Err(InstrumentError::NotFound(_))
    ));
}

#[tokio::test]
async fn build_update_normalizes_before_persisting() {
    let pool = common::test_pool();
    let remote = Arc::new(MemoryStore::new());
    let repository = Arc::new(InstrumentRepository::new(pool));
    let service = service_over(remote, repository);

    let mut form = bond_form("SU26240");
    form.lot = "0".to_string();
    let update = build_update(&form, None).unwrap();
    assert_eq!(update.set_value("lot"), Some(&serde_json::json!(1)));

    let outcome = service.commit(&form, None).await.unwrap();
    match outcome.instrument.details {
        InstrumentDetails::Bond { listed, .. } => assert_eq!(listed.lot, 1),
        other => panic!("expected a bond, got {:?}", other),
    }
    assert_eq!(
        outcome.instrument.min_price_increment,
        rust_decimal_macros::dec!(0.01)
    );
}
