// File: fresq-core/tests/canvas_service_tests.rs

mod common;

use std::sync::Arc;
use common::{code, grid, MockCodeRepo, MockGridRepo};
use fresq_common::error::ValidationError;
use fresq_core::Error;
use fresq_core::eventbus::{CanvasEvent, EventBus};
use fresq_core::models::{
    CellState, ClaimOutcome, ClaimRejection, PaintOutcome, PaintRejection, PaintedCell,
};
use fresq_core::services::CanvasService;

fn service(codes: MockCodeRepo, grid_repo: MockGridRepo, bus: Arc<EventBus>) -> CanvasService {
    CanvasService::new(Arc::new(codes), Arc::new(grid_repo), bus)
}

fn grid_200() -> MockGridRepo {
    let mut grid_repo = MockGridRepo::new();
    grid_repo.expect_get_config().returning(|| Ok(grid(200, 200, 1)));
    grid_repo
}

#[tokio::test]
async fn test_claim_broadcasts_after_success() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_claim_cell()
        .withf(|c, x, y| c == "ABCD2345" && *x == 10 && *y == 10)
        .times(1)
        .returning(|_, x, y| Ok(ClaimOutcome::Claimed { x, y }));

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(None).await;
    let svc = service(codes, grid_200(), bus);

    // normalised before it reaches the repository
    let outcome = svc.claim_cell(" abcd2345 ", 10, 10).await?;
    assert_eq!(outcome, ClaimOutcome::Claimed { x: 10, y: 10 });
    assert_eq!(rx.try_recv().ok(), Some(CanvasEvent::CellClaimed { x: 10, y: 10 }));
    Ok(())
}

#[tokio::test]
async fn test_repeated_claim_is_silent() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_claim_cell()
        .returning(|_, x, y| Ok(ClaimOutcome::AlreadyOwned { x, y }));

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(None).await;
    let svc = service(codes, grid_200(), bus);

    let outcome = svc.claim_cell("ABCD2345", 5, 5).await?;
    assert!(outcome.is_ok());
    assert!(rx.try_recv().is_err(), "no state change, no event");
    Ok(())
}

#[tokio::test]
async fn test_rejected_claim_passes_through_without_event() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_claim_cell()
        .returning(|_, _, _| Ok(ClaimOutcome::Rejected { error: ClaimRejection::CellTaken }));

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(None).await;
    let svc = service(codes, grid_200(), bus);

    let outcome = svc.claim_cell("WXYZ9876", 10, 10).await?;
    assert_eq!(outcome.error(), Some(ClaimRejection::CellTaken));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_claim_validation_happens_before_any_repository_call() {
    // no expectations: any repository call would panic
    let svc = service(MockCodeRepo::new(), MockGridRepo::new(), Arc::new(EventBus::new()));

    let err = svc.claim_cell("", 1, 1).await.unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::MissingCode)));

    let err = svc.claim_cell("NOT-A-CODE", 1, 1).await.unwrap_err();
    assert_eq!(err.code(), "malformed_code");
}

#[tokio::test]
async fn test_claim_outside_current_grid_is_rejected() {
    let svc = service(MockCodeRepo::new(), grid_200(), Arc::new(EventBus::new()));

    let err = svc.claim_cell("ABCD2345", 200, 0).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::OutOfBounds { x: 200, y: 0, width: 200, height: 200 })
    ));
    let err = svc.claim_cell("ABCD2345", 0, -1).await.unwrap_err();
    assert_eq!(err.code(), "out_of_bounds");
}

#[tokio::test]
async fn test_paint_broadcasts_stored_position() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_paint_cell()
        .withf(|c, color| c == "ABCD2345" && *color == 4)
        .times(1)
        .returning(|_, color| Ok(PaintOutcome::Painted { x: 10, y: 10, color }));

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(None).await;
    let svc = service(codes, MockGridRepo::new(), bus);

    let outcome = svc.paint_cell("ABCD2345", 4).await?;
    assert_eq!(outcome, PaintOutcome::Painted { x: 10, y: 10, color: 4 });
    assert_eq!(rx.try_recv().ok(), Some(CanvasEvent::CellPainted { x: 10, y: 10, color: 4 }));
    Ok(())
}

#[tokio::test]
async fn test_paint_rejections() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_paint_cell()
        .returning(|_, _| Ok(PaintOutcome::Rejected { error: PaintRejection::NotClaimed }));

    let bus = Arc::new(EventBus::new());
    let mut rx = bus.subscribe(None).await;
    let svc = service(codes, MockGridRepo::new(), bus);

    let outcome = svc.paint_cell("ABCD2345", 3).await?;
    assert!(!outcome.is_ok());
    assert!(rx.try_recv().is_err());

    for bad in [0, 11, -3] {
        let err = svc.paint_cell("ABCD2345", bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::ColorOutOfRange(c)) if c == bad));
    }
    Ok(())
}

#[tokio::test]
async fn test_validate_code_looks_up_normalised_value() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_get_by_code()
        .withf(|c| c == "ABCD2345")
        .returning(|c| Ok(Some(code(c, CellState::Claimed { x: 1, y: 2 }))));

    let svc = service(codes, MockGridRepo::new(), Arc::new(EventBus::new()));
    let found = svc.validate_code("abcd2345").await?.expect("code exists");
    assert_eq!(found.cell, CellState::Claimed { x: 1, y: 2 });
    Ok(())
}

#[tokio::test]
async fn test_snapshot_and_staleness_check() -> Result<(), Error> {
    let mut codes = MockCodeRepo::new();
    codes
        .expect_painted_cells()
        .returning(|| Ok(vec![PaintedCell { x: 3, y: 4, color: 2 }]));
    let mut grid_repo = MockGridRepo::new();
    grid_repo.expect_get_config().returning(|| Ok(grid(200, 200, 7)));

    let svc = service(codes, grid_repo, Arc::new(EventBus::new()));

    let snapshot = svc.snapshot().await?;
    assert_eq!(snapshot.config.state_version, 7);
    assert_eq!(snapshot.cells, vec![PaintedCell { x: 3, y: 4, color: 2 }]);

    assert!(svc.config_if_changed(7).await?.is_none());
    assert_eq!(svc.config_if_changed(6).await?.map(|c| c.state_version), Some(7));
    Ok(())
}
