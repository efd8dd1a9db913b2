use std::fs;

use casefold_core::{CaseStatus, Field, FieldSet, FieldValue};
use casefold_engine::{DashboardStats, Engine, EngineConfig, EngineError};
use casefold_harness::TestDesk;
use casefold_storage::{RecordFilter, SortOrder};

// ============================================================================
// Search and dashboard
// ============================================================================

#[test]
fn filters_combine() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    desk.register_with(
        FieldSet::new()
            .with(Field::VictimName, "Alice")
            .with(Field::CategoryOfComplaint, "UPI Fraud")
            .with(Field::DateOfComplaint, "2024-03-02"),
    )?;
    let b = desk.register_with(
        FieldSet::new()
            .with(Field::VictimName, "Bob")
            .with(Field::CategoryOfComplaint, "UPI Fraud")
            .with(Field::DateOfComplaint, "2024-04-10")
            .with(Field::ActionTaken, "lien marked"),
    )?;
    desk.register_with(
        FieldSet::new()
            .with(Field::VictimName, "Carol")
            .with(Field::CategoryOfComplaint, "UPI")
            .with(Field::DateOfComplaint, "2024-04-11"),
    )?;

    // Category is an exact match.
    let upi = desk.engine.search(&RecordFilter::new().category("UPI Fraud"))?;
    assert_eq!(upi.len(), 2);

    let resolved = desk.engine.search(
        &RecordFilter::new()
            .category("UPI Fraud")
            .status(CaseStatus::Resolved),
    )?;
    assert_eq!(resolved.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b]);

    let april = desk.engine.search(
        &RecordFilter::new()
            .date_range("2024-04-01", "2024-04-30")
            .sort(SortOrder::Newest),
    )?;
    let names: Vec<&FieldValue> = april.iter().map(|r| r.get(Field::VictimName)).collect();
    assert_eq!(names, vec![&FieldValue::text("Carol"), &FieldValue::text("Bob")]);
    Ok(())
}

#[test]
fn dashboard_counts_follow_merges() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::new()?;
    let a = desk.register("Alice")?;
    let b = desk.register_with(
        FieldSet::new()
            .with(Field::VictimName, "Bob")
            .with(Field::ActionTaken, "refunded"),
    )?;
    desk.register("Carol")?;
    assert_eq!(
        desk.engine.dashboard_stats()?,
        DashboardStats { total: 3, pending: 2, resolved: 1 }
    );

    // The merged action_taken is "<br>refunded", which counts as resolved.
    desk.engine.record_merge(&[a, b])?;
    assert_eq!(
        desk.engine.dashboard_stats()?,
        DashboardStats { total: 2, pending: 1, resolved: 1 }
    );
    Ok(())
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn attach_and_replace_evidence() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_uploads()?;
    let scratch = desk.scratch_dir().ok_or("desk has no scratch dir")?;
    let a = desk.register_with(
        FieldSet::new()
            .with(Field::VictimName, "Alice")
            .with(Field::AcknowledgmentNo, "31507240012345"),
    )?;

    let source = scratch.join("bank-statement.pdf");
    fs::write(&source, b"statement")?;
    let first = desk.engine.attach_file(a, &source)?;
    assert_eq!(
        first.file_name().and_then(|n| n.to_str()),
        Some("31507240012345.pdf")
    );

    let second = desk.engine.replace_attachment(a, Some("png"), b"screenshot")?;
    assert_eq!(fs::read(&second)?, b"screenshot");
    assert_eq!(fs::read(&first)?, b"statement");
    assert_eq!(
        desk.field(a, Field::FileName)?,
        Some(FieldValue::text("31507240012345.png"))
    );
    Ok(())
}

#[test]
fn undo_of_replace_points_at_surviving_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_uploads()?;
    let scratch = desk.scratch_dir().ok_or("desk has no scratch dir")?;
    let a = desk.register("Alice")?;

    let source = scratch.join("receipt.png");
    fs::write(&source, b"original receipt")?;
    let first = desk.engine.attach_file(a, &source)?;

    // Same acknowledgment and extension: the new version must not take the
    // first one's name.
    let second = desk.engine.replace_attachment(a, Some("png"), b"cropped receipt")?;
    assert_ne!(first, second);

    desk.engine.undo_last()?;
    let restored = desk
        .field(a, Field::FilePath)?
        .and_then(|v| v.as_text().map(str::to_string))
        .ok_or("file path missing after undo")?;
    assert_eq!(restored, first.to_string_lossy());
    assert_eq!(fs::read(&restored)?, b"original receipt");

    desk.engine.redo_last()?;
    assert_eq!(fs::read(&second)?, b"cropped receipt");
    Ok(())
}

#[test]
fn reattaching_keeps_the_earlier_copy() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_uploads()?;
    let scratch = desk.scratch_dir().ok_or("desk has no scratch dir")?;
    let a = desk.register("Alice")?;

    let source = scratch.join("chat.jpg");
    fs::write(&source, b"first export")?;
    let first = desk.engine.attach_file(a, &source)?;
    fs::write(&source, b"second export")?;
    let second = desk.engine.attach_file(a, &source)?;

    assert_ne!(first, second);
    assert_eq!(fs::read(&first)?, b"first export");
    assert_eq!(fs::read(&second)?, b"second export");
    Ok(())
}

#[test]
fn merged_record_refuses_attachments() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_uploads()?;
    let scratch = desk.scratch_dir().ok_or("desk has no scratch dir")?;
    let a = desk.register("Alice")?;
    let b = desk.register("Bob")?;
    desk.engine.record_merge(&[a, b])?;
    let before = desk.record(a)?;
    let depth = desk.engine.history().undo_depth();

    let source = scratch.join("proof.pdf");
    fs::write(&source, b"proof")?;
    let err = desk.engine.attach_file(a, &source).unwrap_err();
    assert!(matches!(err, EngineError::MergedRecord(id) if id == a));
    let err = desk.engine.replace_attachment(a, Some("pdf"), b"proof").unwrap_err();
    assert!(matches!(err, EngineError::MergedRecord(id) if id == a));

    assert_eq!(desk.record(a)?, before);
    assert_eq!(desk.engine.history().undo_depth(), depth);
    let uploads = desk.engine.attachments().ok_or("no attachment store")?;
    assert_eq!(fs::read_dir(uploads.upload_dir())?.count(), 0);
    Ok(())
}

#[test]
fn merged_attachments_are_pooled_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = TestDesk::with_uploads()?;
    let scratch = desk.scratch_dir().ok_or("desk has no scratch dir")?;
    let source = scratch.join("proof.jpg");
    fs::write(&source, b"proof")?;

    let a = desk.register("Alice")?;
    let b = desk.register("Bob")?;
    let path_a = desk.engine.attach_file(a, &source)?;
    let path_b = desk.engine.attach_file(b, &source)?;
    let shared = path_a.to_string_lossy().into_owned();
    desk.engine.record_edit(
        b,
        Field::FilePath,
        format!("{shared}, {}", path_b.to_string_lossy()),
    )?;

    desk.engine.record_merge(&[a, b])?;
    let pooled = desk
        .field(a, Field::FilePath)?
        .and_then(|v| v.as_text().map(str::to_string))
        .ok_or("merged file path missing")?;
    assert_eq!(pooled, format!("{shared}, {}", path_b.to_string_lossy()));
    assert!(!pooled.contains(", ,"));
    Ok(())
}

// ============================================================================
// Configuration and persistence
// ============================================================================

#[test]
fn file_store_survives_reopen_without_history() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("casefold.toml");
    fs::write(
        &config_path,
        format!(
            "[store]\npath = {:?}\n\n[history]\nmax_depth = 10\n",
            dir.path().join("cases.db").to_string_lossy()
        ),
    )?;
    let config = EngineConfig::load(&config_path)?;
    assert_eq!(config.history.max_depth, 10);

    let (a, b) = {
        let mut engine = Engine::open(&config)?;
        let a = engine.intake(FieldSet::new().with(Field::VictimName, "Alice").with(Field::AcknowledgmentNo, "A-1"))?;
        let b = engine.intake(FieldSet::new().with(Field::VictimName, "Bob").with(Field::AcknowledgmentNo, "B-1"))?;
        engine.record_merge(&[a, b])?;
        (a, b)
    };

    let mut engine = Engine::open(&config)?;
    assert!(!engine.can_undo());
    assert_eq!(engine.undo_last()?, casefold_engine::HistoryOutcome::Empty);
    assert!(engine.get(b)?.is_none());
    assert_eq!(
        engine.get(a)?.map(|r| r.get(Field::VictimName).clone()),
        Some(FieldValue::text("Alice<br>Bob"))
    );

    // Ids are never handed out twice, even after the merge freed one.
    let c = engine.intake(FieldSet::new().with(Field::VictimName, "Carol"))?;
    assert!(c > b);
    Ok(())
}

#[test]
fn malformed_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("casefold.toml");
    fs::write(&config_path, "[history]\nmax_depth = -3\n")?;
    let err = EngineConfig::load(&config_path).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    Ok(())
}
