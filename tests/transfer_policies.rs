use std::fs;
use std::path::Path;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use zfin_bridge::Flow;
use zfin_bridge::fs_ops::{OnExisting, TransferOutcome, transfer_one};

fn flow(root: &Path) -> Flow {
    Flow::new(
        "BANK->ZFIN",
        root.join("OUT"),
        "txt",
        root.join("in"),
        "occ",
        root.join("ARH"),
    )
}

#[test]
fn delivers_then_archives() {
    let temp = TempDir::new().unwrap();
    let flow = flow(temp.path());
    let src = temp.child("OUT/report.txt");
    src.write_str("payload").unwrap();
    let archive = temp.path().join("ARH/2024-03-01/OUT");
    fs::create_dir_all(&archive).unwrap();

    match transfer_one(&flow, src.path(), &archive, OnExisting::Overwrite) {
        TransferOutcome::Delivered { destination, archived } => {
            assert_eq!(destination, temp.path().join("in/report.occ"));
            assert_eq!(archived, archive.join("report.txt"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    temp.child("in/report.occ").assert("payload");
    temp.child("ARH/2024-03-01/OUT/report.txt").assert("payload");
    assert!(!src.path().exists());
    // No staged leftovers next to the delivered file.
    let leftovers: Vec<_> = fs::read_dir(temp.path().join("in"))
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn no_overwrite_replay_is_skipped_not_failed() {
    let temp = TempDir::new().unwrap();
    let flow = flow(temp.path());
    let archive = temp.path().join("ARH/day/OUT");
    fs::create_dir_all(&archive).unwrap();
    let src = temp.child("OUT/x.txt");
    src.write_str("first").unwrap();
    // Simulate a crash after delivery and before archiving.
    temp.child("in/x.occ").write_str("first").unwrap();

    let outcome = transfer_one(&flow, src.path(), &archive, OnExisting::Skip);
    assert!(matches!(outcome, TransferOutcome::SkippedExisting { .. }));
    assert!(src.path().exists(), "source stays put on skip");
    assert_eq!(fs::read_dir(temp.path().join("in")).unwrap().count(), 1);

    // Every later attempt skips again.
    let outcome = transfer_one(&flow, src.path(), &archive, OnExisting::Skip);
    assert!(matches!(outcome, TransferOutcome::SkippedExisting { .. }));
}

#[test]
fn overwrite_replay_redelivers_and_archives() {
    let temp = TempDir::new().unwrap();
    let flow = flow(temp.path());
    let archive = temp.path().join("ARH/day/OUT");
    fs::create_dir_all(&archive).unwrap();
    let src = temp.child("OUT/x.txt");
    src.write_str("same").unwrap();
    temp.child("in/x.occ").write_str("stale").unwrap();
    temp.child("ARH/day/OUT/x.txt").write_str("older").unwrap();

    let outcome = transfer_one(&flow, src.path(), &archive, OnExisting::Overwrite);
    assert!(matches!(outcome, TransferOutcome::Delivered { .. }));
    temp.child("in/x.occ").assert("same");
    temp.child("ARH/day/OUT/x.txt").assert("same");
    assert!(!src.path().exists());
}

#[test]
fn vanished_source_is_a_failed_outcome() {
    let temp = TempDir::new().unwrap();
    let flow = flow(temp.path());
    let archive = temp.path().join("ARH/day/OUT");
    fs::create_dir_all(&archive).unwrap();

    let gone = temp.path().join("OUT/gone.txt");
    match transfer_one(&flow, &gone, &archive, OnExisting::Overwrite) {
        TransferOutcome::Failed { source, error } => {
            assert_eq!(source, gone);
            assert!(format!("{error:#}").contains("gone.txt"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn empty_target_extension_keeps_name() {
    let temp = TempDir::new().unwrap();
    let flow = Flow::new(
        "ZFIN->BANK",
        temp.path().join("out"),
        "ifm",
        temp.path().join("IN"),
        "",
        temp.path().join("arc"),
    );
    let archive = temp.path().join("arc/day/out");
    fs::create_dir_all(&archive).unwrap();
    let src = temp.child("out/pay.IFM");
    src.write_str("p").unwrap();

    let outcome = transfer_one(&flow, src.path(), &archive, OnExisting::Overwrite);
    assert!(matches!(outcome, TransferOutcome::Delivered { .. }));
    temp.child("IN/pay.IFM").assert("p");
}
