use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;
use zfin_bridge::fs_ops::{RetentionCursor, sweep_if_due, sweep_root};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

#[test]
fn horizon_five_on_day_ten() {
    let td = tempdir().unwrap();
    let root = td.path();
    for name in ["2024-05-03", "2024-05-05", "2024-05-06", "2024-05-10"] {
        fs::create_dir_all(root.join(name).join("OUT")).unwrap();
        fs::write(root.join(name).join("OUT").join("f.txt"), b"x").unwrap();
    }
    fs::create_dir(root.join("manual-backup")).unwrap();
    fs::create_dir(root.join("2000-1-1")).unwrap();
    fs::write(root.join("2024-05-01"), b"plain file with a date name").unwrap();

    let report = sweep_root(root, 5, day(10));
    assert!(report.is_clean());
    assert!(!root.join("2024-05-03").exists());
    assert!(root.join("2024-05-05").exists(), "exactly today - horizon is kept");
    assert!(root.join("2024-05-06").exists());
    assert!(root.join("2024-05-10").exists());
    assert!(root.join("manual-backup").exists());
    assert!(root.join("2000-1-1").exists());
    assert!(root.join("2024-05-01").exists());
    assert_eq!(report.deleted, vec![root.join("2024-05-03")]);
}

#[test]
fn sweeps_every_root_once_per_day() {
    let td = tempdir().unwrap();
    let bank = td.path().join("bank_arh");
    let zfin = td.path().join("zfin_arc");
    fs::create_dir_all(bank.join("2024-05-01")).unwrap();
    fs::create_dir_all(zfin.join("2024-05-02")).unwrap();

    let mut cursor = RetentionCursor::default();
    let report = sweep_if_due(&mut cursor, &[&bank, &zfin], 5, day(10)).unwrap();
    assert_eq!(report.deleted.len(), 2);

    // Same day: a new expired folder is left until tomorrow.
    fs::create_dir_all(bank.join("2024-05-03")).unwrap();
    assert!(sweep_if_due(&mut cursor, &[&bank, &zfin], 5, day(10)).is_none());
    assert!(bank.join("2024-05-03").exists());

    let next = sweep_if_due(&mut cursor, &[&bank, &zfin], 5, day(11)).unwrap();
    assert_eq!(next.deleted, vec![bank.join("2024-05-03")]);
}

#[test]
fn fresh_cursor_always_sweeps() {
    let td = tempdir().unwrap();
    let mut first = RetentionCursor::default();
    assert!(sweep_if_due(&mut first, &[td.path()], 1, day(10)).is_some());
    // A restarted process has a new cursor and sweeps again the same day.
    let mut restarted = RetentionCursor::default();
    assert!(sweep_if_due(&mut restarted, &[td.path()], 1, day(10)).is_some());
}
