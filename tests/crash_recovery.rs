use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_db::engine::core::wal::WAL_FILE_NAME;
use strata_db::{ColumnDefinition, DataChunk, Database, LogicalType, ScalarValue, Settings, Vector};
use tempfile::TempDir;

fn settings(dir: &TempDir) -> Settings {
    let mut settings = Settings::with_data_dir(dir.path());
    settings.wal.fsync = false;
    settings.wal.checkpoint_threshold = 0;
    settings.storage.segment_capacity = 64;
    settings.storage.block_size = 4096;
    settings
}

fn wal_path(settings: &Settings) -> PathBuf {
    PathBuf::from(&settings.wal.dir).join(WAL_FILE_NAME)
}

fn chunk(values: &[i64]) -> DataChunk {
    let rows: Vec<Vec<ScalarValue>> = values
        .iter()
        .map(|&v| vec![ScalarValue::BigInt(v), ScalarValue::Varchar(format!("row-{}", v))])
        .collect();
    DataChunk::from_rows(&[LogicalType::BigInt, LogicalType::Varchar], &rows).unwrap()
}

/// Visible `(row_id, value)` pairs of the `items` table.
fn visible(db: &Database) -> Vec<(u64, i64)> {
    let txn = db.begin();
    db.scan(&txn, "items", &[0], &[])
        .unwrap()
        .iter()
        .flat_map(|c| {
            c.row_ids.iter().copied().zip(c.rows()).map(|(id, row)| match row[0] {
                ScalarValue::BigInt(v) => (id, v),
                ref other => panic!("unexpected value {}", other),
            })
        })
        .collect()
}

fn sorted_values(db: &Database) -> Vec<i64> {
    let mut values: Vec<i64> = visible(db).into_iter().map(|(_, v)| v).collect();
    values.sort_unstable();
    values
}

fn create_items(db: &Database) {
    db.create_table(
        "items",
        vec![
            ColumnDefinition::new("value", LogicalType::BigInt),
            ColumnDefinition::new("label", LogicalType::Varchar),
        ],
    )
    .unwrap();
}

#[test]
fn randomized_workload_survives_reopen_and_checkpoints() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut expected: Vec<i64> = Vec::new();
    let mut next = 0i64;

    let mut db = Database::open(&settings).unwrap();
    create_items(&db);

    for round in 0..40 {
        let mut staged = expected.clone();
        let mut txn = db.begin();
        match rng.gen_range(0..4) {
            0 | 1 => {
                let count = rng.gen_range(1..20);
                let values: Vec<i64> = (next..next + count).collect();
                next += count;
                db.insert(&mut txn, "items", &chunk(&values)).unwrap();
                staged.extend(values);
            }
            2 => {
                let victims: Vec<(u64, i64)> = visible(&db)
                    .into_iter()
                    .filter(|_| rng.gen_bool(0.2))
                    .collect();
                let ids: Vec<u64> = victims.iter().map(|(id, _)| *id).collect();
                db.delete(&mut txn, "items", &ids).unwrap();
                staged.retain(|v| !victims.iter().any(|(_, gone)| gone == v));
            }
            _ => {
                let rows = visible(&db);
                if !rows.is_empty() {
                    let (id, old) = rows[rng.gen_range(0..rows.len())];
                    let new = old + 1_000_000;
                    let values = Vector::from_values(LogicalType::BigInt, &[ScalarValue::BigInt(new)]).unwrap();
                    db.update(&mut txn, "items", 0, &[id], &values).unwrap();
                    if let Some(slot) = staged.iter_mut().find(|v| **v == old) {
                        *slot = new;
                    }
                }
            }
        }
        // Every fifth round aborts instead of committing.
        if round % 5 == 4 {
            db.rollback(&mut txn).unwrap();
        } else {
            db.commit(&mut txn).unwrap();
            expected = staged;
        }
        if round % 13 == 12 {
            db.checkpoint().unwrap();
        }
        if round % 7 == 6 {
            drop(txn);
            drop(db);
            db = Database::open(&settings).unwrap();
        }

        expected.sort_unstable();
        assert_eq!(sorted_values(&db), expected, "round {}", round);
    }
}

#[test]
fn torn_final_commit_is_lost_but_earlier_commits_survive() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    {
        let db = Database::open(&settings).unwrap();
        create_items(&db);
        for batch in [[1, 2, 3], [4, 5, 6]] {
            let mut txn = db.begin();
            db.insert(&mut txn, "items", &chunk(&batch)).unwrap();
            db.commit(&mut txn).unwrap();
        }
    }

    // Cut the final commit record in half.
    let path = wal_path(&settings);
    let len = fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 5)
        .unwrap();

    let db = Database::open(&settings).unwrap();
    assert_eq!(sorted_values(&db), vec![1, 2, 3]);

    let mut txn = db.begin();
    db.insert(&mut txn, "items", &chunk(&[7])).unwrap();
    db.commit(&mut txn).unwrap();
    drop(db);

    let db = Database::open(&settings).unwrap();
    assert_eq!(sorted_values(&db), vec![1, 2, 3, 7]);
}

#[test]
fn garbage_after_last_commit_is_ignored() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    {
        let db = Database::open(&settings).unwrap();
        create_items(&db);
        let mut txn = db.begin();
        db.insert(&mut txn, "items", &chunk(&[10, 20])).unwrap();
        db.commit(&mut txn).unwrap();
    }
    let mut bytes = fs::read(wal_path(&settings)).unwrap();
    bytes.extend_from_slice(&[3, 0xFF, 0xFF]);
    fs::write(wal_path(&settings), &bytes).unwrap();

    let db = Database::open(&settings).unwrap();

    assert_eq!(sorted_values(&db), vec![10, 20]);
}

#[test]
fn checkpoint_survives_missing_wal() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    {
        let db = Database::open(&settings).unwrap();
        create_items(&db);
        let mut txn = db.begin();
        db.insert(&mut txn, "items", &chunk(&(0..200).collect::<Vec<_>>())).unwrap();
        db.commit(&mut txn).unwrap();
        db.checkpoint().unwrap();
    }
    fs::remove_file(wal_path(&settings)).unwrap();

    let db = Database::open(&settings).unwrap();

    assert_eq!(db.checkpoint_iteration(), 1);
    assert_eq!(sorted_values(&db), (0..200).collect::<Vec<_>>());
}
