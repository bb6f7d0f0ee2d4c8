use crate::engine::types::LogicalType;
use crate::test_helpers::factory::Factory;

#[test]
fn creates_requested_tables_and_survives_reopen() {
    let test_db = Factory::database()
        .with_table("events", &[("id", LogicalType::BigInt)])
        .create();
    assert!(test_db.db.table("events").is_ok());

    let reopened = test_db.reopen();
    assert!(reopened.db.table("events").is_ok());
}
