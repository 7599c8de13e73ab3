mod support;

use pulse_core::RateBudgetReading;
use pulse_db::Db;
use support::setup_db;

#[test]
fn rate_budget_is_shared_between_connections() {
    let test_db = setup_db();
    assert_eq!(test_db.db.load_rate_budget("github").expect("load"), None);

    let other = Db::open(&test_db.path).expect("second connection");
    other
        .store_rate_budget(
            "github",
            RateBudgetReading {
                remaining: 4200,
                reset_at: 1_700_000_000,
            },
        )
        .expect("store");
    other
        .store_rate_budget(
            "github",
            RateBudgetReading {
                remaining: 4199,
                reset_at: 1_700_000_000,
            },
        )
        .expect("overwrite");

    let reading = test_db
        .db
        .load_rate_budget("github")
        .expect("load")
        .expect("stored");
    assert_eq!(reading.remaining, 4199);
    assert_eq!(reading.reset_at, 1_700_000_000);
}
