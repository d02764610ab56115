//! Integration tests for `DieselRecordRepository` against embedded PostgreSQL.
//!
//! Each test gets its own database cloned from a migrated template. Database
//! calls run on a Tokio runtime owned by the test context so fixtures stay
//! synchronous.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

use casedesk::domain::ports::{RecordRepository, RecordRepositoryError};
use casedesk::domain::{CaseId, Record, RecordKey, RecordWrite, Username, Variant};
use casedesk::outbound::persistence::{DbPool, DieselRecordRepository, PoolConfig};

mod support;

use support::embedded_postgres::drop_records_table;
use support::{handle_cluster_setup_failure, provision_template_database, shared_cluster};

/// Clock that only moves when told to.
struct SteppedClock(Mutex<DateTime<Utc>>);

impl SteppedClock {
    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for SteppedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

struct TestContext {
    runtime: Runtime,
    repository: DieselRecordRepository,
    clock: Arc<SteppedClock>,
    database_url: String,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn setup_test_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster).map_err(|err| err.to_string())?;
    let database_url = database.url().to_string();

    let config = PoolConfig::new(&database_url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    let clock = Arc::new(SteppedClock(Mutex::new(start())));
    let repository = DieselRecordRepository::new(pool, clock.clone());

    Ok(TestContext {
        runtime,
        repository,
        clock,
        database_url,
        _database: database,
    })
}

fn open_world() -> Option<TestContext> {
    match setup_test_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[fixture]
fn diesel_world() -> Option<TestContext> {
    open_world()
}

fn key(user: &str, case: &str, variant: Variant) -> RecordKey {
    RecordKey::new(
        Username::new(user).expect("valid username"),
        CaseId::new(case).expect("valid case id"),
        variant,
    )
}

fn write(key: RecordKey, payload: &str, elapsed_time: i64, completed: bool) -> RecordWrite {
    RecordWrite {
        key,
        payload: payload.as_bytes().to_vec(),
        elapsed_time,
        completed,
    }
}

#[rstest]
fn absent_then_partial_then_complete(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: absent_then_partial_then_complete skipped");
        return;
    };
    let alice = key("alice", "Case001", Variant::WithoutAid);

    let missing = ctx.block_on(ctx.repository.get(&alice)).expect("get");
    assert!(missing.is_none());

    ctx.block_on(ctx.repository.upsert(&write(alice.clone(), r#"{"Item01":"42"}"#, 5, false)))
        .expect("first upsert");
    let stored = ctx
        .block_on(ctx.repository.get(&alice))
        .expect("get")
        .expect("stored");
    assert_eq!(stored.payload, br#"{"Item01":"42"}"#.to_vec());
    assert_eq!(stored.elapsed_time, 5);
    assert!(!stored.completed);
    assert_eq!(stored.last_update, start());

    ctx.block_on(ctx.repository.upsert(&write(
        alice.clone(),
        r#"{"Item01":"42","Item02":"7"}"#,
        9,
        true,
    )))
    .expect("second upsert");
    let done = ctx
        .block_on(ctx.repository.count_completed(&alice.username, Variant::WithoutAid))
        .expect("count");
    assert_eq!(done, 1);
}

#[rstest]
fn repeated_upsert_only_moves_last_update(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: repeated_upsert_only_moves_last_update skipped");
        return;
    };
    let bob = key("bob", "Case002", Variant::WithAid);
    let same = write(bob.clone(), r#"{"Item03":"1"}"#, 12, false);

    ctx.block_on(ctx.repository.upsert(&same)).expect("first");
    let first = ctx.block_on(ctx.repository.get(&bob)).expect("get").expect("row");

    ctx.clock.advance(Duration::minutes(3));
    ctx.block_on(ctx.repository.upsert(&same)).expect("second");
    let second = ctx.block_on(ctx.repository.get(&bob)).expect("get").expect("row");

    assert_eq!(second.last_update, first.last_update + Duration::minutes(3));
    assert_eq!(
        Record {
            last_update: first.last_update,
            ..second
        },
        first
    );
}

#[rstest]
fn batch_writes_both_variants(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: batch_writes_both_variants skipped");
        return;
    };
    let first = key("carol", "Case001", Variant::WithoutAid);
    let second = first.with_variant(Variant::WithAid);

    ctx.block_on(ctx.repository.upsert_batch(&[
        write(first.clone(), r#"{"Item01":"3"}"#, 30, true),
        write(second.clone(), r#"{"Item01":"3"}"#, 0, false),
    ]))
    .expect("batch");

    let rows = ctx
        .block_on(ctx.repository.list_for_user(&first.username))
        .expect("list");
    assert_eq!(rows.len(), 2);
    let seeded = rows
        .iter()
        .find(|row| row.key == second)
        .expect("with-aid row");
    assert_eq!(seeded.elapsed_time, 0);
    assert!(!seeded.completed);
}

#[rstest]
fn concurrent_upserts_leave_one_row(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_upserts_leave_one_row skipped");
        return;
    };
    let frank = key("frank", "Case001", Variant::WithoutAid);
    let first = write(frank.clone(), r#"{"Item01":"1"}"#, 3, false);
    let second = write(frank.clone(), r#"{"Item01":"2","Item02":"2"}"#, 7, true);

    let (left, right) = ctx.block_on(async {
        tokio::join!(ctx.repository.upsert(&first), ctx.repository.upsert(&second))
    });
    left.expect("first upsert");
    right.expect("second upsert");

    let rows = ctx.block_on(ctx.repository.export_all()).expect("export");
    assert_eq!(rows.len(), 1);
    let stored = rows.first().expect("one row");
    let winner = [&first, &second]
        .into_iter()
        .find(|candidate| candidate.payload == stored.payload)
        .expect("stored payload comes from one of the writes");
    assert_eq!(stored.elapsed_time, winner.elapsed_time);
    assert_eq!(stored.completed, winner.completed);

    ctx.clock.advance(Duration::seconds(1));
    ctx.block_on(ctx.repository.upsert(&first)).expect("later upsert");
    let latest = ctx
        .block_on(ctx.repository.get(&frank))
        .expect("get")
        .expect("row");
    assert_eq!(latest.payload, first.payload);
    assert_eq!(latest.elapsed_time, 3);
    assert!(!latest.completed);
}

#[rstest]
#[case(0)]
#[case(3)]
fn export_then_import_reproduces_the_table(
    diesel_world: Option<TestContext>,
    #[case] rows: usize,
) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: export_then_import_reproduces_the_table skipped");
        return;
    };
    for index in 0..rows {
        let case = format!("Case00{}", index + 1);
        ctx.block_on(ctx.repository.upsert(&write(
            key("dave", &case, Variant::WithoutAid),
            r#"{"Item01":"10"}"#,
            i64::try_from(index).expect("small index"),
            index % 2 == 0,
        )))
        .expect("seed");
        ctx.clock.advance(Duration::seconds(1));
    }
    let exported = ctx.block_on(ctx.repository.export_all()).expect("export");
    assert_eq!(exported.len(), rows);

    let Some(target) = open_world() else {
        return;
    };
    target
        .block_on(target.repository.import_all(&exported))
        .expect("import");
    let restored = target.block_on(target.repository.export_all()).expect("export");
    assert_eq!(restored, exported);
}

#[rstest]
fn missing_table_surfaces_a_query_error(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        eprintln!("SKIP-TEST-CLUSTER: missing_table_surfaces_a_query_error skipped");
        return;
    };
    drop_records_table(&ctx.database_url).expect("drop succeeds");

    let err = ctx
        .block_on(ctx.repository.upsert(&write(
            key("erin", "Case001", Variant::WithoutAid),
            "{}",
            0,
            false,
        )))
        .expect_err("table is gone");
    assert!(
        matches!(err, RecordRepositoryError::Query { .. }),
        "expected Query error, got: {err:?}"
    );
}
