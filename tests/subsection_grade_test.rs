use std::sync::{mpsc, Arc};

use log::LevelFilter;

use persistent_grades::{
    config::Configuration,
    error::GradesError,
    events::Event,
    grades::{
        pluggables::OpaqueKeyLookup,
        types::{PersistentSubsectionGrade, SubsectionGradeParams},
        SubsectionGrades,
    },
    storage::{
        pluggables::{KVStore, KVTransaction, Key},
        variables,
    },
    types::{
        block_record::BlockRecord,
        data_types::{CourseKey, RowId, Timestamp, UsageKey, UserId},
        visible_blocks::VisibleBlocks,
    },
};

mod common;

use common::{
    collaborators::{SingleCourse, TickingClock},
    logging::setup_logger,
    mem_db::MemDB,
};

const EDITED: Timestamp = Timestamp::from_micros(1_690_000_000_000_000);

fn blocks(records: &[(&str, f64, f64)]) -> VisibleBlocks {
    VisibleBlocks::new(
        records
            .iter()
            .map(|(locator, weight, max_score)| BlockRecord::new(*locator, *weight, *max_score)),
    )
    .unwrap()
}

fn params(
    user_id: i64,
    usage_key: &str,
    earned: f64,
    visible_blocks: VisibleBlocks,
) -> SubsectionGradeParams {
    SubsectionGradeParams::builder()
        .user_id(user_id)
        .usage_key(usage_key)
        .course_version("5f0c3a2b")
        .subtree_edited_date(EDITED)
        .earned_all(earned)
        .possible_all(10.0)
        .earned_graded(earned)
        .possible_graded(10.0)
        .visible_blocks(visible_blocks)
        .build()
}

fn grades(kv_store: MemDB) -> SubsectionGrades<MemDB, SingleCourse> {
    SubsectionGrades::builder()
        .kv_store(kv_store)
        .course_lookup(SingleCourse::demo())
        .configuration(Configuration::builder().log_events(true).build())
        .clock(Arc::new(TickingClock::starting_at(1_700_000_000)))
        .build()
}

fn assert_matches_params(grade: &PersistentSubsectionGrade, params: &SubsectionGradeParams) {
    assert_eq!(grade.user_id, params.user_id);
    assert_eq!(grade.course_key, SingleCourse::demo().0);
    assert_eq!(grade.usage_key, params.usage_key);
    assert_eq!(grade.course_version, params.course_version);
    assert_eq!(grade.subtree_edited_date, params.subtree_edited_date);
    assert_eq!(grade.earned_all, params.earned_all);
    assert_eq!(grade.possible_all, params.possible_all);
    assert_eq!(grade.earned_graded, params.earned_graded);
    assert_eq!(grade.possible_graded, params.possible_graded);
    assert_eq!(
        &grade.visible_blocks_hash,
        params.visible_blocks.to_content_hash().unwrap()
    );
}

#[test]
fn read_after_create_test() {
    setup_logger(LevelFilter::Info);
    let grades = grades(MemDB::new());

    let params = params(7, "seq1", 6.5, blocks(&[("b1", 1.0, 10.0), ("b2", 0.5, 4.0)]));
    let created = grades.create(&params).unwrap();
    let read = grades.read(UserId::new(7), &UsageKey::new("seq1")).unwrap();

    assert_eq!(read, created);
    assert_matches_params(&read, &params);
    assert_eq!(read.id, RowId::new(1));
    assert_eq!(read.created.micros(), 1_700_000_000_000_000);
    assert_eq!(read.modified, read.created);
}

/// Tests the lifecycle of one grade: created at 8/10, updated to 9/10, read back as 9/10, and stored
/// as a single row throughout.
#[test]
fn create_then_update_test() {
    setup_logger(LevelFilter::Info);
    let kv_store = MemDB::new();
    let grades = grades(kv_store.clone());
    let user_id = UserId::new(42);
    let usage_key = UsageKey::new("seq1");

    let created = grades
        .create(&params(42, "seq1", 8.0, blocks(&[("b1", 1.0, 10.0)])))
        .unwrap();
    let updated = grades
        .update(&params(42, "seq1", 9.0, blocks(&[("b1", 1.0, 10.0)])))
        .unwrap();
    let read = grades.read(user_id, &usage_key).unwrap();

    assert_eq!(read, updated);
    assert_eq!(read.earned_all, 9.0);
    assert_eq!(read.earned_graded, 9.0);
    assert_eq!(read.id, created.id);
    assert_eq!(read.created, created.created);
    assert!(read.modified > created.modified);
    assert_eq!(kv_store.count_keys(&variables::SUBSECTION_GRADES), 1);
    assert_eq!(kv_store.count_keys(&variables::VISIBLE_BLOCKS), 1);
}

#[test]
fn update_missing_grade_test() {
    let grades = grades(MemDB::new());

    match grades.update(&params(42, "seq1", 9.0, blocks(&[("b1", 1.0, 10.0)]))) {
        Err(GradesError::NotFound { key }) => assert_eq!(
            key,
            Key::SubsectionGrade {
                user_id: UserId::new(42),
                usage_key: UsageKey::new("seq1")
            }
        ),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(matches!(
        grades.read(UserId::new(42), &UsageKey::new("seq1")),
        Err(GradesError::NotFound { .. })
    ));
}

#[test]
fn create_existing_grade_test() {
    let kv_store = MemDB::new();
    let grades = grades(kv_store.clone());
    let params = params(42, "seq1", 8.0, blocks(&[("b1", 1.0, 10.0)]));

    grades.create(&params).unwrap();
    assert!(matches!(
        grades.create(&params),
        Err(GradesError::DuplicateKey { .. })
    ));

    // The rejected create did not consume a row id.
    let other = grades
        .create(&params_for_other_user(&params))
        .unwrap();
    assert_eq!(other.id, RowId::new(2));
    assert_eq!(kv_store.count_keys(&variables::SUBSECTION_GRADES), 2);
}

fn params_for_other_user(params: &SubsectionGradeParams) -> SubsectionGradeParams {
    let mut other = params.clone();
    other.user_id = UserId::new(params.user_id.int() + 1);
    other
}

#[test]
fn save_grade_test() {
    setup_logger(LevelFilter::Info);
    let kv_store = MemDB::new();
    let grades = grades(kv_store.clone());

    let first = grades
        .save_grade(&params(42, "seq1", 3.0, blocks(&[("b1", 1.0, 10.0)])))
        .unwrap();
    let second = grades
        .save_grade(&params(
            42,
            "seq1",
            7.0,
            blocks(&[("b1", 1.0, 10.0), ("b2", 1.0, 5.0)]),
        ))
        .unwrap();
    let read = grades.read(UserId::new(42), &UsageKey::new("seq1")).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(read, second);
    assert_eq!(read.earned_all, 7.0);
    assert_eq!(kv_store.count_keys(&variables::SUBSECTION_GRADES), 1);
    assert_eq!(kv_store.count_keys(&variables::VISIBLE_BLOCKS), 2);
}

#[test]
fn visible_blocks_of_grade_test() {
    let grades = grades(MemDB::new());
    let before = blocks(&[("b1", 1.0, 10.0)]);
    let after = blocks(&[("b1", 1.0, 10.0), ("b3", 2.0, 2.0)]);

    let created = grades.create(&params(42, "seq1", 8.0, before.clone())).unwrap();
    assert_eq!(grades.visible_blocks(&created).unwrap(), before);

    let updated = grades.update(&params(42, "seq1", 8.0, after.clone())).unwrap();
    assert_eq!(grades.visible_blocks(&updated).unwrap(), after);

    // Entries are never deleted, so the old grade's blocks can still be resolved.
    assert_eq!(grades.visible_blocks(&created).unwrap(), before);
}

#[test]
fn invalid_params_test() {
    let kv_store = MemDB::new();
    let grades = grades(kv_store.clone());
    let valid = params(42, "seq1", 8.0, blocks(&[("b1", 1.0, 10.0)]));

    let mut blank_version = valid.clone();
    blank_version.course_version = "".into();

    let mut long_usage_key = valid.clone();
    long_usage_key.usage_key = UsageKey::new("s".repeat(256));

    let mut non_finite = valid.clone();
    non_finite.earned_all = f64::NAN;

    let mut infinite = valid.clone();
    infinite.possible_graded = f64::INFINITY;

    for invalid in [blank_version, long_usage_key, non_finite, infinite] {
        assert!(matches!(
            grades.save_grade(&invalid),
            Err(GradesError::InvalidInput { .. })
        ));
    }
    assert_eq!(kv_store.count_keys(&variables::SUBSECTION_GRADES), 0);
    assert_eq!(kv_store.count_keys(&variables::VISIBLE_BLOCKS), 0);

    // Exactly at the limit is fine.
    let mut longest_usage_key = valid;
    longest_usage_key.usage_key = UsageKey::new("s".repeat(255));
    grades.create(&longest_usage_key).unwrap();
}

#[test]
fn non_finite_block_record_test() {
    let records = vec![BlockRecord::new("b1", f64::NAN, 10.0)];
    let err: GradesError = VisibleBlocks::new(records).unwrap_err().into();
    assert!(matches!(err, GradesError::InvalidInput { .. }));
}

#[test]
fn opaque_key_lookup_test() {
    let grades = SubsectionGrades::builder()
        .kv_store(MemDB::new())
        .course_lookup(OpaqueKeyLookup)
        .configuration(Configuration::builder().log_events(false).build())
        .build();
    let usage_key = "block-v1:edX+DemoX+2024+type@sequential+block@seq1";

    let grade = grades
        .create(&params(42, usage_key, 8.0, blocks(&[("b1", 1.0, 10.0)])))
        .unwrap();
    assert_eq!(grade.course_key, CourseKey::new("course-v1:edX+DemoX+2024"));
    assert_eq!(
        grades.read(UserId::new(42), &UsageKey::new(usage_key)).unwrap(),
        grade
    );

    // A usage key whose course cannot be determined is rejected.
    assert!(matches!(
        grades.create(&params(42, "seq1", 8.0, blocks(&[("b1", 1.0, 10.0)]))),
        Err(GradesError::InvalidInput { .. })
    ));
    assert!(matches!(
        grades.read(UserId::new(42), &UsageKey::new("seq1")),
        Err(GradesError::InvalidInput { .. })
    ));
}

/// Tests that grades written into a caller's transaction become visible only when it commits, and
/// disappear if it rolls back.
#[test]
fn caller_transaction_test() {
    let kv_store = MemDB::new();
    let grades = grades(kv_store.clone());
    let shared = blocks(&[("b1", 1.0, 10.0)]);

    // 1. Create two grades in one transaction, and update one of them before committing.
    let mut transaction = kv_store.begin();
    grades
        .create_in(&mut transaction, &params(1, "seq1", 2.0, shared.clone()))
        .unwrap();
    grades
        .create_in(&mut transaction, &params(2, "seq1", 4.0, shared.clone()))
        .unwrap();
    grades
        .update_in(&mut transaction, &params(2, "seq1", 5.0, shared.clone()))
        .unwrap();
    assert_eq!(
        grades
            .read_in(&transaction, UserId::new(2), &UsageKey::new("seq1"))
            .unwrap()
            .earned_all,
        5.0
    );
    assert!(grades.read(UserId::new(1), &UsageKey::new("seq1")).is_err());
    transaction.commit().unwrap();

    assert_eq!(
        grades.read(UserId::new(1), &UsageKey::new("seq1")).unwrap().earned_all,
        2.0
    );
    assert_eq!(
        grades.read(UserId::new(2), &UsageKey::new("seq1")).unwrap().earned_all,
        5.0
    );
    assert_eq!(kv_store.count_keys(&variables::VISIBLE_BLOCKS), 1);

    // 2. Create a grade in a transaction that is dropped without committing.
    {
        let mut transaction = kv_store.begin();
        grades
            .create_in(&mut transaction, &params(3, "seq1", 1.0, shared.clone()))
            .unwrap();
    }
    assert!(matches!(
        grades.read(UserId::new(3), &UsageKey::new("seq1")),
        Err(GradesError::NotFound { .. })
    ));
    grades.create(&params(3, "seq1", 1.0, shared)).unwrap();
}

#[test]
fn events_test() {
    setup_logger(LevelFilter::Info);
    let (sender, receiver) = mpsc::channel();
    let grades = SubsectionGrades::builder()
        .kv_store(MemDB::new())
        .course_lookup(SingleCourse::demo())
        .configuration(Configuration::builder().log_events(true).build())
        .event_publisher(sender)
        .build();
    let visible_blocks = blocks(&[("b1", 1.0, 10.0)]);
    let hash = visible_blocks.to_content_hash().unwrap().clone();

    // 1. A create inserts both the visible blocks and the grade.
    grades
        .create(&params(42, "seq1", 8.0, visible_blocks.clone()))
        .unwrap();
    let events: Vec<Event> = receiver.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::InsertVisibleBlocks(event) if event.hash == hash));
    assert!(matches!(
        &events[1],
        Event::InsertSubsectionGrade(event) if event.user_id == UserId::new(42) && event.visible_blocks_hash == hash
    ));

    // 2. An update with the same blocks only updates the grade.
    grades
        .update(&params(42, "seq1", 9.0, visible_blocks))
        .unwrap();
    let events: Vec<Event> = receiver.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::UpdateSubsectionGrade(event) if event.visible_blocks_hash == hash));

    // 3. Failed writes emit nothing.
    assert!(grades
        .update(&params(43, "seq1", 9.0, blocks(&[("b1", 1.0, 10.0)])))
        .is_err());
    assert!(receiver.try_recv().is_err());
}

#[test]
fn grade_display_test() {
    let grades = grades(MemDB::new());
    let grade = grades
        .create(&params(42, "seq1", 8.0, blocks(&[("b1", 1.0, 10.0)])))
        .unwrap();

    assert_eq!(
        grade.to_string(),
        "PersistentSubsectionGrade user:42, subsection seq1. 8/10 graded, 8/10 all"
    );
}
