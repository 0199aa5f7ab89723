//! End-to-end study scenarios: ingestion, grouping, edits and persistence together.

use std::sync::atomic::AtomicBool;

use kv_core::save::{load_from_path, save_to_path};
use kv_core::{
    ingest_batch, AxisDefinition, ConsistencyError, ErrorCategory, GroupRequest, MetadataEdit,
    NameError, SchemaEditViolation, SchemaError, SchemaModel, SharedStudy, Study, StudyError,
    StudyRecord, SubmitError,
};
use tempfile::TempDir;

fn jump_study() -> Study {
    let schema = SchemaModel::create(
        vec![
            AxisDefinition::new("TipoSalto", ["CMJ", "SJ"]),
            AxisDefinition::new("Condicion", ["PRE", "POST"]),
        ],
        4,
        3,
    )
    .unwrap();
    Study::create("Saltos verticales", "", schema).unwrap()
}

#[test]
fn test_reference_scenario() {
    let mut study = jump_study();

    assert!(study.submit("P01 CMJ PRE 01.txt").is_ok());
    assert!(study.submit("P01 CMJ POST 01.txt").is_ok());
    assert_eq!(
        study.submit("P01 SJ PRE 01.txt"),
        Err(SubmitError::Consistency(ConsistencyError::FixedAxisMismatch {
            axis: "TipoSalto".into(),
            locked: "CMJ".into(),
            attempted: "SJ".into(),
        }))
    );
    assert_eq!(
        study.submit("Sujeto05 Nulo Nulo 01.txt"),
        Err(SubmitError::Name(NameError::AllAxesAbsent))
    );

    let err = study.submit("P04 CMJ 02.txt").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Structural);

    assert_eq!(study.ledger().len(), 2);
    assert_eq!(study.ledger().locked_selection("P01", 0), Some("CMJ"));
}

#[test]
fn test_group_order_ignores_insertion_order() {
    let names = ["P01 CMJ POST 01.txt", "P02 SJ PRE 01.txt", "P03 CMJ PRE 02.txt"];

    let mut forward = jump_study();
    let mut backward = jump_study();
    let cancel = AtomicBool::new(false);
    ingest_batch(&mut forward, names, &cancel);
    ingest_batch(&mut backward, names.iter().rev().copied(), &cancel);

    let request = GroupRequest::one_axis("Condicion");
    let a = forward.resolve_groups(&request).unwrap();
    let b = backward.resolve_groups(&request).unwrap();

    let values: Vec<&str> = a.groups.iter().map(|g| g.value.as_str()).collect();
    assert_eq!(values, ["PRE", "POST"]);
    assert_eq!(a, b);
}

#[test]
fn test_shrinking_participant_limit() {
    let mut study = jump_study();
    for name in ["P01 CMJ PRE 01.txt", "P02 CMJ PRE 01.txt", "P03 SJ POST 01.txt"] {
        study.submit(name).unwrap();
    }

    assert_eq!(
        study.edit_metadata(None, &MetadataEdit::default().max_participants(2)),
        Err(StudyError::Schema(SchemaError::Edit(
            SchemaEditViolation::ParticipantLimitBelowRecorded { requested: 2, recorded: 3 }
        )))
    );
    study.edit_metadata(None, &MetadataEdit::default().max_participants(3)).unwrap();

    assert_eq!(
        study.submit("P04 CMJ PRE 01.txt"),
        Err(SubmitError::Consistency(ConsistencyError::ParticipantLimitExceeded {
            participant: "P04".into(),
            limit: 3,
        }))
    );
}

#[test]
fn test_mandatory_coverage_report() {
    let schema = SchemaModel::create(
        vec![
            AxisDefinition::new("Lado", ["Izq", "Der"]).mandatory(),
            AxisDefinition::new("Fase", ["F1", "F2"]),
        ],
        10,
        10,
    )
    .unwrap();
    let mut study = Study::create("Marcha", "", schema).unwrap();
    study.submit("P01 Izq F1 01.txt").unwrap();
    study.submit("P01 Der F1 02.txt").unwrap();
    study.submit("P02 Der Nulo 01.txt").unwrap();

    assert_eq!(
        study.submit("P03 Nulo F1 01.txt"),
        Err(SubmitError::Name(NameError::InvalidAbsentForMandatoryAxis { axis: "Lado".into() }))
    );

    let gaps = study.missing_mandatory();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].participant, "P02");
    assert_eq!(gaps[0].missing, ["Izq"]);

    let params = study.study_parameters();
    assert_eq!(params.participants, ["P01", "P02"]);
}

#[test]
fn test_persisted_study_keeps_locks() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("saltos.kvs");

    let mut study = jump_study();
    study.submit("P01 CMJ PRE 01.txt").unwrap();
    study.set_alias("CMJ", "Contramovimiento").unwrap();
    save_to_path(&path, &StudyRecord::from_study(&study)).unwrap();

    let mut restored = load_from_path(&path).unwrap().into_study().unwrap();
    assert_eq!(restored, study);
    assert!(restored.schema().is_committed());
    assert!(matches!(
        restored.submit("P01 SJ POST 01.txt"),
        Err(SubmitError::Consistency(ConsistencyError::FixedAxisMismatch { .. }))
    ));
    assert_eq!(restored.aliases().display("CMJ"), "Contramovimiento");
}

#[test]
fn test_punctuated_sub_values_survive_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("carga.kvs");

    let schema = SchemaModel::create(
        vec![
            AxisDefinition::new("Carga", ["0,5kg", "1-0kg"]),
            AxisDefinition::new("Condicion", ["PRE", "POST"]),
        ],
        4,
        3,
    )
    .unwrap();
    let mut study = Study::create("Cargas", "", schema).unwrap();
    study.submit("P01 0,5kg PRE 01.txt").unwrap();
    study.submit("P02 1-0kg POST 02_Cinematica.txt").unwrap();

    save_to_path(&path, &StudyRecord::from_study(&study)).unwrap();
    let restored = load_from_path(&path).unwrap().into_study().unwrap();
    assert_eq!(restored, study);
    assert_eq!(restored.file_names(), ["P01 0,5kg PRE 01", "P02 1-0kg POST 02"]);
}

#[test]
fn test_dotted_sub_values_rejected_at_creation() {
    let result = SchemaModel::create(
        vec![
            AxisDefinition::new("Carga", ["0.5kg", "1.0kg"]),
            AxisDefinition::new("Condicion", ["PRE", "POST"]),
        ],
        4,
        3,
    );
    assert!(matches!(result, Err(SchemaError::InvalidSubValue { .. })));
}

#[test]
fn test_shared_study_snapshot_during_ingest() {
    let shared = SharedStudy::new(jump_study());
    let cancel = AtomicBool::new(false);
    let report = shared
        .ingest_batch(["P01 CMJ PRE 01.txt", "P01 CMJ PRE 04.txt", "P02 SJ PRE 02.txt"], &cancel)
        .unwrap();

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(
        report.rejected[0].error,
        SubmitError::Consistency(ConsistencyError::AttemptLimitExceeded { attempt: 4, limit: 3 })
    );

    let snapshot = shared.snapshot().unwrap();
    assert_eq!(snapshot.file_names(), ["P01 CMJ PRE 01", "P02 SJ PRE 02"]);
}
