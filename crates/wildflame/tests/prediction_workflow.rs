use std::path::PathBuf;
use std::sync::Arc;

use wildflame::workflows::history::HistoricalTrends;
use wildflame::workflows::prediction::{
    CoordinateSource, Coordinates, FeatureSchema, FireClassifier, ForestClassifier,
    OfflineGeocoder, PredictionBlocked, PredictionSession, SessionPhase, Severity,
    UNKNOWN_LOCATION,
};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn bundled_artifacts() -> (FeatureSchema, ForestClassifier) {
    let schema = FeatureSchema::from_path(data_dir().join("feature_columns.json"))
        .expect("bundled schema loads");
    let classifier = ForestClassifier::from_path(data_dir().join("fire_model.json"), &schema)
        .expect("bundled model loads");
    (schema, classifier)
}

fn bundled_session() -> PredictionSession<ForestClassifier, OfflineGeocoder> {
    let (schema, classifier) = bundled_artifacts();
    PredictionSession::new(
        Arc::new(schema),
        Arc::new(classifier),
        Arc::new(OfflineGeocoder),
    )
}

fn fill(session: &mut PredictionSession<ForestClassifier, OfflineGeocoder>, values: &[&str]) {
    let names: Vec<String> = session.schema().names().map(str::to_string).collect();
    assert_eq!(names.len(), values.len(), "one value per bundled feature");
    for (name, value) in names.iter().zip(values) {
        session
            .set_feature(name, *value)
            .expect("bundled feature name");
    }
}

// day, month, year, temp, RH, wind, rain, FFMC, DMC, DC, ISI, BUI, FWI, latitude, longitude
const DAMP_MORNING: [&str; 15] = [
    "15", "7", "2012", "29", "57", "18", "0", "65.7", "3.4", "7.6", "1.3", "3.4", "0.5",
    "36.19", "5.41",
];
const DROUGHT_AFTERNOON: [&str; 15] = [
    "8", "8", "2012", "40", "15", "25", "0", "96", "300", "800", "20", "310", "60",
    "35.2", "-0.63",
];
const DRY_SPELL: [&str; 15] = [
    "20", "8", "2012", "38", "25", "20", "0", "95", "150", "400", "15", "160", "40",
    "35.2", "-0.63",
];

#[test]
fn bundled_artifacts_describe_the_same_features() {
    let (schema, classifier) = bundled_artifacts();
    assert_eq!(schema.len(), 15);
    assert_eq!(classifier.labels(), ["not fire".to_string(), "fire".to_string()]);

    let importances = classifier.feature_importances();
    assert_eq!(importances.first().map(|(name, _)| name.as_str()), Some("FFMC"));
    assert!(importances.iter().all(|(name, _)| schema.contains(name)));
}

#[test]
fn damp_conditions_predict_no_fire_without_severity() {
    let mut session = bundled_session();
    fill(&mut session, &DAMP_MORNING);

    let snapshot = session.trigger_predict().expect("complete inputs predict");
    assert_eq!(snapshot.label, "not fire");
    assert_eq!(snapshot.severity, None);
    assert_eq!(
        snapshot.location.coordinates,
        Coordinates {
            latitude: 36.19,
            longitude: 5.41
        }
    );
    assert_eq!(snapshot.location.source, CoordinateSource::Supplied);
    assert_eq!(snapshot.location.place_name, UNKNOWN_LOCATION);
}

#[test]
fn drought_conditions_predict_high_severity_fire() {
    let mut session = bundled_session();
    fill(&mut session, &DROUGHT_AFTERNOON);

    let snapshot = session.trigger_predict().expect("complete inputs predict");
    assert_eq!(snapshot.label, "fire");
    assert_eq!(snapshot.severity, Some(Severity::High));
}

#[test]
fn dry_spell_predicts_medium_severity_fire() {
    let mut session = bundled_session();
    fill(&mut session, &DRY_SPELL);

    let snapshot = session.trigger_predict().expect("complete inputs predict");
    assert_eq!(snapshot.label, "fire");
    assert_eq!(snapshot.severity, Some(Severity::Medium));
}

#[test]
fn clearing_a_field_after_prediction_blocks_the_next_one() {
    let mut session = bundled_session();
    fill(&mut session, &DRY_SPELL);
    let snapshot = session.trigger_predict().expect("predicts").clone();

    session.set_feature("longitude", "").expect("bundled feature");
    let blocked = session.trigger_predict().expect_err("longitude is blank");
    assert_eq!(
        blocked,
        PredictionBlocked::Incomplete {
            missing: vec!["longitude".to_string()]
        }
    );
    assert_eq!(session.phase(), SessionPhase::Predicted);
    assert_eq!(session.read_snapshot(), Some(&snapshot));

    session.trigger_reset();
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.inputs().is_blank());
}

#[test]
fn bundled_history_counts_one_season() {
    let trends = HistoricalTrends::from_path(data_dir().join("forest_fire_history.csv"))
        .expect("bundled records load");

    assert_eq!(trends.years.len(), 1);
    let season = &trends.years[0];
    assert_eq!(season.year, 2012);
    assert_eq!(season.counts["fire"] + season.counts["not fire"], season.total);
    assert_eq!(season.total, 24);
}
