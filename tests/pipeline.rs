use lib::{
    LoadOutcome, PipelineError, RelationalStore, SqliteStore, TransformConfig, apps_from_table,
    extract_file, load, reviews_from_table, transform,
};
use std::fs;
use std::path::Path;

const EPSILON: f64 = 1e-9;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn end_to_end_food_and_drink() {
    let dir = tempfile::tempdir().unwrap();
    let apps_path = write(
        dir.path(),
        "apps_data.csv",
        "App,Category,Rating,Reviews,Installs\n\
         A,FOOD_AND_DRINK,4.5,1500,\"10,000+\"\n\
         B,FOOD_AND_DRINK,3.9,5000,\"1,000+\"\n\
         Z,1.9,19,3.0M,Free\n\
         Y,GAME,4.1,,10+\n",
    );
    let reviews_path = write(
        dir.path(),
        "review_data.csv",
        "App,Sentiment_Polarity\nA,0.5\nA,0.3\n",
    );

    let apps = apps_from_table(&extract_file(&apps_path).unwrap()).unwrap();
    let reviews = reviews_from_table(&extract_file(&reviews_path).unwrap()).unwrap();
    let config = TransformConfig {
        snapshot_path: dir.path().join("top_apps.csv"),
        ..TransformConfig::default()
    };

    let report = transform(&apps, &reviews, &config).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].app, "A");
    assert_eq!(report[0].rating, 4.5);
    assert_eq!(report[0].reviews, 1500);
    assert_eq!(report[0].installs, "10,000+");
    assert!((report[0].sentiment_polarity.unwrap() - 0.4).abs() < EPSILON);

    let snapshot = extract_file(&config.snapshot_path).unwrap();
    assert_eq!(
        snapshot.headers,
        vec!["", "App", "Rating", "Reviews", "Installs", "Sentiment_Polarity"]
    );
    assert_eq!(snapshot.shape(), (1, 6));
    assert_eq!(snapshot.rows[0][0], "0");

    let database = dir.path().join("market_research");
    let outcome = load(&report, &database, "top_apps").unwrap();
    assert_eq!(outcome, LoadOutcome::Validated);

    let store = SqliteStore::open(&database).unwrap();
    assert_eq!(store.read_table("top_apps").unwrap().shape(), (1, 5));
}

#[test]
fn repeated_runs_produce_identical_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let apps_path = write(
        dir.path(),
        "apps_data.csv",
        "App,Category,Rating,Reviews,Installs\n\
         A,FOOD_AND_DRINK,4.5,1500,100+\n\
         B,FOOD_AND_DRINK,4.5,1500,100+\n\
         C,FOOD_AND_DRINK,4.8,2500,100+\n\
         A,FOOD_AND_DRINK,4.9,9999,100+\n",
    );
    let reviews_path = write(
        dir.path(),
        "review_data.csv",
        "App,Translated_Review,Sentiment_Polarity\n\
         A,Good,0.2\n\
         A,Good,0.2\n\
         C,Fine,\n",
    );

    let apps = apps_from_table(&extract_file(&apps_path).unwrap()).unwrap();
    let reviews = reviews_from_table(&extract_file(&reviews_path).unwrap()).unwrap();
    let config = TransformConfig {
        snapshot_path: dir.path().join("top_apps.csv"),
        ..TransformConfig::default()
    };

    let first = transform(&apps, &reviews, &config).unwrap();
    let first_bytes = fs::read(&config.snapshot_path).unwrap();
    let second = transform(&apps, &reviews, &config).unwrap();
    let second_bytes = fs::read(&config.snapshot_path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);

    let names: Vec<&str> = first.iter().map(|row| row.app.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);
    assert_eq!(first[1].sentiment_polarity, Some(0.2));
    assert_eq!(first[0].sentiment_polarity, None);
}

#[test]
fn missing_column_aborts_with_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let apps_path = write(
        dir.path(),
        "apps_data.csv",
        "App,Rating,Reviews,Installs\nA,4.5,1500,100+\n",
    );

    let err = apps_from_table(&extract_file(&apps_path).unwrap()).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { .. }));
    assert!(err.to_string().contains("Category"));
}
