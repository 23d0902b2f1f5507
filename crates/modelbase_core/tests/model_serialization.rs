mod support;

use chrono::NaiveDate;
use modelbase_core::{ErrorKind, Model, ModelError, Record, Value};
use support::{jon_birthdate, Dummy, Event, Gadget, ReprDummy, TestDb};

fn launch() -> Event {
    Event {
        id: Some(3),
        title: "Launch".to_string(),
        starts_at: NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_milli_opt(9, 30, 0, 250)
            .unwrap(),
        day: Some(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()),
        all_day: false,
    }
}

#[test]
fn to_dict_skips_private_attributes_and_unsaved_id() {
    let dummy = ReprDummy {
        firstname: Some("John".to_string()),
        age: Some(35),
        secret: Some("hunter2".to_string()),
        ..ReprDummy::default()
    };

    let dict = dummy.to_dict();

    let keys: Vec<&str> = dict.keys().collect();
    assert_eq!(keys, vec!["age", "firstname"]);
    assert_eq!(dict.get("age"), Some(&Value::Integer(35)));
}

#[test]
fn to_dict_keeps_saved_id_and_null_attributes() {
    let mut dummy = Dummy::new("Jon", None);
    dummy.id = Some(4);

    let dict = dummy.to_dict();

    assert_eq!(dict.get("id"), Some(&Value::Integer(4)));
    assert_eq!(dict.get("birthdate"), Some(&Value::Null));
}

#[test]
fn to_json_renders_dates_as_iso_8601() {
    let json: serde_json::Value = serde_json::from_str(&launch().to_json()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "id": 3,
            "title": "Launch",
            "starts_at": "2024-05-17T09:30:00.250",
            "day": "2024-05-17",
            "all_day": false,
        })
    );
}

#[test]
fn json_round_trip_restores_dates_and_datetimes() {
    let event = launch();

    let restored = Event::from_json(&event.to_json()).unwrap();

    assert_eq!(restored, event);
}

#[test]
fn dict_round_trip_without_dates_is_identity() {
    let mut gadget = Gadget::new(
        Record::new()
            .with("label", "lamp")
            .with("weight", 2.5)
            .with("active", true),
    );
    gadget.id = Some(8);

    let restored = Gadget::from_dict(gadget.to_dict()).unwrap();

    assert_eq!(restored, gadget);
}

#[test]
fn from_dict_parses_dates_by_column_type() {
    let record = Record::new()
        .with("name", "2020-01-01")
        .with("birthdate", "1986-04-04");

    let dummy = Dummy::from_dict(record).unwrap();

    assert_eq!(dummy.name, "2020-01-01");
    assert_eq!(dummy.birthdate, Some(jon_birthdate()));
    assert_eq!(dummy.id, None);
}

#[test]
fn from_dict_accepts_bare_dates_for_datetime_columns() {
    let event = Event::from_dict(
        Record::new()
            .with("title", "Launch")
            .with("starts_at", "2024-05-17")
            .with("all_day", true),
    )
    .unwrap();

    assert_eq!(
        event.starts_at,
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );
}

#[test]
fn from_dict_rejects_unknown_and_mistyped_attributes() {
    let unknown = Dummy::from_dict(Record::new().with("name", "Jon").with("nickname", "J"))
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::InvalidModelAttribute);

    let mistyped = Dummy::from_dict(Record::new().with("name", "Jon").with("birthdate", "soon"))
        .unwrap_err();
    assert_eq!(mistyped.kind(), ErrorKind::InvalidModelAttribute);

    let missing = Dummy::from_dict(Record::new()).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::InvalidModelAttribute);
}

#[test]
fn from_json_wraps_decode_errors() {
    let err = Dummy::from_json("{\"name\": \"Jon\", \"birthdate\": ").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnableToCreateModelFromJSON);
    let source = std::error::Error::source(&err).unwrap();
    assert!(source.is::<serde_json::Error>());
}

#[test]
fn from_json_rejects_non_objects_and_nested_values() {
    for text in ["[1, 2]", "\"Jon\"", "{\"name\": {\"first\": \"Jon\"}}"] {
        let err = Dummy::from_json(text).unwrap_err();
        assert!(
            matches!(err, ModelError::UnableToCreateModelFromJSON(_)),
            "`{text}` should be rejected"
        );
    }
}

#[test]
fn json_from_storage_survives_a_round_trip() {
    let test_db = TestDb::new();
    let saved = Dummy::new("Jon", Some(jon_birthdate()))
        .save(&test_db.db)
        .unwrap();

    let restored = Dummy::from_json(&saved.to_json()).unwrap();

    assert_eq!(restored, saved);
    assert_eq!(Dummy::fetch(&test_db.db, saved.id.unwrap()).unwrap(), restored);
}
