mod common;

use common::{todo_mapper, Todo};
use docmapper_core::{
    Filter, FindOptions, MapperError, Pagination, Projection, SortOrder, Sorting,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;

#[test]
fn end_to_end_people_scenario() {
    let mapper = todo_mapper("people");

    let todo = Todo::new("a");
    mapper.save(&todo).unwrap();

    let found = mapper.find_all().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "a");
    assert_eq!(found[0].id, todo.id);

    let done = Todo {
        done: true,
        ..todo.clone()
    };
    let updated = mapper.update(&todo.id_value(), &done).unwrap();
    assert!(updated.done);
    assert_eq!(updated.id, todo.id);

    let removed = mapper.remove(&todo.id_value()).unwrap();
    assert_eq!(removed.id, todo.id);
    assert!(removed.done);

    assert!(mapper.find_all().unwrap().is_empty());
}

#[test]
fn save_rejects_unrecognized_entity_and_writes_nothing() {
    let mapper = todo_mapper("todos");

    let malformed = Todo {
        id: "not-a-uuid".to_string(),
        text: "broken".to_string(),
        done: false,
    };
    let err = mapper.save(&malformed).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { expected } if expected == "Todo"));

    assert!(mapper.find_all().unwrap().is_empty());
}

#[test]
fn update_rejects_unrecognized_entity() {
    let mapper = todo_mapper("todos");
    let todo = Todo::new("fine");
    mapper.save(&todo).unwrap();

    let malformed = Todo {
        id: "not-a-uuid".to_string(),
        ..todo.clone()
    };
    let err = mapper.update(&todo.id_value(), &malformed).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { .. }));
}

#[test]
fn update_missing_id_fails_and_leaves_collection_unchanged() {
    let mapper = todo_mapper("todos");
    let todo = Todo::new("stays");
    mapper.save(&todo).unwrap();

    let ghost = Todo::new("ghost");
    let err = mapper.update(&ghost.id_value(), &ghost).unwrap_err();
    assert!(matches!(err, MapperError::NotFound(_)));

    let found = mapper.find_all().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], todo);
}

#[test]
fn update_never_alters_the_stored_identifier() {
    let mapper = todo_mapper("todos");
    let todo = Todo::new("original");
    mapper.save(&todo).unwrap();

    // Entity carries a different (valid) id; the target id must win.
    let imposter = Todo {
        text: "renamed".to_string(),
        ..Todo::new("ignored")
    };
    let updated = mapper.update(&todo.id_value(), &imposter).unwrap();
    assert_eq!(updated.id, todo.id);
    assert_eq!(updated.text, "renamed");

    let found = mapper.find_all().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, todo.id);
}

#[test]
fn remove_missing_id_fails_with_not_found() {
    let mapper = todo_mapper("todos");

    let err = mapper.remove(&json!("no-such-id")).unwrap_err();
    assert!(matches!(err, MapperError::NotFound(_)));
}

#[test]
fn duplicate_identifier_surfaces_store_error() {
    let mapper = todo_mapper("todos");
    let todo = Todo::new("once");
    mapper.save(&todo).unwrap();

    let err = mapper.save(&todo).unwrap_err();
    assert!(matches!(err, MapperError::Store(_)));
}

#[test]
fn find_filters_by_field_equality() {
    let mapper = todo_mapper("todos");
    mapper.save(&Todo::new("open one")).unwrap();
    mapper
        .save(&Todo {
            done: true,
            ..Todo::new("closed one")
        })
        .unwrap();

    let mut filter = Filter::new();
    filter.insert("done".to_string(), json!(true));
    let found = mapper.find(&filter, &FindOptions::default()).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "closed one");
}

#[test]
fn find_preserves_natural_order_by_default() {
    let mapper = todo_mapper("todos");
    for text in ["first", "second", "third"] {
        mapper.save(&Todo::new(text)).unwrap();
    }

    let texts: Vec<_> = mapper
        .find_all()
        .unwrap()
        .into_iter()
        .map(|todo| todo.text)
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[test]
fn find_applies_sort_and_pagination() {
    let mapper = todo_mapper("todos");
    for text in ["banana", "apple", "cherry", "date"] {
        mapper.save(&Todo::new(text)).unwrap();
    }

    let options = FindOptions {
        sorting: Sorting::by("text", SortOrder::Ascending),
        pagination: Pagination { skip: 1, limit: 2 },
        ..FindOptions::default()
    };
    let texts: Vec<_> = mapper
        .find(&Filter::new(), &options)
        .unwrap()
        .into_iter()
        .map(|todo| todo.text)
        .collect();
    assert_eq!(texts, vec!["banana", "cherry"]);
}

#[test]
fn projected_results_still_construct_entities() {
    let mapper = todo_mapper("todos");
    mapper
        .save(&Todo {
            done: true,
            ..Todo::new("keep text only")
        })
        .unwrap();

    let options = FindOptions {
        projection: Projection::Include(vec!["text".to_string()]),
        ..FindOptions::default()
    };
    let found = mapper.find(&Filter::new(), &options).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "keep text only");
    // `done` was projected away; the factory defaults it.
    assert!(!found[0].done);
}

#[test]
fn one_session_supports_concurrent_callers() {
    let mapper = Arc::new(todo_mapper("todos"));

    thread::scope(|scope| {
        for worker in 0..4 {
            let mapper = Arc::clone(&mapper);
            scope.spawn(move || {
                mapper.save(&Todo::new(format!("from worker {worker}"))).unwrap();
            });
        }
    });

    assert_eq!(mapper.find_all().unwrap().len(), 4);
}
