/// Tests for SequenceList error handling and ordering across index wrap

use metavoxel_shared::{SequenceError, SequenceList};

#[derive(Debug, PartialEq)]
struct Record {
    version: u32,
}

#[test]
fn try_insert_rejects_duplicate_id() {
    let mut list = SequenceList::new();
    list.try_insert_scan_from_back(100, Record { version: 1 }).unwrap();

    assert_eq!(
        list.try_insert_scan_from_back(100, Record { version: 2 }),
        Err(SequenceError::DuplicateId { id: 100 })
    );
    assert_eq!(list.len(), 1);
    assert_eq!(list.get_scan_from_back(&100), Some(&Record { version: 1 }));
}

#[test]
fn out_of_order_inserts_are_sorted() {
    let mut list = SequenceList::new();
    list.try_insert_scan_from_back(200, Record { version: 2 }).unwrap();
    list.try_insert_scan_from_back(100, Record { version: 1 }).unwrap();
    list.try_insert_scan_from_back(150, Record { version: 3 }).unwrap();

    let ids: Vec<u16> = list.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![100, 150, 200]);
}

#[test]
fn ordering_survives_wrap_around() {
    let mut list = SequenceList::new();
    for id in [65530u16, 65535, 0, 5] {
        list.try_insert_scan_from_back(id, Record { version: u32::from(id) }).unwrap();
    }

    assert_eq!(list.front().map(|(id, _)| *id), Some(65530));
    assert_eq!(list.back().map(|(id, _)| *id), Some(5));
    assert_eq!(list.find_nearest_prior(&3).map(|(id, _)| *id), Some(0));

    assert_eq!(list.prune_before(&0), 2);
    assert_eq!(list.front().map(|(id, _)| *id), Some(0));
}

#[test]
fn removal_and_clear() {
    let mut list = SequenceList::new();
    list.try_insert_scan_from_back(100, Record { version: 1 }).unwrap();
    list.try_insert_scan_from_back(200, Record { version: 2 }).unwrap();

    assert_eq!(list.remove_scan_from_front(&100), Some(Record { version: 1 }));
    assert!(list.remove_scan_from_front(&999).is_none());
    assert!(list.get_scan_from_back(&100).is_none());
    assert_eq!(list.len(), 1);

    list.clear();
    assert!(list.is_empty());
}

#[test]
fn error_display_format() {
    let error = SequenceError::DuplicateId { id: 12345 };
    let error_string = format!("{}", error);

    assert!(error_string.contains("12345"));
    assert!(error_string.contains("Duplicate"));
}
