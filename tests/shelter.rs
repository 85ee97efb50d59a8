use animal_shelter::{ANIMAL_ID_FIELD, AnimalShelter, MemoryCollection, ShelterError};
use mongodb::bson::{Document, doc};

fn empty_shelter() -> AnimalShelter<MemoryCollection> {
    AnimalShelter::new(MemoryCollection::new())
}

fn ids(records: &[Document]) -> Vec<String> {
    let mut ids: Vec<String> = records
        .iter()
        .map(|r| r.get_str(ANIMAL_ID_FIELD).unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn first_id_is_a1_and_advances_after_insert() {
    let shelter = empty_shelter();
    assert_eq!(shelter.next_animal_id().await, "A1");

    assert!(shelter.create(Some(doc! { "animal_id": "A1" })).await.unwrap());
    assert_eq!(shelter.next_animal_id().await, "A2");
}

#[tokio::test]
async fn create_assigns_id_then_rejects_duplicate() {
    let shelter = empty_shelter();

    assert!(shelter.create(Some(doc! { "name": "Rex" })).await.unwrap());
    let stored = shelter.collection().documents();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_str("animal_id").unwrap(), "A1");
    assert_eq!(stored[0].get_str("name").unwrap(), "Rex");

    let created = shelter
        .create(Some(doc! { "name": "Fido", "animal_id": "A1" }))
        .await
        .unwrap();
    assert!(!created);

    let stored = shelter.collection().documents();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_str("name").unwrap(), "Rex");
}

#[tokio::test]
async fn sequential_creates_get_distinct_well_formed_ids() {
    let shelter = empty_shelter();

    for name in ["Rex", "Fido", "Tom", "Luna", "Max", "Bella", "Milo", "Coco", "Nala", "Zeus", "Kiki"] {
        assert!(shelter.create(Some(doc! { "name": name })).await.unwrap());
    }

    let all = shelter.read(Some(&doc! {})).await;
    let mut seen = ids(&all);
    assert_eq!(seen.len(), 11);
    seen.dedup();
    assert_eq!(seen.len(), 11, "animal_ids must be unique");

    for id in &seen {
        let digits = id.strip_prefix('A').unwrap();
        assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
    }

    // ids past A9 keep counting instead of wrapping to A10 twice
    assert!(seen.contains(&"A11".to_string()));
    assert_eq!(shelter.next_animal_id().await, "A12");
}

#[tokio::test]
async fn create_none_is_invalid_argument() {
    let shelter = empty_shelter();
    assert!(matches!(
        shelter.create(None).await,
        Err(ShelterError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn read_returns_exactly_the_matches_without_side_effects() {
    let shelter = empty_shelter();
    shelter.create(Some(doc! { "name": "Rex", "breed": "Beagle" })).await.unwrap();
    shelter.create(Some(doc! { "name": "Tom", "breed": "Tabby" })).await.unwrap();
    shelter.create(Some(doc! { "name": "Fido", "breed": "Beagle" })).await.unwrap();

    let query = doc! { "breed": "Beagle" };
    let first = shelter.read(Some(&query)).await;
    let second = shelter.read(Some(&query)).await;

    assert_eq!(ids(&first), vec!["A1", "A3"]);
    assert_eq!(first, second);
    assert_eq!(shelter.collection().len(), 3);
    assert!(shelter.read(None).await.is_empty());
}

#[tokio::test]
async fn update_merges_fields_into_matches_only() {
    let shelter = empty_shelter();
    shelter.create(Some(doc! { "name": "Rex", "breed": "Beagle", "age": 2 })).await.unwrap();
    shelter.create(Some(doc! { "name": "Fido", "breed": "Beagle", "age": 5 })).await.unwrap();
    shelter.create(Some(doc! { "name": "Tom", "breed": "Tabby", "age": 3 })).await.unwrap();

    let modified = shelter
        .update(
            Some(&doc! { "breed": "Beagle" }),
            Some(&doc! { "outcome_type": "Adoption", "age": 6 }),
        )
        .await
        .unwrap();
    assert_eq!(modified, 2);

    let beagles = shelter.read(Some(&doc! { "breed": "Beagle" })).await;
    for beagle in &beagles {
        assert_eq!(beagle.get_str("outcome_type").unwrap(), "Adoption");
        assert_eq!(beagle.get_i32("age").unwrap(), 6);
        assert!(beagle.get_str("name").is_ok());
    }

    let tom = shelter.read(Some(&doc! { "name": "Tom" })).await;
    assert_eq!(tom.len(), 1);
    assert!(!tom[0].contains_key("outcome_type"));
    assert_eq!(tom[0].get_i32("age").unwrap(), 3);
}

#[tokio::test]
async fn update_with_no_matches_modifies_nothing() {
    let shelter = empty_shelter();
    shelter.create(Some(doc! { "name": "Rex" })).await.unwrap();

    let modified = shelter
        .update(Some(&doc! { "name": "Ghost" }), Some(&doc! { "name": "Casper" }))
        .await
        .unwrap();
    assert_eq!(modified, 0);
}

#[tokio::test]
async fn delete_removes_matches_and_repeats_as_zero() {
    let shelter = empty_shelter();
    shelter.create(Some(doc! { "name": "Rex", "breed": "Beagle" })).await.unwrap();
    shelter.create(Some(doc! { "name": "Fido", "breed": "Beagle" })).await.unwrap();
    shelter.create(Some(doc! { "name": "Tom", "breed": "Tabby" })).await.unwrap();

    let query = doc! { "breed": "Beagle" };
    assert_eq!(shelter.delete(Some(&query)).await.unwrap(), 2);
    assert_eq!(shelter.delete(Some(&query)).await.unwrap(), 0);

    let left = shelter.read(Some(&doc! {})).await;
    assert_eq!(ids(&left), vec!["A3"]);
}

#[tokio::test]
async fn unacknowledged_insert_reports_false() {
    let shelter = empty_shelter();
    shelter.collection().set_unacknowledged(true);

    assert!(!shelter.create(Some(doc! { "name": "Rex" })).await.unwrap());
}

#[tokio::test]
async fn store_outage_degrades_every_operation() {
    let shelter = empty_shelter();
    shelter.create(Some(doc! { "name": "Rex" })).await.unwrap();
    shelter.collection().set_unavailable(true);

    let query = doc! { "name": "Rex" };
    assert_eq!(shelter.next_animal_id().await, "A1");
    assert!(!shelter.create(Some(doc! { "name": "Fido" })).await.unwrap());
    assert!(shelter.read(Some(&query)).await.is_empty());
    assert_eq!(shelter.update(Some(&query), Some(&doc! { "age": 1 })).await.unwrap(), 0);
    assert_eq!(shelter.delete(Some(&query)).await.unwrap(), 0);

    shelter.collection().set_unavailable(false);
    assert_eq!(shelter.collection().len(), 1);
}

#[tokio::test]
async fn closed_shelter_releases_collection() {
    let collection = MemoryCollection::new();
    let shelter = AnimalShelter::new(collection.clone());
    shelter.create(Some(doc! { "name": "Rex" })).await.unwrap();
    shelter.close().await.unwrap();

    let reopened = AnimalShelter::new(collection);
    assert!(reopened.read(Some(&doc! {})).await.is_empty());
    assert!(reopened.try_read(&doc! {}).await.is_err());
}
