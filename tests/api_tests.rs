//! API integration tests
//!
//! Run against a live server with a migrated database:
//! `cargo test -- --ignored`

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Title unique per test run so runs don't trip over leftover data
fn unique_title(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{} {}", prefix, nanos)
}

fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

async fn create_book(client: &Client, title: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": title,
            "author": "Alice Walker"
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse book response")
}

async fn create_member(client: &Client, name: &str) -> Value {
    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send create member request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse member response")
}

async fn get_book(client: &Client, id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send get book request");

    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse book response")
}

async fn delete_book(client: &Client, id: i64) {
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await;
}

async fn delete_member(client: &Client, id: i64) {
    let _ = client
        .delete(format!("{}/members/{}", BASE_URL, id))
        .send()
        .await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_create_book_merges_duplicate() {
    let client = Client::new();
    let title = unique_title("Meridian");

    let first = create_book(&client, &title).await;
    let second = create_book(&client, &title).await;

    // Same logical book, count incremented, no second identifier
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["available"].as_i64().unwrap(), 1);
    assert_eq!(second["available"].as_i64().unwrap(), 2);

    delete_book(&client, first["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_malformed_author() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": unique_title("Meridian"),
            "author": "alice walker"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_create_of_new_book_never_errors_out() {
    let client = Client::new();
    let title = unique_title("Horses");

    let create = || {
        let client = client.clone();
        let title = title.clone();
        async move {
            client
                .post(format!("{}/books", BASE_URL))
                .json(&json!({ "title": title, "author": "Alice Walker" }))
                .send()
                .await
                .expect("Failed to send create book request")
                .status()
        }
    };

    // Both requests race on a (title, author) pair that has no row yet. The
    // loser of the insert race must get a typed conflict, not a 500.
    let (a, b) = tokio::join!(create(), create());
    for status in [a, b] {
        assert!(
            status == 201 || status == 409,
            "unexpected status {}",
            status
        );
    }
    let creations = [a, b].iter().filter(|s| s.as_u16() == 201).count();
    assert!(creations >= 1);

    let response = client
        .get(format!("{}/books?title={}", BASE_URL, title))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"].as_i64().unwrap(), 1);
    assert_eq!(
        body["items"][0]["available"].as_i64().unwrap(),
        creations as i64
    );

    delete_book(&client, body["items"][0]["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_update_collision_and_partial_semantics() {
    let client = Client::new();
    let first_title = unique_title("First Edition");
    let second_title = unique_title("Second Edition");
    let first = create_book(&client, &first_title).await;
    let second = create_book(&client, &second_title).await;
    let second_id = second["id"].as_i64().unwrap();

    // Renaming the second book onto the first's (title, author) is refused
    let response = client
        .put(format!("{}/books/{}", BASE_URL, second_id))
        .json(&json!({ "title": first_title }))
        .send()
        .await
        .expect("Failed to send update request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "NotUnique");

    // Absent fields keep their current value; available is replaced
    let response = client
        .put(format!("{}/books/{}", BASE_URL, second_id))
        .json(&json!({ "available": 5 }))
        .send()
        .await
        .expect("Failed to send update request");
    assert!(response.status().is_success());

    let updated: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(updated["title"], second_title.as_str());
    assert_eq!(updated["available"].as_i64().unwrap(), 5);

    delete_book(&client, first["id"].as_i64().unwrap()).await;
    delete_book(&client, second_id).await;
}

#[tokio::test]
#[ignore]
async fn test_huge_page_number_returns_empty_list() {
    let client = Client::new();

    let response = client
        .get(format!(
            "{}/books?page={}&per_page=100",
            BASE_URL,
            i64::MAX
        ))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_toggle_is_its_own_inverse() {
    let client = Client::new();
    let book = create_book(&client, &unique_title("The Color Purple")).await;
    let member = create_member(&client, &unique_name("celie")).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    // First toggle borrows
    let response = client
        .patch(format!("{}/members/{}/books/{}", BASE_URL, member_id, book_id))
        .send()
        .await
        .expect("Failed to send toggle request");
    assert!(response.status().is_success());

    let held: Value = response.json().await.expect("Failed to parse held books");
    assert_eq!(held.as_array().unwrap().len(), 1);
    assert_eq!(held[0]["id"], book["id"]);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64().unwrap(), 0);

    // Second toggle returns
    let response = client
        .patch(format!("{}/members/{}/books/{}", BASE_URL, member_id, book_id))
        .send()
        .await
        .expect("Failed to send toggle request");
    assert!(response.status().is_success());

    let held: Value = response.json().await.expect("Failed to parse held books");
    assert!(held.as_array().unwrap().is_empty());
    assert_eq!(get_book(&client, book_id).await["available"].as_i64().unwrap(), 1);

    delete_book(&client, book_id).await;
    delete_member(&client, member_id).await;
}

#[tokio::test]
#[ignore]
async fn test_borrow_with_zero_copies_fails() {
    let client = Client::new();
    let book = create_book(&client, &unique_title("Possessing")).await;
    let holder = create_member(&client, &unique_name("shug")).await;
    let latecomer = create_member(&client, &unique_name("sofia")).await;
    let book_id = book["id"].as_i64().unwrap();

    // Holder takes the only copy
    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL,
            holder["id"].as_i64().unwrap(),
            book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert!(response.status().is_success());

    // Latecomer is refused and state is unchanged
    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL,
            latecomer["id"].as_i64().unwrap(),
            book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "BookCantBeBorrowed");
    assert_eq!(get_book(&client, book_id).await["available"].as_i64().unwrap(), 0);

    // Cleanup
    let _ = client
        .patch(format!(
            "{}/members/{}/books/{}/return",
            BASE_URL,
            holder["id"].as_i64().unwrap(),
            book_id
        ))
        .send()
        .await;
    delete_book(&client, book_id).await;
    delete_member(&client, holder["id"].as_i64().unwrap()).await;
    delete_member(&client, latecomer["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_borrow_fails() {
    let client = Client::new();
    let title = unique_title("Meridian");
    let book = create_book(&client, &title).await;
    // Second copy so availability is not the blocker
    create_book(&client, &title).await;
    let member = create_member(&client, &unique_name("truman")).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert!(response.status().is_success());

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert_eq!(response.status(), 409);

    // Cleanup
    let _ = client
        .patch(format!(
            "{}/members/{}/books/{}/return",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await;
    delete_book(&client, book_id).await;
    delete_member(&client, member_id).await;
}

#[tokio::test]
#[ignore]
async fn test_return_unheld_book_fails() {
    let client = Client::new();
    let book = create_book(&client, &unique_title("Grange Copeland")).await;
    let member = create_member(&client, &unique_name("brownfield")).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/return",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 404);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64().unwrap(), 1);

    delete_book(&client, book_id).await;
    delete_member(&client, member_id).await;
}

#[tokio::test]
#[ignore]
async fn test_delete_guards() {
    let client = Client::new();
    let book = create_book(&client, &unique_title("Temple")).await;
    let member = create_member(&client, &unique_name("lissie")).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert!(response.status().is_success());

    // Neither side of an outstanding loan can be deleted
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), 409);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), 409);

    // After the return both deletes go through
    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/return",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send return request");
    assert!(response.status().is_success());

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), 204);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit() {
    let client = Client::new();
    let member = create_member(&client, &unique_name("voracious")).await;
    let member_id = member["id"].as_i64().unwrap();

    // Default limit is 10; the 11th distinct book is refused
    let mut book_ids = Vec::new();
    for i in 0..11 {
        let book = create_book(&client, &unique_title(&format!("Volume {}", i))).await;
        book_ids.push(book["id"].as_i64().unwrap());
    }

    for book_id in &book_ids[..10] {
        let response = client
            .patch(format!(
                "{}/members/{}/books/{}/borrow",
                BASE_URL, member_id, book_id
            ))
            .send()
            .await
            .expect("Failed to send borrow request");
        assert!(response.status().is_success());
    }

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL, member_id, book_ids[10]
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "BookCantBeBorrowed");

    // Cleanup
    for book_id in &book_ids[..10] {
        let _ = client
            .patch(format!(
                "{}/members/{}/books/{}/return",
                BASE_URL, member_id, book_id
            ))
            .send()
            .await;
    }
    for book_id in &book_ids {
        delete_book(&client, *book_id).await;
    }
    delete_member(&client, member_id).await;
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrow_of_last_copy() {
    let client = Client::new();
    let book = create_book(&client, &unique_title("Last Copy")).await;
    let first = create_member(&client, &unique_name("fast")).await;
    let second = create_member(&client, &unique_name("faster")).await;
    let book_id = book["id"].as_i64().unwrap();

    let borrow = |member_id: i64| {
        let client = client.clone();
        async move {
            client
                .patch(format!(
                    "{}/members/{}/books/{}/borrow",
                    BASE_URL, member_id, book_id
                ))
                .send()
                .await
                .expect("Failed to send borrow request")
                .status()
        }
    };

    let (a, b) = tokio::join!(
        borrow(first["id"].as_i64().unwrap()),
        borrow(second["id"].as_i64().unwrap())
    );

    // Exactly one borrow wins; the loser sees a business refusal or a
    // retryable conflict, never a corrupted count.
    let successes = [a, b].iter().filter(|s| s.is_success()).count();
    assert_eq!(successes, 1);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64().unwrap(), 0);

    // Cleanup: whoever holds it returns it
    for member in [&first, &second] {
        let _ = client
            .patch(format!(
                "{}/members/{}/books/{}/return",
                BASE_URL,
                member["id"].as_i64().unwrap(),
                book_id
            ))
            .send()
            .await;
    }
    delete_book(&client, book_id).await;
    delete_member(&client, first["id"].as_i64().unwrap()).await;
    delete_member(&client, second["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_member_name_must_be_unique() {
    let client = Client::new();
    let name = unique_name("albert");

    let member = create_member(&client, &name).await;

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    delete_member(&client, member["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_member_list_filters_by_exact_name() {
    let client = Client::new();
    let name = unique_name("nettie");
    let member = create_member(&client, &name).await;
    // A second member that the filter must not match
    let other = create_member(&client, &unique_name("nettie")).await;

    let response = client
        .get(format!("{}/members?name={}", BASE_URL, name))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"].as_i64().unwrap(), 1);
    assert_eq!(body["items"][0]["name"], name.as_str());

    delete_member(&client, member["id"].as_i64().unwrap()).await;
    delete_member(&client, other["id"].as_i64().unwrap()).await;
}

#[tokio::test]
#[ignore]
async fn test_borrowed_titles_report() {
    let client = Client::new();
    let title = unique_title("Everyday Use");
    let book = create_book(&client, &title).await;
    let member = create_member(&client, &unique_name("maggie")).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .patch(format!(
            "{}/members/{}/books/{}/borrow",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/books/borrowed?with_counts=true", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let titles: Value = response.json().await.expect("Failed to parse response");
    let entry = titles
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["title"] == title.as_str())
        .expect("Borrowed title missing from report");
    assert_eq!(entry["borrowed"].as_i64().unwrap(), 1);

    // Without counts the field is omitted
    let response = client
        .get(format!("{}/books/borrowed", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let titles: Value = response.json().await.expect("Failed to parse response");
    let entry = titles
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["title"] == title.as_str())
        .expect("Borrowed title missing from report");
    assert!(entry.get("borrowed").is_none());

    // Cleanup
    let _ = client
        .patch(format!(
            "{}/members/{}/books/{}/return",
            BASE_URL, member_id, book_id
        ))
        .send()
        .await;
    delete_book(&client, book_id).await;
    delete_member(&client, member_id).await;
}
