use futures_util::future::join_all;
use rand::prelude::SliceRandom;
use rand::{thread_rng, Rng};

use bookcatalog::api::{BookDetails, BookPatch};
use bookcatalog::client::BookCatalogClient;

use crate::service_url;

#[tokio::test]
async fn generate_lots_of_books_and_updates() {
    const NO_OF_BOOKS_TO_GENERATE: usize = 100;
    const NO_OF_UPDATES: usize = 200;

    let mut rng = thread_rng();
    let client = BookCatalogClient::new(&service_url()).expect("Failed to create client");

    let run_id: u32 = rng.gen();
    let books = generate_books(&mut rng, run_id, NO_OF_BOOKS_TO_GENERATE);

    for book in &books {
        client
            .add_book(book)
            .await
            .expect("Failed to add book")
            .expect("Book rejected");
        println!("Added book {}", book.id);
    }

    for _ in 0..NO_OF_UPDATES {
        let book = books.choose(&mut rng).unwrap();
        let patch = BookPatch {
            pages: Some(rng.gen_range(50..1500).to_string()),
            ..BookPatch::default()
        };
        let updated = client
            .update_book(&book.id, &patch)
            .await
            .expect("Failed to update book")
            .expect("Book not found");
        assert_eq!(updated.details.pages, patch.pages.unwrap());
    }

    for book in &books {
        assert!(client.delete_book(&book.id).await.expect("Failed to delete"));
    }
}

#[tokio::test]
/// Fires concurrent creates with the same id.
/// Uniqueness is only checked before insert, so more than one create may succeed.
async fn concurrent_creates_with_same_id() {
    const NO_OF_CONCURRENT_CREATES: usize = 20;

    let client = BookCatalogClient::new(&service_url()).expect("Failed to create client");
    let book = BookDetails {
        id: format!("race-{}", thread_rng().gen::<u32>()),
        title: "Raced".to_string(),
        ..BookDetails::default()
    };

    let results = join_all((0..NO_OF_CONCURRENT_CREATES).map(|_| client.add_book(&book))).await;
    let created = results
        .into_iter()
        .map(|result| result.expect("Failed to add book"))
        .filter(Result::is_ok)
        .count();
    println!(
        "{} of {} concurrent creates succeeded",
        created, NO_OF_CONCURRENT_CREATES
    );
    assert!(created >= 1);

    while client.delete_book(&book.id).await.expect("Failed to delete") {}
}

fn generate_books(rng: &mut impl Rng, run_id: u32, no_of_books: usize) -> Vec<BookDetails> {
    (0..no_of_books)
        .map(|no| BookDetails {
            id: format!("load-{}-{}", run_id, no),
            title: format!("A tale of number {} and {}", no, rng.gen_range(0..1000)),
            author: format!(
                "{} {}",
                FIRST_NAMES.choose(rng).unwrap(),
                LAST_NAMES.choose(rng).unwrap()
            ),
            edition: format!("{}", rng.gen_range(1..10)),
            pages: rng.gen_range(50..1500).to_string(),
            year: rng.gen_range(1800..2025).to_string(),
        })
        .collect()
}

const FIRST_NAMES: &[&str] = &[
    "Mary", "Edgar", "Jose", "Ursula", "Gabriel", "Virginia", "Jorge", "Octavia", "Italo",
    "Clarice",
];

const LAST_NAMES: &[&str] = &[
    "Shelley", "Poe", "Rivera", "Le Guin", "Marquez", "Woolf", "Borges", "Butler", "Calvino",
    "Lispector",
];
