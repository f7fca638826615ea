//! Catalog management service

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, BorrowedTitle, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    /// Register a book, merging into an existing (title, author) record.
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        let (created, merged) = self
            .repository
            .books
            .create(&book.title, &book.author)
            .await?;

        if merged {
            tracing::info!(
                book_id = created.id,
                available = created.available,
                "Catalog create: duplicate (title, author), incremented existing record"
            );
        }
        Ok(created)
    }

    /// Update a book (partial fields)
    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, &update).await
    }

    /// Delete a book; fails while any member holds a copy
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Titles currently on loan, optionally with holder counts
    pub async fn borrowed_titles(&self, with_counts: bool) -> AppResult<Vec<BorrowedTitle>> {
        let mut titles = self.repository.books.borrowed_titles().await?;
        if !with_counts {
            for entry in &mut titles {
                entry.borrowed = None;
            }
        }
        Ok(titles)
    }

    /// Count all books
    pub async fn count_books(&self) -> AppResult<i64> {
        self.repository.books.count_all().await
    }
}
