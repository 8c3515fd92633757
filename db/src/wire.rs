//! Speedy-encoded request and response bodies of the catalog service.
//!
//! Dates travel as `YYYY-MM-DD` strings and instance ids in hyphenated form.

use crate::{
    forms::FieldError,
    models::{display_genre, Author, Book, BookInstance, Genre, Language, LoanStatus},
    page::Page,
    status::ItemOutcome,
    store::{AuthorDetail, BookDetail, BookListing, CatalogCounts, Loan},
};
use chrono::NaiveDate;
use speedy::{Readable, Writable};

fn date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.to_string())
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct Pagination {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub page_size: i64,
    pub is_paginated: bool,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages(),
            total: page.total,
            page_size: page.size,
            is_paginated: page.is_paginated(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct IndexCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_visits: i64,
}

impl IndexCounts {
    pub fn new(counts: CatalogCounts, num_visits: i64) -> Self {
        Self {
            num_books: counts.books,
            num_instances: counts.instances,
            num_instances_available: counts.available,
            num_authors: counts.authors,
            num_visits,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct AuthorRow {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub display_name: String,
    pub url: String,
}

impl From<&Author> for AuthorRow {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: date(author.date_of_birth),
            date_of_death: date(author.date_of_death),
            display_name: author.to_string(),
            url: author.absolute_url(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct AuthorList {
    pub authors: Vec<AuthorRow>,
    pub pagination: Pagination,
}

impl From<Page<Author>> for AuthorList {
    fn from(page: Page<Author>) -> Self {
        Self {
            pagination: Pagination::from(&page),
            authors: page.items.iter().map(AuthorRow::from).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author: Option<String>,
    pub display_genre: String,
    pub url: String,
}

impl BookRow {
    fn new(book: &Book, author: Option<&Author>, genres: &[Genre]) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            author: author.map(Author::to_string),
            display_genre: display_genre(genres),
            url: book.absolute_url(),
        }
    }
}

impl From<&BookListing> for BookRow {
    fn from(listing: &BookListing) -> Self {
        Self::new(&listing.book, listing.author.as_ref(), &listing.genres)
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookList {
    pub books: Vec<BookRow>,
    pub pagination: Pagination,
}

impl From<Page<BookListing>> for BookList {
    fn from(page: Page<BookListing>) -> Self {
        Self {
            pagination: Pagination::from(&page),
            books: page.items.iter().map(BookRow::from).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct CopyRow {
    pub id: String,
    pub imprint: String,
    pub status: LoanStatus,
    pub due_back: Option<String>,
    pub overdue: bool,
}

impl CopyRow {
    pub fn new(instance: &BookInstance, today: NaiveDate) -> Self {
        Self {
            id: instance.id.to_string(),
            imprint: instance.imprint.clone(),
            status: instance.status,
            due_back: date(instance.due_back),
            overdue: instance.is_overdue(today),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookDetailView {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: Option<AuthorRow>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub display_genre: String,
    pub copies: Vec<CopyRow>,
}

impl BookDetailView {
    pub fn new(detail: &BookDetail, today: NaiveDate) -> Self {
        Self {
            id: detail.book.id,
            title: detail.book.title.clone(),
            summary: detail.book.summary.clone(),
            isbn: detail.book.isbn.clone(),
            author: detail.author.as_ref().map(AuthorRow::from),
            language: detail.language.as_ref().map(|language| language.name.clone()),
            genres: detail.genres.iter().map(|genre| genre.name.clone()).collect(),
            display_genre: display_genre(&detail.genres),
            copies: detail
                .instances
                .iter()
                .map(|instance| CopyRow::new(instance, today))
                .collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct AuthorDetailView {
    pub author: AuthorRow,
    pub books: Vec<BookRow>,
}

impl From<&AuthorDetail> for AuthorDetailView {
    fn from(detail: &AuthorDetail) -> Self {
        Self {
            author: AuthorRow::from(&detail.author),
            books: detail
                .books
                .iter()
                .map(|book| BookRow::new(book, Some(&detail.author), &[]))
                .collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct LoanRow {
    pub id: String,
    pub book_id: i32,
    pub book_title: String,
    pub imprint: String,
    pub status: LoanStatus,
    pub due_back: Option<String>,
    pub borrower: Option<String>,
    pub overdue: bool,
}

impl LoanRow {
    pub fn new(loan: &Loan, today: NaiveDate) -> Self {
        Self {
            id: loan.instance.id.to_string(),
            book_id: loan.instance.book_id,
            book_title: loan.book_title.clone(),
            imprint: loan.instance.imprint.clone(),
            status: loan.instance.status,
            due_back: date(loan.instance.due_back),
            borrower: loan.borrower.clone(),
            overdue: loan.instance.is_overdue(today),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct LoanList {
    pub loans: Vec<LoanRow>,
    pub pagination: Pagination,
}

impl LoanList {
    pub fn new(page: &Page<Loan>, today: NaiveDate) -> Self {
        Self {
            loans: page.items.iter().map(|loan| LoanRow::new(loan, today)).collect(),
            pagination: Pagination::from(page),
        }
    }
}

/// The renewal form as shown to a librarian, with any errors from the last submission.
#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct RenewalForm {
    pub instance: LoanRow,
    pub due_back: String,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct RenewalPart<'a> {
    pub due_back: &'a str,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct AuthorForm<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: Option<&'a str>,
    pub date_of_death: Option<&'a str>,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookForm<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub isbn: &'a str,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
    pub genre_ids: Vec<i32>,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct NamePart<'a> {
    pub name: &'a str,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookInstanceForm<'a> {
    pub book_id: i32,
    pub imprint: &'a str,
    pub due_back: Option<&'a str>,
    pub borrower: Option<&'a str>,
    pub status: &'a str,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct Choice {
    pub id: i32,
    pub name: String,
}

/// Selectable values offered by the book form.
#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookChoices {
    pub authors: Vec<Choice>,
    pub languages: Vec<Choice>,
    pub genres: Vec<Choice>,
}

impl BookChoices {
    pub fn new(authors: &[Author], languages: &[Language], genres: &[Genre]) -> Self {
        Self {
            authors: authors
                .iter()
                .map(|author| Choice {
                    id: author.id,
                    name: author.to_string(),
                })
                .collect(),
            languages: languages
                .iter()
                .map(|language| Choice {
                    id: language.id,
                    name: language.name.clone(),
                })
                .collect(),
            genres: genres
                .iter()
                .map(|genre| Choice {
                    id: genre.id,
                    name: genre.name.clone(),
                })
                .collect(),
        }
    }
}

/// A book as currently stored, with the choices its edit form offers.
#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BookEditForm {
    pub book: BookDetailView,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
    pub genre_ids: Vec<i32>,
    pub choices: BookChoices,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct InstanceIds {
    pub ids: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BulkItem {
    pub id: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct BulkReport {
    pub items: Vec<BulkItem>,
}

#[derive(Debug, PartialEq, Eq, Readable, Writable)]
pub struct Created {
    pub id: String,
}
