use crate::{
    error::StoreError,
    models::{
        display_genre, Author, Book, BookInstance, Genre, Language, LoanStatus, NewAuthor, NewBook,
        NewBookInstance, NewUser, User,
    },
    page::{Page, PageRequest},
    session::Session,
};
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub books: i64,
    pub instances: i64,
    pub available: i64,
    pub authors: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookListing {
    pub book: Book,
    pub author: Option<Author>,
    pub genres: Vec<Genre>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookDetail {
    pub book: Book,
    pub author: Option<Author>,
    pub language: Option<Language>,
    pub genres: Vec<Genre>,
    pub instances: Vec<BookInstance>,
}

impl BookDetail {
    pub fn display_genre(&self) -> String {
        display_genre(&self.genres)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorDetail {
    pub author: Author,
    pub books: Vec<Book>,
}

/// A book instance together with what loan listings show about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loan {
    pub instance: BookInstance,
    pub book_title: String,
    pub borrower: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookChanges<'a> {
    pub book: NewBook<'a>,
    pub genre_ids: Vec<i32>,
}

/// Persistent storage of the catalog.
///
/// Listings come back in their fixed order:
/// books by author (last name, first name; authorless last) then title,
/// authors by last then first name, a borrower's loans by due date,
/// all loans by due date, borrower and book.
pub trait Catalog: Send + Sync {
    fn counts(&self) -> Result<CatalogCounts, StoreError>;

    fn books(&self, page: PageRequest) -> Result<Page<BookListing>, StoreError>;
    fn book(&self, id: i32) -> Result<BookDetail, StoreError>;
    fn has_book(&self, id: i32) -> Result<bool, StoreError>;
    fn create_book(&self, changes: &BookChanges<'_>) -> Result<Book, StoreError>;
    fn update_book(&self, id: i32, changes: &BookChanges<'_>) -> Result<Book, StoreError>;
    /// Also removes the book's instances and genre links.
    fn delete_book(&self, id: i32) -> Result<(), StoreError>;

    fn authors(&self, page: PageRequest) -> Result<Page<Author>, StoreError>;
    fn all_authors(&self) -> Result<Vec<Author>, StoreError>;
    fn author(&self, id: i32) -> Result<AuthorDetail, StoreError>;
    fn has_author(&self, id: i32) -> Result<bool, StoreError>;
    fn create_author(&self, author: &NewAuthor<'_>) -> Result<Author, StoreError>;
    fn update_author(&self, id: i32, author: &NewAuthor<'_>) -> Result<Author, StoreError>;
    /// Leaves the author's books in place without an author.
    fn delete_author(&self, id: i32) -> Result<(), StoreError>;

    fn genres(&self) -> Result<Vec<Genre>, StoreError>;
    fn missing_genres(&self, ids: &[i32]) -> Result<Vec<i32>, StoreError>;
    fn create_genre(&self, name: &str) -> Result<Genre, StoreError>;

    fn languages(&self) -> Result<Vec<Language>, StoreError>;
    fn has_language(&self, id: i32) -> Result<bool, StoreError>;
    fn create_language(&self, name: &str) -> Result<Language, StoreError>;

    fn instance(&self, id: Uuid) -> Result<Loan, StoreError>;
    fn create_instance(&self, instance: NewBookInstance<'_>) -> Result<BookInstance, StoreError>;
    fn delete_instance(&self, id: Uuid) -> Result<(), StoreError>;
    fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> Result<(), StoreError>;
    /// Returns the status the instance had before.
    fn set_status(&self, id: Uuid, status: LoanStatus) -> Result<LoanStatus, StoreError>;
    fn loans_for(&self, borrower_id: i32, page: PageRequest) -> Result<Page<Loan>, StoreError>;
    fn all_loans(&self, page: PageRequest) -> Result<Page<Loan>, StoreError>;

    fn user_by_name(&self, username: &str) -> Result<Option<User>, StoreError>;
    fn create_user(&self, user: &NewUser<'_>) -> Result<User, StoreError>;

    /// Unknown keys yield an empty session.
    fn load_session(&self, key: &str) -> Result<Session, StoreError>;
    fn save_session(&self, key: &str, session: &Session) -> Result<(), StoreError>;
}
