use crate::{
    models::{LoanStatus, NewAuthor, NewBook, NewBookInstance, NewUser, User},
    store::{BookChanges, Catalog},
};
use chrono::{Duration, Local, NaiveDate};
use uuid::Uuid;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn new_author<'a>(first_name: &'a str, last_name: &'a str) -> NewAuthor<'a> {
    NewAuthor {
        first_name,
        last_name,
        date_of_birth: None,
        date_of_death: None,
    }
}

pub struct LoanFixture {
    pub book_id: i32,
    /// `testuser1`, without permissions.
    pub borrower: User,
    /// `testuser2`, allowed to mark copies returned.
    pub librarian: User,
    pub instances: Vec<Uuid>,
}

/// One book with `copies` on-loan instances, due back over the next five
/// days and alternately borrowed by `testuser1` (odd) and `testuser2` (even).
pub fn seed_loans(catalog: &dyn Catalog, copies: usize) -> LoanFixture {
    let borrower = catalog
        .create_user(&NewUser {
            username: "testuser1",
            is_superuser: false,
            can_mark_returned: false,
        })
        .unwrap();
    let librarian = catalog
        .create_user(&NewUser {
            username: "testuser2",
            is_superuser: false,
            can_mark_returned: true,
        })
        .unwrap();
    let author = catalog.create_author(&new_author("John", "Smith")).unwrap();
    let genre = catalog.create_genre("Fantasy").unwrap();
    let language = catalog.create_language("English").unwrap();
    let book = catalog
        .create_book(&BookChanges {
            book: NewBook {
                title: "Book Title",
                summary: "My book summary",
                isbn: "1234567891123",
                author_id: Some(author.id),
                language_id: Some(language.id),
            },
            genre_ids: vec![genre.id],
        })
        .unwrap();
    let today = today();
    let instances = (0..copies)
        .map(|copy| {
            let borrower_id = if copy % 2 == 1 {
                borrower.id
            } else {
                librarian.id
            };
            catalog
                .create_instance(NewBookInstance {
                    book_id: book.id,
                    imprint: "Unlikely Imprint, 2016",
                    due_back: Some(today + Duration::days((copy % 5) as i64)),
                    borrower_id: Some(borrower_id),
                    status: LoanStatus::OnLoan,
                })
                .unwrap()
                .id
        })
        .collect();
    LoanFixture {
        book_id: book.id,
        borrower,
        librarian,
        instances,
    }
}
