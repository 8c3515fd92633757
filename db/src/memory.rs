use crate::{
    error::StoreError,
    models::{
        Author, Book, BookInstance, Genre, Language, LoanStatus, NewAuthor, NewBookInstance,
        NewUser, User,
    },
    page::{Page, PageRequest},
    session::Session,
    store::{AuthorDetail, BookChanges, BookDetail, BookListing, Catalog, CatalogCounts, Loan},
};
use chrono::NaiveDate;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    next_id: i32,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    book_genres: BTreeSet<(i32, i32)>,
    instances: HashMap<Uuid, BookInstance>,
    users: BTreeMap<i32, User>,
    sessions: HashMap<String, Vec<u8>>,
}

impl Tables {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn genres_of(&self, book_id: i32) -> Vec<Genre> {
        self.book_genres
            .range((book_id, i32::MIN)..=(book_id, i32::MAX))
            .filter_map(|(_, genre_id)| self.genres.get(genre_id).cloned())
            .collect()
    }

    fn author_of(&self, book: &Book) -> Option<&Author> {
        book.author_id.and_then(|id| self.authors.get(&id))
    }

    fn loan(&self, instance: &BookInstance) -> Loan {
        Loan {
            instance: instance.clone(),
            book_title: self
                .books
                .get(&instance.book_id)
                .map(|book| book.title.clone())
                .unwrap_or_default(),
            borrower: instance
                .borrower_id
                .and_then(|id| self.users.get(&id))
                .map(|user| user.username.clone()),
        }
    }

    fn instance_mut(&mut self, id: Uuid) -> Result<&mut BookInstance, StoreError> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("book instance", id))
    }

    fn link_genres(&mut self, book_id: i32, genre_ids: &[i32]) {
        self.book_genres.retain(|(book, _)| *book != book_id);
        self.book_genres
            .extend(genre_ids.iter().map(|genre_id| (book_id, *genre_id)));
    }

    fn loans_where(
        &self,
        page: PageRequest,
        keep: impl Fn(&BookInstance) -> bool,
        order: impl Fn(&BookInstance, &BookInstance) -> Ordering,
    ) -> Result<Page<Loan>, StoreError> {
        let mut instances: Vec<&BookInstance> =
            self.instances.values().filter(|i| keep(i)).collect();
        instances.sort_by(|a, b| order(a, b).then_with(|| a.id.cmp(&b.id)));
        page.slice(instances)
            .map(|page| page.map(|instance| self.loan(instance)))
    }
}

/// Orders `Some` values ascending with `None` after them, as PostgreSQL does.
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Catalog kept in process memory, mainly for tests.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))
    }
}

impl Catalog for MemoryCatalog {
    fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let tables = self.read()?;
        Ok(CatalogCounts {
            books: tables.books.len() as i64,
            instances: tables.instances.len() as i64,
            available: tables
                .instances
                .values()
                .filter(|instance| instance.status == LoanStatus::Available)
                .count() as i64,
            authors: tables.authors.len() as i64,
        })
    }

    fn books(&self, page: PageRequest) -> Result<Page<BookListing>, StoreError> {
        let tables = self.read()?;
        let mut books: Vec<&Book> = tables.books.values().collect();
        books.sort_by(|a, b| {
            let author_a = tables.author_of(a).map(Author::sort_key);
            let author_b = tables.author_of(b).map(Author::sort_key);
            nulls_last(&author_a, &author_b)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(page.slice(books)?.map(|book| BookListing {
            book: book.clone(),
            author: tables.author_of(book).cloned(),
            genres: tables.genres_of(book.id),
        }))
    }

    fn book(&self, id: i32) -> Result<BookDetail, StoreError> {
        let tables = self.read()?;
        let book = tables
            .books
            .get(&id)
            .ok_or_else(|| StoreError::not_found("book", id))?;
        let mut instances: Vec<BookInstance> = tables
            .instances
            .values()
            .filter(|instance| instance.book_id == id)
            .cloned()
            .collect();
        instances.sort_by(|a, b| nulls_last(&a.due_back, &b.due_back).then_with(|| a.id.cmp(&b.id)));
        Ok(BookDetail {
            book: book.clone(),
            author: tables.author_of(book).cloned(),
            language: book
                .language_id
                .and_then(|id| tables.languages.get(&id))
                .cloned(),
            genres: tables.genres_of(id),
            instances,
        })
    }

    fn has_book(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.read()?.books.contains_key(&id))
    }

    fn create_book(&self, changes: &BookChanges<'_>) -> Result<Book, StoreError> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let book = Book {
            id,
            title: changes.book.title.to_owned(),
            summary: changes.book.summary.to_owned(),
            isbn: changes.book.isbn.to_owned(),
            author_id: changes.book.author_id,
            language_id: changes.book.language_id,
        };
        tables.books.insert(id, book.clone());
        tables.link_genres(id, &changes.genre_ids);
        Ok(book)
    }

    fn update_book(&self, id: i32, changes: &BookChanges<'_>) -> Result<Book, StoreError> {
        let mut tables = self.write()?;
        let book = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("book", id))?;
        book.title = changes.book.title.to_owned();
        book.summary = changes.book.summary.to_owned();
        book.isbn = changes.book.isbn.to_owned();
        book.author_id = changes.book.author_id;
        book.language_id = changes.book.language_id;
        let book = book.clone();
        tables.link_genres(id, &changes.genre_ids);
        Ok(book)
    }

    fn delete_book(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables
            .books
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("book", id))?;
        tables.link_genres(id, &[]);
        tables.instances.retain(|_, instance| instance.book_id != id);
        Ok(())
    }

    fn authors(&self, page: PageRequest) -> Result<Page<Author>, StoreError> {
        page.slice(self.all_authors()?)
    }

    fn all_authors(&self) -> Result<Vec<Author>, StoreError> {
        let tables = self.read()?;
        let mut authors: Vec<Author> = tables.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()).then_with(|| a.id.cmp(&b.id)));
        Ok(authors)
    }

    fn author(&self, id: i32) -> Result<AuthorDetail, StoreError> {
        let tables = self.read()?;
        let author = tables
            .authors
            .get(&id)
            .ok_or_else(|| StoreError::not_found("author", id))?;
        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|book| book.author_id == Some(id))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(AuthorDetail {
            author: author.clone(),
            books,
        })
    }

    fn has_author(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.read()?.authors.contains_key(&id))
    }

    fn create_author(&self, author: &NewAuthor<'_>) -> Result<Author, StoreError> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let author = Author {
            id,
            first_name: author.first_name.to_owned(),
            last_name: author.last_name.to_owned(),
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        };
        tables.authors.insert(id, author.clone());
        Ok(author)
    }

    fn update_author(&self, id: i32, changes: &NewAuthor<'_>) -> Result<Author, StoreError> {
        let mut tables = self.write()?;
        let author = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("author", id))?;
        author.first_name = changes.first_name.to_owned();
        author.last_name = changes.last_name.to_owned();
        author.date_of_birth = changes.date_of_birth;
        author.date_of_death = changes.date_of_death;
        Ok(author.clone())
    }

    fn delete_author(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables
            .authors
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("author", id))?;
        for book in tables.books.values_mut() {
            if book.author_id == Some(id) {
                book.author_id = None;
            }
        }
        Ok(())
    }

    fn genres(&self) -> Result<Vec<Genre>, StoreError> {
        Ok(self.read()?.genres.values().cloned().collect())
    }

    fn missing_genres(&self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !tables.genres.contains_key(id))
            .collect())
    }

    fn create_genre(&self, name: &str) -> Result<Genre, StoreError> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let genre = Genre {
            id,
            name: name.to_owned(),
        };
        tables.genres.insert(id, genre.clone());
        Ok(genre)
    }

    fn languages(&self) -> Result<Vec<Language>, StoreError> {
        Ok(self.read()?.languages.values().cloned().collect())
    }

    fn has_language(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.read()?.languages.contains_key(&id))
    }

    fn create_language(&self, name: &str) -> Result<Language, StoreError> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let language = Language {
            id,
            name: name.to_owned(),
        };
        tables.languages.insert(id, language.clone());
        Ok(language)
    }

    fn instance(&self, id: Uuid) -> Result<Loan, StoreError> {
        let tables = self.read()?;
        let instance = tables
            .instances
            .get(&id)
            .ok_or_else(|| StoreError::not_found("book instance", id))?;
        Ok(tables.loan(instance))
    }

    fn create_instance(&self, instance: NewBookInstance<'_>) -> Result<BookInstance, StoreError> {
        let mut tables = self.write()?;
        if !tables.books.contains_key(&instance.book_id) {
            return Err(StoreError::not_found("book", instance.book_id));
        }
        let instance = instance.into_instance();
        tables.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    fn delete_instance(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()?
            .instances
            .remove(&id)
            .map(drop)
            .ok_or_else(|| StoreError::not_found("book instance", id))
    }

    fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> Result<(), StoreError> {
        self.write()?.instance_mut(id)?.due_back = Some(due_back);
        Ok(())
    }

    fn set_status(&self, id: Uuid, status: LoanStatus) -> Result<LoanStatus, StoreError> {
        let mut tables = self.write()?;
        let instance = tables.instance_mut(id)?;
        Ok(std::mem::replace(&mut instance.status, status))
    }

    fn loans_for(&self, borrower_id: i32, page: PageRequest) -> Result<Page<Loan>, StoreError> {
        self.read()?.loans_where(
            page,
            |instance| {
                instance.borrower_id == Some(borrower_id) && instance.status == LoanStatus::OnLoan
            },
            |a, b| nulls_last(&a.due_back, &b.due_back),
        )
    }

    fn all_loans(&self, page: PageRequest) -> Result<Page<Loan>, StoreError> {
        self.read()?.loans_where(
            page,
            |instance| instance.status == LoanStatus::OnLoan,
            |a, b| {
                nulls_last(&a.due_back, &b.due_back)
                    .then_with(|| nulls_last(&a.borrower_id, &b.borrower_id))
                    .then_with(|| a.book_id.cmp(&b.book_id))
            },
        )
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn create_user(&self, user: &NewUser<'_>) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let user = User {
            id,
            username: user.username.to_owned(),
            is_superuser: user.is_superuser,
            can_mark_returned: user.can_mark_returned,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn load_session(&self, key: &str) -> Result<Session, StoreError> {
        Ok(self
            .read()?
            .sessions
            .get(key)
            .map(|data| Session::decode(data))
            .unwrap_or_default())
    }

    fn save_session(&self, key: &str, session: &Session) -> Result<(), StoreError> {
        let data = session.encode()?;
        self.write()?.sessions.insert(key.to_owned(), data);
        Ok(())
    }
}
