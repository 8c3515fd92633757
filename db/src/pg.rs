use crate::{
    error::StoreError,
    models::{
        Author, Book, BookGenre, BookInstance, Genre, Language, LoanStatus, NewAuthor,
        NewBookInstance, NewGenre, NewLanguage, NewUser, User,
    },
    page::{Page, PageRequest},
    schema::{authors, book_genres, book_instances, books, genres, languages, sessions, users},
    session::Session,
    store::{AuthorDetail, BookChanges, BookDetail, BookListing, Catalog, CatalogCounts, Loan},
};
use chrono::NaiveDate;
use diesel::{
    dsl::exists,
    pg::PgConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool, PooledConnection},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;
use uuid::Uuid;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn establish_pool(database_url: &str, max_size: u32) -> Result<DbPool, StoreError> {
    Ok(Pool::builder()
        .max_size(max_size)
        .build(ConnectionManager::new(database_url))?)
}

/// PostgreSQL's default name for `book_instances.book_id REFERENCES books`.
const BOOK_FK: &str = "book_instances_book_id_fkey";

type LoanRow = (BookInstance, String, Option<String>);

fn into_loan((instance, book_title, borrower): LoanRow) -> Loan {
    Loan {
        instance,
        book_title,
        borrower,
    }
}

fn genres_by_book(
    conn: &mut PgConnection,
    book_ids: &[i32],
) -> QueryResult<HashMap<i32, Vec<Genre>>> {
    let rows = book_genres::table
        .inner_join(genres::table)
        .filter(book_genres::book_id.eq_any(book_ids))
        .order_by((book_genres::book_id, genres::id))
        .select((book_genres::book_id, genres::all_columns))
        .load::<(i32, Genre)>(conn)?;
    let mut by_book: HashMap<i32, Vec<Genre>> = HashMap::new();
    for (book_id, genre) in rows {
        by_book.entry(book_id).or_default().push(genre);
    }
    Ok(by_book)
}

fn link_genres(conn: &mut PgConnection, book_id: i32, genre_ids: &[i32]) -> QueryResult<()> {
    diesel::delete(book_genres::table.filter(book_genres::book_id.eq(book_id))).execute(conn)?;
    let links: Vec<BookGenre> = genre_ids
        .iter()
        .map(|&genre_id| BookGenre { book_id, genre_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(book_genres::table)
            .values(&links)
            .execute(conn)?;
    }
    Ok(())
}

fn deleted(count: usize, entity: &'static str, id: impl ToString) -> Result<(), StoreError> {
    if count == 0 {
        Err(StoreError::not_found(entity, id))
    } else {
        Ok(())
    }
}

/// PostgreSQL-backed catalog over an r2d2 pool.
#[derive(Clone)]
pub struct PgCatalog {
    pool: DbPool,
}

impl PgCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<DbConnection, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl Catalog for PgCatalog {
    fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let mut conn = self.conn()?;
        Ok(CatalogCounts {
            books: books::table.count().get_result(&mut conn)?,
            instances: book_instances::table.count().get_result(&mut conn)?,
            available: book_instances::table
                .filter(book_instances::status.eq(LoanStatus::Available))
                .count()
                .get_result(&mut conn)?,
            authors: authors::table.count().get_result(&mut conn)?,
        })
    }

    fn books(&self, page: PageRequest) -> Result<Page<BookListing>, StoreError> {
        let mut conn = self.conn()?;
        let total: i64 = books::table.count().get_result(&mut conn)?;
        let page = page.resolve(total)?;
        let rows = books::table
            .left_join(authors::table)
            .order_by((
                authors::last_name.nullable().asc(),
                authors::first_name.nullable().asc(),
                books::title.asc(),
                books::id.asc(),
            ))
            .offset(page.offset())
            .limit(page.size)
            .select((books::all_columns, authors::all_columns.nullable()))
            .load::<(Book, Option<Author>)>(&mut conn)?;
        let ids: Vec<i32> = rows.iter().map(|(book, _)| book.id).collect();
        let mut genres = genres_by_book(&mut conn, &ids)?;
        let listings = rows
            .into_iter()
            .map(|(book, author)| BookListing {
                genres: genres.remove(&book.id).unwrap_or_default(),
                book,
                author,
            })
            .collect();
        Ok(Page::new(listings, page, total))
    }

    fn book(&self, id: i32) -> Result<BookDetail, StoreError> {
        let mut conn = self.conn()?;
        let book = books::table
            .find(id)
            .first::<Book>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::not_found("book", id))?;
        let author = match book.author_id {
            Some(author_id) => authors::table
                .find(author_id)
                .first::<Author>(&mut conn)
                .optional()?,
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => languages::table
                .find(language_id)
                .first::<Language>(&mut conn)
                .optional()?,
            None => None,
        };
        let genres = genres_by_book(&mut conn, &[id])?
            .remove(&id)
            .unwrap_or_default();
        let instances = book_instances::table
            .filter(book_instances::book_id.eq(id))
            .order_by((book_instances::due_back.asc(), book_instances::id.asc()))
            .load::<BookInstance>(&mut conn)?;
        Ok(BookDetail {
            book,
            author,
            language,
            genres,
            instances,
        })
    }

    fn has_book(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::select(exists(books::table.find(id))).get_result(&mut conn)?)
    }

    fn create_book(&self, changes: &BookChanges<'_>) -> Result<Book, StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let book = diesel::insert_into(books::table)
                .values(&changes.book)
                .get_result::<Book>(conn)?;
            link_genres(conn, book.id, &changes.genre_ids)?;
            Ok(book)
        })
    }

    fn update_book(&self, id: i32, changes: &BookChanges<'_>) -> Result<Book, StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let book = diesel::update(books::table.find(id))
                .set(&changes.book)
                .get_result::<Book>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("book", id))?;
            link_genres(conn, id, &changes.genre_ids)?;
            Ok(book)
        })
    }

    fn delete_book(&self, id: i32) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let count = diesel::delete(books::table.find(id)).execute(&mut conn)?;
        deleted(count, "book", id)
    }

    fn authors(&self, page: PageRequest) -> Result<Page<Author>, StoreError> {
        let mut conn = self.conn()?;
        let total: i64 = authors::table.count().get_result(&mut conn)?;
        let page = page.resolve(total)?;
        let authors = authors::table
            .order_by((
                authors::last_name.asc(),
                authors::first_name.asc(),
                authors::id.asc(),
            ))
            .offset(page.offset())
            .limit(page.size)
            .load::<Author>(&mut conn)?;
        Ok(Page::new(authors, page, total))
    }

    fn all_authors(&self) -> Result<Vec<Author>, StoreError> {
        let mut conn = self.conn()?;
        Ok(authors::table
            .order_by((
                authors::last_name.asc(),
                authors::first_name.asc(),
                authors::id.asc(),
            ))
            .load::<Author>(&mut conn)?)
    }

    fn author(&self, id: i32) -> Result<AuthorDetail, StoreError> {
        let mut conn = self.conn()?;
        let author = authors::table
            .find(id)
            .first::<Author>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::not_found("author", id))?;
        let books = books::table
            .filter(books::author_id.eq(id))
            .order_by((books::title.asc(), books::id.asc()))
            .load::<Book>(&mut conn)?;
        Ok(AuthorDetail { author, books })
    }

    fn has_author(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::select(exists(authors::table.find(id))).get_result(&mut conn)?)
    }

    fn create_author(&self, author: &NewAuthor<'_>) -> Result<Author, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(authors::table)
            .values(author)
            .get_result(&mut conn)?)
    }

    fn update_author(&self, id: i32, author: &NewAuthor<'_>) -> Result<Author, StoreError> {
        let mut conn = self.conn()?;
        diesel::update(authors::table.find(id))
            .set(author)
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::not_found("author", id))
    }

    fn delete_author(&self, id: i32) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let count = diesel::delete(authors::table.find(id)).execute(&mut conn)?;
        deleted(count, "author", id)
    }

    fn genres(&self) -> Result<Vec<Genre>, StoreError> {
        let mut conn = self.conn()?;
        Ok(genres::table.order_by(genres::id).load(&mut conn)?)
    }

    fn missing_genres(&self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        let mut conn = self.conn()?;
        let found: Vec<i32> = genres::table
            .filter(genres::id.eq_any(ids))
            .select(genres::id)
            .load(&mut conn)?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect())
    }

    fn create_genre(&self, name: &str) -> Result<Genre, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(genres::table)
            .values(NewGenre { name })
            .get_result(&mut conn)?)
    }

    fn languages(&self) -> Result<Vec<Language>, StoreError> {
        let mut conn = self.conn()?;
        Ok(languages::table.order_by(languages::id).load(&mut conn)?)
    }

    fn has_language(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::select(exists(languages::table.find(id))).get_result(&mut conn)?)
    }

    fn create_language(&self, name: &str) -> Result<Language, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(languages::table)
            .values(NewLanguage { name })
            .get_result(&mut conn)?)
    }

    fn instance(&self, id: Uuid) -> Result<Loan, StoreError> {
        let mut conn = self.conn()?;
        book_instances::table
            .inner_join(books::table)
            .left_join(users::table)
            .filter(book_instances::id.eq(id))
            .select((
                book_instances::all_columns,
                books::title,
                users::username.nullable(),
            ))
            .first::<LoanRow>(&mut conn)
            .optional()?
            .map(into_loan)
            .ok_or_else(|| StoreError::not_found("book instance", id))
    }

    fn create_instance(&self, instance: NewBookInstance<'_>) -> Result<BookInstance, StoreError> {
        let mut conn = self.conn()?;
        let book_id = instance.book_id;
        diesel::insert_into(book_instances::table)
            .values(&instance.into_instance())
            .get_result(&mut conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, ref info)
                    if info.constraint_name() == Some(BOOK_FK) =>
                {
                    StoreError::not_found("book", book_id)
                }
                err => err.into(),
            })
    }

    fn delete_instance(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let count = diesel::delete(book_instances::table.find(id)).execute(&mut conn)?;
        deleted(count, "book instance", id)
    }

    fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let count = diesel::update(book_instances::table.find(id))
            .set(book_instances::due_back.eq(due_back))
            .execute(&mut conn)?;
        deleted(count, "book instance", id)
    }

    fn set_status(&self, id: Uuid, status: LoanStatus) -> Result<LoanStatus, StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let previous = book_instances::table
                .find(id)
                .select(book_instances::status)
                .for_update()
                .first::<LoanStatus>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("book instance", id))?;
            diesel::update(book_instances::table.find(id))
                .set(book_instances::status.eq(status))
                .execute(conn)?;
            Ok(previous)
        })
    }

    fn loans_for(&self, borrower_id: i32, page: PageRequest) -> Result<Page<Loan>, StoreError> {
        let mut conn = self.conn()?;
        let total: i64 = book_instances::table
            .filter(book_instances::borrower_id.eq(borrower_id))
            .filter(book_instances::status.eq(LoanStatus::OnLoan))
            .count()
            .get_result(&mut conn)?;
        let page = page.resolve(total)?;
        let loans = book_instances::table
            .inner_join(books::table)
            .left_join(users::table)
            .filter(book_instances::borrower_id.eq(borrower_id))
            .filter(book_instances::status.eq(LoanStatus::OnLoan))
            .order_by((book_instances::due_back.asc(), book_instances::id.asc()))
            .offset(page.offset())
            .limit(page.size)
            .select((
                book_instances::all_columns,
                books::title,
                users::username.nullable(),
            ))
            .load::<LoanRow>(&mut conn)?;
        Ok(Page::new(
            loans.into_iter().map(into_loan).collect(),
            page,
            total,
        ))
    }

    fn all_loans(&self, page: PageRequest) -> Result<Page<Loan>, StoreError> {
        let mut conn = self.conn()?;
        let total: i64 = book_instances::table
            .filter(book_instances::status.eq(LoanStatus::OnLoan))
            .count()
            .get_result(&mut conn)?;
        let page = page.resolve(total)?;
        let loans = book_instances::table
            .inner_join(books::table)
            .left_join(users::table)
            .filter(book_instances::status.eq(LoanStatus::OnLoan))
            .order_by((
                book_instances::due_back.asc(),
                book_instances::borrower_id.asc(),
                book_instances::book_id.asc(),
                book_instances::id.asc(),
            ))
            .offset(page.offset())
            .limit(page.size)
            .select((
                book_instances::all_columns,
                books::title,
                users::username.nullable(),
            ))
            .load::<LoanRow>(&mut conn)?;
        Ok(Page::new(
            loans.into_iter().map(into_loan).collect(),
            page,
            total,
        ))
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .first::<User>(&mut conn)
            .optional()?)
    }

    fn create_user(&self, user: &NewUser<'_>) -> Result<User, StoreError> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(users::table)
            .values(user)
            .get_result(&mut conn)?)
    }

    fn load_session(&self, key: &str) -> Result<Session, StoreError> {
        let mut conn = self.conn()?;
        let data = sessions::table
            .find(key)
            .select(sessions::data)
            .first::<Vec<u8>>(&mut conn)
            .optional()?;
        Ok(data.map(|data| Session::decode(&data)).unwrap_or_default())
    }

    fn save_session(&self, key: &str, session: &Session) -> Result<(), StoreError> {
        let data = session.encode()?;
        let mut conn = self.conn()?;
        diesel::insert_into(sessions::table)
            .values((
                sessions::session_key.eq(key),
                sessions::data.eq(data.as_slice()),
            ))
            .on_conflict(sessions::session_key)
            .do_update()
            .set(sessions::data.eq(data.as_slice()))
            .execute(&mut conn)?;
        Ok(())
    }
}
