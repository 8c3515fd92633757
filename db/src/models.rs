use crate::schema::{authors, book_genres, book_instances, books, genres, languages, users};
use chrono::NaiveDate;
use diesel::prelude::*;
use speedy::{Readable, Writable};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    diesel_derive_enum::DbEnum,
    Readable,
    Writable,
    PartialEq,
    Eq,
    Hash,
)]
#[ExistingTypePath = "crate::schema::sql_types::LoanStatus"]
pub enum LoanStatus {
    #[default]
    #[db_rename = "m"]
    Maintenance,
    #[db_rename = "o"]
    OnLoan,
    #[db_rename = "a"]
    Available,
    #[db_rename = "r"]
    Reserved,
}

impl LoanStatus {
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Maintenance => "Maintenance",
            Self::OnLoan => "On loan",
            Self::Available => "Available",
            Self::Reserved => "Reserved",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(Self::Maintenance),
            "o" => Ok(Self::OnLoan),
            "a" => Ok(Self::Available),
            "r" => Ok(Self::Reserved),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = genres)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = genres)]
pub struct NewGenre<'a> {
    pub name: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = languages)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = languages)]
pub struct NewLanguage<'a> {
    pub name: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = authors)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    pub fn absolute_url(&self) -> String {
        format!("/catalog/author/{}", self.id)
    }

    /// Default listing order: last name, then first name.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.last_name, &self.first_name)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.last_name, self.first_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Insertable, AsChangeset)]
#[diesel(table_name = authors, treat_none_as_null = true)]
pub struct NewAuthor<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = books)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
}

impl Book {
    pub fn absolute_url(&self) -> String {
        format!("/catalog/book/{}", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Insertable, AsChangeset)]
#[diesel(table_name = books, treat_none_as_null = true)]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub isbn: &'a str,
    pub author_id: Option<i32>,
    pub language_id: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = book_genres)]
pub struct BookGenre {
    pub book_id: i32,
    pub genre_id: i32,
}

/// Comma-joined names of the first three genres.
pub fn display_genre(genres: &[Genre]) -> String {
    genres
        .iter()
        .take(3)
        .map(|genre| genre.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable, Insertable)]
#[diesel(table_name = book_instances)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub status: LoanStatus,
}

impl BookInstance {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_back.map_or(false, |due_back| today > due_back)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBookInstance<'a> {
    pub book_id: i32,
    pub imprint: &'a str,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub status: LoanStatus,
}

impl NewBookInstance<'_> {
    /// Assigns the copy its permanent identifier.
    pub fn into_instance(self) -> BookInstance {
        BookInstance {
            id: Uuid::new_v4(),
            book_id: self.book_id,
            imprint: self.imprint.to_owned(),
            due_back: self.due_back,
            borrower_id: self.borrower_id,
            status: self.status,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    CanMarkReturned,
}

impl Permission {
    pub fn codename(self) -> &'static str {
        match self {
            Self::CanMarkReturned => "catalog.can_mark_returned",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_superuser: bool,
    pub can_mark_returned: bool,
}

impl User {
    pub fn has_perm(&self, permission: Permission) -> bool {
        self.is_superuser
            || match permission {
                Permission::CanMarkReturned => self.can_mark_returned,
            }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub is_superuser: bool,
    pub can_mark_returned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i32, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_owned(),
        }
    }

    #[test]
    fn author_displays_last_name_first() {
        let author = Author {
            id: 1,
            first_name: "Big".to_owned(),
            last_name: "Bob".to_owned(),
            date_of_birth: None,
            date_of_death: None,
        };
        assert_eq!(author.to_string(), "Bob, Big");
        assert_eq!(author.absolute_url(), "/catalog/author/1");
    }

    #[test]
    fn display_genre_keeps_first_three() {
        assert_eq!(display_genre(&[]), "");
        assert_eq!(display_genre(&[genre(1, "Testing")]), "Testing");
        let genres = [
            genre(1, "Fantasy"),
            genre(2, "Horror"),
            genre(3, "Poetry"),
            genre(4, "Satire"),
        ];
        assert_eq!(display_genre(&genres), "Fantasy, Horror, Poetry");
    }

    #[test]
    fn loan_status_codes() {
        for (code, status) in [
            ("m", LoanStatus::Maintenance),
            ("o", LoanStatus::OnLoan),
            ("a", LoanStatus::Available),
            ("r", LoanStatus::Reserved),
        ] {
            assert_eq!(code.parse(), Ok(status));
        }
        assert_eq!("x".parse::<LoanStatus>(), Err(()));
        assert_eq!(LoanStatus::default(), LoanStatus::Maintenance);
        assert_eq!(LoanStatus::OnLoan.to_string(), "On loan");
    }

    #[test]
    fn overdue_only_after_due_date() {
        let due_back = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let instance = NewBookInstance {
            book_id: 1,
            imprint: "Unlikely Imprint, 2016",
            due_back: Some(due_back),
            borrower_id: None,
            status: LoanStatus::OnLoan,
        }
        .into_instance();
        assert!(!instance.is_overdue(due_back));
        assert!(instance.is_overdue(due_back.succ_opt().unwrap()));
    }

    #[test]
    fn superuser_holds_every_permission() {
        let mut user = User {
            id: 1,
            username: "testuser1".to_owned(),
            is_superuser: false,
            can_mark_returned: false,
        };
        assert!(!user.has_perm(Permission::CanMarkReturned));
        user.is_superuser = true;
        assert!(user.has_perm(Permission::CanMarkReturned));
    }
}
