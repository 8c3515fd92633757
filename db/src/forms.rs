use crate::{
    error::StoreError,
    models::{LoanStatus, NewAuthor, NewBook, NewBookInstance},
    store::{BookChanges, Catalog},
    wire::{AuthorForm, BookForm, BookInstanceForm},
};
use chrono::NaiveDate;
use speedy::{Readable, Writable};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_CHOICE: &str = "Select a valid choice.";

#[derive(Clone, Debug, PartialEq, Eq, Readable, Writable)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Readable, Writable)]
pub struct FormErrors {
    pub errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn for_field(&self, field: &str) -> impl Iterator<Item = &str> {
        let field = field.to_owned();
        self.errors
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| error.message.as_str())
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for FormErrors {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Trims and checks a required text field against its column width.
pub fn text<'a>(errors: &mut FormErrors, field: &str, value: &'a str, max: usize) -> &'a str {
    let value = value.trim();
    let length = value.chars().count();
    if length == 0 {
        errors.add(field, REQUIRED);
    } else if length > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {length})."),
        );
    }
    value
}

/// Parses an optional `YYYY-MM-DD` field; blank counts as absent.
pub fn date(errors: &mut FormErrors, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, INVALID_DATE);
            None
        }
    }
}

pub fn validate_genre<'a>(name: &'a str) -> Result<&'a str, FormErrors> {
    let mut errors = FormErrors::default();
    let name = text(&mut errors, "name", name, 200);
    errors.finish(name)
}

pub fn validate_language<'a>(name: &'a str) -> Result<&'a str, FormErrors> {
    let mut errors = FormErrors::default();
    let name = text(&mut errors, "name", name, 100);
    errors.finish(name)
}

pub fn validate_author<'a>(form: &AuthorForm<'a>) -> Result<NewAuthor<'a>, FormErrors> {
    let mut errors = FormErrors::default();
    let first_name = text(&mut errors, "first_name", form.first_name, 100);
    let last_name = text(&mut errors, "last_name", form.last_name, 100);
    let date_of_birth = date(&mut errors, "date_of_birth", form.date_of_birth);
    let date_of_death = date(&mut errors, "date_of_death", form.date_of_death);
    if let (Some(born), Some(died)) = (date_of_birth, date_of_death) {
        if died < born {
            errors.add("date_of_death", "Date of death is before date of birth.");
        }
    }
    errors.finish(NewAuthor {
        first_name,
        last_name,
        date_of_birth,
        date_of_death,
    })
}

/// Checks field shapes and that every referenced author, language and genre exists.
pub fn validate_book<'a>(
    catalog: &dyn Catalog,
    form: &BookForm<'a>,
) -> Result<Result<BookChanges<'a>, FormErrors>, StoreError> {
    let mut errors = FormErrors::default();
    let title = text(&mut errors, "title", form.title, 200);
    let summary = text(&mut errors, "summary", form.summary, 1000);
    let isbn = form.isbn.trim();
    if isbn.chars().count() != 13 {
        errors.add("isbn", "ISBN must be exactly 13 characters.");
    }
    if let Some(author_id) = form.author_id {
        if !catalog.has_author(author_id)? {
            errors.add("author", INVALID_CHOICE);
        }
    }
    if let Some(language_id) = form.language_id {
        if !catalog.has_language(language_id)? {
            errors.add("language", INVALID_CHOICE);
        }
    }
    let mut genre_ids = form.genre_ids.clone();
    genre_ids.sort_unstable();
    genre_ids.dedup();
    for missing in catalog.missing_genres(&genre_ids)? {
        errors.add("genre", format!("{missing} is not one of the available choices."));
    }
    Ok(errors.finish(BookChanges {
        book: NewBook {
            title,
            summary,
            isbn,
            author_id: form.author_id,
            language_id: form.language_id,
        },
        genre_ids,
    }))
}

pub fn validate_book_instance<'a>(
    catalog: &dyn Catalog,
    form: &BookInstanceForm<'a>,
) -> Result<Result<NewBookInstance<'a>, FormErrors>, StoreError> {
    let mut errors = FormErrors::default();
    if !catalog.has_book(form.book_id)? {
        errors.add("book", INVALID_CHOICE);
    }
    let imprint = text(&mut errors, "imprint", form.imprint, 200);
    let due_back = date(&mut errors, "due_back", form.due_back);
    let status = match form.status.parse::<LoanStatus>() {
        Ok(status) => status,
        Err(()) => {
            errors.add("status", INVALID_CHOICE);
            LoanStatus::default()
        }
    };
    let borrower = form.borrower.map(str::trim).filter(|name| !name.is_empty());
    let borrower_id = match borrower {
        Some(username) => match catalog.user_by_name(username)? {
            Some(user) => Some(user.id),
            None => {
                errors.add("borrower", INVALID_CHOICE);
                None
            }
        },
        None => None,
    };
    Ok(errors.finish(NewBookInstance {
        book_id: form.book_id,
        imprint,
        due_back,
        borrower_id,
        status,
    }))
}
