use crate::{
    access::{Operation, Viewer},
    decode, encode, redirect, respond, run, today, AppState,
    error::ApiError,
};
use actix_web::{get, post, web, web::Bytes, HttpResponse};
use db::{
    forms::{
        validate_author, validate_book, validate_book_instance, validate_genre, validate_language,
    },
    wire::{
        AuthorDetailView, AuthorForm, AuthorRow, BookChoices, BookDetailView, BookEditForm,
        BookForm, BookInstanceForm, Created, NamePart,
    },
    Catalog, StoreError,
};
use uuid::Uuid;

const AUTHORS_URL: &str = "/catalog/authors/";
const BOOKS_URL: &str = "/catalog/books/";

fn book_choices(catalog: &dyn Catalog) -> Result<BookChoices, StoreError> {
    Ok(BookChoices::new(
        &catalog.all_authors()?,
        &catalog.languages()?,
        &catalog.genres()?,
    ))
}

fn created(id: String) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Created().body(encode(&Created { id })?))
}

#[get("/author/create/")]
async fn author_create_form(viewer: Viewer) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditAuthor)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/author/create/")]
async fn author_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditAuthor)?.username.clone();
    let author = run(&state, move |catalog| {
        let form: AuthorForm = decode(&body)?;
        let author = validate_author(&form)?;
        Ok(catalog.create_author(&author)?)
    })
    .await?;
    log::info!("{librarian} created author {} ({author})", author.id);
    Ok(redirect(&author.absolute_url()))
}

#[get("/author/{id}/update/")]
async fn author_update_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditAuthor)?;
    let id = id.into_inner();
    let author = run(&state, move |catalog| {
        Ok(AuthorRow::from(&catalog.author(id)?.author))
    })
    .await?;
    respond(&author)
}

#[post("/author/{id}/update/")]
async fn author_update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditAuthor)?.username.clone();
    let id = id.into_inner();
    let author = run(&state, move |catalog| {
        if !catalog.has_author(id)? {
            return Err(ApiError::NotFound);
        }
        let form: AuthorForm = decode(&body)?;
        let author = validate_author(&form)?;
        Ok(catalog.update_author(id, &author)?)
    })
    .await?;
    log::info!("{librarian} updated author {id} ({author})");
    Ok(redirect(&author.absolute_url()))
}

#[get("/author/{id}/delete/")]
async fn author_delete_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditAuthor)?;
    let id = id.into_inner();
    let author = run(&state, move |catalog| {
        Ok(AuthorDetailView::from(&catalog.author(id)?))
    })
    .await?;
    respond(&author)
}

#[post("/author/{id}/delete/")]
async fn author_delete(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditAuthor)?.username.clone();
    let id = id.into_inner();
    run(&state, move |catalog| Ok(catalog.delete_author(id)?)).await?;
    log::info!("{librarian} deleted author {id}");
    Ok(redirect(AUTHORS_URL))
}

#[get("/book/create/")]
async fn book_create_form(
    state: web::Data<AppState>,
    viewer: Viewer,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditBook)?;
    let choices = run(&state, |catalog| Ok(book_choices(catalog)?)).await?;
    respond(&choices)
}

#[post("/book/create/")]
async fn book_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditBook)?.username.clone();
    let book = run(&state, move |catalog| {
        let form: BookForm = decode(&body)?;
        let changes = validate_book(catalog, &form)??;
        Ok(catalog.create_book(&changes)?)
    })
    .await?;
    log::info!("{librarian} created book {} ({})", book.id, book.title);
    Ok(redirect(&book.absolute_url()))
}

#[get("/book/{id}/update/")]
async fn book_update_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditBook)?;
    let id = id.into_inner();
    let today = today();
    let form = run(&state, move |catalog| {
        let detail = catalog.book(id)?;
        Ok(BookEditForm {
            book: BookDetailView::new(&detail, today),
            author_id: detail.book.author_id,
            language_id: detail.book.language_id,
            genre_ids: detail.genres.iter().map(|genre| genre.id).collect(),
            choices: book_choices(catalog)?,
        })
    })
    .await?;
    respond(&form)
}

#[post("/book/{id}/update/")]
async fn book_update(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditBook)?.username.clone();
    let id = id.into_inner();
    let book = run(&state, move |catalog| {
        if !catalog.has_book(id)? {
            return Err(ApiError::NotFound);
        }
        let form: BookForm = decode(&body)?;
        let changes = validate_book(catalog, &form)??;
        Ok(catalog.update_book(id, &changes)?)
    })
    .await?;
    log::info!("{librarian} updated book {id} ({})", book.title);
    Ok(redirect(&book.absolute_url()))
}

#[get("/book/{id}/delete/")]
async fn book_delete_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::EditBook)?;
    let id = id.into_inner();
    let today = today();
    let book = run(&state, move |catalog| {
        Ok(BookDetailView::new(&catalog.book(id)?, today))
    })
    .await?;
    respond(&book)
}

#[post("/book/{id}/delete/")]
async fn book_delete(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditBook)?.username.clone();
    let id = id.into_inner();
    run(&state, move |catalog| Ok(catalog.delete_book(id)?)).await?;
    log::info!("{librarian} deleted book {id} with its copies");
    Ok(redirect(BOOKS_URL))
}

#[post("/genre/create/")]
async fn genre_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditGenre)?.username.clone();
    let genre = run(&state, move |catalog| {
        let NamePart { name } = decode(&body)?;
        Ok(catalog.create_genre(validate_genre(name)?)?)
    })
    .await?;
    log::info!("{librarian} created genre {} ({})", genre.id, genre.name);
    created(genre.id.to_string())
}

#[post("/language/create/")]
async fn language_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditLanguage)?.username.clone();
    let language = run(&state, move |catalog| {
        let NamePart { name } = decode(&body)?;
        Ok(catalog.create_language(validate_language(name)?)?)
    })
    .await?;
    log::info!("{librarian} created language {} ({})", language.id, language.name);
    created(language.id.to_string())
}

#[post("/bookinstance/create/")]
async fn instance_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditInstance)?.username.clone();
    let instance = run(&state, move |catalog| {
        let form: BookInstanceForm = decode(&body)?;
        let instance = validate_book_instance(catalog, &form)??;
        Ok(catalog.create_instance(instance)?)
    })
    .await?;
    log::info!(
        "{librarian} added copy {} of book {}",
        instance.id,
        instance.book_id
    );
    created(instance.id.to_string())
}

#[post("/bookinstance/{id}/delete/")]
async fn instance_delete(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::EditInstance)?.username.clone();
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound)?;
    let book_id = run(&state, move |catalog| {
        let loan = catalog.instance(id)?;
        catalog.delete_instance(id)?;
        Ok(loan.instance.book_id)
    })
    .await?;
    log::info!("{librarian} retired copy {id} of book {book_id}");
    Ok(redirect(&format!("/catalog/book/{book_id}")))
}

pub(crate) fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(author_create_form)
        .service(author_create)
        .service(author_update_form)
        .service(author_update)
        .service(author_delete_form)
        .service(author_delete)
        .service(book_create_form)
        .service(book_create)
        .service(book_update_form)
        .service(book_update)
        .service(book_delete_form)
        .service(book_delete)
        .service(genre_create)
        .service(language_create)
        .service(instance_create)
        .service(instance_delete);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config,
        tests::{location, state},
    };
    use actix_web::{
        http::StatusCode,
        test::{self, TestRequest},
        App,
    };
    use db::{
        forms::{FormErrors, REQUIRED},
        models::LoanStatus,
        testing::seed_loans,
        MemoryCatalog,
    };
    use speedy::{Readable, Writable};
    use std::sync::Arc;

    fn author_form<'a>(first_name: &'a str, last_name: &'a str) -> Vec<u8> {
        AuthorForm {
            first_name,
            last_name,
            date_of_birth: Some("1920-01-02"),
            date_of_death: None,
        }
        .write_to_vec()
        .unwrap()
    }

    fn post(uri: &str, user: &str, body: Vec<u8>) -> TestRequest {
        TestRequest::post()
            .uri(uri)
            .insert_header(("Remote-User", user.to_owned()))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn editing_needs_the_librarian_permission() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_loans(catalog.as_ref(), 1);
        let app = test::init_service(
            App::new().configure(|cfg| config(cfg, state(Arc::clone(&catalog)))),
        )
        .await;

        let req = TestRequest::get().uri("/catalog/author/create/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/accounts/login/?next=/catalog/author/create/");

        let req = post("/catalog/author/create/", "testuser1", author_form("Big", "Bob"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(catalog.all_authors().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn author_lifecycle() {
        let catalog = Arc::new(MemoryCatalog::new());
        let fixture = seed_loans(catalog.as_ref(), 1);
        let app = test::init_service(
            App::new().configure(|cfg| config(cfg, state(Arc::clone(&catalog)))),
        )
        .await;

        let req = post("/catalog/author/create/", "testuser2", author_form("", "Bob")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let errors = FormErrors::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(errors.for_field("first_name").collect::<Vec<_>>(), [REQUIRED]);

        let req = post("/catalog/author/create/", "testuser2", author_form("Big", "Bob"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let url = location(&resp).to_owned();
        let id: i32 = url.trim_start_matches("/catalog/author/").parse().unwrap();

        let req = post(
            &format!("/catalog/author/{id}/update/"),
            "testuser2",
            author_form("Big", "Bobby"),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), url);
        let req = TestRequest::get()
            .uri(&format!("/catalog/author/{id}/update/"))
            .insert_header(("Remote-User", "testuser2"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let author = AuthorRow::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(author.display_name, "Bobby, Big");
        assert_eq!(author.date_of_birth.as_deref(), Some("1920-01-02"));

        // Removing the seeded author keeps the book.
        let john = catalog.book(fixture.book_id).unwrap().author.unwrap().id;
        let req = post(&format!("/catalog/author/{john}/delete/"), "testuser2", Vec::new())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), AUTHORS_URL);
        assert_eq!(catalog.book(fixture.book_id).unwrap().author, None);

        let req = post(&format!("/catalog/author/{john}/delete/"), "testuser2", Vec::new())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn book_lifecycle() {
        let catalog = Arc::new(MemoryCatalog::new());
        let fixture = seed_loans(catalog.as_ref(), 2);
        let author_id = catalog.all_authors().unwrap()[0].id;
        let genre_id = catalog.genres().unwrap()[0].id;
        let app = test::init_service(
            App::new().configure(|cfg| config(cfg, state(Arc::clone(&catalog)))),
        )
        .await;

        let req = TestRequest::get()
            .uri("/catalog/book/create/")
            .insert_header(("Remote-User", "testuser2"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let choices = BookChoices::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(choices.authors[0].name, "Smith, John");
        assert_eq!(choices.genres[0].name, "Fantasy");

        let form = |isbn: &str, genre_ids: Vec<i32>| {
            BookForm {
                title: "Second Book",
                summary: "Another summary",
                isbn,
                author_id: Some(author_id),
                language_id: None,
                genre_ids,
            }
            .write_to_vec()
            .unwrap()
        };
        let req = post("/catalog/book/create/", "testuser2", form("123", vec![9999])).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let errors = FormErrors::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(errors.for_field("isbn").count(), 1);
        assert_eq!(errors.for_field("genre").count(), 1);

        let req = post(
            "/catalog/book/create/",
            "testuser2",
            form("9781234567897", vec![genre_id]),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let id: i32 = location(&resp)
            .trim_start_matches("/catalog/book/")
            .parse()
            .unwrap();

        let req = TestRequest::get()
            .uri(&format!("/catalog/book/{id}/update/"))
            .insert_header(("Remote-User", "testuser2"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let edit = BookEditForm::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(edit.book.title, "Second Book");
        assert_eq!(edit.author_id, Some(author_id));
        assert_eq!(edit.genre_ids, [genre_id]);

        let req = post(
            &format!("/catalog/book/{}/delete/", fixture.book_id),
            "testuser2",
            Vec::new(),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), BOOKS_URL);
        assert!(!catalog.has_book(fixture.book_id).unwrap());
        assert!(catalog.instance(fixture.instances[0]).unwrap_err().is_not_found());
    }

    #[actix_web::test]
    async fn genres_languages_and_copies() {
        let catalog = Arc::new(MemoryCatalog::new());
        let fixture = seed_loans(catalog.as_ref(), 1);
        let app = test::init_service(
            App::new().configure(|cfg| config(cfg, state(Arc::clone(&catalog)))),
        )
        .await;

        let name = |name: &str| NamePart { name }.write_to_vec().unwrap();
        let req = post("/catalog/genre/create/", "testuser2", name("Science Fiction")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let genre = Created::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert!(catalog
            .genres()
            .unwrap()
            .iter()
            .any(|created| created.id.to_string() == genre.id));

        let req = post("/catalog/language/create/", "testuser2", name("   ")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(catalog.languages().unwrap().len(), 1);

        let copy = BookInstanceForm {
            book_id: fixture.book_id,
            imprint: "Second Printing, 2018",
            due_back: None,
            borrower: None,
            status: "a",
        };
        let req = post(
            "/catalog/bookinstance/create/",
            "testuser2",
            copy.write_to_vec().unwrap(),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = Created::read_from_buffer(&test::read_body(resp).await).unwrap();
        let id = Uuid::parse_str(&created.id).unwrap();
        assert_eq!(
            catalog.instance(id).unwrap().instance.status,
            LoanStatus::Available
        );

        let req = post(
            &format!("/catalog/bookinstance/{id}/delete/"),
            "testuser2",
            Vec::new(),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/catalog/book/{}", fixture.book_id));
        assert!(catalog.instance(id).is_err());
    }
}
