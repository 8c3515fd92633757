use crate::{error::ApiError, respond, run, today, AppState, PageQuery};
use actix_web::{cookie::Cookie, get, web, HttpRequest, HttpResponse};
use db::{
    page::{AUTHORS_PER_PAGE, BOOKS_PER_PAGE},
    session::NUM_VISITS,
    wire::{AuthorDetailView, AuthorList, BookDetailView, BookList, IndexCounts},
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";

/// The caller's session key, and whether it was issued just now.
fn session_key(req: &HttpRequest) -> (String, bool) {
    match req.cookie(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() && cookie.value().len() <= 40 => {
            (cookie.value().to_owned(), false)
        }
        _ => (Uuid::new_v4().simple().to_string(), true),
    }
}

#[get("/")]
async fn index(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let (key, issued) = session_key(&req);
    let session_key = key.clone();
    let counts = run(&state, move |catalog| {
        let mut session = catalog.load_session(&session_key)?;
        let num_visits = session.increment(NUM_VISITS);
        catalog.save_session(&session_key, &session)?;
        Ok(IndexCounts::new(catalog.counts()?, num_visits))
    })
    .await?;
    let body = crate::encode(&counts)?;
    let mut response = HttpResponse::Ok();
    if issued {
        response.cookie(
            Cookie::build(SESSION_COOKIE, key)
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
    Ok(response.body(body))
}

#[get("/books/")]
async fn books(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.request(BOOKS_PER_PAGE)?;
    let list = run(&state, move |catalog| Ok(BookList::from(catalog.books(page)?))).await?;
    respond(&list)
}

#[get("/book/{id}")]
async fn book(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let today = today();
    let detail = run(&state, move |catalog| {
        Ok(BookDetailView::new(&catalog.book(id)?, today))
    })
    .await?;
    respond(&detail)
}

#[get("/authors/")]
async fn authors(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.request(AUTHORS_PER_PAGE)?;
    let list = run(&state, move |catalog| Ok(AuthorList::from(catalog.authors(page)?))).await?;
    respond(&list)
}

#[get("/author/{id}")]
async fn author(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let detail = run(&state, move |catalog| {
        Ok(AuthorDetailView::from(&catalog.author(id)?))
    })
    .await?;
    respond(&detail)
}

pub(crate) fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(books)
        .service(book)
        .service(authors)
        .service(author);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config, tests::state};
    use actix_web::{
        http::StatusCode,
        test::{self, TestRequest},
        App,
    };
    use db::{
        models::{LoanStatus, NewBook, NewBookInstance},
        store::BookChanges,
        testing::{new_author, seed_loans},
        Catalog, MemoryCatalog,
    };
    use speedy::Readable;
    use std::sync::Arc;

    #[actix_web::test]
    async fn index_counts_visits_per_session() {
        let catalog = Arc::new(MemoryCatalog::new());
        let fixture = seed_loans(catalog.as_ref(), 3);
        catalog
            .create_instance(NewBookInstance {
                book_id: fixture.book_id,
                imprint: "Reprint, 2020",
                due_back: None,
                borrower_id: None,
                status: LoanStatus::Available,
            })
            .unwrap();
        let app = test::init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;

        let resp = test::call_service(&app, TestRequest::get().uri("/catalog/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .unwrap()
            .into_owned();
        let counts = IndexCounts::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(
            counts,
            IndexCounts {
                num_books: 1,
                num_instances: 4,
                num_instances_available: 1,
                num_authors: 1,
                num_visits: 0,
            }
        );

        let req = TestRequest::get().uri("/catalog/").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.response().cookies().count(), 0);
        let counts = IndexCounts::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(counts.num_visits, 1);

        // A fresh browser starts over.
        let resp = test::call_service(&app, TestRequest::get().uri("/catalog/").to_request()).await;
        let counts = IndexCounts::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(counts.num_visits, 0);
    }

    #[actix_web::test]
    async fn authors_are_paginated_by_ten() {
        let catalog = Arc::new(MemoryCatalog::new());
        for id in 0..13 {
            let first_name = format!("Christian {id}");
            let last_name = format!("Surname {id:02}");
            catalog
                .create_author(&new_author(&first_name, &last_name))
                .unwrap();
        }
        let app = test::init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;

        let resp =
            test::call_service(&app, TestRequest::get().uri("/catalog/authors/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let list = AuthorList::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(list.authors.len(), 10);
        assert!(list.pagination.is_paginated);
        assert_eq!(list.pagination.num_pages, 2);
        assert_eq!(list.authors[0].last_name, "Surname 00");

        let req = TestRequest::get().uri("/catalog/authors/?page=2").to_request();
        let resp = test::call_service(&app, req).await;
        let list = AuthorList::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(list.authors.len(), 3);
        assert_eq!(list.pagination.number, 2);

        for page in ["3", "0", "two"] {
            let req = TestRequest::get()
                .uri(&format!("/catalog/authors/?page={page}"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "page {page}");
        }
    }

    #[actix_web::test]
    async fn books_are_paginated_by_ten() {
        let catalog = Arc::new(MemoryCatalog::new());
        for id in 0..13 {
            let title = format!("Title {id:02}");
            let isbn = format!("97800000000{id:02}");
            catalog
                .create_book(&BookChanges {
                    book: NewBook {
                        title: &title,
                        summary: "Summary",
                        isbn: &isbn,
                        author_id: None,
                        language_id: None,
                    },
                    genre_ids: Vec::new(),
                })
                .unwrap();
        }
        let app = test::init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;

        let req = TestRequest::get().uri("/catalog/books/").to_request();
        let resp = test::call_service(&app, req).await;
        let list = BookList::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(list.books.len(), 10);
        assert_eq!(list.books[0].title, "Title 00");
        assert_eq!(list.pagination.num_pages, 2);

        for uri in ["/catalog/books/?page=2", "/catalog/books/?page=last"] {
            let req = TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let list = BookList::read_from_buffer(&test::read_body(resp).await).unwrap();
            assert_eq!(list.books.len(), 3, "{uri}");
            assert_eq!(list.pagination.number, 2, "{uri}");
            assert_eq!(list.books[2].title, "Title 12");
        }

        let req = TestRequest::get().uri("/catalog/books/?page=3").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn book_pages() {
        let catalog = Arc::new(MemoryCatalog::new());
        let fixture = seed_loans(catalog.as_ref(), 2);
        let app = test::init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;

        let resp =
            test::call_service(&app, TestRequest::get().uri("/catalog/books/").to_request()).await;
        let list = BookList::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(list.books.len(), 1);
        assert_eq!(list.books[0].author.as_deref(), Some("Smith, John"));
        assert_eq!(list.books[0].display_genre, "Fantasy");
        assert!(!list.pagination.is_paginated);

        let req = TestRequest::get()
            .uri(&format!("/catalog/book/{}", fixture.book_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = BookDetailView::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(detail.title, "Book Title");
        assert_eq!(detail.language.as_deref(), Some("English"));
        assert_eq!(detail.copies.len(), 2);

        for uri in ["/catalog/book/9999", "/catalog/book/abc", "/catalog/author/9999"] {
            let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn author_page_lists_books() {
        let catalog = Arc::new(MemoryCatalog::new());
        seed_loans(catalog.as_ref(), 1);
        let author_id = catalog.all_authors().unwrap()[0].id;
        let app = test::init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;

        let req = TestRequest::get()
            .uri(&format!("/catalog/author/{author_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let detail = AuthorDetailView::read_from_buffer(&test::read_body(resp).await).unwrap();
        assert_eq!(detail.author.display_name, "Smith, John");
        assert_eq!(detail.books.len(), 1);
        assert_eq!(detail.books[0].title, "Book Title");
    }
}
