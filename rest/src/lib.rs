pub mod access;
mod catalog;
pub mod config;
mod editing;
pub mod error;
mod loans;

use actix_web::{http::header, web, HttpResponse};
use db::{page::PageRequest, Catalog};
use chrono::{Local, NaiveDate};
use config::Settings;
use error::ApiError;
use serde::Deserialize;
use speedy::{LittleEndian, Readable, Writable};
use std::sync::Arc;

/// Shared by every handler through `web::Data`.
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub login_url: String,
    pub user_header: String,
}

impl AppState {
    pub fn new(catalog: Arc<dyn Catalog>, settings: &Settings) -> Self {
        Self {
            catalog,
            login_url: settings.login_url.clone(),
            user_header: settings.user_header.clone(),
        }
    }
}

pub(crate) fn encode<T: Writable<LittleEndian>>(value: &T) -> Result<Vec<u8>, ApiError> {
    value
        .write_to_vec_with_ctx(LittleEndian::default())
        .map_err(ApiError::Encode)
}

pub(crate) fn decode<'a, T: Readable<'a, LittleEndian>>(body: &'a [u8]) -> Result<T, ApiError> {
    T::read_from_buffer_with_ctx(LittleEndian::default(), body).map_err(ApiError::BadRequest)
}

pub(crate) fn respond<T: Writable<LittleEndian>>(value: &T) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().body(encode(value)?))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Runs blocking catalog work off the async executor.
pub(crate) async fn run<T, F>(state: &web::Data<AppState>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Catalog) -> Result<T, ApiError> + Send + 'static,
{
    let catalog = Arc::clone(&state.catalog);
    web::block(move || work(catalog.as_ref())).await?
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    /// `?page=last` names the final page; any other non-integer finds nothing.
    pub(crate) fn request(&self, size: i64) -> Result<PageRequest, ApiError> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(PageRequest::new(1, size)),
            Some("last") => Ok(PageRequest::last(size)),
            Some(raw) => raw
                .parse()
                .map(|number| PageRequest::new(number, size))
                .map_err(|_| ApiError::NotFound),
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    cfg.app_data(state).service(
        web::scope("/catalog")
            .configure(catalog::config)
            .configure(loans::config)
            .configure(editing::config),
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use actix_web::{
        dev::ServiceResponse,
        http::StatusCode,
        test::{call_service, init_service, TestRequest},
        App,
    };
    use db::MemoryCatalog;

    pub(crate) fn state(catalog: Arc<MemoryCatalog>) -> web::Data<AppState> {
        web::Data::new(AppState {
            catalog,
            login_url: "/accounts/login/".to_owned(),
            user_header: "Remote-User".to_owned(),
        })
    }

    pub(crate) fn location(resp: &ServiceResponse) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn page_query() {
        let query = |page: Option<&str>| PageQuery {
            page: page.map(str::to_owned),
        };
        assert_eq!(query(None).request(10).unwrap(), PageRequest::new(1, 10));
        assert_eq!(query(Some("3")).request(20).unwrap(), PageRequest::new(3, 20));
        assert_eq!(query(Some("last")).request(10).unwrap(), PageRequest::last(10));
        assert!(matches!(query(Some("two")).request(10), Err(ApiError::NotFound)));
    }

    #[actix_web::test]
    async fn unknown_routes_are_not_found() {
        let catalog = Arc::new(MemoryCatalog::new());
        let app = init_service(App::new().configure(|cfg| config(cfg, state(catalog)))).await;
        let req = TestRequest::get().uri("/catalog/nope/").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
