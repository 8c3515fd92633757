use crate::{
    access::{Operation, Viewer},
    decode, redirect, respond, run, today, AppState, PageQuery,
    error::ApiError,
};
use actix_web::{get, post, web, web::Bytes, HttpResponse};
use db::{
    page::{ALL_LOANS_PER_PAGE, MY_LOANS_PER_PAGE},
    renewal::{clean_due_back, proposed_renewal},
    status::{self, StatusAction},
    wire::{BulkReport, InstanceIds, LoanList, LoanRow, RenewalForm, RenewalPart},
};
use uuid::Uuid;

pub const ALL_LOANS_URL: &str = "/catalog/allloanedbooks/";

/// Malformed ids name no instance.
fn instance_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

async fn my_loans(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let borrower_id = viewer.require(Operation::MyLoans)?.id;
    let page = query.request(MY_LOANS_PER_PAGE)?;
    let today = today();
    let list = run(&state, move |catalog| {
        Ok(LoanList::new(&catalog.loans_for(borrower_id, page)?, today))
    })
    .await?;
    respond(&list)
}

async fn all_loans(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::AllLoans)?;
    let page = query.request(ALL_LOANS_PER_PAGE)?;
    let today = today();
    let list = run(&state, move |catalog| {
        Ok(LoanList::new(&catalog.all_loans(page)?, today))
    })
    .await?;
    respond(&list)
}

#[get("/renew/{id}")]
async fn renewal_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    viewer.require(Operation::Renew)?;
    let id = instance_id(&id)?;
    let today = today();
    let form = run(&state, move |catalog| {
        Ok(RenewalForm {
            instance: LoanRow::new(&catalog.instance(id)?, today),
            due_back: proposed_renewal(today).to_string(),
            errors: Vec::new(),
        })
    })
    .await?;
    respond(&form)
}

#[post("/renew/{id}")]
async fn renew(
    state: web::Data<AppState>,
    viewer: Viewer,
    id: web::Path<String>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::Renew)?.username.clone();
    let id = instance_id(&id)?;
    let today = today();
    let rejected = run(&state, move |catalog| {
        let loan = catalog.instance(id)?;
        let RenewalPart { due_back } = decode(&body)?;
        match clean_due_back(due_back, today) {
            Ok(due_back) => {
                catalog.set_due_back(id, due_back)?;
                log::info!("{librarian} renewed {id} until {due_back}");
                Ok(None)
            }
            Err(error) => Ok(Some(RenewalForm {
                instance: LoanRow::new(&loan, today),
                due_back: due_back.to_owned(),
                errors: vec![error],
            })),
        }
    })
    .await?;
    match rejected {
        None => Ok(redirect(ALL_LOANS_URL)),
        Some(form) => respond(&form),
    }
}

#[post("/bookinstances/{action}/")]
async fn bulk_status(
    state: web::Data<AppState>,
    viewer: Viewer,
    action: web::Path<String>,
    body: Bytes,
) -> Result<HttpResponse, ApiError> {
    let librarian = viewer.require(Operation::BulkStatus)?.username.clone();
    let action: StatusAction = action.parse().map_err(|()| ApiError::NotFound)?;
    let report = run(&state, move |catalog| {
        let InstanceIds { ids } = decode(&body)?;
        Ok(BulkReport {
            items: status::apply(catalog, action, &ids)?,
        })
    })
    .await?;
    log::info!(
        "{librarian} applied {} to {} instance(s)",
        action.to_str(),
        report.items.len()
    );
    respond(&report)
}

/// Listings answer GET and POST alike, and other methods with 405.
pub(crate) fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/mybooks/")
            .route(web::get().to(my_loans))
            .route(web::post().to(my_loans)),
    )
    .service(
        web::resource("/allloanedbooks/")
            .route(web::get().to(all_loans))
            .route(web::post().to(all_loans)),
    )
    .service(renewal_form)
        .service(renew)
        .service(bulk_status);
}
