use crate::{error::ApiError, AppState};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use db::models::{Permission, User};
use std::{future::Future, pin::Pin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Permission(Permission),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Index,
    Browse,
    MyLoans,
    AllLoans,
    Renew,
    BulkStatus,
    EditAuthor,
    EditBook,
    EditGenre,
    EditLanguage,
    EditInstance,
}

impl Operation {
    pub fn requirement(self) -> Requirement {
        match self {
            Self::Index | Self::Browse => Requirement::Public,
            Self::MyLoans => Requirement::Authenticated,
            Self::AllLoans
            | Self::Renew
            | Self::BulkStatus
            | Self::EditAuthor
            | Self::EditBook
            | Self::EditGenre
            | Self::EditLanguage
            | Self::EditInstance => Requirement::Permission(Permission::CanMarkReturned),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denied {
    Unauthenticated,
    Forbidden(Permission),
}

pub fn authorize(user: Option<&User>, operation: Operation) -> Result<(), Denied> {
    match (operation.requirement(), user) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(Denied::Unauthenticated),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::Permission(permission), Some(user)) => {
            if user.has_perm(permission) {
                Ok(())
            } else {
                Err(Denied::Forbidden(permission))
            }
        }
    }
}

/// `login_url?next=<path>`, keeping `/` readable in the return path.
pub fn login_redirect(login_url: &str, next: &str) -> String {
    format!(
        "{login_url}?next={}",
        urlencoding::encode(next).replace("%2F", "/")
    )
}

/// The caller of a request, as identified by the fronting auth proxy.
#[derive(Debug)]
pub struct Viewer {
    user: Option<User>,
    login_location: String,
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Gates a non-public operation and returns the signed-in user.
    pub fn require(&self, operation: Operation) -> Result<&User, ApiError> {
        let denied = match (authorize(self.user(), operation), self.user()) {
            (Ok(()), Some(user)) => return Ok(user),
            (Ok(()), None) | (Err(Denied::Unauthenticated), _) => Denied::Unauthenticated,
            (Err(denied), _) => denied,
        };
        log::debug!(
            "denied {operation:?} to {}: {denied:?}",
            self.user().map_or("anonymous", |user| user.username.as_str())
        );
        Err(match denied {
            Denied::Unauthenticated => ApiError::LoginRequired {
                location: self.login_location.clone(),
            },
            Denied::Forbidden(permission) => ApiError::Forbidden(permission.codename()),
        })
    }
}

impl FromRequest for Viewer {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let next = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.path().to_owned(), |path| path.as_str().to_owned());
        let username = state.as_ref().and_then(|state| {
            req.headers()
                .get(state.user_header.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
        });
        Box::pin(async move {
            let state = state.ok_or(ApiError::Misconfigured("AppState is not registered"))?;
            let login_location = login_redirect(&state.login_url, &next);
            let user = match username {
                Some(username) => {
                    let lookup = state.clone();
                    let user =
                        web::block(move || lookup.catalog.user_by_name(&username)).await??;
                    if user.is_none() {
                        log::debug!("unknown user in {} header", state.user_header);
                    }
                    user
                }
                None => None,
            };
            Ok(Viewer {
                user,
                login_location,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(can_mark_returned: bool) -> User {
        User {
            id: 1,
            username: "testuser1".to_owned(),
            is_superuser: false,
            can_mark_returned,
        }
    }

    #[test]
    fn public_operations_need_nothing() {
        assert_eq!(authorize(None, Operation::Index), Ok(()));
        assert_eq!(authorize(None, Operation::Browse), Ok(()));
    }

    #[test]
    fn my_loans_need_a_user() {
        assert_eq!(
            authorize(None, Operation::MyLoans),
            Err(Denied::Unauthenticated)
        );
        assert_eq!(authorize(Some(&user(false)), Operation::MyLoans), Ok(()));
    }

    #[test]
    fn librarian_operations_need_the_permission() {
        let librarian_only = [
            Operation::AllLoans,
            Operation::Renew,
            Operation::BulkStatus,
            Operation::EditAuthor,
            Operation::EditBook,
            Operation::EditGenre,
            Operation::EditLanguage,
            Operation::EditInstance,
        ];
        for operation in librarian_only {
            assert_eq!(authorize(None, operation), Err(Denied::Unauthenticated));
            assert_eq!(
                authorize(Some(&user(false)), operation),
                Err(Denied::Forbidden(Permission::CanMarkReturned))
            );
            assert_eq!(authorize(Some(&user(true)), operation), Ok(()));
        }
    }

    #[test]
    fn login_redirect_keeps_slashes() {
        assert_eq!(
            login_redirect("/accounts/login/", "/catalog/mybooks/"),
            "/accounts/login/?next=/catalog/mybooks/"
        );
        assert_eq!(
            login_redirect("/accounts/login/", "/catalog/allloanedbooks/?page=2"),
            "/accounts/login/?next=/catalog/allloanedbooks/%3Fpage%3D2"
        );
    }
}
