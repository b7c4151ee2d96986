//! `/cats` routes.
//!
//! | Route | Policy |
//! |---|---|
//! | `GET /cats` | none |
//! | `POST /cats` | role `admin`, [`ValidationPipe`] |
//! | `POST /cats/validation-pipe` | [`TypedValidationPipe<CreateCatDto>`] |
//! | `GET /cats/{id}` | [`ParseIntPipe`] on `id` |
//!
//! The role check is one [`RolesGuard::from_route`] at controller scope; the
//! routes only declare which roles they need.

use std::sync::Arc;

use http::{Method, StatusCode};

use super::dto::{Cat, CreateCatDto};
use super::service::CatsService;
use crate::exception::HttpException;
use crate::guard::RolesGuard;
use crate::interceptor::LoggingInterceptor;
use crate::pipe::{ParseIntPipe, TypedValidationPipe, ValidationPipe};
use crate::pipeline::Route;
use crate::request::Request;
use crate::response::Json;
use crate::router::Controller;

pub fn controller(service: Arc<CatsService>) -> Controller {
    Controller::new("/cats")
        .guard(RolesGuard::from_route())
        .interceptor(LoggingInterceptor)
        .route(
            Method::GET,
            "",
            Route::new(with_service(&service, find_all)).summary("List all cats"),
        )
        .route(
            Method::POST,
            "",
            Route::new(with_service(&service, create))
                .summary("Create cat")
                .roles(["admin"])
                .pipe(ValidationPipe),
        )
        .route(
            Method::POST,
            "/validation-pipe",
            Route::new(with_service(&service, create))
                .summary("Create cat with typed validation")
                .pipe(TypedValidationPipe::<CreateCatDto>::new()),
        )
        .route(
            Method::GET,
            "/{id}",
            Route::new(with_service(&service, find_one))
                .summary("Find one cat by position")
                .param_pipe("id", ParseIntPipe),
        )
}

/// Binds a `(service, request)` handler to one shared service.
fn with_service<F, Fut>(
    service: &Arc<CatsService>,
    handler: F,
) -> impl Fn(Request) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<CatsService>, Request) -> Fut + Send + Sync + 'static,
{
    let service = Arc::clone(service);
    move |req| handler(Arc::clone(&service), req)
}

async fn find_all(service: Arc<CatsService>, _req: Request) -> Json<Vec<Cat>> {
    Json(service.find_all())
}

async fn create(
    service: Arc<CatsService>,
    req: Request,
) -> Result<(StatusCode, Json<Cat>), HttpException> {
    let dto: CreateCatDto = req.json()?;
    let (_, cat) = service.create(dto.into());
    Ok((StatusCode::CREATED, Json(cat)))
}

async fn find_one(service: Arc<CatsService>, req: Request) -> Result<Json<Cat>, HttpException> {
    let id: i64 = req.param_as("id")?;
    usize::try_from(id)
        .ok()
        .and_then(|index| service.find_one(index))
        .map(Json)
        .ok_or_else(|| HttpException::not_found("Cat not found"))
}
