use actix_web::{middleware::Logger, web, App, HttpServer};
use db::{establish_pool, PgCatalog};
use rest::{config, config::Settings, AppState};
use dotenvy::dotenv;
use std::{io, sync::Arc};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env().map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    let pool = establish_pool(&settings.database_url, settings.pool_size)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    let state = web::Data::new(AppState::new(Arc::new(PgCatalog::new(pool)), &settings));

    log::info!(
        "serving the catalog on {}:{}",
        settings.bind_addr,
        settings.port
    );
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| config(cfg, state))
    })
    .bind((settings.bind_addr.as_str(), settings.port))?
    .run()
    .await
}
