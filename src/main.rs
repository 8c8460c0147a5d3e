use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::error::Error;
use std::sync::Arc;

use taskkeeper::config::Config;
use taskkeeper::notifications::{LogMailer, Mailer, SendGridMailer};
use taskkeeper::routes;
use taskkeeper::state::AppState;
use taskkeeper::store::{MemoryStore, PgStore, Store};

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(config, url).await?;
            store.migrate().await?;
            log::info!("connected to Postgres, migrations applied");
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL is not set, data will only live in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn open_mailer(config: &Config) -> Result<Arc<dyn Mailer>, Box<dyn Error>> {
    match &config.sendgrid_api_key {
        Some(key) => {
            let mailer = SendGridMailer::new(key, &config.mail_from, config.mail_timeout)?;
            Ok(Arc::new(mailer))
        }
        None => {
            log::warn!("SENDGRID_API_KEY is not set, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let mailer = open_mailer(&config)?;
    let state = web::Data::new(AppState::new(&config, store, mailer));

    log::info!("Starting taskkeeper at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(())
}
