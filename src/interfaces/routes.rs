use actix_web::web;

use crate::handlers::home::home;

mod files;
mod json_error;
mod system;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.configure(system::config_routes);

    cfg.service(
        web::scope("/api")
            .configure(files::config_routes)
    );

    cfg.configure(json_error::config_routes);
}
