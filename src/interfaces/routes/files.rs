use actix_web::web;

use crate::handlers::files::{delete_file, get_file, get_file_content, list_files, upload_file};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_file)
        .service(list_files)
        .service(get_file_content)
        .service(get_file)
        .service(delete_file);
}
