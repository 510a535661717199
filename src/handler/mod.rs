//! Request handler module
//!
//! Every page is a `Handler`: it turns a `Request` into a `Response` or an
//! `AppError` kind for the dispatcher to map. Closures with the same shape
//! are handlers too.

pub mod dispatcher;
pub mod pages;
pub mod static_files;

use crate::config::Config;
use crate::error::AppError;
use crate::http::{Request, Response};
use crate::routing::RouteTable;
use std::path::Path;

pub use dispatcher::{Dispatcher, ErrorPages};

pub trait Handler: Send + Sync {
    fn get_response(&self, request: &Request) -> Result<Response, AppError>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Response, AppError> + Send + Sync,
{
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        self(request)
    }
}

/// Route table of the site: the fixed page set plus `/static/`
pub fn site_routes(config: &Config) -> RouteTable {
    let templates = Path::new(&config.site.template_dir);
    let static_files =
        static_files::StaticFiles::new(&config.site.static_dir, config.site.index_files.clone());

    RouteTable::builder(static_files)
        .route("/", pages::IndexPage::new(templates))
        .route("/now/", pages::NowPage::new(templates))
        .route("/headers/", pages::HeadersPage)
        .route("/parameters/", pages::ParametersPage)
        .route("/cookies/", pages::CookiesPage)
        .route("/user/", pages::UserPage::new(config.users.clone()))
        .build()
}

/// Dispatcher for the site described by `config`
pub fn site_dispatcher(config: &Config) -> Dispatcher {
    Dispatcher::new(
        site_routes(config),
        ErrorPages::load(Path::new(&config.site.template_dir)),
        config.http.server_name.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_routes() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(
            site_routes(&config).paths(),
            vec!["/", "/cookies/", "/headers/", "/now/", "/parameters/", "/user/"]
        );
    }
}
