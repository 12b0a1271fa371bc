use crate::api::routes;
use crate::challenge::Presenter;
use crate::config::SharedConfig;
use crate::store::DynRecordStore;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub presenter: Arc<Presenter>,
}

pub fn new(
    config: SharedConfig,
    store: DynRecordStore,
) -> impl Future<Output = hyper::Result<()>> {
    let presenter = Arc::new(Presenter::new(config.clone(), store));
    axum::Server::bind(&config.api_bind_addr)
        .serve(routes::new(AppState { config, presenter }).into_make_service())
}
