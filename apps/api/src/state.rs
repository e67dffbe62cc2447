use fieldgate_application::CrudService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub crud_service: CrudService,
}
