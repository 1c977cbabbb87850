use utoipa::OpenApi;
use crate::modules::trigger::events::StorageObject;

#[derive(OpenApi)]
#[openapi(
    paths(crate::modules::trigger::handler::handle_notification),
    components(schemas(StorageObject)),
    tags(
        (name = "Trigger", description = "Object-finalized notifications that start transcoder jobs")
    )
)]
pub struct ApiDoc;
