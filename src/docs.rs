use utoipa::OpenApi;
use crate::{config, handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::handle_command,
        handlers::handle_event,
        handlers::get_settings,
        handlers::put_settings,
        handlers::plug_state,
    ),
    components(
        schemas(
            models::CommandRequest,
            models::CommandResponse,
            models::DeviceInfo,
            models::EnergyUsage,
            models::EnergySample,
            models::HostEvent,
            models::PlugStateView,
            models::SessionState,
            config::PlugSettings,
        )
    )
)]
pub struct ApiDoc;
