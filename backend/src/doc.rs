//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every sequencing endpoint, the health checks and the
//! error envelope schemas. The document backs Swagger UI in debug builds and
//! is exported with `cargo run --bin openapi-dump`.

use utoipa::OpenApi;

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::sequences::{
    AppendItemBody, MoveItemBody, ScopeItemsBody, SequencedItemBody, TransferItemBody,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS backend API",
        description = "Dense, gapless orderings for course modules, submodules, videos and dashboard lists."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::sequences::list_items,
        crate::inbound::http::sequences::append_item,
        crate::inbound::http::sequences::get_item,
        crate::inbound::http::sequences::move_item,
        crate::inbound::http::sequences::transfer_item,
        crate::inbound::http::sequences::deactivate_item,
        crate::inbound::http::sequences::reactivate_item,
        crate::inbound::http::sequences::remove_item,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        SequencedItemBody,
        ScopeItemsBody,
        AppendItemBody,
        MoveItemBody,
        TransferItemBody
    )),
    tags(
        (name = "sequences", description = "Ordering of sequenced items within their scopes"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
