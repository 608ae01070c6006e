//! Sequencing HTTP handlers.
//!
//! ```text
//! GET    /api/v1/sequences/{list}/items?scopeId=
//! POST   /api/v1/sequences/{list}/items
//! GET    /api/v1/sequences/{list}/items/{itemId}
//! POST   /api/v1/sequences/{list}/items/{itemId}/move
//! POST   /api/v1/sequences/{list}/items/{itemId}/transfer
//! POST   /api/v1/sequences/{list}/items/{itemId}/deactivate
//! POST   /api/v1/sequences/{list}/items/{itemId}/reactivate
//! DELETE /api/v1/sequences/{list}/items/{itemId}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{AppendItemRequest, MoveItemRequest, TransferItemRequest};
use crate::domain::sequencing::{ItemRef, ScopeKey, SequencedItem};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_list, parse_optional_uuid, parse_uuid, scope_for,
};

/// Path parameters addressing a list.
#[derive(Debug, Deserialize)]
pub struct ListPath {
    list: String,
}

/// Path parameters addressing one item of a list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPath {
    list: String,
    item_id: String,
}

/// Query parameters selecting a scope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    scope_id: Option<String>,
}

/// Request payload for appending an item.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendItemBody {
    #[schema(format = "uuid")]
    pub item_id: String,
    /// Parent entity; omitted for global lists.
    #[schema(format = "uuid")]
    pub scope_id: Option<String>,
}

/// Request payload for moving an item within its scope.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveItemBody {
    /// Target position; clamped to `1..=N`.
    pub sequence: i64,
}

/// Request payload for moving an item into another scope.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferItemBody {
    #[schema(format = "uuid")]
    pub scope_id: String,
    /// Target position in the new scope; omitted appends to the end.
    pub sequence: Option<i64>,
}

/// One sequenced item as returned to clients.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SequencedItemBody {
    #[schema(format = "uuid")]
    pub item_id: String,
    pub list: String,
    #[schema(format = "uuid")]
    pub scope_id: Option<String>,
    /// Position in the scope, or `-1` for hidden items.
    pub sequence: i32,
    pub active: bool,
}

/// Ordered items of one scope.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopeItemsBody {
    pub list: String,
    #[schema(format = "uuid")]
    pub scope_id: Option<String>,
    pub items: Vec<SequencedItemBody>,
}

impl From<SequencedItem> for SequencedItemBody {
    fn from(value: SequencedItem) -> Self {
        Self {
            item_id: value.id.to_string(),
            list: value.scope.list().as_str().to_owned(),
            scope_id: value.scope.parent().map(|id| id.to_string()),
            sequence: value.sequence.get(),
            active: value.active,
        }
    }
}

fn parse_item(path: ItemPath) -> Result<ItemRef, Error> {
    let list = parse_list(&path.list)?;
    let id = parse_uuid(&path.item_id, FieldName::new("itemId"))?;
    Ok(ItemRef::new(list, id))
}

fn parse_scope(list: &str, scope_id: Option<&str>) -> Result<ScopeKey, Error> {
    let list = parse_list(list)?;
    let parent = parse_optional_uuid(scope_id, FieldName::new("scopeId"))?;
    scope_for(list, parent, FieldName::new("scopeId"))
}

fn item_json(item: SequencedItem) -> web::Json<SequencedItemBody> {
    web::Json(SequencedItemBody::from(item))
}

/// List the visible items of a scope in order.
#[utoipa::path(
    get,
    path = "/api/v1/sequences/{list}/items",
    params(
        ("list" = String, Path, description = "Sequence list name, e.g. course_modules"),
        ("scopeId" = Option<String>, Query, description = "Parent entity; omitted for global lists")
    ),
    responses(
        (status = 200, description = "Ordered items", body = ScopeItemsBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "listSequenceItems"
)]
#[get("/sequences/{list}/items")]
pub async fn list_items(
    state: web::Data<HttpState>,
    path: web::Path<ListPath>,
    query: web::Query<ScopeQuery>,
) -> ApiResult<web::Json<ScopeItemsBody>> {
    let scope = parse_scope(&path.list, query.scope_id.as_deref())?;
    let items = state.sequencing_query.list_scope(scope).await?;

    Ok(web::Json(ScopeItemsBody {
        list: scope.list().as_str().to_owned(),
        scope_id: scope.parent().map(|id| id.to_string()),
        items: items.into_iter().map(SequencedItemBody::from).collect(),
    }))
}

/// Append an item at the end of its scope.
#[utoipa::path(
    post,
    path = "/api/v1/sequences/{list}/items",
    params(("list" = String, Path, description = "Sequence list name")),
    request_body = AppendItemBody,
    responses(
        (status = 201, description = "Item appended", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "appendSequenceItem"
)]
#[post("/sequences/{list}/items")]
pub async fn append_item(
    state: web::Data<HttpState>,
    path: web::Path<ListPath>,
    payload: web::Json<AppendItemBody>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let scope = parse_scope(&path.list, payload.scope_id.as_deref())?;
    let item_id = parse_uuid(&payload.item_id, FieldName::new("itemId"))?;

    let item = state
        .sequencing
        .append(AppendItemRequest { scope, item_id })
        .await?;

    Ok(HttpResponse::Created().json(SequencedItemBody::from(item)))
}

/// Fetch one item, including hidden ones.
#[utoipa::path(
    get,
    path = "/api/v1/sequences/{list}/items/{itemId}",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Item", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "getSequenceItem"
)]
#[get("/sequences/{list}/items/{itemId}")]
pub async fn get_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
) -> ApiResult<web::Json<SequencedItemBody>> {
    let item = parse_item(path.into_inner())?;
    Ok(item_json(state.sequencing_query.find_item(item).await?))
}

/// Move an item to a new position within its scope.
#[utoipa::path(
    post,
    path = "/api/v1/sequences/{list}/items/{itemId}/move",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    request_body = MoveItemBody,
    responses(
        (status = 200, description = "Item moved", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "moveSequenceItem"
)]
#[post("/sequences/{list}/items/{itemId}/move")]
pub async fn move_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
    payload: web::Json<MoveItemBody>,
) -> ApiResult<web::Json<SequencedItemBody>> {
    let item = parse_item(path.into_inner())?;
    let moved = state
        .sequencing
        .move_within_scope(MoveItemRequest {
            item,
            sequence: payload.sequence,
        })
        .await?;
    Ok(item_json(moved))
}

/// Move an item into another scope of the same list.
#[utoipa::path(
    post,
    path = "/api/v1/sequences/{list}/items/{itemId}/transfer",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    request_body = TransferItemBody,
    responses(
        (status = 200, description = "Item transferred", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "transferSequenceItem"
)]
#[post("/sequences/{list}/items/{itemId}/transfer")]
pub async fn transfer_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
    payload: web::Json<TransferItemBody>,
) -> ApiResult<web::Json<SequencedItemBody>> {
    let path = path.into_inner();
    let payload = payload.into_inner();
    let target = parse_scope(&path.list, Some(payload.scope_id.as_str()))?;
    let item = parse_item(path)?;

    let moved = state
        .sequencing
        .move_across_scopes(TransferItemRequest {
            item,
            target,
            sequence: payload.sequence,
        })
        .await?;
    Ok(item_json(moved))
}

/// Hide an item and close the gap it leaves.
#[utoipa::path(
    post,
    path = "/api/v1/sequences/{list}/items/{itemId}/deactivate",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Item hidden", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "deactivateSequenceItem"
)]
#[post("/sequences/{list}/items/{itemId}/deactivate")]
pub async fn deactivate_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
) -> ApiResult<web::Json<SequencedItemBody>> {
    let item = parse_item(path.into_inner())?;
    Ok(item_json(state.sequencing.deactivate(item).await?))
}

/// Show a hidden item again at the end of its scope.
#[utoipa::path(
    post,
    path = "/api/v1/sequences/{list}/items/{itemId}/reactivate",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Item shown", body = SequencedItemBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "reactivateSequenceItem"
)]
#[post("/sequences/{list}/items/{itemId}/reactivate")]
pub async fn reactivate_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
) -> ApiResult<web::Json<SequencedItemBody>> {
    let item = parse_item(path.into_inner())?;
    Ok(item_json(state.sequencing.reactivate(item).await?))
}

/// Delete an item's ordering record.
#[utoipa::path(
    delete,
    path = "/api/v1/sequences/{list}/items/{itemId}",
    params(
        ("list" = String, Path, description = "Sequence list name"),
        ("itemId" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["sequences"],
    operation_id = "removeSequenceItem"
)]
#[delete("/sequences/{list}/items/{itemId}")]
pub async fn remove_item(
    state: web::Data<HttpState>,
    path: web::Path<ItemPath>,
) -> ApiResult<HttpResponse> {
    let item = parse_item(path.into_inner())?;
    state.sequencing.remove(item).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register every sequencing handler on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_items)
        .service(append_item)
        .service(get_item)
        .service(move_item)
        .service(transfer_item)
        .service(deactivate_item)
        .service(reactivate_item)
        .service(remove_item);
}

#[cfg(test)]
#[path = "sequences_tests.rs"]
mod tests;
