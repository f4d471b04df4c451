//! OpenAPI document for the generated routes.

use utoipa::openapi::path::{HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, KnownFormat, ObjectBuilder, SchemaFormat, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathItem,
    PathsBuilder, Ref, RefOr, Required, ResponseBuilder, Schema,
};

use crate::metadata::{EntityDescriptor, FieldDescriptor, KeyKind, option_inner};
use crate::routes::{collection_path, item_path};

const JSON: &str = "application/json";

/// Builds the document for `entities`: five operations each, plus one
/// component schema per entity without its hidden fields.
#[must_use]
pub fn document<'a>(
    title: &str,
    version: &str,
    entities: impl IntoIterator<Item = &'a EntityDescriptor>,
) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut components = ComponentsBuilder::new();

    for entity in entities {
        components = components.schema(entity.name(), entity_schema(entity));

        let mut collection = PathItem::new(HttpMethod::Get, list_operation(entity));
        collection.post = Some(create_operation(entity));
        paths = paths.path(collection_path(entity), collection);

        let mut item = PathItem::new(HttpMethod::Get, get_operation(entity));
        item.put = Some(update_operation(entity));
        item.delete = Some(delete_operation(entity));
        paths = paths.path(item_path(entity), item);
    }

    OpenApiBuilder::new()
        .info(InfoBuilder::new().title(title).version(version).build())
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn tag(entity: &EntityDescriptor) -> String {
    entity.resource_segment()
}

fn entity_ref(entity: &EntityDescriptor) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(entity.name()))
}

fn json_response(description: &str, schema: RefOr<Schema>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn plain_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new().description(description).build()
}

fn id_parameter(entity: &EntityDescriptor) -> utoipa::openapi::path::Parameter {
    let kind = entity
        .primary_key()
        .map_or(KeyKind::Integer, FieldDescriptor::key_kind);
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(key_schema(kind)))
        .build()
}

fn request_body(entity: &EntityDescriptor) -> utoipa::openapi::request_body::RequestBody {
    RequestBodyBuilder::new()
        .content(JSON, ContentBuilder::new().schema(Some(entity_ref(entity))).build())
        .required(Some(Required::True))
        .build()
}

fn operation(entity: &EntityDescriptor, verb: &str, summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .operation_id(Some(format!("{verb}_{}", entity.table_name())))
        .summary(Some(summary))
        .tag(tag(entity))
}

fn list_operation(entity: &EntityDescriptor) -> Operation {
    let list = Schema::Array(ArrayBuilder::new().items(entity_ref(entity)).build());
    operation(entity, "list", format!("List every {}", entity.name()))
        .response("200", json_response("All stored entities", RefOr::T(list)))
        .response("500", plain_response("Storage failure"))
        .build()
}

fn create_operation(entity: &EntityDescriptor) -> Operation {
    operation(entity, "create", format!("Create a {}", entity.name()))
        .request_body(Some(request_body(entity)))
        .response("201", json_response("Created", entity_ref(entity)))
        .response("400", plain_response("Invalid request body"))
        .response("500", plain_response("Hook or storage failure"))
        .build()
}

fn get_operation(entity: &EntityDescriptor) -> Operation {
    operation(entity, "get", format!("Get one {} by id", entity.name()))
        .parameter(id_parameter(entity))
        .response("200", json_response("Found", entity_ref(entity)))
        .response("400", plain_response("Invalid ID"))
        .response("404", plain_response("Not found"))
        .build()
}

fn update_operation(entity: &EntityDescriptor) -> Operation {
    operation(entity, "update", format!("Update a {}", entity.name()))
        .parameter(id_parameter(entity))
        .request_body(Some(request_body(entity)))
        .response("200", json_response("Updated", entity_ref(entity)))
        .response("400", plain_response("Invalid ID or request body"))
        .response("404", plain_response("Not found"))
        .response("500", plain_response("Hook or storage failure"))
        .build()
}

fn delete_operation(entity: &EntityDescriptor) -> Operation {
    operation(entity, "delete", format!("Delete a {}", entity.name()))
        .parameter(id_parameter(entity))
        .response("204", plain_response("Deleted"))
        .response("400", plain_response("Invalid ID"))
        .response("404", plain_response("Not found"))
        .response("500", plain_response("Hook or storage failure"))
        .build()
}

fn key_schema(kind: KeyKind) -> Schema {
    let object = match kind {
        KeyKind::Integer => ObjectBuilder::new().schema_type(Type::Integer),
        KeyKind::Uuid => ObjectBuilder::new()
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid))),
        KeyKind::Text => ObjectBuilder::new().schema_type(Type::String),
    };
    Schema::Object(object.build())
}

fn entity_schema(entity: &EntityDescriptor) -> Schema {
    let mut object = ObjectBuilder::new().schema_type(Type::Object);
    for field in entity.fields().iter().filter(|f| !f.is_hidden) {
        let mut schema = field_schema(&field.type_name);
        if field.is_read_only || entity.is_aggregate_field(&field.name) {
            if let Schema::Object(inner) = &mut schema {
                inner.read_only = Some(true);
            }
        }
        object = object.property(&field.name, schema);
        if option_inner(&field.type_name).is_none() {
            object = object.required(&field.name);
        }
    }
    Schema::Object(object.build())
}

/// Schema for a normalized Rust type name.
fn field_schema(type_name: &str) -> Schema {
    let inner = option_inner(type_name).unwrap_or(type_name);

    if let Some(element) = inner
        .strip_prefix("Vec<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return Schema::Array(
            ArrayBuilder::new()
                .items(RefOr::T(field_schema(element)))
                .build(),
        );
    }

    let last = inner.rsplit("::").next().unwrap_or(inner);
    let object = match last {
        "bool" => ObjectBuilder::new().schema_type(Type::Boolean),
        "f32" | "f64" => ObjectBuilder::new().schema_type(Type::Number),
        "String" | "str" | "&str" | "char" => ObjectBuilder::new().schema_type(Type::String),
        _ => match KeyKind::from_type_name(last) {
            KeyKind::Integer => ObjectBuilder::new().schema_type(Type::Integer),
            KeyKind::Uuid => ObjectBuilder::new()
                .schema_type(Type::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid))),
            KeyKind::Text => ObjectBuilder::new().schema_type(Type::Object),
        },
    };
    Schema::Object(object.build())
}
