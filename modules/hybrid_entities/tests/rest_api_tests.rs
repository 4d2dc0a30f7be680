//! End-to-end REST tests over an in-memory SQLite database

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::print_test_header;
use hybrid_entities::{Config, HybridEntitiesModule};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> Router {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    HybridEntitiesModule::migrate(&db).await.unwrap();

    let module = HybridEntitiesModule::init(Arc::new(db), Config::default());
    module.register_rest(Router::new())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    tenant: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder
            .header("X-Tenant-Id", tenant.to_string())
            .header("X-User-Id", "carlos.mendez");
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn visitador_schema() -> Value {
    json!({
        "entidadTipo": "agentes",
        "subTipo": "Visitador",
        "nombre": "Visitador médico",
        "campos": [
            { "name": "zona", "label": "Zona", "type": "select", "required": true,
              "options": [
                { "value": "N", "label": "Norte" },
                { "value": "S", "label": "Sur" }
              ] },
            { "name": "visitasMes", "label": "Visitas por mes", "type": "number" }
        ]
    })
}

async fn create_schema(app: &Router, tenant: Uuid) -> Uuid {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/EsquemasPersonalizados",
        Some(tenant),
        Some(visitador_schema()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_agent_lifecycle_over_http() {
    print_test_header(
        "test_agent_lifecycle_over_http",
        &[
            "Schema and agent CRUD through the router, persisted with SeaORM",
            "including the linked dynamic record and soft delete",
        ],
    );

    let app = test_app().await;
    let tenant = Uuid::new_v4();
    let schema_id = create_schema(&app, tenant).await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/Agentes",
        Some(tenant),
        Some(json!({
            "tipoEntidadId": schema_id,
            "code": "A-100",
            "name": "Ana Rojas",
            "email": "ana@pharma.test",
            "datosDinamicos": { "zona": "N", "visitasMes": 8 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["code"], "A-100");
    assert_eq!(created["esquemaNombre"], "Visitador médico");
    assert_eq!(created["subTipo"], "Visitador");
    assert_eq!(created["datosDinamicos"]["zona"], "N");
    assert_eq!(created["createdBy"], "carlos.mendez");
    let id = created["id"].as_str().unwrap().to_string();
    let dynamic_id = created["entidadDinamicaId"].as_str().unwrap().to_string();

    let (status, page) = send(&app, Method::GET, "/api/Agentes?page=1&pageSize=5", Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["totalPages"], 1);
    assert_eq!(page["currentPage"], 1);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/Agentes/{}", id),
        Some(tenant),
        Some(json!({
            "code": "A-100",
            "name": "Ana M. Rojas",
            "datosDinamicos": { "zona": "S" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["name"], "Ana M. Rojas");
    assert_eq!(updated["entidadDinamicaId"], dynamic_id.as_str());
    assert_eq!(updated["datosDinamicos"]["zona"], "S");
    assert_eq!(updated["updatedBy"], "carlos.mendez");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/EntidadesDinamicas/{}", dynamic_id),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["esquemaId"], schema_id.to_string().as_str());

    let (status, body) = send(&app, Method::DELETE, &format!("/api/Agentes/{}", id), Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registro eliminado correctamente");

    let (status, body) = send(&app, Method::GET, &format!("/api/Agentes/{}", id), Some(tenant), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/Agentes/{}", id), Some(tenant), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Other tenants see nothing
    let (status, page) = send(&app, Method::GET, "/api/Agentes", Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalItems"], 0);
    println!("✅ Agent {} went through its full lifecycle", id);
}

#[tokio::test]
async fn test_error_responses() {
    print_test_header(
        "test_error_responses",
        &["Missing headers, bad input and duplicates map to Problem Details"],
    );

    let app = test_app().await;
    let tenant = Uuid::new_v4();

    let (status, body) = send(&app, Method::GET, "/api/Agentes", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Missing Header");

    let schema_id = create_schema(&app, tenant).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/EsquemasPersonalizados",
        Some(tenant),
        Some(visitador_schema()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/Agentes",
        Some(tenant),
        Some(json!({
            "tipoEntidadId": schema_id,
            "code": "A-1",
            "name": "Ana",
            "datosDinamicos": { "zona": "X" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Dynamic Field Validation Failed");
    assert!(!body["errors"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/Clientes",
        Some(tenant),
        Some(json!({ "tipoEntidadId": schema_id, "name": "Farmacia Central" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Validation Error");

    let (status, _) = send(&app, Method::GET, "/api/Agentes?page=0", Some(tenant), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Sub-types are unique per entity type regardless of case
    let mut lowercase = visitador_schema();
    lowercase["subTipo"] = json!("visitador");
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/EsquemasPersonalizados",
        Some(tenant),
        Some(lowercase),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    let (_, listed) = send(
        &app,
        Method::GET,
        "/api/EsquemasPersonalizados/tipo/agentes",
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/EsquemasPersonalizados/{}", Uuid::new_v4()),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schema_resolution_and_filters() {
    print_test_header(
        "test_schema_resolution_and_filters",
        &["Resolver, filter field discovery and search through the router"],
    );

    let app = test_app().await;
    let tenant = Uuid::new_v4();
    let schema_id = create_schema(&app, tenant).await;

    let (status, schema) = send(
        &app,
        Method::GET,
        "/api/EsquemasPersonalizados/resolver/agente?subTipo=visitador",
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schema["id"], schema_id.to_string().as_str());
    assert_eq!(schema["entidadTipo"], "Agente");

    let (status, listed) = send(
        &app,
        Method::GET,
        "/api/EsquemasPersonalizados/tipo/Agentes",
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    for (code, zona, visitas) in [("A-1", "N", 5), ("A-2", "S", 12), ("A-3", "N", 20)] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/Agentes",
            Some(tenant),
            Some(json!({
                "tipoEntidadId": schema_id,
                "code": code,
                "name": format!("Agente {}", code),
                "datosDinamicos": { "zona": zona, "visitasMes": visitas }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (status, fields) = send(
        &app,
        Method::GET,
        &format!("/api/Agentes/filtros?tipoEntidadId={}", schema_id),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = fields
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"code"));
    assert!(keys.contains(&"visitasMes"));

    let (status, page) = send(
        &app,
        Method::POST,
        "/api/Agentes/buscar",
        Some(tenant),
        Some(json!({
            "tipoEntidadId": schema_id,
            "filtros": [
                { "field": "zona", "operator": "eq", "value": "N" },
                { "field": "visitasMes", "operator": "gte", "value": 10, "connector": "AND" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["items"][0]["code"], "A-3");

    let (status, nodes) = send(
        &app,
        Method::POST,
        &format!("/api/EsquemasPersonalizados/{}/formulario", schema_id),
        Some(tenant),
        Some(json!({ "valores": { "zona": "S" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nodes[0]["path"], "zona");
    assert_eq!(nodes[0]["value"], "S");
    assert_eq!(nodes[0]["options"]["state"], "static");
}

#[tokio::test]
async fn test_page_bounds_over_http() {
    print_test_header(
        "test_page_bounds_over_http",
        &["Page numbers whose offset SQLite cannot bind answer 400 instead of failing the handler"],
    );

    let app = test_app().await;
    let tenant = Uuid::new_v4();
    let schema_id = create_schema(&app, tenant).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/Agentes",
        Some(tenant),
        Some(json!({
            "tipoEntidadId": schema_id,
            "code": "A-1",
            "name": "Ana",
            "datosDinamicos": { "zona": "N" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for page in ["18446744073709551615", "184467440737095516"] {
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/Agentes?page={}&pageSize=100", page),
            Some(tenant),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "page {}: {}", page, body);
        assert_eq!(body["title"], "Validation Error");
    }

    let last_valid = (i64::MAX as u64) / 100 + 1;
    let (status, page) = send(
        &app,
        Method::GET,
        &format!("/api/Agentes?page={}&pageSize=100", last_valid),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["totalItems"], 1);
    assert!(page["items"].as_array().unwrap().is_empty());

    let (status, page) = send(&app, Method::GET, "/api/Agentes?page=2", Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["currentPage"], 2);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_dynamic_values_round_trip_through_sqlite() {
    print_test_header(
        "test_nested_dynamic_values_round_trip_through_sqlite",
        &[
            "Fieldset and repeater values are stored as JSON and read back unchanged",
            "while malformed dates are rejected on write",
        ],
    );

    let app = test_app().await;
    let tenant = Uuid::new_v4();
    let (status, schema) = send(
        &app,
        Method::POST,
        "/api/EsquemasPersonalizados",
        Some(tenant),
        Some(json!({
            "entidadTipo": "agente",
            "subTipo": "Gerente",
            "nombre": "Gerente regional",
            "campos": [
                { "name": "ingreso", "label": "Ingreso", "type": "date" },
                { "name": "direccion", "label": "Dirección", "type": "fieldset", "fields": [
                    { "name": "ciudad", "label": "Ciudad", "type": "text", "required": true },
                    { "name": "estado", "label": "Estado", "type": "text" }
                ] },
                { "name": "contactos", "label": "Contactos", "type": "repeater", "maxItems": 3, "fields": [
                    { "name": "telefono", "label": "Teléfono", "type": "text", "required": true },
                    { "name": "principal", "label": "Principal", "type": "checkbox" }
                ] }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", schema);
    let schema_id = schema["id"].as_str().unwrap().to_string();

    let nested = json!({
        "ingreso": "2024-06-01",
        "direccion": { "ciudad": "Valencia", "estado": "Carabobo" },
        "contactos": [
            { "telefono": "555-0101", "principal": true },
            { "telefono": "555-0199", "principal": false }
        ]
    });
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/Agentes",
        Some(tenant),
        Some(json!({
            "tipoEntidadId": schema_id,
            "code": "G-7",
            "name": "Pedro Salas",
            "datosDinamicos": nested.clone()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let id = created["id"].as_str().unwrap().to_string();
    let dynamic_id = created["entidadDinamicaId"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/Agentes/{}", id), Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["datosDinamicos"], nested);
    assert_eq!(fetched["subTipo"], "Gerente");

    let (status, record) = send(
        &app,
        Method::GET,
        &format!("/api/EntidadesDinamicas/{}", dynamic_id),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["datos"], nested);
    assert_eq!(record["datos"]["contactos"][1]["telefono"], "555-0199");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/Agentes/{}", id),
        Some(tenant),
        Some(json!({
            "code": "G-7",
            "name": "Pedro Salas",
            "datosDinamicos": { "ingreso": "not-a-date" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Dynamic Field Validation Failed");

    let (_, unchanged) = send(&app, Method::GET, &format!("/api/Agentes/{}", id), Some(tenant), None).await;
    assert_eq!(unchanged["datosDinamicos"], nested);
    println!("✅ Nested values for {} survived the round trip", id);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = test_app().await;
    let (status, doc) = send(&app, Method::GET, "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "CRM hybrid entities API");
    assert!(doc["components"]["schemas"]["SchemaDto"].is_object());
    assert!(doc["components"]["schemas"]["Problem"].is_object());

    let paths = &doc["paths"];
    for base in ["/api/Agentes", "/api/Clientes"] {
        assert!(paths[base]["get"].is_object(), "{} get", base);
        assert!(paths[base]["post"].is_object(), "{} post", base);
        assert!(paths[format!("{}/buscar", base)]["post"].is_object());
        assert!(paths[format!("{}/filtros", base)]["get"].is_object());
        let item = &paths[format!("{}/{{id}}", base)];
        for method in ["get", "put", "delete"] {
            assert!(item[method].is_object(), "{}/{{id}} {}", base, method);
        }
    }
    assert!(paths["/api/EsquemasPersonalizados/{id}/formulario"]["post"].is_object());
    assert!(paths["/api/EsquemasPersonalizados/resolver/{entidad_tipo}"]["get"].is_object());
    assert!(paths["/api/EntidadesDinamicas/esquema/{esquema_id}"]["get"].is_object());
}
