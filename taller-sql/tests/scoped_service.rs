use std::sync::Arc;

use serde_json::{json, Value};
use taller_core::{ErrorKind, Principal, RequestParams, TallerError, TallerService, TenantContext, TenantId};
use taller_sql::{
    ChildRoute, DefaultValue, FieldKind, FieldSpec, FilterSpec, JoinStep, OwnershipChain, Projection, Reference,
    ResourceDescriptor, ScopedResourceService, SqliteStore, Store, UniqueKey, UpdatePolicy, CRUD,
};

const SCHEMA: &str = r#"
CREATE TABLE clientes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    taller_id INTEGER NOT NULL,
    nombre TEXT NOT NULL,
    cedula TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE vehiculos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cliente_id INTEGER NOT NULL REFERENCES clientes(id),
    placa TEXT NOT NULL,
    activo BOOLEAN NOT NULL DEFAULT 1,
    extras TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

const VEHICULO_CHAIN: &[JoinStep] = &[JoinStep {
    table: "clientes",
    alias: "c",
    on: "c.id = t.cliente_id",
}];

static CLIENTES: ResourceDescriptor = ResourceDescriptor {
    name: "clientes",
    table: "clientes",
    fields: &[
        FieldSpec::rw("nombre", FieldKind::Text),
        FieldSpec::rw("cedula", FieldKind::Text),
    ],
    ownership: OwnershipChain::direct(),
    references: &[],
    filters: &[],
    search_columns: &["t.nombre"],
    projections: &[],
    order_by: "t.id",
    defaults: &[],
    required: &["nombre"],
    unique_keys: &[UniqueKey {
        fields: &["cedula"],
        message: "Ya existe un cliente con esa cédula",
    }],
    children: &[ChildRoute {
        relation: "vehiculos",
        child: &VEHICULOS,
        column: "t.cliente_id",
    }],
    policy: UpdatePolicy::AllowList,
    not_found: "Cliente no encontrado",
    methods: CRUD,
};

static VEHICULOS: ResourceDescriptor = ResourceDescriptor {
    name: "vehiculos",
    table: "vehiculos",
    fields: &[
        FieldSpec::rw("cliente_id", FieldKind::Integer),
        FieldSpec::rw("placa", FieldKind::Text),
        FieldSpec::rw("activo", FieldKind::Boolean),
        FieldSpec::rw("extras", FieldKind::Json),
    ],
    ownership: OwnershipChain::through(VEHICULO_CHAIN, "c.taller_id"),
    references: &[Reference {
        field: "cliente_id",
        target: &CLIENTES,
    }],
    filters: &[FilterSpec::eq("activo", "t.activo", FieldKind::Boolean)],
    search_columns: &["t.placa", "c.nombre"],
    projections: &[Projection {
        expr: "c.nombre",
        alias: "cliente_nombre",
    }],
    order_by: "t.id",
    defaults: &[("activo", DefaultValue::Bool(true))],
    required: &["cliente_id", "placa"],
    unique_keys: &[],
    children: &[],
    policy: UpdatePolicy::AllowList,
    not_found: "Vehículo no encontrado",
    methods: CRUD,
};

fn tenant(id: i64) -> TenantContext {
    TenantContext::new(Principal::new("1", "admin", TenantId(id)))
}

fn params() -> RequestParams {
    RequestParams::internal()
}

fn kind_of(err: &anyhow::Error) -> ErrorKind {
    TallerError::from_anyhow(err).expect("structured error").kind
}

struct Fixture {
    clientes: ScopedResourceService,
    vehiculos: ScopedResourceService,
}

async fn fixture() -> Fixture {
    let store = SqliteStore::memory().await.unwrap();
    store.execute_script(SCHEMA).await.unwrap();
    let store: Arc<dyn Store> = Arc::new(store);
    Fixture {
        clientes: ScopedResourceService::new(&CLIENTES, Arc::clone(&store)),
        vehiculos: ScopedResourceService::new(&VEHICULOS, store),
    }
}

async fn seed(f: &Fixture, t: i64, nombre: &str, placa: &str) -> (i64, i64) {
    let c = f.clientes.create(&tenant(t), json!({"nombre": nombre}), params()).await.unwrap();
    let cid = c["id"].as_i64().unwrap();
    let v = f
        .vehiculos
        .create(&tenant(t), json!({"cliente_id": cid, "placa": placa}), params())
        .await
        .unwrap();
    (cid, v["id"].as_i64().unwrap())
}

#[tokio::test]
async fn direct_resource_takes_tenant_from_context() {
    let f = fixture().await;
    let c = f
        .clientes
        .create(&tenant(1), json!({"nombre": "Ana", "taller_id": 2}), params())
        .await
        .unwrap();
    assert_eq!(c["taller_id"], json!(1));
}

#[tokio::test]
async fn other_tenants_rows_are_not_found() {
    let f = fixture().await;
    let (cid, vid) = seed(&f, 1, "Ana", "ABC-001").await;

    let b = tenant(2);
    let err = f.vehiculos.get(&b, &vid.to_string(), params()).await.unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);
    assert_eq!(TallerError::from_anyhow(&err).unwrap().message, "Vehículo no encontrado");

    let err = f
        .vehiculos
        .update(&b, &vid.to_string(), json!({"placa": "ZZZ"}), params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);

    let err = f.clientes.remove(&b, &cid.to_string(), params()).await.unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);

    // Still intact for the owner.
    let v = f.vehiculos.get(&tenant(1), &vid.to_string(), params()).await.unwrap();
    assert_eq!(v["placa"], json!("ABC-001"));
    assert_eq!(v["cliente_nombre"], json!("Ana"));
    assert_eq!(v["activo"], json!(true));
}

#[tokio::test]
async fn lists_only_contain_own_rows() {
    let f = fixture().await;
    seed(&f, 1, "Ana", "AAA-1").await;
    seed(&f, 2, "Beto", "BBB-1").await;
    seed(&f, 1, "Carla", "AAA-2").await;

    let rows = f.vehiculos.find(&tenant(1), params()).await.unwrap();
    let placas: Vec<&str> = rows.iter().map(|r| r["placa"].as_str().unwrap()).collect();
    assert_eq!(placas, vec!["AAA-1", "AAA-2"]);

    let rows = f.vehiculos.find(&tenant(2), params()).await.unwrap();
    assert_eq!(rows.len(), 1);

    let search = params().with_query("search", "carla");
    let rows = f.vehiculos.find(&tenant(1), search).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["placa"], json!("AAA-2"));
}

#[tokio::test]
async fn foreign_reference_is_rejected_without_insert() {
    let f = fixture().await;
    let (foreign_cliente, _) = seed(&f, 2, "Beto", "BBB-1").await;

    let err = f
        .vehiculos
        .create(&tenant(1), json!({"cliente_id": foreign_cliente, "placa": "SMUGGLED"}), params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);
    assert_eq!(TallerError::from_anyhow(&err).unwrap().message, "Cliente no encontrado");

    let all_b = f.vehiculos.find(&tenant(2), params()).await.unwrap();
    assert!(all_b.iter().all(|v| v["placa"] != json!("SMUGGLED")));
    assert!(f.vehiculos.find(&tenant(1), params()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_cannot_move_a_row_to_a_foreign_parent() {
    let f = fixture().await;
    let (_, vid) = seed(&f, 1, "Ana", "AAA-1").await;
    let (foreign_cliente, _) = seed(&f, 2, "Beto", "BBB-1").await;

    let err = f
        .vehiculos
        .update(&tenant(1), &vid.to_string(), json!({"cliente_id": foreign_cliente}), params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn partial_update_touches_only_supplied_fields() {
    let f = fixture().await;
    let (_, vid) = seed(&f, 1, "Ana", "AAA-1").await;
    let id = vid.to_string();

    let before = f.vehiculos.get(&tenant(1), &id, params()).await.unwrap();
    let after = f
        .vehiculos
        .update(&tenant(1), &id, json!({"extras": {"color": "rojo"}, "unknown": 1}), params())
        .await
        .unwrap();

    assert_eq!(after["extras"], json!({"color": "rojo"}));
    assert_eq!(after["placa"], before["placa"]);
    assert_eq!(after["cliente_id"], before["cliente_id"]);
    assert_eq!(after["activo"], before["activo"]);

    let err = f
        .vehiculos
        .update(&tenant(1), &id, json!({"taller_id": 9, "id": 100}), params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::BadRequest);
    let unchanged = f.vehiculos.get(&tenant(1), &id, params()).await.unwrap();
    assert_eq!(unchanged["extras"], json!({"color": "rojo"}));
}

#[tokio::test]
async fn null_on_a_required_column_is_rejected_without_write() {
    let f = fixture().await;
    let (cid, vid) = seed(&f, 1, "Ana", "AAA-1").await;

    let err = f
        .vehiculos
        .update(&tenant(1), &vid.to_string(), json!({"cliente_id": null, "placa": "ZZZ-9"}), params())
        .await
        .unwrap_err();
    let err = TallerError::from_anyhow(&err).unwrap();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(err.message, "El campo 'cliente_id' es requerido");

    let err = f
        .clientes
        .update(&tenant(1), &cid.to_string(), json!({"nombre": null}), params())
        .await
        .unwrap_err();
    assert_eq!(TallerError::from_anyhow(&err).unwrap().message, "El campo 'nombre' es requerido");

    let v = f.vehiculos.get(&tenant(1), &vid.to_string(), params()).await.unwrap();
    assert_eq!(v["placa"], json!("AAA-1"));
    let c = f.clientes.get(&tenant(1), &cid.to_string(), params()).await.unwrap();
    assert_eq!(c["nombre"], json!("Ana"));

    let cleared = f
        .clientes
        .update(&tenant(1), &cid.to_string(), json!({"cedula": null}), params())
        .await
        .unwrap();
    assert_eq!(cleared["cedula"], Value::Null);
}

#[tokio::test]
async fn writes_answer_with_the_same_shape_as_reads() {
    let f = fixture().await;
    let (cid, vid) = seed(&f, 1, "Ana", "AAA-1").await;
    let id = vid.to_string();

    let updated = f
        .vehiculos
        .update(&tenant(1), &id, json!({"placa": "AAA-2"}), params())
        .await
        .unwrap();
    let read = f.vehiculos.get(&tenant(1), &id, params()).await.unwrap();
    assert_eq!(updated, read);
    assert_eq!(updated["cliente_nombre"], json!("Ana"));
    assert_eq!(updated["placa"], json!("AAA-2"));

    let created = f
        .vehiculos
        .create(&tenant(1), json!({"cliente_id": cid, "placa": "AAA-3"}), params())
        .await
        .unwrap();
    assert_eq!(created["cliente_nombre"], json!("Ana"));
}

#[tokio::test]
async fn delete_twice_is_not_found_the_second_time() {
    let f = fixture().await;
    let (_, vid) = seed(&f, 1, "Ana", "AAA-1").await;
    let id = vid.to_string();

    let deleted = f.vehiculos.remove(&tenant(1), &id, params()).await.unwrap();
    assert_eq!(deleted["id"], json!(vid));

    let err = f.vehiculos.remove(&tenant(1), &id, params()).await.unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);

    let err = f.vehiculos.remove(&tenant(1), "999", params()).await.unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn referenced_parent_delete_is_a_conflict() {
    let f = fixture().await;
    let (cid, _) = seed(&f, 1, "Ana", "AAA-1").await;
    let err = f.clientes.remove(&tenant(1), &cid.to_string(), params()).await.unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::Conflict);
}

#[tokio::test]
async fn non_numeric_ids_are_bad_requests() {
    let f = fixture().await;
    for id in ["abc", "1;DROP TABLE clientes", ""] {
        let err = f.clientes.get(&tenant(1), id, params()).await.unwrap_err();
        assert_eq!(kind_of(&err), ErrorKind::BadRequest, "{id}");
    }
}

#[tokio::test]
async fn required_fields_and_natural_keys_are_prechecked() {
    let f = fixture().await;

    let err = f.vehiculos.create(&tenant(1), json!({"placa": "X"}), params()).await.unwrap_err();
    let err = TallerError::from_anyhow(&err).unwrap();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(err.message, "Faltan campos requeridos: cliente_id");

    f.clientes
        .create(&tenant(1), json!({"nombre": "Ana", "cedula": "123"}), params())
        .await
        .unwrap();
    let err = f
        .clientes
        .create(&tenant(1), json!({"nombre": "Otra Ana", "cedula": "123"}), params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::BadRequest);

    // Natural keys are per tenant.
    f.clientes
        .create(&tenant(2), json!({"nombre": "Ana", "cedula": "123"}), params())
        .await
        .unwrap();
    assert_eq!(f.clientes.find(&tenant(1), params()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn related_listing_checks_the_parent_first() {
    let f = fixture().await;
    let (cid, _) = seed(&f, 1, "Ana", "AAA-1").await;
    f.vehiculos
        .create(&tenant(1), json!({"cliente_id": cid, "placa": "AAA-2", "activo": false}), params())
        .await
        .unwrap();
    seed(&f, 1, "Beto", "BBB-1").await;

    let rows = f
        .clientes
        .related(&tenant(1), &cid.to_string(), "vehiculos", params())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let inactive = params().with_query("activo", "false");
    let rows = f
        .clientes
        .related(&tenant(1), &cid.to_string(), "vehiculos", inactive)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["activo"], Value::Bool(false));

    let err = f
        .clientes
        .related(&tenant(2), &cid.to_string(), "vehiculos", params())
        .await
        .unwrap_err();
    assert_eq!(TallerError::from_anyhow(&err).unwrap().message, "Cliente no encontrado");

    let err = f
        .clientes
        .related(&tenant(1), &cid.to_string(), "facturas", params())
        .await
        .unwrap_err();
    assert_eq!(kind_of(&err), ErrorKind::NotFound);
}
