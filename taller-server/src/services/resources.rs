//! Descriptors of every tenant-owned resource.
//!
//! Ownership chains:
//!
//! | resource     | chain to the tenant                  |
//! |--------------|--------------------------------------|
//! | usuarios     | `t.taller_id`                        |
//! | clientes     | `t.taller_id`                        |
//! | servicios    | `t.taller_id`                        |
//! | cotizaciones | `t.taller_id`                        |
//! | vehiculos    | vehiculo → cliente                   |
//! | citas        | cita → vehiculo → cliente            |
//! | ordenes      | orden → vehiculo → cliente           |

use taller_sql::{
    ChildRoute, DefaultValue, FieldKind, FieldSpec, FilterOp, FilterSpec, JoinStep, OwnershipChain, Projection,
    Reference, ResourceDescriptor, UniqueKey, UpdatePolicy, CRUD,
};

const VIA_CLIENTE: &[JoinStep] = &[JoinStep {
    table: "clientes",
    alias: "c",
    on: "c.id = t.cliente_id",
}];

const VIA_VEHICULO: &[JoinStep] = &[
    JoinStep {
        table: "vehiculos",
        alias: "v",
        on: "v.id = t.vehiculo_id",
    },
    JoinStep {
        table: "clientes",
        alias: "c",
        on: "c.id = v.cliente_id",
    },
];

const VEHICULO_PROJECTIONS: &[Projection] = &[
    Projection {
        expr: "v.placa",
        alias: "placa",
    },
    Projection {
        expr: "v.cliente_id",
        alias: "cliente_id",
    },
    Projection {
        expr: "c.nombre",
        alias: "cliente_nombre",
    },
];

pub static USUARIOS: ResourceDescriptor = ResourceDescriptor {
    name: "usuarios",
    table: "usuarios",
    fields: &[
        FieldSpec::rw("nombre", FieldKind::Text),
        FieldSpec::rw("email", FieldKind::Text),
        FieldSpec::rw("password_hash", FieldKind::Text),
        FieldSpec::rw("rol", FieldKind::Text),
        FieldSpec::rw("activo", FieldKind::Boolean),
    ],
    ownership: OwnershipChain::direct(),
    references: &[],
    filters: &[
        FilterSpec::eq("rol", "t.rol", FieldKind::Text),
        FilterSpec::eq("activo", "t.activo", FieldKind::Boolean),
    ],
    search_columns: &["t.nombre", "t.email"],
    projections: &[],
    order_by: "t.nombre, t.id",
    defaults: &[("rol", DefaultValue::Text("mecanico")), ("activo", DefaultValue::Bool(true))],
    required: &["nombre", "email", "password_hash"],
    unique_keys: &[UniqueKey {
        fields: &["email"],
        message: "Ya existe un usuario con ese email",
    }],
    children: &[],
    policy: UpdatePolicy::AllowList,
    not_found: "Usuario no encontrado",
    methods: CRUD,
};

pub static CLIENTES: ResourceDescriptor = ResourceDescriptor {
    name: "clientes",
    table: "clientes",
    fields: &[
        FieldSpec::rw("nombre", FieldKind::Text),
        FieldSpec::rw("cedula", FieldKind::Text),
        FieldSpec::rw("telefono", FieldKind::Text),
        FieldSpec::rw("email", FieldKind::Text),
        FieldSpec::rw("direccion", FieldKind::Text),
        FieldSpec::rw("notas", FieldKind::Text),
    ],
    ownership: OwnershipChain::direct(),
    references: &[],
    filters: &[],
    search_columns: &["t.nombre", "t.cedula", "t.telefono", "t.email"],
    projections: &[],
    order_by: "t.nombre, t.id",
    defaults: &[],
    required: &["nombre"],
    unique_keys: &[UniqueKey {
        fields: &["cedula"],
        message: "Ya existe un cliente con esa cédula",
    }],
    children: &[
        ChildRoute {
            relation: "vehiculos",
            child: &VEHICULOS,
            column: "t.cliente_id",
        },
        ChildRoute {
            relation: "cotizaciones",
            child: &COTIZACIONES,
            column: "t.cliente_id",
        },
    ],
    policy: UpdatePolicy::AllowList,
    not_found: "Cliente no encontrado",
    methods: CRUD,
};

pub static VEHICULOS: ResourceDescriptor = ResourceDescriptor {
    name: "vehiculos",
    table: "vehiculos",
    fields: &[
        FieldSpec::rw("cliente_id", FieldKind::Integer),
        FieldSpec::rw("placa", FieldKind::Text),
        FieldSpec::rw("marca", FieldKind::Text),
        FieldSpec::rw("modelo", FieldKind::Text),
        FieldSpec::rw("anio", FieldKind::Integer),
        FieldSpec::rw("color", FieldKind::Text),
        FieldSpec::rw("vin", FieldKind::Text),
        FieldSpec::rw("kilometraje", FieldKind::Integer),
    ],
    ownership: OwnershipChain::through(VIA_CLIENTE, "c.taller_id"),
    references: &[Reference {
        field: "cliente_id",
        target: &CLIENTES,
    }],
    filters: &[FilterSpec::eq("cliente_id", "t.cliente_id", FieldKind::Integer)],
    search_columns: &["t.placa", "t.marca", "t.modelo", "c.nombre"],
    projections: &[Projection {
        expr: "c.nombre",
        alias: "cliente_nombre",
    }],
    order_by: "t.placa, t.id",
    defaults: &[],
    required: &["cliente_id", "placa"],
    unique_keys: &[UniqueKey {
        fields: &["placa"],
        message: "Ya existe un vehículo con esa placa",
    }],
    children: &[
        ChildRoute {
            relation: "citas",
            child: &CITAS,
            column: "t.vehiculo_id",
        },
        ChildRoute {
            relation: "ordenes",
            child: &ORDENES,
            column: "t.vehiculo_id",
        },
    ],
    policy: UpdatePolicy::AllowList,
    not_found: "Vehículo no encontrado",
    methods: CRUD,
};

pub static SERVICIOS: ResourceDescriptor = ResourceDescriptor {
    name: "servicios",
    table: "servicios",
    fields: &[
        FieldSpec::rw("nombre", FieldKind::Text),
        FieldSpec::rw("descripcion", FieldKind::Text),
        FieldSpec::rw("precio", FieldKind::Decimal).not_null(),
        FieldSpec::rw("duracion_minutos", FieldKind::Integer),
        FieldSpec::rw("activo", FieldKind::Boolean),
    ],
    ownership: OwnershipChain::direct(),
    references: &[],
    filters: &[FilterSpec::eq("activo", "t.activo", FieldKind::Boolean)],
    search_columns: &["t.nombre", "t.descripcion"],
    projections: &[],
    order_by: "t.nombre, t.id",
    defaults: &[("activo", DefaultValue::Bool(true))],
    required: &["nombre"],
    unique_keys: &[UniqueKey {
        fields: &["nombre"],
        message: "Ya existe un servicio con ese nombre",
    }],
    children: &[],
    policy: UpdatePolicy::Coalesce,
    not_found: "Servicio no encontrado",
    methods: CRUD,
};

pub static CITAS: ResourceDescriptor = ResourceDescriptor {
    name: "citas",
    table: "citas",
    fields: &[
        FieldSpec::rw("vehiculo_id", FieldKind::Integer),
        FieldSpec::rw("fecha", FieldKind::Date),
        FieldSpec::rw("hora", FieldKind::Time),
        FieldSpec::rw("motivo", FieldKind::Text),
        FieldSpec::rw("estado", FieldKind::Text),
        FieldSpec::rw("notas", FieldKind::Text),
    ],
    ownership: OwnershipChain::through(VIA_VEHICULO, "c.taller_id"),
    references: &[Reference {
        field: "vehiculo_id",
        target: &VEHICULOS,
    }],
    filters: &[
        FilterSpec::eq("estado", "t.estado", FieldKind::Text),
        FilterSpec::eq("fecha", "t.fecha", FieldKind::Date),
        FilterSpec::eq("vehiculo_id", "t.vehiculo_id", FieldKind::Integer),
        FilterSpec::eq("cliente_id", "v.cliente_id", FieldKind::Integer),
        FilterSpec::range("fecha_desde", "t.fecha", FilterOp::Gte, FieldKind::Date),
        FilterSpec::range("fecha_hasta", "t.fecha", FilterOp::Lte, FieldKind::Date),
    ],
    search_columns: &["t.motivo", "v.placa", "c.nombre"],
    projections: VEHICULO_PROJECTIONS,
    order_by: "t.fecha, t.hora, t.id",
    defaults: &[("estado", DefaultValue::Text("pendiente"))],
    required: &["vehiculo_id", "fecha"],
    unique_keys: &[],
    children: &[],
    policy: UpdatePolicy::AllowList,
    not_found: "Cita no encontrada",
    methods: CRUD,
};

pub static ORDENES: ResourceDescriptor = ResourceDescriptor {
    name: "ordenes",
    table: "ordenes",
    fields: &[
        FieldSpec::rw("vehiculo_id", FieldKind::Integer),
        FieldSpec::rw("cita_id", FieldKind::Integer),
        FieldSpec::rw("descripcion", FieldKind::Text),
        FieldSpec::rw("diagnostico", FieldKind::Text),
        FieldSpec::rw("estado", FieldKind::Text),
        FieldSpec::rw("fecha_ingreso", FieldKind::Date).not_null(),
        FieldSpec::rw("fecha_entrega", FieldKind::Date),
        FieldSpec::rw("kilometraje", FieldKind::Integer),
        FieldSpec::rw("total", FieldKind::Decimal).not_null(),
    ],
    ownership: OwnershipChain::through(VIA_VEHICULO, "c.taller_id"),
    references: &[
        Reference {
            field: "vehiculo_id",
            target: &VEHICULOS,
        },
        Reference {
            field: "cita_id",
            target: &CITAS,
        },
    ],
    filters: &[
        FilterSpec::eq("estado", "t.estado", FieldKind::Text),
        FilterSpec::eq("vehiculo_id", "t.vehiculo_id", FieldKind::Integer),
        FilterSpec::eq("cliente_id", "v.cliente_id", FieldKind::Integer),
        FilterSpec::range("fecha_desde", "t.fecha_ingreso", FilterOp::Gte, FieldKind::Date),
        FilterSpec::range("fecha_hasta", "t.fecha_ingreso", FilterOp::Lte, FieldKind::Date),
    ],
    search_columns: &["t.descripcion", "t.diagnostico", "v.placa", "c.nombre"],
    projections: VEHICULO_PROJECTIONS,
    order_by: "t.fecha_ingreso DESC, t.id DESC",
    defaults: &[("estado", DefaultValue::Text("abierta"))],
    required: &["vehiculo_id", "descripcion"],
    unique_keys: &[],
    children: &[],
    policy: UpdatePolicy::AllowList,
    not_found: "Orden no encontrada",
    methods: CRUD,
};

pub static COTIZACIONES: ResourceDescriptor = ResourceDescriptor {
    name: "cotizaciones",
    table: "cotizaciones",
    fields: &[
        FieldSpec::rw("cliente_id", FieldKind::Integer),
        FieldSpec::rw("vehiculo_id", FieldKind::Integer),
        FieldSpec::rw("codigo", FieldKind::Text),
        FieldSpec::rw("cliente_nombre", FieldKind::Text),
        FieldSpec::rw("cliente_cedula", FieldKind::Text),
        FieldSpec::rw("vehiculo_placa", FieldKind::Text),
        FieldSpec::rw("fecha", FieldKind::Date).not_null(),
        FieldSpec::rw("estado", FieldKind::Text),
        FieldSpec::rw("es_proforma", FieldKind::Boolean),
        FieldSpec::rw("items", FieldKind::Json).not_null(),
        FieldSpec::rw("subtotal_repuestos", FieldKind::Decimal).not_null(),
        FieldSpec::rw("subtotal_mano_obra", FieldKind::Decimal).not_null(),
        FieldSpec::rw("subtotal", FieldKind::Decimal).not_null(),
        FieldSpec::rw("iva", FieldKind::Decimal).not_null(),
        FieldSpec::rw("impuesto", FieldKind::Decimal).not_null(),
        FieldSpec::rw("total", FieldKind::Decimal).not_null(),
        FieldSpec::rw("validez_dias", FieldKind::Integer),
        FieldSpec::rw("notas", FieldKind::Text),
    ],
    ownership: OwnershipChain::direct(),
    references: &[
        Reference {
            field: "cliente_id",
            target: &CLIENTES,
        },
        Reference {
            field: "vehiculo_id",
            target: &VEHICULOS,
        },
    ],
    filters: &[
        FilterSpec::eq("estado", "t.estado", FieldKind::Text),
        FilterSpec::eq("cliente_id", "t.cliente_id", FieldKind::Integer),
        FilterSpec::eq("es_proforma", "t.es_proforma", FieldKind::Boolean),
        FilterSpec::range("fecha_desde", "t.fecha", FilterOp::Gte, FieldKind::Date),
        FilterSpec::range("fecha_hasta", "t.fecha", FilterOp::Lte, FieldKind::Date),
    ],
    search_columns: &["t.codigo", "t.cliente_nombre", "t.cliente_cedula", "t.vehiculo_placa", "t.notas"],
    projections: &[],
    order_by: "t.fecha DESC, t.id DESC",
    defaults: &[
        ("estado", DefaultValue::Text("borrador")),
        ("es_proforma", DefaultValue::Bool(false)),
    ],
    required: &["codigo"],
    unique_keys: &[UniqueKey {
        fields: &["codigo"],
        message: "Ya existe una cotización con ese código",
    }],
    children: &[],
    policy: UpdatePolicy::AllowList,
    not_found: "Cotización no encontrada",
    methods: CRUD,
};

/// Every CRUD resource, in mount order.
pub static ALL: &[&ResourceDescriptor] = &[
    &USUARIOS,
    &CLIENTES,
    &VEHICULOS,
    &SERVICIOS,
    &CITAS,
    &ORDENES,
    &COTIZACIONES,
];

#[cfg(test)]
mod tests {
    use taller_sql::{Dialect, ScopedQuery};
    use taller_core::{Principal, TenantContext, TenantId};

    use super::*;

    #[test]
    fn every_read_reaches_the_tenant_column() {
        let tenant = TenantContext::new(Principal::new("1", "admin", TenantId(7)));
        for desc in ALL {
            let stmt = ScopedQuery::new(desc, Dialect::Sqlite).select_one(1, &tenant);
            assert!(stmt.sql.contains("taller_id = $2"), "{}: {}", desc.name, stmt.sql);
        }
    }

    #[test]
    fn appointment_chain_runs_through_vehicle_and_client() {
        let tenant = TenantContext::new(Principal::new("1", "admin", TenantId(7)));
        let stmt = ScopedQuery::new(&CITAS, Dialect::Postgres).delete(4, &tenant);
        assert!(stmt.sql.contains("JOIN vehiculos v ON v.id = t.vehiculo_id"));
        assert!(stmt.sql.contains("JOIN clientes c ON c.id = v.cliente_id"));
        assert!(stmt.sql.contains("c.taller_id = $2::bigint"));
    }

    /// `NOT NULL` columns of `table` in the SQLite schema script.
    fn not_null_columns(table: &str) -> Vec<String> {
        let start = format!("CREATE TABLE IF NOT EXISTS {table} (");
        let body = crate::db::SQLITE_SCHEMA
            .split(&start)
            .nth(1)
            .and_then(|rest| rest.split(");").next())
            .unwrap_or_default();
        body.lines()
            .map(str::trim)
            .filter(|l| l.contains("NOT NULL"))
            .filter_map(|l| l.split_whitespace().next())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn not_null_columns_never_accept_null_updates() {
        for desc in ALL {
            let columns = not_null_columns(desc.table);
            assert!(!columns.is_empty(), "{} missing from schema", desc.table);
            for f in desc.updatable() {
                if columns.iter().any(|c| c == f.name) {
                    assert!(!f.nullable, "{}.{} is NOT NULL", desc.name, f.name);
                }
            }
        }
    }

    #[test]
    fn references_and_children_point_at_known_resources() {
        for desc in ALL {
            for r in desc.references {
                assert!(desc.field(r.field).is_some(), "{}.{}", desc.name, r.field);
                assert!(ALL.iter().any(|d| d.name == r.target.name));
            }
            for c in desc.children {
                assert!(ALL.iter().any(|d| d.name == c.child.name));
            }
        }
    }
}
