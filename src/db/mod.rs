pub mod entities;
pub mod enums;
pub mod services;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

/// Creates any missing tables from the entity definitions. The schema is
/// small enough that entity-derived DDL beats carrying a migration crate.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::node::Entity),
        schema.create_table_from_entity(entities::node_group::Entity),
        schema.create_table_from_entity(entities::node_group_member::Entity),
        schema.create_table_from_entity(entities::playbook_execution::Entity),
        schema.create_table_from_entity(entities::inventory_import::Entity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        db.execute(backend.build(statement)).await?;
    }

    Ok(())
}
