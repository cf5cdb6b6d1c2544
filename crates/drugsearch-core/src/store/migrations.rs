//! Schema migrations for the SQLite-backed index store.

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial drug document schema with FTS5 and semantic cache",
        up: MIGRATION_V1_UP,
    },
];

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS drug_documents (
    ndc TEXT PRIMARY KEY,
    drug_name TEXT NOT NULL,
    brand_name TEXT NOT NULL DEFAULT '',
    generic_name TEXT NOT NULL,
    drug_class TEXT NOT NULL DEFAULT '',
    therapeutic_class TEXT NOT NULL DEFAULT '',
    gcn_seqno INTEGER NOT NULL,
    dosage_form TEXT NOT NULL,
    strength TEXT NOT NULL,
    route TEXT NOT NULL,
    manufacturer_name TEXT NOT NULL,
    is_generic INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    dea_schedule TEXT NOT NULL DEFAULT '',
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_drug_documents_gcn_seqno ON drug_documents(gcn_seqno);
CREATE INDEX IF NOT EXISTS idx_drug_documents_dosage_form ON drug_documents(dosage_form);
CREATE INDEX IF NOT EXISTS idx_drug_documents_dea_schedule ON drug_documents(dea_schedule);
CREATE INDEX IF NOT EXISTS idx_drug_documents_is_generic ON drug_documents(is_generic);
CREATE INDEX IF NOT EXISTS idx_drug_documents_is_active ON drug_documents(is_active);

CREATE VIRTUAL TABLE IF NOT EXISTS drug_documents_fts USING fts5(
    ndc UNINDEXED,
    drug_name,
    brand_name,
    generic_name,
    content='drug_documents',
    content_rowid='rowid',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS drug_documents_ai AFTER INSERT ON drug_documents BEGIN
    INSERT INTO drug_documents_fts(rowid, ndc, drug_name, brand_name, generic_name)
    VALUES (new.rowid, new.ndc, new.drug_name, new.brand_name, new.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS drug_documents_ad AFTER DELETE ON drug_documents BEGIN
    INSERT INTO drug_documents_fts(drug_documents_fts, rowid, ndc, drug_name, brand_name, generic_name)
    VALUES ('delete', old.rowid, old.ndc, old.drug_name, old.brand_name, old.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS drug_documents_au AFTER UPDATE ON drug_documents BEGIN
    INSERT INTO drug_documents_fts(drug_documents_fts, rowid, ndc, drug_name, brand_name, generic_name)
    VALUES ('delete', old.rowid, old.ndc, old.drug_name, old.brand_name, old.generic_name);
    INSERT INTO drug_documents_fts(rowid, ndc, drug_name, brand_name, generic_name)
    VALUES (new.rowid, new.ndc, new.drug_name, new.brand_name, new.generic_name);
END;

CREATE TABLE IF NOT EXISTS semantic_cache (
    id TEXT PRIMARY KEY,
    query_text TEXT NOT NULL,
    query_embedding BLOB NOT NULL,
    stored_output TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_semantic_cache_stored_at ON semantic_cache(stored_at);
"#;

pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [migration.version],
            )?;
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn applies_all_migrations_once() {
        let conn = Connection::open_in_memory().unwrap();
        let applied = apply_migrations(&conn).unwrap();
        assert_eq!(applied, MIGRATIONS.len() as u32);
        assert_eq!(apply_migrations(&conn).unwrap(), 0);
        assert_eq!(get_current_version(&conn).unwrap(), 1);
    }
}
