use mongodb::{
    bson::{doc, Document},
    error::{Error, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Database, IndexModel,
};
use std::sync::OnceLock;

static DB: OnceLock<Database> = OnceLock::new();

const DUPLICATE_KEY: i32 = 11000;

/// (collection, field) pairs backed by a unique index.
const UNIQUE_FIELDS: [(&str, &str); 5] = [
    ("staff", "nic"),
    ("staff", "email"),
    ("staff", "staff_id"),
    ("teams", "team_id"),
    ("admins", "email"),
];

pub async fn connect(uri: &str, name: &str) -> Result<(), String> {
    let client = Client::with_uri_str(uri)
        .await
        .map_err(|_| "DATABASE_CONNECTION_FAILED".to_string())?;
    let db = client.database(name);
    ensure_indexes(&db).await?;
    DB.set(db)
        .map_err(|_| "DATABASE_ALREADY_CONNECTED".to_string())
}

pub fn get_db() -> Result<Database, String> {
    DB.get()
        .cloned()
        .ok_or_else(|| "DATABASE_NOT_AVAILABLE".to_string())
}

fn unique_index(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn ensure_indexes(db: &Database) -> Result<(), String> {
    for (collection, field) in UNIQUE_FIELDS {
        db.collection::<Document>(collection)
            .create_index(unique_index(field), None)
            .await
            .map_err(|error| {
                tracing::error!(%error, collection, field, "unique index creation failed");
                "DATABASE_INDEX_FAILED".to_string()
            })?;
    }
    Ok(())
}

/// Maps a failed insert to `duplicate` when a unique key rejected it.
pub fn insert_error(error: &Error, duplicate: &str) -> String {
    let code = match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
        _ => None,
    };
    insert_error_code(code, duplicate)
}

fn insert_error_code(code: Option<i32>, duplicate: &str) -> String {
    match code {
        Some(DUPLICATE_KEY) => duplicate.to_string(),
        _ => "INSERTING_FAILED".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_become_conflict_codes() {
        assert_eq!(
            insert_error_code(Some(DUPLICATE_KEY), "STAFF_ALREADY_EXIST"),
            "STAFF_ALREADY_EXIST"
        );
        assert_eq!(
            insert_error_code(Some(121), "STAFF_ALREADY_EXIST"),
            "INSERTING_FAILED"
        );
        assert_eq!(insert_error_code(None, "TEAM_ALREADY_EXIST"), "INSERTING_FAILED");
    }

    #[test]
    fn identity_fields_are_uniquely_indexed() {
        for (_, field) in UNIQUE_FIELDS {
            let index = unique_index(field);
            assert_eq!(index.keys, doc! { field: 1 });
            assert_eq!(index.options.and_then(|options| options.unique), Some(true));
        }
        assert!(UNIQUE_FIELDS.contains(&("staff", "nic")));
        assert!(UNIQUE_FIELDS.contains(&("staff", "email")));
        assert!(UNIQUE_FIELDS.contains(&("staff", "staff_id")));
        assert!(UNIQUE_FIELDS.contains(&("teams", "team_id")));
        assert!(UNIQUE_FIELDS.contains(&("admins", "email")));
    }
}
