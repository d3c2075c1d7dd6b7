use tokio_postgres::types::Json;
use tracing::instrument;

use super::PgPool;
use super::store::StoreError;
use super::util::TimedClientExt;
use crate::api::{Dictionary, DictionaryValues};

#[instrument(skip(pool))]
pub async fn find_dictionary(pool: &PgPool, name: &str) -> Result<Option<Dictionary>, StoreError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT name, vals FROM sm.dictionaries WHERE name = $1",
            &[&name],
            "dictionaries.find",
        )
        .await?;

    Ok(row.map(|row| {
        let values: Json<DictionaryValues> = row.get("vals");
        Dictionary {
            name: row.get("name"),
            values: values.0,
        }
    }))
}

#[instrument(skip(pool, dictionary), fields(name = %dictionary.name))]
pub async fn insert_dictionary_if_absent(
    pool: &PgPool,
    dictionary: &Dictionary,
) -> Result<bool, StoreError> {
    let client = pool.get().await?;
    let inserted = client
        .timed_execute(
            "INSERT INTO sm.dictionaries (name, vals) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
            &[&dictionary.name, &Json(&dictionary.values)],
            "dictionaries.insert",
        )
        .await?;
    Ok(inserted > 0)
}
