use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| query_value(conn, key))
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                (key, value),
            )?;
            Ok(())
        })
    }

    pub fn delete_value(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

fn query_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
    let value = stmt
        .query_row([key], |row| row.get::<_, String>(0))
        .optional()?;
    Ok(value)
}

trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, KeyValueStore};

    #[test]
    fn set_get_overwrite_delete() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("authToken").unwrap(), None);

        db.set("authToken", "t1").unwrap();
        db.set("authToken", "t2").unwrap();
        assert_eq!(db.get("authToken").unwrap().as_deref(), Some("t2"));

        db.delete("authToken").unwrap();
        assert_eq!(db.get("authToken").unwrap(), None);

        // deleting a missing key is not an error
        db.delete("authToken").unwrap();
    }

    #[test]
    fn keys_are_independent() {
        let db = Database::open_in_memory().unwrap();
        db.set("userId", "u1").unwrap();
        db.set("friendRequestSent_u1", "true").unwrap();
        assert_eq!(db.get("userId").unwrap().as_deref(), Some("u1"));
        assert_eq!(db.get("friendRequestSent_u1").unwrap().as_deref(), Some("true"));
        assert_eq!(db.get("friendRequestSent_u2").unwrap(), None);
    }
}
