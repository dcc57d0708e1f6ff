use sqlhooks_driver::{Error, Result, Value};
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Row, TypeInfo, Value as _, ValueRef};
use time::PrimitiveDateTime;

/// Convert a SQLite value to a driver [`Value`].
///
/// Dates and times are stored as TEXT by SQLite and come back as text.
/// Booleans are stored as INTEGER unless the column is declared BOOLEAN.
pub fn to_value(value: SqliteValueRef) -> Result<Value> {
   if value.is_null() {
      return Ok(Value::Null);
   }

   let column_type = value.type_info();

   // Handle types based on SQLite's type affinity
   let result = match column_type.name() {
      "TEXT" | "DATE" | "TIME" => value
         .to_owned()
         .try_decode::<String>()
         .map_or(Value::Null, Value::Text),

      "REAL" => value
         .to_owned()
         .try_decode::<f64>()
         .map_or(Value::Null, Value::Real),

      "INTEGER" | "NUMERIC" => value
         .to_owned()
         .try_decode::<i64>()
         .map_or(Value::Null, Value::Integer),

      "BOOLEAN" => value
         .to_owned()
         .try_decode::<bool>()
         .map_or(Value::Null, Value::Bool),

      "DATETIME" => {
         if let Ok(dt) = value.to_owned().try_decode::<PrimitiveDateTime>() {
            Value::Text(dt.to_string())
         } else if let Ok(v) = value.to_owned().try_decode::<String>() {
            Value::Text(v)
         } else {
            Value::Null
         }
      }

      "BLOB" => value
         .to_owned()
         .try_decode::<Vec<u8>>()
         .map_or(Value::Null, Value::Blob),

      "NULL" => Value::Null,

      _ => {
         // For unknown types, try to decode as text
         if let Ok(text) = value.to_owned().try_decode::<String>() {
            Value::Text(text)
         } else {
            return Err(Error::UnsupportedDatatype(format!(
               "Unknown SQLite type: {}",
               column_type.name()
            )));
         }
      }
   };

   Ok(result)
}

/// Decode every column of a row in order.
pub fn decode_row(row: &SqliteRow) -> Result<Vec<Value>> {
   (0..row.len())
      .map(|i| {
         let raw = row.try_get_raw(i).map_err(Error::driver)?;
         to_value(raw)
      })
      .collect()
}
