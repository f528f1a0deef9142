//! Catalog data type -> Go type mapping
//!
//! Handles both PostgreSQL and MySQL spellings so that catalogs for either
//! dialect can feed the emitter.

/// Go type used for timestamp-like columns
pub const TIME_TYPE: &str = "time.Time";

/// Map a catalog data type to the declared Go type
///
/// Length/precision suffixes and array markers are ignored for the base
/// lookup; arrays are not special-cased and fall back to `string`.
pub fn go_type(data_type: &str) -> &'static str {
    let base_type = data_type
        .split('(')
        .next()
        .unwrap_or(data_type)
        .trim()
        .to_lowercase();

    match base_type.as_str() {
        "boolean" | "bool" => "bool",

        "bigint" | "int8" | "bigserial" | "serial8" => "int64",
        "integer" | "int" | "int4" | "serial" | "serial4" | "mediumint" => "int32",
        "smallint" | "int2" | "smallserial" | "serial2" | "tinyint" => "int32",

        "real" | "float4" | "float" => "float32",
        "double precision" | "float8" | "double" | "numeric" | "decimal" | "money" => "float64",

        "date"
        | "datetime"
        | "time"
        | "time without time zone"
        | "time with time zone"
        | "timetz"
        | "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz" => TIME_TYPE,

        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            "[]byte"
        }

        _ => "string",
    }
}

/// Whether a declared Go type needs the `time` package
pub fn needs_time_import(go_type: &str) -> bool {
    go_type.contains(TIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths() {
        assert_eq!(go_type("bigint"), "int64");
        assert_eq!(go_type("integer"), "int32");
        assert_eq!(go_type("tinyint(1)"), "int32");
    }

    #[test]
    fn timestamps_map_to_time() {
        assert_eq!(go_type("timestamp with time zone"), "time.Time");
        assert_eq!(go_type("datetime(3)"), "time.Time");
        assert_eq!(go_type("DATE"), "time.Time");
        assert!(needs_time_import("time.Time"));
        assert!(!needs_time_import("string"));
    }

    #[test]
    fn strings_and_fallback() {
        assert_eq!(go_type("character varying(255)"), "string");
        assert_eq!(go_type("jsonb"), "string");
        assert_eq!(go_type("uuid"), "string");
        assert_eq!(go_type("bytea"), "[]byte");
        assert_eq!(go_type("numeric(10,2)"), "float64");
    }
}
