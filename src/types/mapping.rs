//! Column type vocabulary and row-value decoding.
//!
//! MySQL reports a column type for every field of a result set; the decode
//! table here turns a raw driver value plus its column type into a [`Value`].

use crate::error::ConversionError;
use crate::types::Value;
use mysql_async::consts::ColumnType;

/// MySQL column type as seen in result set metadata.
///
/// The blob variants are collapsed into a single `Blob` since the length
/// class does not affect decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MysqlType {
    /// TINYINT
    Tiny,
    /// SMALLINT
    Short,
    /// MEDIUMINT
    Int24,
    /// INT
    Long,
    /// BIGINT
    LongLong,
    /// YEAR
    Year,
    /// FLOAT
    Float,
    /// DOUBLE
    Double,
    /// DECIMAL / NUMERIC
    Decimal,
    /// CHAR / BINARY
    String,
    /// VARCHAR / VARBINARY
    VarString,
    /// TINYBLOB through LONGBLOB, TEXT variants share the wire type
    Blob,
    /// JSON
    Json,
    /// DATE
    Date,
    /// TIME
    Time,
    /// DATETIME
    Datetime,
    /// TIMESTAMP
    Timestamp,
    /// Explicit NULL column
    Null,
}

impl MysqlType {
    /// Map a driver column type to the mylite vocabulary.
    ///
    /// # Errors
    /// Returns `ConversionError::UnsupportedType` for column types mylite
    /// does not decode (GEOMETRY, SET, ENUM internals and the like).
    pub fn from_column_type(ct: ColumnType) -> Result<Self, ConversionError> {
        match ct {
            ColumnType::MYSQL_TYPE_TINY => Ok(MysqlType::Tiny),
            ColumnType::MYSQL_TYPE_SHORT => Ok(MysqlType::Short),
            ColumnType::MYSQL_TYPE_INT24 => Ok(MysqlType::Int24),
            ColumnType::MYSQL_TYPE_LONG => Ok(MysqlType::Long),
            ColumnType::MYSQL_TYPE_LONGLONG => Ok(MysqlType::LongLong),
            ColumnType::MYSQL_TYPE_YEAR => Ok(MysqlType::Year),
            ColumnType::MYSQL_TYPE_FLOAT => Ok(MysqlType::Float),
            ColumnType::MYSQL_TYPE_DOUBLE => Ok(MysqlType::Double),
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                Ok(MysqlType::Decimal)
            }
            ColumnType::MYSQL_TYPE_STRING => Ok(MysqlType::String),
            ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => {
                Ok(MysqlType::VarString)
            }
            ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_BLOB => Ok(MysqlType::Blob),
            ColumnType::MYSQL_TYPE_JSON => Ok(MysqlType::Json),
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => Ok(MysqlType::Date),
            ColumnType::MYSQL_TYPE_TIME => Ok(MysqlType::Time),
            ColumnType::MYSQL_TYPE_DATETIME => Ok(MysqlType::Datetime),
            ColumnType::MYSQL_TYPE_TIMESTAMP => Ok(MysqlType::Timestamp),
            ColumnType::MYSQL_TYPE_NULL => Ok(MysqlType::Null),
            other => Err(ConversionError::UnsupportedType {
                type_name: format!("{:?}", other),
            }),
        }
    }

    /// Check if this type belongs to the integer family.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            MysqlType::Tiny
                | MysqlType::Short
                | MysqlType::Int24
                | MysqlType::Long
                | MysqlType::LongLong
                | MysqlType::Year
        )
    }

    /// Check if this type belongs to the float family.
    pub fn is_float(&self) -> bool {
        matches!(self, MysqlType::Float | MysqlType::Double)
    }

    /// Check if this type carries temporal values.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            MysqlType::Date | MysqlType::Time | MysqlType::Datetime | MysqlType::Timestamp
        )
    }
}

/// Decode a raw driver value into a [`Value`].
///
/// The binary protocol delivers typed values, the text protocol delivers
/// byte strings; both paths funnel through here. `binary` is the column's
/// BINARY flag and distinguishes BLOB from TEXT, which share a wire type.
///
/// Integer families decode to `Int`, FLOAT/DOUBLE to `Float`, character
/// types to `Text`, binary blobs to `Bytes`. DECIMAL decodes to `Int` when
/// integral and `Float` otherwise; temporal values pass through as text.
pub fn decode(
    raw: mysql_async::Value,
    ty: MysqlType,
    binary: bool,
    row: usize,
    column: usize,
) -> Result<Value, ConversionError> {
    use mysql_async::Value as Wire;

    match raw {
        Wire::NULL => Ok(Value::Null),
        Wire::Int(i) => Ok(Value::Int(i)),
        Wire::UInt(u) => Ok(match i64::try_from(u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(u),
        }),
        Wire::Float(f) => Ok(Value::Float(f64::from(f))),
        Wire::Double(d) => Ok(Value::Float(d)),
        Wire::Date(y, mo, d, h, mi, s, us) => Ok(Value::Text(format_date(
            ty, y, mo, d, h, mi, s, us,
        ))),
        Wire::Time(neg, days, h, mi, s, us) => {
            Ok(Value::Text(format_time(neg, days, h, mi, s, us)))
        }
        Wire::Bytes(bytes) => decode_bytes(bytes, ty, binary, row, column),
    }
}

fn decode_bytes(
    bytes: Vec<u8>,
    ty: MysqlType,
    binary: bool,
    row: usize,
    column: usize,
) -> Result<Value, ConversionError> {
    match ty {
        MysqlType::Blob if binary => Ok(Value::Bytes(bytes)),
        MysqlType::String | MysqlType::VarString if binary => Ok(Value::Bytes(bytes)),
        MysqlType::Json => serde_json::from_slice(&bytes)
            .map(Value::Json)
            .map_err(|e| ConversionError::ValueConversionFailed {
                row,
                column,
                message: format!("invalid JSON: {}", e),
            }),
        MysqlType::Decimal => {
            let text = into_utf8(bytes, row, column)?;
            decode_decimal(&text, row, column)
        }
        ty if ty.is_integer() => {
            let text = into_utf8(bytes, row, column)?;
            text.parse::<i64>().map(Value::Int).map_err(|_| {
                ConversionError::ValueConversionFailed {
                    row,
                    column,
                    message: format!("invalid integer: {}", text),
                }
            })
        }
        ty if ty.is_float() => {
            let text = into_utf8(bytes, row, column)?;
            text.parse::<f64>().map(Value::Float).map_err(|_| {
                ConversionError::ValueConversionFailed {
                    row,
                    column,
                    message: format!("invalid float: {}", text),
                }
            })
        }
        // TEXT columns, temporal text-protocol values and anything else
        // representable as a string.
        _ => into_utf8(bytes, row, column).map(Value::Text),
    }
}

fn decode_decimal(text: &str, row: usize, column: usize) -> Result<Value, ConversionError> {
    if text.contains('.') || text.contains('e') || text.contains('E') {
        return text.parse::<f64>().map(Value::Float).map_err(|_| {
            ConversionError::ValueConversionFailed {
                row,
                column,
                message: format!("invalid decimal: {}", text),
            }
        });
    }
    match text.parse::<i64>() {
        Ok(i) => Ok(Value::Int(i)),
        // DECIMAL(65) can exceed i64; keep the value rather than fail.
        Err(_) => text.parse::<f64>().map(Value::Float).map_err(|_| {
            ConversionError::NumericOverflow { row, column }
        }),
    }
}

fn into_utf8(bytes: Vec<u8>, row: usize, column: usize) -> Result<String, ConversionError> {
    String::from_utf8(bytes).map_err(|_| ConversionError::InvalidUtf8 { row, column })
}

#[allow(clippy::too_many_arguments)]
fn format_date(ty: MysqlType, y: u16, mo: u8, d: u8, h: u8, mi: u8, s: u8, us: u32) -> String {
    match ty {
        MysqlType::Date => format!("{:04}-{:02}-{:02}", y, mo, d),
        _ if us > 0 => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, mo, d, h, mi, s, us
        ),
        _ => format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, mo, d, h, mi, s),
    }
}

fn format_time(neg: bool, days: u32, h: u8, mi: u8, s: u8, us: u32) -> String {
    let sign = if neg { "-" } else { "" };
    let hours = u32::from(h) + days * 24;
    if us > 0 {
        format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, mi, s, us)
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, hours, mi, s)
    }
}
