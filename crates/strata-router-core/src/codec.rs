//! Partition-key component codec
//!
//! Encodes a single typed value into the exact bytes the native protocol
//! carries for it. The concatenation of these encodings (no length prefixes)
//! is what the server hashes to place a row, so the byte layout here is a
//! wire contract, not an implementation detail.
//!
//! | Type                  | Encoding                                        |
//! |-----------------------|-------------------------------------------------|
//! | text, varchar, ascii  | raw string bytes                                |
//! | bigint/int/smallint   | big-endian two's complement, 8/4/2 bytes        |
//! | tinyint, boolean      | 1 byte                                          |
//! | double, float         | big-endian IEEE-754 bits                        |
//! | timestamp             | `millis * 1000` as big-endian i64               |
//! | uuid, timeuuid        | 16 bytes, RFC 4122 network order                |
//! | inet                  | 4 or 16 address bytes                           |
//! | date                  | days since epoch biased by 2^31, big-endian u32 |
//! | time                  | nanoseconds of day, big-endian i64              |
//! | blob                  | raw bytes                                       |

use bytes::BufMut;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use strata_types::{ColumnType, Value};
use uuid::Uuid;

use crate::error::{Result, RoutingError};

const DATE_EPOCH_BIAS: i64 = 1 << 31;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

fn unix_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Whether values of `column_type` can be part of a partition key
pub fn is_partition_key_type(column_type: ColumnType) -> bool {
    !matches!(
        column_type,
        ColumnType::Counter
            | ColumnType::Custom
            | ColumnType::Decimal
            | ColumnType::Tuple
            | ColumnType::Varint
            | ColumnType::List
            | ColumnType::Map
            | ColumnType::Set
            | ColumnType::Udt
    )
}

fn mismatch(expected: ColumnType, value: &Value) -> RoutingError {
    RoutingError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

/// Append the encoding of `value`, declared as `column_type`, to `buf`
pub fn encode<B: BufMut>(column_type: ColumnType, value: &Value, buf: &mut B) -> Result<()> {
    if !is_partition_key_type(column_type) {
        return Err(RoutingError::UnsupportedColumnType(column_type));
    }

    match (column_type, value) {
        (ColumnType::Text | ColumnType::Varchar, Value::Text(s)) => buf.put_slice(s.as_bytes()),
        (ColumnType::Ascii, Value::Text(s)) => {
            if !s.is_ascii() {
                return Err(RoutingError::TypeMismatch {
                    expected: ColumnType::Ascii,
                    actual: "non-ascii text",
                });
            }
            buf.put_slice(s.as_bytes());
        }
        (ColumnType::BigInt, Value::BigInt(v)) => buf.put_i64(*v),
        (ColumnType::Int, Value::Int(v)) => buf.put_i32(*v),
        (ColumnType::SmallInt, Value::SmallInt(v)) => buf.put_i16(*v),
        (ColumnType::TinyInt, Value::TinyInt(v)) => buf.put_i8(*v),
        (ColumnType::Boolean, Value::Boolean(v)) => buf.put_u8(u8::from(*v)),
        (ColumnType::Double, Value::Double(v)) => buf.put_u64(v.to_bits()),
        (ColumnType::Float, Value::Float(v)) => buf.put_u32(v.to_bits()),
        (ColumnType::Timestamp, Value::Timestamp(ts)) => {
            // Millisecond precision carried in a microsecond-capable value;
            // sub-millisecond parts truncate toward zero
            let millis = ts.timestamp_micros() / 1000;
            buf.put_i64(millis.wrapping_mul(1000));
        }
        (ColumnType::Uuid, Value::Uuid(id)) | (ColumnType::TimeUuid, Value::TimeUuid(id)) => {
            buf.put_slice(id.as_bytes());
        }
        (ColumnType::Inet, Value::Inet(IpAddr::V4(ip))) => buf.put_slice(&ip.octets()),
        (ColumnType::Inet, Value::Inet(IpAddr::V6(ip))) => buf.put_slice(&ip.octets()),
        (ColumnType::Date, Value::Date(date)) => {
            let days = date.signed_duration_since(unix_epoch_date()).num_days();
            buf.put_u32((days + DATE_EPOCH_BIAS) as u32);
        }
        (ColumnType::Time, Value::Time(time)) => {
            // Leap seconds have no nanoseconds-of-day representation
            if time.nanosecond() as i64 >= NANOS_PER_SECOND {
                return Err(invalid(
                    column_type,
                    format!("leap second {} is not a time of day", time),
                ));
            }
            let nanos = time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND
                + time.nanosecond() as i64;
            buf.put_i64(nanos);
        }
        (ColumnType::Blob, Value::Blob(bytes)) => buf.put_slice(bytes),
        _ => return Err(mismatch(column_type, value)),
    }

    Ok(())
}

/// Encode a single value into a fresh buffer
pub fn encode_to_vec(column_type: ColumnType, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(column_type, value, &mut buf)?;
    Ok(buf)
}

fn fixed<const N: usize>(column_type: ColumnType, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| RoutingError::InvalidEncoding {
        column_type,
        reason: format!("expected {} bytes, got {}", N, bytes.len()),
    })
}

fn invalid(column_type: ColumnType, reason: impl Into<String>) -> RoutingError {
    RoutingError::InvalidEncoding {
        column_type,
        reason: reason.into(),
    }
}

/// Decode one partition-key component previously produced by [`encode`]
pub fn decode(column_type: ColumnType, bytes: &[u8]) -> Result<Value> {
    if !is_partition_key_type(column_type) {
        return Err(RoutingError::UnsupportedColumnType(column_type));
    }

    let value = match column_type {
        ColumnType::Text | ColumnType::Varchar => {
            let s = std::str::from_utf8(bytes).map_err(|e| invalid(column_type, e.to_string()))?;
            Value::Text(s.to_string())
        }
        ColumnType::Ascii => {
            if !bytes.is_ascii() {
                return Err(invalid(column_type, "non-ascii byte"));
            }
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
        ColumnType::BigInt => Value::BigInt(i64::from_be_bytes(fixed(column_type, bytes)?)),
        ColumnType::Int => Value::Int(i32::from_be_bytes(fixed(column_type, bytes)?)),
        ColumnType::SmallInt => Value::SmallInt(i16::from_be_bytes(fixed(column_type, bytes)?)),
        ColumnType::TinyInt => Value::TinyInt(i8::from_be_bytes(fixed(column_type, bytes)?)),
        ColumnType::Boolean => {
            let [b] = fixed::<1>(column_type, bytes)?;
            Value::Boolean(b != 0)
        }
        ColumnType::Double => {
            Value::Double(f64::from_bits(u64::from_be_bytes(fixed(column_type, bytes)?)))
        }
        ColumnType::Float => {
            Value::Float(f32::from_bits(u32::from_be_bytes(fixed(column_type, bytes)?)))
        }
        ColumnType::Timestamp => {
            let micros = i64::from_be_bytes(fixed(column_type, bytes)?);
            let ts = DateTime::<Utc>::from_timestamp_millis(micros.div_euclid(1000))
                .ok_or_else(|| invalid(column_type, "timestamp out of range"))?;
            Value::Timestamp(ts)
        }
        ColumnType::Uuid => Value::Uuid(Uuid::from_bytes(fixed(column_type, bytes)?)),
        ColumnType::TimeUuid => Value::TimeUuid(Uuid::from_bytes(fixed(column_type, bytes)?)),
        ColumnType::Inet => match bytes.len() {
            4 => Value::Inet(IpAddr::V4(Ipv4Addr::from(fixed::<4>(column_type, bytes)?))),
            16 => Value::Inet(IpAddr::V6(Ipv6Addr::from(fixed::<16>(column_type, bytes)?))),
            n => return Err(invalid(column_type, format!("expected 4 or 16 bytes, got {}", n))),
        },
        ColumnType::Date => {
            let raw = u32::from_be_bytes(fixed(column_type, bytes)?);
            let days = raw as i64 - DATE_EPOCH_BIAS;
            let date = unix_epoch_date()
                .checked_add_signed(Duration::days(days))
                .ok_or_else(|| invalid(column_type, "date out of range"))?;
            Value::Date(date)
        }
        ColumnType::Time => {
            let nanos = i64::from_be_bytes(fixed(column_type, bytes)?);
            if !(0..NANOS_PER_DAY).contains(&nanos) {
                return Err(invalid(column_type, format!("{} ns is not a time of day", nanos)));
            }
            let time = NaiveTime::from_num_seconds_from_midnight_opt(
                (nanos / NANOS_PER_SECOND) as u32,
                (nanos % NANOS_PER_SECOND) as u32,
            )
            .ok_or_else(|| invalid(column_type, "time out of range"))?;
            Value::Time(time)
        }
        ColumnType::Blob => Value::Blob(bytes.to_vec()),
        other => return Err(RoutingError::UnsupportedColumnType(other)),
    };

    Ok(value)
}
