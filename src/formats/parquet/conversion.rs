//! Conversion from Arrow arrays to text columns.
//!
//! Every target column is TEXT, so the reader turns each projected column into
//! a `StringArray` before the loader sees it. Nulls stay null. Temporal columns
//! get an explicit, deterministic rendering so the text read back from the
//! store never depends on a library's default formatting.

use anyhow::{Context, Result, anyhow};
use arrow::array::*;
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Time32MillisecondType, Time32SecondType,
    Time64MicrosecondType, Time64NanosecondType, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
/// Times with a non-zero fraction always carry six digits
const FRACTIONAL_TIME_FORMAT: &str = "%H:%M:%S%.6f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Normalize a creation date/time column to canonical text
///
/// Accepts date, time, timestamp and string arrays, including
/// dictionary-encoded strings. Anything else is rejected because it cannot
/// carry a date or time of day.
pub fn normalize_temporal(array: &dyn Array) -> Result<StringArray> {
    match array.data_type() {
        DataType::Date32 => {
            let arr = as_primitive_array::<Date32Type>(array);
            map_values(arr, |days| {
                let date = epoch_date()
                    .checked_add_signed(chrono::Duration::days(days as i64))
                    .context("Invalid date")?;
                Ok(date.format(DATE_FORMAT).to_string())
            })
        }
        DataType::Date64 => {
            let arr = as_primitive_array::<Date64Type>(array);
            map_values(arr, |millis| {
                let datetime = DateTime::from_timestamp_millis(millis).context("Invalid date")?;
                Ok(datetime.format(DATE_FORMAT).to_string())
            })
        }
        DataType::Time32(TimeUnit::Second) => {
            let arr = as_primitive_array::<Time32SecondType>(array);
            map_values(arr, |secs| format_time(secs as i64 * NANOS_PER_SECOND))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            let arr = as_primitive_array::<Time32MillisecondType>(array);
            map_values(arr, |millis| format_time(millis as i64 * 1_000_000))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            let arr = as_primitive_array::<Time64MicrosecondType>(array);
            map_values(arr, |micros| format_time(micros * 1_000))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            let arr = as_primitive_array::<Time64NanosecondType>(array);
            map_values(arr, format_time)
        }
        DataType::Timestamp(unit, _) => convert_timestamp(array, unit),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => to_text(array),
        DataType::Dictionary(_, value)
            if matches!(
                value.as_ref(),
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
            ) =>
        {
            to_text(array)
        }
        other => Err(anyhow!(
            "Unsupported type for a date/time column: {:?}",
            other
        )),
    }
}

/// Convert any supported Arrow array to a text array
///
/// Strings pass through, binary values are hex-encoded and everything else
/// uses Arrow's canonical string cast.
pub fn to_text(array: &dyn Array) -> Result<StringArray> {
    match array.data_type() {
        DataType::Utf8 => Ok(as_string_array(array).clone()),
        DataType::Binary => {
            let arr = as_generic_binary_array::<i32>(array);
            Ok(arr.iter().map(|v| v.map(hex::encode)).collect())
        }
        DataType::LargeBinary => {
            let arr = as_generic_binary_array::<i64>(array);
            Ok(arr.iter().map(|v| v.map(hex::encode)).collect())
        }
        DataType::Date32
        | DataType::Date64
        | DataType::Time32(_)
        | DataType::Time64(_)
        | DataType::Timestamp(_, _) => normalize_temporal(array),
        other => {
            let casted = cast(array, &DataType::Utf8).with_context(|| {
                format!("Unsupported array type for conversion: {:?}", other)
            })?;
            Ok(as_string_array(casted.as_ref()).clone())
        }
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Apply `f` to every non-null value, keeping nulls
fn map_values<T, F>(arr: &PrimitiveArray<T>, mut f: F) -> Result<StringArray>
where
    T: ArrowPrimitiveType,
    F: FnMut(T::Native) -> Result<String>,
{
    let mut builder = StringBuilder::with_capacity(arr.len(), arr.len() * 10);
    for i in 0..arr.len() {
        if arr.is_null(i) {
            builder.append_null();
        } else {
            builder.append_value(f(arr.value(i))?);
        }
    }
    Ok(builder.finish())
}

fn format_time(nanos_since_midnight: i64) -> Result<String> {
    let secs = nanos_since_midnight.div_euclid(NANOS_PER_SECOND);
    let nanos = nanos_since_midnight.rem_euclid(NANOS_PER_SECOND);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos as u32)
        .with_context(|| format!("Invalid time of day: {} ns", nanos_since_midnight))?;
    let format = if nanos == 0 {
        TIME_FORMAT
    } else {
        FRACTIONAL_TIME_FORMAT
    };
    Ok(time.format(format).to_string())
}

/// Convert timestamp arrays to strings
///
/// The format is chosen for the whole column: a column holding only midnight
/// values renders as plain dates, otherwise every value gets the time of day
/// with as many fractional digits as the most precise value needs.
fn convert_timestamp(array: &dyn Array, unit: &TimeUnit) -> Result<StringArray> {
    let datetimes = match unit {
        TimeUnit::Second => datetimes(
            as_primitive_array::<TimestampSecondType>(array),
            |seconds| DateTime::from_timestamp(seconds, 0),
        ),
        TimeUnit::Millisecond => datetimes(
            as_primitive_array::<TimestampMillisecondType>(array),
            DateTime::from_timestamp_millis,
        ),
        TimeUnit::Microsecond => datetimes(
            as_primitive_array::<TimestampMicrosecondType>(array),
            DateTime::from_timestamp_micros,
        ),
        TimeUnit::Nanosecond => datetimes(
            as_primitive_array::<TimestampNanosecondType>(array),
            |nanos| Some(DateTime::from_timestamp_nanos(nanos)),
        ),
    }?;

    let format = timestamp_format(&datetimes);
    Ok(datetimes
        .iter()
        .map(|value| value.map(|datetime| datetime.format(&format).to_string()))
        .collect())
}

fn datetimes<T, F>(arr: &PrimitiveArray<T>, f: F) -> Result<Vec<Option<NaiveDateTime>>>
where
    T: ArrowPrimitiveType,
    F: Fn(T::Native) -> Option<DateTime<Utc>>,
{
    arr.iter()
        .map(|value| {
            value
                .map(|raw| f(raw).map(|dt| dt.naive_utc()).context("Invalid timestamp"))
                .transpose()
        })
        .collect()
}

fn timestamp_format(values: &[Option<NaiveDateTime>]) -> String {
    let mut dates_only = true;
    let mut digits = 0;
    for datetime in values.iter().flatten() {
        let nanos = datetime.nanosecond();
        if datetime.num_seconds_from_midnight() != 0 || nanos != 0 {
            dates_only = false;
        }
        let needed = match nanos {
            0 => 0,
            n if n % 1_000_000 == 0 => 3,
            n if n % 1_000 == 0 => 6,
            _ => 9,
        };
        digits = digits.max(needed);
    }

    match (dates_only, digits) {
        (true, _) => DATE_FORMAT.to_string(),
        (false, 0) => TIMESTAMP_FORMAT.to_string(),
        (false, digits) => format!("{}%.{}f", TIMESTAMP_FORMAT, digits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Int32Type;
    use std::sync::Arc;

    fn values(arr: &StringArray) -> Vec<Option<&str>> {
        arr.iter().collect()
    }

    #[test]
    fn test_date32_renders_iso_date() {
        // 19783 days after the epoch is 2024-03-01
        let arr = Date32Array::from(vec![Some(0), Some(19783), None]);
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![Some("1970-01-01"), Some("2024-03-01"), None]
        );
    }

    #[test]
    fn test_date64_renders_iso_date() {
        let arr = Date64Array::from(vec![1_709_251_200_000]);
        let text = normalize_temporal(&arr).unwrap();
        assert_eq!(values(&text), vec![Some("2024-03-01")]);
    }

    #[test]
    fn test_time64_fraction_has_six_digits_when_present() {
        let micros = (14 * 3600 + 30 * 60) * 1_000_000i64;
        let arr = Time64MicrosecondArray::from(vec![Some(micros), Some(micros + 250_000), None]);
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![Some("14:30:00"), Some("14:30:00.250000"), None]
        );
    }

    #[test]
    fn test_time64_nanoseconds_keep_microsecond_precision() {
        let nanos = 3661 * NANOS_PER_SECOND + 5_000;
        let arr = Time64NanosecondArray::from(vec![nanos]);
        let text = normalize_temporal(&arr).unwrap();
        assert_eq!(values(&text), vec![Some("01:01:01.000005")]);
    }

    #[test]
    fn test_time32_seconds() {
        let arr = Time32SecondArray::from(vec![3661]);
        let text = normalize_temporal(&arr).unwrap();
        assert_eq!(values(&text), vec![Some("01:01:01")]);
    }

    #[test]
    fn test_timestamp_renders_date_and_time() {
        let arr = TimestampSecondArray::from(vec![1_709_303_400]);
        let text = normalize_temporal(&arr).unwrap();
        assert_eq!(values(&text), vec![Some("2024-03-01 14:30:00")]);
    }

    #[test]
    fn test_midnight_timestamps_render_as_dates() {
        // 2024-03-01T00:00:00 and 2024-03-02T00:00:00
        let arr = TimestampMicrosecondArray::from(vec![
            Some(1_709_251_200_000_000),
            None,
            Some(1_709_337_600_000_000),
        ]);
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![Some("2024-03-01"), None, Some("2024-03-02")]
        );
    }

    #[test]
    fn test_one_non_midnight_value_keeps_time_for_whole_column() {
        let arr = TimestampSecondArray::from(vec![1_709_251_200, 1_709_303_400]);
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![Some("2024-03-01 00:00:00"), Some("2024-03-01 14:30:00")]
        );
    }

    #[test]
    fn test_timestamp_fraction_width_follows_most_precise_value() {
        let arr = TimestampMillisecondArray::from(vec![1_709_303_400_000, 1_709_303_400_250]);
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![
                Some("2024-03-01 14:30:00.000"),
                Some("2024-03-01 14:30:00.250")
            ]
        );
    }

    #[test]
    fn test_dictionary_strings_pass_through_temporal_normalization() {
        let arr: DictionaryArray<Int32Type> =
            vec![Some("20240301"), None, Some("20240301")].into_iter().collect();
        let text = normalize_temporal(&arr).unwrap();

        assert_eq!(
            values(&text),
            vec![Some("20240301"), None, Some("20240301")]
        );
    }

    #[test]
    fn test_strings_pass_through_temporal_normalization() {
        let arr = StringArray::from(vec![Some("20240301"), None]);
        let text = normalize_temporal(&arr).unwrap();
        assert_eq!(values(&text), vec![Some("20240301"), None]);
    }

    #[test]
    fn test_numeric_column_is_not_temporal() {
        let arr = Int64Array::from(vec![20240301]);
        let err = normalize_temporal(&arr).unwrap_err();
        assert!(err.to_string().contains("Int64"));
    }

    #[test]
    fn test_to_text_numbers_and_booleans() {
        let ints = Int32Array::from(vec![Some(1), None, Some(-3)]);
        assert_eq!(
            values(&to_text(&ints).unwrap()),
            vec![Some("1"), None, Some("-3")]
        );

        let floats = Float64Array::from(vec![1.5]);
        assert_eq!(values(&to_text(&floats).unwrap()), vec![Some("1.5")]);

        let flags = BooleanArray::from(vec![true, false]);
        assert_eq!(
            values(&to_text(&flags).unwrap()),
            vec![Some("true"), Some("false")]
        );
    }

    #[test]
    fn test_to_text_binary_is_hex() {
        let arr = BinaryArray::from(vec![Some(&b"\x01\xff"[..]), None]);
        assert_eq!(values(&to_text(&arr).unwrap()), vec![Some("01ff"), None]);
    }

    #[test]
    fn test_to_text_large_utf8() {
        let arr: ArrayRef = Arc::new(LargeStringArray::from(vec!["DE", "US"]));
        assert_eq!(
            values(&to_text(arr.as_ref()).unwrap()),
            vec![Some("DE"), Some("US")]
        );
    }

    #[test]
    fn test_to_text_decimal() {
        let arr = Decimal128Array::from(vec![12345_i128])
            .with_precision_and_scale(10, 2)
            .unwrap();
        assert_eq!(values(&to_text(&arr).unwrap()), vec![Some("123.45")]);
    }
}
