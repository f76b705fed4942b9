//! Typed values that can be bound to a dynamically built PostgreSQL query.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A bindable value. `None` binds a typed NULL so assignments to typed columns work.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    I32(Option<i32>),
    I64(Option<i64>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Decimal(Option<BigDecimal>),
}

impl PgBindValue {
    pub fn text(s: impl Into<String>) -> Self {
        PgBindValue::Text(Some(s.into()))
    }

    pub fn int(n: i64) -> Self {
        PgBindValue::I64(Some(n))
    }
}

impl From<&str> for PgBindValue {
    fn from(s: &str) -> Self {
        PgBindValue::text(s)
    }
}

impl From<String> for PgBindValue {
    fn from(s: String) -> Self {
        PgBindValue::Text(Some(s))
    }
}

impl From<i64> for PgBindValue {
    fn from(n: i64) -> Self {
        PgBindValue::I64(Some(n))
    }
}

impl From<i32> for PgBindValue {
    fn from(n: i32) -> Self {
        PgBindValue::I32(Some(n))
    }
}

impl From<NaiveDate> for PgBindValue {
    fn from(d: NaiveDate) -> Self {
        PgBindValue::Date(Some(d))
    }
}

impl From<BigDecimal> for PgBindValue {
    fn from(d: BigDecimal) -> Self {
        PgBindValue::Decimal(Some(d))
    }
}

impl From<Option<i64>> for PgBindValue {
    fn from(n: Option<i64>) -> Self {
        PgBindValue::I64(n)
    }
}

impl From<Option<NaiveDate>> for PgBindValue {
    fn from(d: Option<NaiveDate>) -> Self {
        PgBindValue::Date(d)
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::I32(v) => <Option<i32> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::I64(v) => <Option<i64> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Text(v) => <Option<String> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Date(v) => <Option<NaiveDate> as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::Decimal(v) => <Option<BigDecimal> as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    /// The declared parameter type follows the variant, not the blanket TEXT.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::I32(_) => <i32 as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::Text(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Date(_) => <NaiveDate as Type<Postgres>>::type_info(),
            PgBindValue::Decimal(_) => <BigDecimal as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_typed_variants() {
        assert_eq!(PgBindValue::from(7i64), PgBindValue::I64(Some(7)));
        assert_eq!(PgBindValue::from("x"), PgBindValue::Text(Some("x".into())));
        assert_eq!(PgBindValue::from(None::<i64>), PgBindValue::I64(None));
    }

    #[test]
    fn declared_type_follows_variant() {
        let ty = PgBindValue::int(1).produces().unwrap();
        assert_eq!(ty, <i64 as Type<Postgres>>::type_info());
        let ty = PgBindValue::Date(None).produces().unwrap();
        assert_eq!(ty, <NaiveDate as Type<Postgres>>::type_info());
    }
}
