//! ピクセル寸法と属性文字列の整数パース
//!
//! 属性値はホストの `parseInt(s, 10)` と同じ規則で解釈する。
//! パースできない値は NaN 番兵になり、検証や拒否はしない。

use serde::{Serialize, Serializer};

use crate::PayloadFormat;

/// i64 で表せる範囲の境界（2^63）
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// 1 軸分の寸法（ピクセル）
///
/// 常に整数値か NaN のどちらか。NaN は「属性が無い／数値でない」を表す番兵で、
/// JS 側へはそのまま `NaN` として渡る。
#[derive(Debug, Clone, Copy)]
pub struct Dimension(f64);

impl Dimension {
    /// パース失敗を表す番兵
    pub const NAN: Self = Dimension(f64::NAN);

    /// 整数値から生成する
    pub fn from_int(value: i64) -> Self {
        Dimension(value as f64)
    }

    /// NaN 番兵か
    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    /// 整数値を返す。NaN または i64 に収まらない場合は `None`
    pub fn value(&self) -> Option<i64> {
        if self.0.is_nan() || self.0 >= I64_LIMIT || self.0 <= -I64_LIMIT {
            None
        } else {
            Some(self.0 as i64)
        }
    }

    /// JS の Number として渡す値（NaN はそのまま）
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// NaN 同士は等しいとみなす（番兵としての比較）
impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || (self.is_nan() && other.is_nan())
    }
}

impl Eq for Dimension {}

impl From<i64> for Dimension {
    fn from(value: i64) -> Self {
        Dimension::from_int(value)
    }
}

impl core::fmt::Display for Dimension {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{}", v),
            None if self.is_nan() => write!(f, "NaN"),
            None => write!(f, "{}", self.0),
        }
    }
}

/// JSON では整数か `null`（NaN）になる
impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value() {
            Some(v) => serializer.serialize_i64(v),
            None if self.is_nan() => serializer.serialize_none(),
            None => serializer.serialize_f64(self.0),
        }
    }
}

/// 幅と高さの組
///
/// チャンネル境界では `{width, height}` のタグ付き構造として扱い、
/// 位置による取り違えを避ける。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionPair {
    pub width: Dimension,
    pub height: Dimension,
}

impl DimensionPair {
    pub fn new(width: i64, height: i64) -> Self {
        DimensionPair {
            width: Dimension::from_int(width),
            height: Dimension::from_int(height),
        }
    }

    /// width / height 属性の生の値から組み立てる
    ///
    /// 属性が無い場合も空文字と同様に NaN になる。
    pub fn from_attributes(width: Option<&str>, height: Option<&str>) -> Self {
        DimensionPair {
            width: width.map_or(Dimension::NAN, parse_int),
            height: height.map_or(Dimension::NAN, parse_int),
        }
    }

    /// 旧形式 `[width, height]` 用の値
    pub fn to_tuple(&self) -> [f64; 2] {
        [self.width.as_f64(), self.height.as_f64()]
    }
}

/// JS の StrWhiteSpaceChar（WhiteSpace + LineTerminator）
///
/// `char::is_whitespace` とは一致しない。U+0085 (NEL) は含まず、U+FEFF は含む。
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\u{000B}' | '\u{000C}' | '\u{FEFF}'
            | '\n' | '\r' | '\u{2028}' | '\u{2029}'
            // Unicode 一般カテゴリ Zs
            | ' ' | '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}'
            | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

/// サイズポートに載せる値
///
/// JS 境界でそのまま Number になる `f64` を持つ。NaN も保持する。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// `{width, height}`
    Record { width: f64, height: f64 },
    /// `[width, height]`
    Tuple([f64; 2]),
}

impl DimensionPair {
    /// 設定された形式でポートに渡す値を作る
    pub fn to_payload(&self, format: PayloadFormat) -> Payload {
        match format {
            PayloadFormat::Record => Payload::Record {
                width: self.width.as_f64(),
                height: self.height.as_f64(),
            },
            PayloadFormat::Tuple => Payload::Tuple(self.to_tuple()),
        }
    }
}

/// 文字列を 10 進整数として解釈する（`parseInt(s, 10)` 相当）
///
/// 1. 先頭の空白を読み飛ばす
/// 2. 符号 `+` / `-` を 1 つだけ受け付ける
/// 3. 連続する ASCII 数字を読む。以降の文字は無視する（`"42px"` → 42）
/// 4. 数字が 1 つも無ければ NaN
pub fn parse_int(text: &str) -> Dimension {
    let rest = text.trim_start_matches(is_js_whitespace);

    let (negative, digits) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let mut value = 0f64;
    let mut seen_digit = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10.0 + f64::from(b - b'0');
        seen_digit = true;
    }

    if !seen_digit {
        return Dimension::NAN;
    }
    Dimension(if negative { -value } else { value })
}
