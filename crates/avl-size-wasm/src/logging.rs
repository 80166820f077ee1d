//! ブラウザコンソールへ出力する tracing subscriber
//!
//! ```text
//! tracing::warn!(...)  → fmt::layer → ConsoleWriter → console.warn(...)
//! ```
//!
//! `configurePorts` は未設定なら既定フィルタ（`warn`）で自動的に登録する。
//! 詳細なログが欲しい場合は `configurePorts` より前に `initLogging` を呼ぶ。

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wasm_bindgen::prelude::*;

/// フィルタ未指定時のディレクティブ
pub const DEFAULT_FILTER: &str = "warn";

/// フィルタ文字列を解釈する（`EnvFilter` のディレクティブ構文）
///
/// 空文字や未指定は `DEFAULT_FILTER` として扱う。
pub fn parse_filter(directives: Option<&str>) -> Result<EnvFilter, String> {
    let directives = directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|e| format!("invalid log filter {:?}: {}", directives, e))
}

fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(ConsoleMakeWriter)
                // wasm32-unknown-unknown では SystemTime が使えない
                .without_time()
                .with_target(true)
                .with_ansi(false),
        )
        .try_init()
}

/// 既定フィルタで登録する。既に登録済みなら何もしない
pub(crate) fn init_default() {
    if let Ok(filter) = parse_filter(None) {
        let _ = install(filter);
    }
}

/// ログ出力を有効化する
///
/// # 引数
/// - `filter`: `"debug"`、`"avl_size_core=debug,warn"` など。省略時は `"warn"`
///
/// # エラー
/// - フィルタ文字列が不正
/// - 既に subscriber が登録済み（`configurePorts` の後に呼んだ場合を含む）
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(filter: Option<String>) -> Result<(), JsError> {
    let filter = parse_filter(filter.as_deref()).map_err(|e| JsError::new(&e))?;
    install(filter).map_err(|e| JsError::new(&format!("logging already initialized: {}", e)))
}

/// 出力先のコンソールメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleMethod {
    Error,
    Warn,
    Info,
    Debug,
}

fn console_method(level: Level) -> ConsoleMethod {
    match level {
        Level::ERROR => ConsoleMethod::Error,
        Level::WARN => ConsoleMethod::Warn,
        Level::INFO => ConsoleMethod::Info,
        _ => ConsoleMethod::Debug,
    }
}

struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(*meta.level())
    }
}

/// 1 イベント分をためて、Drop 時にまとめて console へ書く
struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl ConsoleWriter {
    fn new(level: Level) -> Self {
        ConsoleWriter {
            level,
            buf: Vec::new(),
        }
    }

    /// ためた内容を 1 行として取り出す（末尾の改行は落とす）
    fn take_line(&mut self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end();
        let line = if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        };
        self.buf.clear();
        line
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let Some(line) = self.take_line() else {
            return;
        };
        let msg = JsValue::from_str(&line);
        match console_method(self.level) {
            ConsoleMethod::Error => web_sys::console::error_1(&msg),
            ConsoleMethod::Warn => web_sys::console::warn_1(&msg),
            ConsoleMethod::Info => web_sys::console::info_1(&msg),
            ConsoleMethod::Debug => web_sys::console::debug_1(&msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_filter_defaults_to_warn() {
        assert!(parse_filter(None).is_ok());
        assert!(parse_filter(Some("   ")).is_ok());
        assert_eq!(
            parse_filter(None).map(|f| f.to_string()),
            parse_filter(Some(DEFAULT_FILTER)).map(|f| f.to_string())
        );
    }

    #[test]
    fn test_parse_filter_accepts_targets() {
        assert!(parse_filter(Some("debug")).is_ok());
        assert!(parse_filter(Some("avl_size_core=debug,warn")).is_ok());
    }

    #[test]
    fn test_parse_filter_rejects_unknown_level() {
        let err = parse_filter(Some("avl_size_core=loud")).unwrap_err();
        assert!(err.contains("avl_size_core=loud"));
    }

    #[test]
    fn test_console_method_by_level() {
        assert_eq!(console_method(Level::ERROR), ConsoleMethod::Error);
        assert_eq!(console_method(Level::WARN), ConsoleMethod::Warn);
        assert_eq!(console_method(Level::INFO), ConsoleMethod::Info);
        assert_eq!(console_method(Level::DEBUG), ConsoleMethod::Debug);
        assert_eq!(console_method(Level::TRACE), ConsoleMethod::Debug);
    }

    #[test]
    fn test_writer_joins_chunks_into_one_line() {
        let mut writer = ConsoleWriter::new(Level::WARN);
        write!(writer, " WARN avl_size_core::bridge: ").unwrap();
        writer.write_all(b"activation ignored\n").unwrap();

        assert_eq!(
            writer.take_line().as_deref(),
            Some(" WARN avl_size_core::bridge: activation ignored")
        );
        // 取り出し後は空なので Drop でコンソールに触れない
        assert_eq!(writer.take_line(), None);
    }
}
