use crate::tree::LogMessage;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

// Opt-in JSONL developer log shared by every conversion of a converter.
// Write failures are swallowed; they never change a conversion.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_stage_ms(&self, name: &str, doc_id: Option<usize>, ms: f64) {
        let json = format!(
            "{{\"type\":\"svg.stage\",\"name\":\"{}\",\"doc_id\":{},\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            doc_json(doc_id),
            ms
        );
        self.log_json(&json);
    }

    pub fn log_diagnostic(&self, doc_id: Option<usize>, message: &LogMessage) {
        let json = format!(
            "{{\"type\":\"svg.diagnostic\",\"doc_id\":{},\"level\":\"{}\",\"line\":{},\"message\":\"{}\"}}",
            doc_json(doc_id),
            message.level.label(),
            message.line,
            json_escape(&message.message)
        );
        self.log_json(&json);
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let counts = counters
                .iter()
                .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"svg.summary\",\"context\":\"{}\",\"counts\":{{{}}}}}",
                json_escape(context),
                counts
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

fn doc_json(doc_id: Option<usize>) -> String {
    doc_id
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::LogLevel;

    fn temp_log(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("svgdrawable_debug_{}_{}.jsonl", name, std::process::id()))
    }

    #[test]
    fn escapes_quotes_and_control_characters() {
        assert_eq!(json_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(json_escape("\u{1}"), "\\u0001");
    }

    #[test]
    fn writes_stage_diagnostic_and_summary_lines() {
        let path = temp_log("lines");
        let logger = DebugLogger::new(&path).expect("create log");
        logger.log_stage_ms("extract", Some(3), 1.25);
        logger.log_diagnostic(
            None,
            &LogMessage {
                level: LogLevel::Warning,
                line: 7,
                message: "Scaling of \"stroke\"".to_string(),
            },
        );
        logger.increment("leaves", 2);
        logger.increment("leaves", 1);
        logger.increment("nodes", 5);
        logger.emit_summary("convert_str");
        logger.flush();

        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "{\"type\":\"svg.stage\",\"name\":\"extract\",\"doc_id\":3,\"unit\":\"ms\",\"ms\":1.250}",
                "{\"type\":\"svg.diagnostic\",\"doc_id\":null,\"level\":\"WARNING\",\"line\":7,\"message\":\"Scaling of \\\"stroke\\\"\"}",
                "{\"type\":\"svg.summary\",\"context\":\"convert_str\",\"counts\":{\"leaves\":3,\"nodes\":5}}",
            ]
        );
    }

    #[test]
    fn summary_resets_counters() {
        let path = temp_log("reset");
        let logger = DebugLogger::new(&path).expect("create log");
        logger.increment("nodes", 1);
        logger.emit_summary("first");
        logger.emit_summary("second");
        logger.flush();
        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        assert!(text.lines().nth(1).is_some_and(|l| l.ends_with("\"counts\":{}}")));
    }
}
