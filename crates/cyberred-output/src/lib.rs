//! Output Processor: three-tier extraction of findings from raw tool
//! output (deterministic parser, LLM distillation, raw truncation), plus
//! WASM-based hot-reload of additional Tier-1 parsers.

mod cache;
pub mod error;
mod hotreload;
mod llm_client;
mod parser;
mod parsers;
mod processor;
mod tier2;
mod types;

pub use error::OutputError;
pub use hotreload::{PluginWatcher, WasmParser, DEBOUNCE};
pub use llm_client::LlmClient;
pub use parser::{ParseOutcome, Parser, ParserRegistry};
pub use parsers::register_builtin;
pub use processor::{OutputProcessor, TimestampSource};
pub use types::{ParseContext, ProcessedOutput, RawFinding, Tier};
