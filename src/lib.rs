// パス: src/lib.rs
// 役割: クレートのルート。各モジュールを束ね、主要な型を再エクスポートする
// 意図: 言語処理（字句・構文）と REPL の中核（追跡・命名・評価）を分けて公開する
// 関連ファイル: src/readiness.rs, src/repl/driver.rs, src/bin/kaleido.rs
//! Kaleidoscope REPL (Rust) ルートモジュール
//!
//! 目的:
//! - 行単位の入力から構文の完結を判定し、完結した構文を名前付きで評価する。
//! - 評価エンジンはツリーインタプリタと Cranelift JIT を差し替え可能にする。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 文法・評価器・通知の受け手はトレイトで差し替えられるようにする。

pub mod ast;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod primitives;
pub mod prototype;
pub mod readiness;
pub mod repl;
pub mod span;

// 便利な再エクスポート（AST/エラー/パーサと中核の型）
pub use crate::ast::*;
pub use crate::errors::*;
pub use crate::parser::{parse_expr, parse_top_level, Grammar, KaleidoscopeGrammar, ParseOutcome};
pub use crate::prototype::{extract, ParameterDescriptor, PrototypeDescriptor};
pub use crate::readiness::{ReadinessEvent, ReadinessObserver, ReadinessTracker};
pub use crate::span::SourceSpan;
